pub mod browse_cmd;
pub mod serve_cmd;

pub use browse_cmd::BrowseCommand;
pub use browse_cmd::run_browse;
pub use serve_cmd::ServeCommand;
pub use serve_cmd::run_serve;
