//! The back process: serves game searches, playlists and logs to clients
//! over an authenticated websocket.

pub mod config;
pub mod daemon;
pub mod handlers;
pub mod log_buffer;
pub mod logging;
pub mod metadata;
pub mod playlists;

pub use config::BackConfig;
pub use config::ConfigError;
pub use daemon::Back;
pub use daemon::run;
pub use metadata::DaemonMetadata;
