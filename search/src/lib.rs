//! Client-side search views over the back's game library.
//!
//! Parameters entered in the UI are compiled by [`compiler`] (usually on the
//! back, through `parse_query_data`), then [`controller::SearchController`]
//! fetches the first page and the page keyset of every view and merges
//! pushed pages into its [`view::ResultsView`]s.

pub mod advanced;
pub mod compiler;
pub mod controller;
pub mod freeform;
pub mod pages;
pub mod remote;
pub mod view;
pub mod views;

pub use compiler::CompileInput;
pub use compiler::SearchPreferences;
pub use compiler::compile;
pub use compiler::create_search_query;
pub use controller::BrowseBackend;
pub use controller::DebounceTiming;
pub use controller::SearchController;
pub use freeform::BasicInputParser;
pub use freeform::SearchInputParser;
pub use pages::PageCache;
pub use pages::RequestState;
pub use remote::BackClient;
pub use remote::route_pages;
pub use view::AddData;
pub use view::ResultsView;
pub use view::ViewData;
pub use views::GENERAL_VIEW_ID;
pub use views::SearchViews;
pub use views::StoredView;
