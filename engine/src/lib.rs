//! Query engines that run compiled game searches.

mod error;
mod filter;
mod memory;

use arcade_protocol::game::Game;
use arcade_protocol::search::GameSearch;
use arcade_protocol::search::PageKeyset;
use async_trait::async_trait;

pub use error::EngineError;
pub use filter::matches;
pub use memory::MemoryEngine;

/// Runs a [`GameSearch`] against some game store.
///
/// Cursors are opaque to callers: [`QueryEngine::keyset`] hands them out and
/// [`QueryEngine::page`] resumes from one.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn first_page(&self, search: &GameSearch) -> Result<Vec<Game>, EngineError>;

    /// Cursors of every page after the first, plus the result count.
    async fn keyset(&self, search: &GameSearch) -> Result<PageKeyset, EngineError>;

    async fn page(&self, search: &GameSearch, offset: u64) -> Result<Vec<Game>, EngineError>;
}
