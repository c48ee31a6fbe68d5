use crate::EngineError;
use crate::QueryEngine;
use crate::filter::matches;
use arcade_protocol::VIEW_PAGE_SIZE;
use arcade_protocol::game::Game;
use arcade_protocol::search::GameSearch;
use arcade_protocol::search::PageKeyset;
use arcade_protocol::search::SortColumn;
use arcade_protocol::search::SortDirection;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Engine over an in-memory game list. A cursor is the position of the
/// first row of a page within the ordered results.
#[derive(Debug)]
pub struct MemoryEngine {
    games: Vec<Game>,
    page_size: usize,
}

impl MemoryEngine {
    pub fn new(games: Vec<Game>) -> Self {
        Self {
            games,
            page_size: VIEW_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Loads a JSON array of games.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path).map_err(|source| EngineError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let engine = Self::from_json(&json)?;
        info!(path = %path.display(), games = engine.len(), "loaded game list");
        Ok(engine)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    fn page_size(&self, search: &GameSearch) -> usize {
        search
            .limit
            .and_then(|limit| usize::try_from(limit).ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(self.page_size)
    }

    /// Matching games in result order.
    fn results(&self, search: &GameSearch) -> Vec<&Game> {
        let mut results: Vec<&Game> = self
            .games
            .iter()
            .filter(|game| matches(&search.filter, game))
            .collect();
        let custom: HashMap<&str, usize> = search
            .custom_id_order
            .iter()
            .flatten()
            .enumerate()
            .map(|(position, id)| (id.as_str(), position))
            .collect();
        results.sort_by(|a, b| {
            let primary = compare(search.order.column, &custom, a, b);
            let primary = match search.order.direction {
                SortDirection::Asc => primary,
                SortDirection::Desc => primary.reverse(),
            };
            primary
                .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
                .then_with(|| a.id.cmp(&b.id))
        });
        results
    }

    fn slice(&self, search: &GameSearch, offset: usize) -> Vec<Game> {
        self.results(search)
            .into_iter()
            .skip(offset)
            .take(self.page_size(search))
            .cloned()
            .collect()
    }
}

fn compare(column: SortColumn, custom: &HashMap<&str, usize>, a: &Game, b: &Game) -> Ordering {
    let text = |x: &str, y: &str| x.to_lowercase().cmp(&y.to_lowercase());
    match column {
        SortColumn::Title => text(&a.title, &b.title),
        SortColumn::Developer => text(&a.developer, &b.developer),
        SortColumn::Publisher => text(&a.publisher, &b.publisher),
        SortColumn::Series => text(&a.series, &b.series),
        SortColumn::Platform => text(&a.platform, &b.platform),
        SortColumn::DateAdded => a.date_added.cmp(&b.date_added),
        SortColumn::DateModified => a.date_modified.cmp(&b.date_modified),
        SortColumn::ReleaseDate => a.release_date.cmp(&b.release_date),
        SortColumn::LastPlayed => a.last_played.cmp(&b.last_played),
        SortColumn::Playtime => a.playtime.cmp(&b.playtime),
        SortColumn::Custom => {
            let position = |game: &Game| custom.get(game.id.as_str()).copied().unwrap_or(usize::MAX);
            position(a).cmp(&position(b))
        }
    }
}

#[async_trait]
impl QueryEngine for MemoryEngine {
    async fn first_page(&self, search: &GameSearch) -> Result<Vec<Game>, EngineError> {
        Ok(self.slice(search, 0))
    }

    async fn keyset(&self, search: &GameSearch) -> Result<PageKeyset, EngineError> {
        let total = self.results(search).len();
        let page_size = self.page_size(search);
        let keyset = (page_size..total)
            .step_by(page_size)
            .map(|cursor| cursor as u64)
            .collect();
        Ok(PageKeyset {
            keyset,
            total: total as u64,
        })
    }

    async fn page(&self, search: &GameSearch, offset: u64) -> Result<Vec<Game>, EngineError> {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(self.slice(search, offset))
    }
}
