//! Per-view search state and its reducers.
//!
//! Every response carries the `search_id` of the search that produced it.
//! Data from an older search is dropped, data from a newer one replaces
//! whatever the view holds.

use crate::pages::PageCache;
use crate::pages::RequestState;
use arcade_protocol::game::Game;
use arcade_protocol::game::Playlist;
use arcade_protocol::search::AdvancedFilter;
use arcade_protocol::search::GameOrderBy;
use arcade_protocol::search::PageKeyset;
use arcade_protocol::search::QueryData;
use arcade_protocol::search::SearchQuery;
use arcade_protocol::search::SortDirection;
use arcade_protocol::search::ViewPage;
use std::collections::BTreeMap;
use tracing::debug;

/// Results of the current search of a view.
#[derive(Debug)]
pub struct ViewData {
    pub search_id: u64,
    /// `keyset[i]` is the cursor of page `i + 1`.
    pub keyset: Vec<u64>,
    pub total: Option<u64>,
    pub meta_state: RequestState,
    pub pages: PageCache,
}

impl ViewData {
    fn new(max_resident_pages: usize) -> Self {
        Self {
            search_id: 0,
            keyset: Vec::new(),
            total: None,
            meta_state: RequestState::Waiting,
            pages: PageCache::new(max_resident_pages),
        }
    }

    fn reset(&mut self, search_id: u64) {
        self.search_id = search_id;
        self.keyset.clear();
        self.total = None;
        self.meta_state = RequestState::Requested;
        self.pages.clear();
    }
}

/// A partial update for [`ResultsView::add_data`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AddData {
    pub search_id: u64,
    pub page: Option<usize>,
    pub games: Option<Vec<Game>>,
    pub total: Option<u64>,
    pub pages: BTreeMap<usize, RequestState>,
    pub keyset: Option<Vec<u64>>,
}

impl AddData {
    pub fn page(search_id: u64, page: usize, games: Vec<Game>) -> Self {
        Self {
            search_id,
            page: Some(page),
            games: Some(games),
            ..Self::default()
        }
    }

    pub fn keyset(search_id: u64, keyset: PageKeyset) -> Self {
        Self {
            search_id,
            total: Some(keyset.total),
            keyset: Some(keyset.keyset),
            ..Self::default()
        }
    }
}

impl From<ViewPage> for AddData {
    fn from(page: ViewPage) -> Self {
        Self::page(page.search_id, page.page, page.games)
    }
}

#[derive(Debug)]
pub struct ResultsView {
    pub id: String,
    pub text: String,
    pub advanced_filter: AdvancedFilter,
    pub order_by: GameOrderBy,
    pub order_direction: SortDirection,
    pub selected_playlist: Option<Playlist>,
    pub selected_game: Option<Game>,
    /// Compiled query of the current search.
    pub search_filter: SearchQuery,
    pub data: ViewData,
}

impl ResultsView {
    pub fn new(id: impl Into<String>, library: Option<&str>, max_resident_pages: usize) -> Self {
        let id = id.into();
        Self {
            search_filter: SearchQuery::empty(id.clone()),
            id,
            text: String::new(),
            advanced_filter: AdvancedFilter::for_library(library),
            order_by: GameOrderBy::default(),
            order_direction: SortDirection::default(),
            selected_playlist: None,
            selected_game: None,
            data: ViewData::new(max_resident_pages),
        }
    }

    /// Parameters for the next search of this view, one generation ahead
    /// of anything it has seen.
    pub fn next_query_data(&self) -> QueryData {
        QueryData {
            view_id: self.id.clone(),
            search_id: self.search_filter.search_id.max(self.data.search_id) + 1,
            text: self.text.clone(),
            advanced_filter: self.advanced_filter.clone(),
            order_by: self.order_by,
            order_direction: self.order_direction,
            playlist: self.selected_playlist.clone(),
        }
    }

    /// Adopts a freshly compiled query unless a newer one is already in
    /// place. Clears all results on success.
    pub fn set_filter(&mut self, filter: SearchQuery) -> bool {
        if filter.search_id <= self.search_filter.search_id {
            debug!(
                view = %self.id,
                search_id = filter.search_id,
                current = self.search_filter.search_id,
                "ignoring outdated filter"
            );
            return false;
        }
        self.data.reset(filter.search_id);
        self.search_filter = filter;
        true
    }

    pub fn add_data(&mut self, update: AddData) -> bool {
        if update.search_id < self.data.search_id {
            debug!(
                view = %self.id,
                search_id = update.search_id,
                current = self.data.search_id,
                "dropping stale results"
            );
            return false;
        }
        if update.search_id > self.data.search_id {
            self.data.reset(update.search_id);
        }
        let data = &mut self.data;

        if let Some(total) = update.total {
            data.total = Some(total);
        }
        if let Some(keyset) = update.keyset {
            data.pages.set_state(0, RequestState::Received);
            for page in 1..=keyset.len() {
                if !data.pages.is_resident(page) {
                    data.pages.set_state(page, RequestState::Waiting);
                }
            }
            data.keyset = keyset;
        }
        for (page, state) in update.pages {
            data.pages.set_state(page, state);
        }
        if let Some(page) = update.page {
            let games = update.games.unwrap_or_default();
            if page == 0 && games.is_empty() {
                data.total = Some(0);
            }
            if let Some(evicted) = data.pages.store(page, games) {
                debug!(view = %self.id, page = evicted, "evicted cached page");
            }
            data.meta_state = RequestState::Received;
        }
        true
    }

    /// Marks the fetchable pages in `start..start + count` as requested
    /// and returns the queries to send for them. Page 0 arrives with the
    /// first-page fetch and is never requested here.
    pub fn request_range(&mut self, start: usize, count: usize, search_id: u64) -> Vec<SearchQuery> {
        if search_id != self.data.search_id {
            return Vec::new();
        }
        let end = start
            .saturating_add(count)
            .min(self.data.keyset.len().saturating_add(1));
        let mut queries = Vec::new();
        for page in start.max(1)..end {
            match self.data.pages.state(page) {
                Some(RequestState::Waiting) => {
                    let cursor = self.data.keyset[page - 1];
                    self.data.pages.set_state(page, RequestState::Requested);
                    let mut query = self.search_filter.for_page(page, cursor);
                    query.search_id = self.data.search_id;
                    queries.push(query);
                }
                Some(RequestState::Received) => self.data.pages.touch(page),
                _ => {}
            }
        }
        queries
    }

    /// Row at an absolute index of the current results.
    pub fn game(&self, index: usize) -> Option<&Game> {
        self.data.pages.game(index)
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_order_by(&mut self, order_by: GameOrderBy) {
        self.order_by = order_by;
    }

    pub fn set_order_direction(&mut self, direction: SortDirection) {
        self.order_direction = direction;
    }

    pub fn set_advanced_filter(&mut self, filter: AdvancedFilter) {
        self.advanced_filter = filter;
    }

    pub fn select_playlist(&mut self, playlist: Option<Playlist>) {
        self.selected_playlist = playlist;
    }

    pub fn select_game(&mut self, game: Option<Game>) {
        self.selected_game = game;
    }

    /// Replaces every copy of `game` this view holds.
    pub fn update_game(&mut self, game: &Game) {
        if let Some(selected) = self.selected_game.as_mut()
            && selected.id == game.id
        {
            *selected = game.clone();
        }
        for row in self.data.pages.games_mut().filter(|row| row.id == game.id) {
            *row = game.clone();
        }
    }

    /// Moves `source_game_id` to the place of `dest_game_id` in the
    /// selected playlist. Only allowed while results follow the playlist
    /// order; the cached rows of both games are then moved to match.
    /// Returns the updated playlist, which the caller persists.
    pub fn move_playlist_game(
        &mut self,
        source_game_id: &str,
        dest_game_id: &str,
    ) -> Option<Playlist> {
        if !self.advanced_filter.playlist_order || source_game_id == dest_game_id {
            return None;
        }
        let playlist = self.selected_playlist.as_mut()?;
        let source = playlist.position(source_game_id)?;
        let dest = playlist.position(dest_game_id)?;
        let entry = playlist.games.remove(source);
        playlist.games.insert(dest, entry);
        let playlist = playlist.clone();

        if let Some(source_row) = self.data.pages.position(source_game_id)
            && let Some(dest_row) = self.data.pages.position(dest_game_id)
        {
            self.data.pages.move_row(source_row, dest_row);
        }
        Some(playlist)
    }
}
