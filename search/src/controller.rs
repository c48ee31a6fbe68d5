//! UI-facing entry points. Every call is a fire-and-forget transition;
//! the UI reads results back through [`SearchController::view`].

use crate::pages::DEFAULT_RESIDENT_PAGES;
use crate::pages::RequestState;
use crate::view::AddData;
use crate::view::ResultsView;
use crate::views::SearchViews;
use crate::views::StoredView;
use arcade_protocol::game::Game;
use arcade_protocol::game::Playlist;
use arcade_protocol::search::AdvancedFilter;
use arcade_protocol::search::FirstPage;
use arcade_protocol::search::GameOrderBy;
use arcade_protocol::search::PageKeyset;
use arcade_protocol::search::QueryData;
use arcade_protocol::search::SearchQuery;
use arcade_protocol::search::SortDirection;
use arcade_protocol::search::ViewPage;
use arcade_socket::SocketError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

/// The back as seen by the search controller.
#[async_trait]
pub trait BrowseBackend: Send + Sync + 'static {
    async fn parse_query_data(&self, data: QueryData) -> Result<SearchQuery, SocketError>;

    async fn first_page(&self, query: SearchQuery) -> Result<FirstPage, SocketError>;

    async fn keyset(&self, query: SearchQuery) -> Result<PageKeyset, SocketError>;

    /// Asks for one page; the rows come back later as a pushed
    /// [`ViewPage`] that the caller feeds to [`SearchController::apply_page`].
    fn request_page(&self, query: SearchQuery) -> Result<(), SocketError>;

    fn save_playlist(&self, playlist: Playlist) -> Result<(), SocketError>;
}

/// Delays of the two search stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebounceTiming {
    /// Quiet period after a parameter change before the search compiles.
    pub compile: Duration,
    /// Delay between adopting a compiled search and fetching its rows.
    pub fetch: Duration,
}

impl Default for DebounceTiming {
    fn default() -> Self {
        Self {
            compile: Duration::from_millis(125),
            fetch: Duration::from_millis(50),
        }
    }
}

pub struct SearchController<B: BrowseBackend> {
    inner: Arc<Inner<B>>,
}

impl<B: BrowseBackend> Clone for SearchController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<B> {
    backend: B,
    views: Mutex<SearchViews>,
    /// Live search task of each view.
    searches: Mutex<HashMap<String, CancellationToken>>,
    timing: DebounceTiming,
}

/// Parameter-changing methods spawn the search task, so they must be
/// called from within a Tokio runtime.
impl<B: BrowseBackend> SearchController<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, DebounceTiming::default(), DEFAULT_RESIDENT_PAGES)
    }

    pub fn with_options(backend: B, timing: DebounceTiming, max_resident_pages: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                views: Mutex::new(SearchViews::new(max_resident_pages)),
                searches: Mutex::new(HashMap::new()),
                timing,
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    pub fn create_views(&self, names: &[String], stored: &[StoredView], are_libraries: bool) {
        lock(&self.inner.views).create_views(names, stored, are_libraries);
        let live = lock(&self.inner.views).names();
        lock(&self.inner.searches).retain(|view, token| {
            let keep = live.contains(view);
            if !keep {
                token.cancel();
            }
            keep
        });
    }

    pub fn add_views(&self, names: &[String], stored: &[StoredView]) {
        lock(&self.inner.views).add_views(names, stored);
    }

    pub fn delete_view(&self, name: &str) -> bool {
        self.cancel_search(name);
        lock(&self.inner.views).delete_view(name)
    }

    pub fn rename_view(&self, old: &str, new: &str) -> bool {
        self.cancel_search(old);
        lock(&self.inner.views).rename_view(old, new)
    }

    pub fn set_search_text(&self, view: &str, text: impl Into<String>) {
        let text = text.into();
        self.change(view, |v| v.set_text(text));
    }

    pub fn select_playlist(&self, view: &str, playlist: Option<Playlist>) {
        self.change(view, |v| v.select_playlist(playlist));
    }

    pub fn set_order_by(&self, view: &str, order_by: GameOrderBy) {
        self.change(view, |v| v.set_order_by(order_by));
    }

    pub fn set_order_reverse(&self, view: &str, direction: SortDirection) {
        self.change(view, |v| v.set_order_direction(direction));
    }

    pub fn set_advanced_filter(&self, view: &str, filter: AdvancedFilter) {
        self.change(view, |v| v.set_advanced_filter(filter));
    }

    /// Searches again right away with the current parameters.
    pub fn force_search(&self, view: &str) {
        if lock(&self.inner.views).get(view).is_some() {
            self.schedule(view, Duration::ZERO);
        }
    }

    pub fn select_game(&self, view: &str, game: Option<Game>) {
        if let Some(v) = lock(&self.inner.views).get_mut(view) {
            v.select_game(game);
        }
    }

    /// Refreshes `game` in every view that holds a copy of it.
    pub fn update_game(&self, game: &Game) {
        lock(&self.inner.views).update_game(game);
    }

    /// Moves `source_game_id` to the place of `dest_game_id` in the selected
    /// playlist of `view` and saves it.
    pub fn move_playlist_game(
        &self,
        view: &str,
        source_game_id: &str,
        dest_game_id: &str,
    ) -> bool {
        let playlist = lock(&self.inner.views)
            .get_mut(view)
            .and_then(|v| v.move_playlist_game(source_game_id, dest_game_id));
        let Some(playlist) = playlist else {
            return false;
        };
        if let Err(err) = self.inner.backend.save_playlist(playlist) {
            warn!(view, error = %err, "failed to save playlist");
        }
        true
    }

    /// Requests the pages covering `start..start + count` that are known
    /// but not fetched yet.
    pub fn request_range(&self, view: &str, search_id: u64, start: usize, count: usize) {
        let queries = lock(&self.inner.views)
            .get_mut(view)
            .map(|v| v.request_range(start, count, search_id))
            .unwrap_or_default();
        for query in queries {
            let page = query.page;
            if let Err(err) = self.inner.backend.request_page(query) {
                warn!(view, search_id, page, error = %err, "failed to request page");
                // Back to waiting so a later range request retries it.
                self.inner.apply(
                    view,
                    AddData {
                        search_id,
                        pages: BTreeMap::from([(page, RequestState::Waiting)]),
                        ..AddData::default()
                    },
                );
            }
        }
    }

    /// Merges a page pushed by the back. Returns `false` when it was stale
    /// or its view is gone.
    pub fn apply_page(&self, page: ViewPage) -> bool {
        let view = page.view_id.clone();
        self.inner.apply(&view, AddData::from(page))
    }

    /// Reads a view under the lock.
    pub fn view<R>(&self, name: &str, read: impl FnOnce(&ResultsView) -> R) -> Option<R> {
        lock(&self.inner.views).get(name).map(read)
    }

    pub fn game(&self, view: &str, index: usize) -> Option<Game> {
        lock(&self.inner.views)
            .get(view)
            .and_then(|v| v.game(index).cloned())
    }

    pub fn view_names(&self) -> Vec<String> {
        lock(&self.inner.views).names()
    }

    fn change(&self, view: &str, update: impl FnOnce(&mut ResultsView)) {
        let found = lock(&self.inner.views).get_mut(view).map(update).is_some();
        if found {
            self.schedule(view, self.inner.timing.compile);
        } else {
            debug!(view, "ignoring change to unknown view");
        }
    }

    /// Starts a new search task for `view`, cancelling the previous one.
    fn schedule(&self, view: &str, delay: Duration) {
        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.inner.searches).insert(view.to_string(), token.clone()) {
            previous.cancel();
        }
        let inner = Arc::clone(&self.inner);
        let view = view.to_string();
        tokio::spawn(async move { inner.search(view, delay, token).await });
    }

    fn cancel_search(&self, view: &str) {
        if let Some(token) = lock(&self.inner.searches).remove(view) {
            token.cancel();
        }
    }
}

impl<B: BrowseBackend> Inner<B> {
    async fn search(&self, view: String, delay: Duration, token: CancellationToken) {
        if cancellable(&token, tokio::time::sleep(delay)).await.is_none() {
            return;
        }
        let Some(data) = lock(&self.views).get(&view).map(ResultsView::next_query_data) else {
            return;
        };
        let query = match cancellable(&token, self.backend.parse_query_data(data)).await {
            None => return,
            Some(Ok(query)) => query,
            Some(Err(err)) => {
                warn!(view, error = %err, "failed to compile search");
                return;
            }
        };
        let search_id = query.search_id;
        let adopted = lock(&self.views)
            .get_mut(&view)
            .is_some_and(|v| v.set_filter(query.clone()));
        if !adopted {
            return;
        }

        if cancellable(&token, tokio::time::sleep(self.timing.fetch))
            .await
            .is_none()
        {
            return;
        }
        let first = match cancellable(&token, self.backend.first_page(query.clone())).await {
            None => return,
            Some(Ok(first)) => first,
            Some(Err(err)) => {
                warn!(view, search_id, error = %err, "failed to fetch first page");
                return;
            }
        };
        if !self.apply(&view, AddData::page(search_id, 0, first.games)) {
            return;
        }

        match cancellable(&token, self.backend.keyset(query)).await {
            None => {}
            Some(Ok(keyset)) => {
                self.apply(&view, AddData::keyset(search_id, keyset));
            }
            Some(Err(err)) => warn!(view, search_id, error = %err, "failed to fetch keyset"),
        }
    }

    /// Merges `update` into `view`, subject to generation checks.
    fn apply(&self, view: &str, update: AddData) -> bool {
        lock(&self.views)
            .get_mut(view)
            .is_some_and(|v| v.add_data(update))
    }
}

async fn cancellable<F: Future>(token: &CancellationToken, future: F) -> Option<F::Output> {
    tokio::select! {
        _ = token.cancelled() => None,
        output = future => Some(output),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
