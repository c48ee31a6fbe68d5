use arcade_protocol::VIEW_PAGE_SIZE;
use arcade_protocol::game::Game;
use lru::LruCache;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;

/// Received pages kept per view unless configured otherwise.
pub const DEFAULT_RESIDENT_PAGES: usize = 40;

/// Fetch status of one page of a view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    #[default]
    Waiting,
    Requested,
    Received,
}

/// Page states plus the rows of recently used pages.
///
/// Page 0 is always resident because nothing fetches it again. Other pages
/// live in an LRU; evicting one drops its rows and puts it back to
/// [`RequestState::Waiting`].
#[derive(Debug)]
pub struct PageCache {
    states: BTreeMap<usize, RequestState>,
    first: Option<Vec<Game>>,
    resident: LruCache<usize, Vec<Game>>,
}

impl PageCache {
    pub fn new(max_resident_pages: usize) -> Self {
        let capacity = NonZeroUsize::new(max_resident_pages).unwrap_or(NonZeroUsize::MIN);
        Self {
            states: BTreeMap::new(),
            first: None,
            resident: LruCache::new(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.first = None;
        self.resident.clear();
    }

    pub fn state(&self, page: usize) -> Option<RequestState> {
        self.states.get(&page).copied()
    }

    pub fn set_state(&mut self, page: usize, state: RequestState) {
        self.states.insert(page, state);
    }

    pub fn states(&self) -> &BTreeMap<usize, RequestState> {
        &self.states
    }

    pub fn is_resident(&self, page: usize) -> bool {
        if page == 0 {
            self.first.is_some()
        } else {
            self.resident.contains(&page)
        }
    }

    /// Stores the rows of `page` and marks it received. Returns the page
    /// evicted to make room, if any.
    pub fn store(&mut self, page: usize, rows: Vec<Game>) -> Option<usize> {
        self.states.insert(page, RequestState::Received);
        if page == 0 {
            self.first = Some(rows);
            return None;
        }
        match self.resident.push(page, rows) {
            Some((evicted, _)) if evicted != page => {
                self.states.insert(evicted, RequestState::Waiting);
                Some(evicted)
            }
            _ => None,
        }
    }

    /// Marks `page` as recently used.
    pub fn touch(&mut self, page: usize) {
        self.resident.promote(&page);
    }

    /// Row at an absolute index; `None` means "not fetched yet".
    pub fn game(&self, index: usize) -> Option<&Game> {
        let page = index / VIEW_PAGE_SIZE;
        let rows = if page == 0 {
            self.first.as_ref()
        } else {
            self.resident.peek(&page)
        };
        rows?.get(index % VIEW_PAGE_SIZE)
    }

    fn game_mut(&mut self, index: usize) -> Option<&mut Game> {
        let page = index / VIEW_PAGE_SIZE;
        let rows = if page == 0 {
            self.first.as_mut()
        } else {
            self.resident.peek_mut(&page)
        };
        rows?.get_mut(index % VIEW_PAGE_SIZE)
    }

    /// Absolute indices of every resident row, ascending.
    pub fn indices(&self) -> Vec<usize> {
        let first = self.first.iter().map(|rows| (0, rows));
        let rest = self.resident.iter().map(|(page, rows)| (*page, rows));
        let mut indices: Vec<usize> = first
            .chain(rest)
            .flat_map(|(page, rows)| (0..rows.len()).map(move |i| page * VIEW_PAGE_SIZE + i))
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Absolute index of the resident row holding game `id`.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.indices()
            .into_iter()
            .find(|index| self.game(*index).is_some_and(|game| game.id == id))
    }

    pub fn games_mut(&mut self) -> impl Iterator<Item = &mut Game> {
        let first = self.first.iter_mut().flatten();
        let rest = self.resident.iter_mut().flat_map(|(_, rows)| rows.iter_mut());
        first.chain(rest)
    }

    /// Moves the row at `source` to `dest`, shifting the resident rows in
    /// between by one. Does nothing unless both ends are resident.
    pub fn move_row(&mut self, source: usize, dest: usize) -> bool {
        if source == dest || self.game(source).is_none() || self.game(dest).is_none() {
            return false;
        }
        let (low, high) = (source.min(dest), source.max(dest));
        let slots: Vec<usize> = self
            .indices()
            .into_iter()
            .filter(|index| (low..=high).contains(index))
            .collect();
        let mut rows: Vec<Game> = slots
            .iter()
            .filter_map(|index| self.game(*index).cloned())
            .collect();
        if source < dest {
            rows.rotate_left(1);
        } else {
            rows.rotate_right(1);
        }
        for (index, row) in slots.into_iter().zip(rows) {
            if let Some(slot) = self.game_mut(index) {
                *slot = row;
            }
        }
        true
    }
}
