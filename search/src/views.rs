use crate::pages::DEFAULT_RESIDENT_PAGES;
use crate::view::ResultsView;
use arcade_protocol::game::Game;
use arcade_protocol::search::AdvancedFilter;
use arcade_protocol::search::GameOrderBy;
use arcade_protocol::search::SortDirection;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// View that always exists, independent of the configured views.
pub const GENERAL_VIEW_ID: &str = "!general!";

/// View recreated when the last user view is deleted.
pub const FALLBACK_VIEW_ID: &str = "Browse";

/// View parameters persisted in user preferences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredView {
    pub view: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub advanced_filter: AdvancedFilter,
    #[serde(default)]
    pub order_by: GameOrderBy,
    #[serde(default)]
    pub order_reverse: SortDirection,
}

/// Every results view, keyed by name.
#[derive(Debug)]
pub struct SearchViews {
    views: BTreeMap<String, ResultsView>,
    max_resident_pages: usize,
}

impl Default for SearchViews {
    fn default() -> Self {
        Self::new(DEFAULT_RESIDENT_PAGES)
    }
}

impl SearchViews {
    pub fn new(max_resident_pages: usize) -> Self {
        let mut views = BTreeMap::new();
        views.insert(
            GENERAL_VIEW_ID.to_string(),
            ResultsView::new(GENERAL_VIEW_ID, None, max_resident_pages),
        );
        Self {
            views,
            max_resident_pages,
        }
    }

    /// Replaces every view except the general one. With `are_libraries`
    /// each view starts filtered to the library of the same name.
    pub fn create_views(&mut self, names: &[String], stored: &[StoredView], are_libraries: bool) {
        info!(views = ?names, "creating search views");
        self.views.retain(|id, _| id == GENERAL_VIEW_ID);
        for name in names {
            if !self.views.contains_key(name) {
                let library = are_libraries.then_some(name.as_str());
                self.insert(name, library);
            }
        }
        self.restore(stored);
    }

    /// Adds views that do not exist yet, leaving existing ones untouched.
    pub fn add_views(&mut self, names: &[String], stored: &[StoredView]) {
        for name in names {
            if !self.views.contains_key(name) {
                self.insert(name, None);
            }
        }
        self.restore(stored);
    }

    pub fn delete_view(&mut self, name: &str) -> bool {
        if name == GENERAL_VIEW_ID {
            return false;
        }
        let removed = self.views.remove(name).is_some();
        if self.views.len() == 1 {
            self.insert(FALLBACK_VIEW_ID, None);
        }
        removed
    }

    pub fn rename_view(&mut self, old: &str, new: &str) -> bool {
        if old == GENERAL_VIEW_ID || self.views.contains_key(new) {
            return false;
        }
        let Some(mut view) = self.views.remove(old) else {
            return false;
        };
        view.id = new.to_string();
        view.search_filter.view_id = new.to_string();
        self.views.insert(new.to_string(), view);
        true
    }

    pub fn get(&self, name: &str) -> Option<&ResultsView> {
        self.views.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ResultsView> {
        self.views.get_mut(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.views.keys().cloned().collect()
    }

    pub fn update_game(&mut self, game: &Game) {
        for view in self.views.values_mut() {
            view.update_game(game);
        }
    }

    fn insert(&mut self, name: &str, library: Option<&str>) {
        self.views.insert(
            name.to_string(),
            ResultsView::new(name, library, self.max_resident_pages),
        );
    }

    fn restore(&mut self, stored: &[StoredView]) {
        for saved in stored {
            if let Some(view) = self.views.get_mut(&saved.view) {
                view.text = saved.text.clone();
                view.advanced_filter = saved.advanced_filter.clone();
                view.order_by = saved.order_by;
                view.order_direction = saved.order_reverse;
            }
        }
    }
}
