//! Filter and sort descriptors understood by the query engine, plus the
//! view-level query shapes that travel between client and back.

use crate::game::Game;
use crate::game::Playlist;
use serde::Deserialize;
use serde::Serialize;
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;
use strum_macros::Display;
use strum_macros::EnumString;

/// Text columns a filter clause can target.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FilterField {
    Id,
    #[strum(to_string = "title", serialize = "t")]
    Title,
    AlternateTitles,
    #[strum(to_string = "developer", serialize = "dev")]
    Developer,
    #[strum(to_string = "publisher", serialize = "pub")]
    Publisher,
    Series,
    #[strum(to_string = "tags", serialize = "tag")]
    Tags,
    #[strum(to_string = "platforms", serialize = "platform")]
    Platforms,
    #[strum(to_string = "play_mode", serialize = "playmode", serialize = "mode")]
    PlayMode,
    #[strum(to_string = "library", serialize = "lib")]
    Library,
    Status,
    Source,
}

/// Numeric columns usable in comparison clauses.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum NumericField {
    #[strum(to_string = "playcount", serialize = "plays")]
    Playcount,
    Playtime,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BoolField {
    Installed,
    Extreme,
}

pub type FieldFilter = BTreeMap<FilterField, Vec<String>>;

/// A conjunctive (or, with `match_any`, disjunctive) set of clauses.
///
/// Every populated clause and every sub-filter must hold unless `match_any`
/// is set, in which case one of them suffices. Maps are ordered so two
/// equal filters always serialize identically.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameFilter {
    pub subfilters: Vec<GameFilter>,
    pub whitelist: FieldFilter,
    pub blacklist: FieldFilter,
    pub exact_whitelist: FieldFilter,
    pub exact_blacklist: FieldFilter,
    pub lower_than: BTreeMap<NumericField, i64>,
    pub higher_than: BTreeMap<NumericField, i64>,
    pub equal_to: BTreeMap<NumericField, i64>,
    pub bool_comp: BTreeMap<BoolField, bool>,
    pub match_any: bool,
}

impl GameFilter {
    pub fn any_of() -> Self {
        Self {
            match_any: true,
            ..Self::default()
        }
    }

    /// True when the filter constrains nothing.
    pub fn is_empty(&self) -> bool {
        self.subfilters.iter().all(GameFilter::is_empty)
            && self.whitelist.is_empty()
            && self.blacklist.is_empty()
            && self.exact_whitelist.is_empty()
            && self.exact_blacklist.is_empty()
            && self.lower_than.is_empty()
            && self.higher_than.is_empty()
            && self.equal_to.is_empty()
            && self.bool_comp.is_empty()
    }
}

/// Engine-side sort column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    #[default]
    Title,
    Developer,
    Publisher,
    Series,
    Platform,
    DateAdded,
    DateModified,
    ReleaseDate,
    LastPlayed,
    Playtime,
    /// Order given by [`GameSearch::custom_id_order`].
    Custom,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Symbolic ordering chosen in the UI.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum GameOrderBy {
    Custom,
    #[default]
    Title,
    Developer,
    Publisher,
    Series,
    Platform,
    DateAdded,
    DateModified,
    ReleaseDate,
    LastPlayed,
    Playtime,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSearchOrder {
    pub column: SortColumn,
    pub direction: SortDirection,
}

/// Structured filter/sort descriptor handed to the query engine.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameSearch {
    pub filter: GameFilter,
    pub order: GameSearchOrder,
    /// Game ids in display order, used when sorting by [`SortColumn::Custom`].
    pub custom_id_order: Option<Vec<String>>,
    pub limit: Option<u64>,
    /// Keyset cursor of the page to fetch; `None` means the first page.
    pub offset: Option<u64>,
}

/// Sidebar filter controls of a results view.
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdvancedFilter {
    pub installed: Option<bool>,
    /// Sort by the playlist's stored order while a playlist is selected.
    pub playlist_order: bool,
    pub library: Vec<String>,
    pub play_mode: Vec<String>,
    pub platform: Vec<String>,
    pub tags: Vec<String>,
}

impl Default for AdvancedFilter {
    fn default() -> Self {
        Self {
            installed: None,
            playlist_order: true,
            library: Vec::new(),
            play_mode: Vec::new(),
            platform: Vec::new(),
            tags: Vec::new(),
        }
    }
}

impl AdvancedFilter {
    pub fn for_library(library: Option<&str>) -> Self {
        Self {
            library: library.map(|name| vec![name.to_string()]).unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.installed.is_none()
            && self.library.is_empty()
            && self.play_mode.is_empty()
            && self.platform.is_empty()
            && self.tags.is_empty()
    }
}

/// Everything needed to compile the search of one view.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryData {
    pub view_id: String,
    pub search_id: u64,
    pub text: String,
    pub advanced_filter: AdvancedFilter,
    pub order_by: GameOrderBy,
    pub order_direction: SortDirection,
    pub playlist: Option<Playlist>,
}

/// A compiled search bound to a view and a search generation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub view_id: String,
    pub search_id: u64,
    pub page: usize,
    pub search: GameSearch,
    pub playlist: Option<Playlist>,
}

impl SearchQuery {
    pub fn empty(view_id: impl Into<String>) -> Self {
        Self {
            view_id: view_id.into(),
            ..Self::default()
        }
    }

    /// Copy of this query targeting `page`, resumed from `cursor`.
    pub fn for_page(&self, page: usize, cursor: u64) -> Self {
        let mut query = self.clone();
        query.page = page;
        query.search.offset = Some(cursor);
        query
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FirstPage {
    pub games: Vec<Game>,
}

/// Whole-query metadata: `keyset[i]` is the cursor of page `i + 1`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageKeyset {
    pub keyset: Vec<u64>,
    pub total: u64,
}

/// Rows of one page pushed to the view that asked for them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPage {
    pub view_id: String,
    pub search_id: u64,
    pub page: usize,
    pub games: Vec<Game>,
}
