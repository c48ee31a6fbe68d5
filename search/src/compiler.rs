//! Compiles view parameters into the descriptor the query engine runs.

use crate::advanced::merge_filters;
use crate::advanced::parse_advanced_filter;
use crate::freeform::BasicInputParser;
use crate::freeform::SearchInputParser;
use arcade_protocol::game::Playlist;
use arcade_protocol::game::TagFilterGroup;
use arcade_protocol::search::AdvancedFilter;
use arcade_protocol::search::FilterField;
use arcade_protocol::search::GameFilter;
use arcade_protocol::search::GameOrderBy;
use arcade_protocol::search::GameSearch;
use arcade_protocol::search::GameSearchOrder;
use arcade_protocol::search::NumericField;
use arcade_protocol::search::QueryData;
use arcade_protocol::search::SearchQuery;
use arcade_protocol::search::SortColumn;
use arcade_protocol::search::SortDirection;
use serde::Deserialize;
use serde::Serialize;

/// User preferences that shape every compiled search.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchPreferences {
    pub tag_filters: Vec<TagFilterGroup>,
    pub show_extreme: bool,
}

impl SearchPreferences {
    /// Tags hidden from every search: enabled groups, plus extreme groups
    /// while extreme content is hidden.
    pub fn excluded_tags(&self) -> Vec<String> {
        self.tag_filters
            .iter()
            .filter(|group| group.enabled || (group.extreme && !self.show_extreme))
            .flat_map(|group| group.tags.iter().cloned())
            .collect()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CompileInput<'a> {
    pub text: &'a str,
    pub advanced_filter: &'a AdvancedFilter,
    pub order_by: GameOrderBy,
    pub order_direction: SortDirection,
    pub playlist: Option<&'a Playlist>,
}

impl<'a> From<&'a QueryData> for CompileInput<'a> {
    fn from(data: &'a QueryData) -> Self {
        Self {
            text: &data.text,
            advanced_filter: &data.advanced_filter,
            order_by: data.order_by,
            order_direction: data.order_direction,
            playlist: data.playlist.as_ref(),
        }
    }
}

pub fn compile(input: &CompileInput<'_>, preferences: &SearchPreferences) -> GameSearch {
    compile_with(&BasicInputParser, input, preferences)
}

pub fn compile_with(
    parser: &dyn SearchInputParser,
    input: &CompileInput<'_>,
    preferences: &SearchPreferences,
) -> GameSearch {
    let mut filter = parser.parse(input.text);
    if !input.advanced_filter.is_empty() {
        filter = merge_filters(filter, parse_advanced_filter(input.advanced_filter));
    }

    let column = match input.playlist {
        Some(_) if input.advanced_filter.playlist_order => SortColumn::Custom,
        _ => sort_column(input.order_by),
    };
    if matches!(input.order_by, GameOrderBy::LastPlayed | GameOrderBy::Playtime)
        && input.playlist.is_none()
        && !constrains_play_counts(&filter)
    {
        // Outside a playlist these orderings act as a play history.
        filter.higher_than.insert(NumericField::Playcount, 0);
    }

    let excluded = preferences.excluded_tags();
    if !excluded.is_empty() {
        let mut hidden = GameFilter::any_of();
        hidden.exact_blacklist.insert(FilterField::Tags, excluded);
        filter = merge_filters(filter, hidden);
    }

    let mut custom_id_order = None;
    if let Some(playlist) = input.playlist {
        let ids = playlist.game_ids();
        let mut members = GameFilter::any_of();
        members.exact_whitelist.insert(FilterField::Id, ids.clone());
        // The playlist narrows the search: both halves must hold.
        filter = GameFilter {
            subfilters: vec![filter, members],
            match_any: false,
            ..GameFilter::default()
        };
        custom_id_order = Some(ids);
    }

    GameSearch {
        filter,
        order: GameSearchOrder {
            column,
            direction: input.order_direction,
        },
        custom_id_order,
        limit: None,
        offset: None,
    }
}

/// Compiles `data` into a query for its view and generation.
pub fn create_search_query(data: QueryData, preferences: &SearchPreferences) -> SearchQuery {
    let search = compile(&CompileInput::from(&data), preferences);
    SearchQuery {
        view_id: data.view_id,
        search_id: data.search_id,
        page: 0,
        search,
        playlist: data.playlist,
    }
}

fn sort_column(order_by: GameOrderBy) -> SortColumn {
    match order_by {
        GameOrderBy::Custom => SortColumn::Custom,
        GameOrderBy::Title => SortColumn::Title,
        GameOrderBy::Developer => SortColumn::Developer,
        GameOrderBy::Publisher => SortColumn::Publisher,
        GameOrderBy::Series => SortColumn::Series,
        GameOrderBy::Platform => SortColumn::Platform,
        GameOrderBy::DateAdded => SortColumn::DateAdded,
        GameOrderBy::DateModified => SortColumn::DateModified,
        GameOrderBy::ReleaseDate => SortColumn::ReleaseDate,
        GameOrderBy::LastPlayed => SortColumn::LastPlayed,
        GameOrderBy::Playtime => SortColumn::Playtime,
    }
}

fn constrains_play_counts(filter: &GameFilter) -> bool {
    filter.higher_than.contains_key(&NumericField::Playcount)
        || filter.equal_to.contains_key(&NumericField::Playcount)
        || filter.equal_to.contains_key(&NumericField::Playtime)
}
