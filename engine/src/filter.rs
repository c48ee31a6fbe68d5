//! Evaluation of [`GameFilter`] trees against single games.
//!
//! Clause semantics:
//! * each whitelist value is its own clause ("the field contains / equals
//!   this value"); a field listed without values admits nothing,
//! * each blacklist entry is one clause per field ("the field contains /
//!   equals none of these values"),
//! * numeric and boolean comparisons are one clause each,
//! * each sub-filter is one clause.
//!
//! Without `match_any` every clause must hold; with it one is enough. A
//! filter with no clauses matches everything. Text comparisons ignore case.

use arcade_protocol::game::Game;
use arcade_protocol::search::BoolField;
use arcade_protocol::search::FieldFilter;
use arcade_protocol::search::FilterField;
use arcade_protocol::search::GameFilter;
use arcade_protocol::search::NumericField;

pub fn matches(filter: &GameFilter, game: &Game) -> bool {
    let mut clauses = clauses(filter, game).peekable();
    if clauses.peek().is_none() {
        return true;
    }
    if filter.match_any {
        clauses.any(|clause| clause)
    } else {
        clauses.all(|clause| clause)
    }
}

fn clauses<'a>(filter: &'a GameFilter, game: &'a Game) -> impl Iterator<Item = bool> + 'a {
    let whitelist = values(&filter.whitelist).map(move |(field, value)| {
        value.is_some_and(|value| field_values(game, field).any(|text| contains(text, value)))
    });
    let exact_whitelist = values(&filter.exact_whitelist)
        .map(move |(field, value)| value.is_some_and(|value| has_exact(game, field, value)));
    let blacklist = filter.blacklist.iter().map(move |(field, banned)| {
        !banned
            .iter()
            .any(|value| field_values(game, *field).any(|text| contains(text, value)))
    });
    let exact_blacklist = filter
        .exact_blacklist
        .iter()
        .map(move |(field, banned)| !banned.iter().any(|value| has_exact(game, *field, value)));
    let lower = filter
        .lower_than
        .iter()
        .map(move |(field, bound)| numeric(game, *field) < *bound);
    let higher = filter
        .higher_than
        .iter()
        .map(move |(field, bound)| numeric(game, *field) > *bound);
    let equal = filter
        .equal_to
        .iter()
        .map(move |(field, bound)| numeric(game, *field) == *bound);
    let flags = filter
        .bool_comp
        .iter()
        .map(move |(field, expected)| flag(game, *field) == *expected);
    let subfilters = filter.subfilters.iter().map(move |sub| matches(sub, game));

    whitelist
        .chain(exact_whitelist)
        .chain(blacklist)
        .chain(exact_blacklist)
        .chain(lower)
        .chain(higher)
        .chain(equal)
        .chain(flags)
        .chain(subfilters)
}

/// One item per listed value, or a single `None` for a field with no values.
fn values(map: &FieldFilter) -> impl Iterator<Item = (FilterField, Option<&String>)> {
    map.iter().flat_map(|(field, values)| {
        let unlisted = values.is_empty().then_some((*field, None));
        values
            .iter()
            .map(move |value| (*field, Some(value)))
            .chain(unlisted)
    })
}

/// Exact match; the empty string matches a field with no value.
fn has_exact(game: &Game, field: FilterField, value: &str) -> bool {
    let mut texts = field_values(game, field).peekable();
    if value.is_empty() && texts.peek().is_none() {
        return true;
    }
    texts.any(|text| text.eq_ignore_ascii_case(value))
}

fn contains(text: &str, needle: &str) -> bool {
    text.to_lowercase().contains(&needle.to_lowercase())
}

/// Non-empty values of a text field. Tags yield one value per tag and the
/// alternate titles one per `;`-separated entry.
fn field_values(game: &Game, field: FilterField) -> Box<dyn Iterator<Item = &str> + '_> {
    match field {
        FilterField::Id => single(&game.id),
        FilterField::Title => single(&game.title),
        FilterField::AlternateTitles => Box::new(
            game.alternate_titles
                .split(';')
                .map(str::trim)
                .filter(|text| !text.is_empty()),
        ),
        FilterField::Developer => single(&game.developer),
        FilterField::Publisher => single(&game.publisher),
        FilterField::Series => single(&game.series),
        FilterField::Tags => Box::new(game.tags.iter().map(String::as_str)),
        FilterField::Platforms => single(&game.platform),
        FilterField::PlayMode => single(&game.play_mode),
        FilterField::Library => single(&game.library),
        FilterField::Status => single(&game.status),
        FilterField::Source => single(&game.source),
    }
}

fn single(text: &str) -> Box<dyn Iterator<Item = &str> + '_> {
    Box::new(std::iter::once(text).filter(|text| !text.is_empty()))
}

fn numeric(game: &Game, field: NumericField) -> i64 {
    match field {
        NumericField::Playcount => game.play_counter,
        NumericField::Playtime => game.playtime,
    }
}

fn flag(game: &Game, field: BoolField) -> bool {
    match field {
        BoolField::Installed => game.installed,
        BoolField::Extreme => game.extreme,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> Game {
        let mut game = Game::new("g1", "Space Quest III");
        game.developer = "Sierra On-Line".to_string();
        game.alternate_titles = "SQ3; The Pirates of Pestulon".to_string();
        game.tags = vec!["Adventure".to_string(), "Sci-Fi".to_string()];
        game.play_counter = 2;
        game.installed = true;
        game
    }

    fn list(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(matches(&GameFilter::default(), &game()));
        assert!(matches(&GameFilter::any_of(), &game()));
    }

    #[test]
    fn whitelist_values_are_all_required_by_default() {
        let mut filter = GameFilter::default();
        filter
            .whitelist
            .insert(FilterField::Title, list(&["space", "QUEST"]));
        assert!(matches(&filter, &game()));
        filter
            .whitelist
            .insert(FilterField::Developer, list(&["lucas"]));
        assert!(!matches(&filter, &game()));
        filter.match_any = true;
        assert!(matches(&filter, &game()));
    }

    #[test]
    fn blacklist_entry_rejects_any_listed_value() {
        let mut filter = GameFilter::any_of();
        filter
            .exact_blacklist
            .insert(FilterField::Tags, list(&["Horror", "sci-fi"]));
        assert!(!matches(&filter, &game()));
        filter
            .exact_blacklist
            .insert(FilterField::Tags, list(&["Horror"]));
        assert!(matches(&filter, &game()));
    }

    #[test]
    fn exact_empty_matches_missing_values() {
        let mut filter = GameFilter::default();
        filter
            .exact_whitelist
            .insert(FilterField::PlayMode, list(&[""]));
        assert!(matches(&filter, &game()));
        filter
            .exact_whitelist
            .insert(FilterField::AlternateTitles, list(&["sq3"]));
        assert!(matches(&filter, &game()));
    }

    #[test]
    fn comparisons_and_flags() {
        let mut filter = GameFilter::default();
        filter.higher_than.insert(NumericField::Playcount, 0);
        filter.bool_comp.insert(BoolField::Installed, true);
        assert!(matches(&filter, &game()));
        filter.lower_than.insert(NumericField::Playcount, 2);
        assert!(!matches(&filter, &game()));
    }

    #[test]
    fn membership_group_narrows_a_conjunction() {
        let mut members = GameFilter::any_of();
        members
            .exact_whitelist
            .insert(FilterField::Id, list(&["other", "g1"]));
        let mut hidden = GameFilter::any_of();
        hidden
            .exact_blacklist
            .insert(FilterField::Tags, list(&["Horror"]));
        let mut scoped = GameFilter {
            subfilters: vec![hidden, members],
            ..GameFilter::default()
        };
        assert!(matches(&scoped, &game()));

        scoped.subfilters[0]
            .exact_blacklist
            .insert(FilterField::Tags, list(&["Sci-Fi"]));
        assert!(!matches(&scoped, &game()));

        scoped.subfilters[0] = GameFilter::default();
        scoped.subfilters[1]
            .exact_whitelist
            .insert(FilterField::Id, list(&["other"]));
        assert!(!matches(&scoped, &game()));
    }

    #[test]
    fn field_without_values_admits_nothing() {
        let mut members = GameFilter::any_of();
        members.exact_whitelist.insert(FilterField::Id, Vec::new());
        assert!(!matches(&members, &game()));
    }
}
