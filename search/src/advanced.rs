use arcade_protocol::search::AdvancedFilter;
use arcade_protocol::search::BoolField;
use arcade_protocol::search::FilterField;
use arcade_protocol::search::GameFilter;

/// Translates the sidebar controls into a filter. Each populated control
/// becomes one any-of group; the groups must all hold.
pub fn parse_advanced_filter(advanced: &AdvancedFilter) -> GameFilter {
    let mut filter = GameFilter::default();
    if let Some(installed) = advanced.installed {
        filter.bool_comp.insert(BoolField::Installed, installed);
    }
    if !advanced.play_mode.is_empty() {
        filter.subfilters.push(play_mode_group(&advanced.play_mode));
    }
    for (field, values) in [
        (FilterField::Library, &advanced.library),
        (FilterField::Platforms, &advanced.platform),
        (FilterField::Tags, &advanced.tags),
    ] {
        if !values.is_empty() {
            let mut group = GameFilter::any_of();
            group.exact_whitelist.insert(field, values.clone());
            filter.subfilters.push(group);
        }
    }
    filter
}

/// Play modes match by substring, except the empty string which selects
/// games with no play mode at all.
fn play_mode_group(modes: &[String]) -> GameFilter {
    let mut group = GameFilter::any_of();
    for mode in modes {
        let target = if mode.is_empty() {
            &mut group.exact_whitelist
        } else {
            &mut group.whitelist
        };
        target.entry(FilterField::PlayMode).or_default().push(mode.clone());
    }
    group
}

/// Conjunction of two filters, flattening into `base` when it is already a
/// conjunction.
pub fn merge_filters(mut base: GameFilter, extra: GameFilter) -> GameFilter {
    if extra.is_empty() {
        return base;
    }
    if base.is_empty() {
        return extra;
    }
    if base.match_any {
        return GameFilter {
            subfilters: vec![base, extra],
            ..GameFilter::default()
        };
    }
    base.subfilters.push(extra);
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_controls_produce_an_empty_filter() {
        assert!(parse_advanced_filter(&AdvancedFilter::default()).is_empty());
    }

    #[test]
    fn controls_become_any_of_groups() {
        let advanced = AdvancedFilter {
            installed: Some(true),
            play_mode: vec!["Multiplayer".to_string(), String::new()],
            tags: vec!["Puzzle".to_string(), "Adventure".to_string()],
            ..AdvancedFilter::default()
        };
        let filter = parse_advanced_filter(&advanced);
        assert_eq!(filter.bool_comp.get(&BoolField::Installed), Some(&true));
        assert!(!filter.match_any);
        assert_eq!(filter.subfilters.len(), 2);

        let modes = &filter.subfilters[0];
        assert!(modes.match_any);
        assert_eq!(
            modes.whitelist.get(&FilterField::PlayMode),
            Some(&vec!["Multiplayer".to_string()])
        );
        assert_eq!(
            modes.exact_whitelist.get(&FilterField::PlayMode),
            Some(&vec![String::new()])
        );

        let tags = &filter.subfilters[1];
        assert!(tags.match_any);
        assert_eq!(
            tags.exact_whitelist.get(&FilterField::Tags),
            Some(&vec!["Puzzle".to_string(), "Adventure".to_string()])
        );
    }

    #[test]
    fn merge_skips_empty_sides_and_wraps_disjunctions() {
        let mut base = GameFilter::any_of();
        base.whitelist
            .insert(FilterField::Title, vec!["quest".to_string()]);
        let mut extra = GameFilter::default();
        extra.bool_comp.insert(BoolField::Installed, true);

        assert_eq!(merge_filters(base.clone(), GameFilter::default()), base);
        assert_eq!(merge_filters(GameFilter::default(), extra.clone()), extra);

        let merged = merge_filters(base.clone(), extra.clone());
        assert!(!merged.match_any);
        assert_eq!(merged.subfilters, vec![base, extra]);
    }
}
