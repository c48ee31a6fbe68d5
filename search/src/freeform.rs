//! Free-text search input.
//!
//! Supported syntax, tokens separated by whitespace:
//!
//! * `word` or `"quoted phrase"`: matches title, alternate titles,
//!   developer, publisher or series.
//! * `field:value`: substring match on one field (`dev:`, `tag:`, ...).
//! * `field=value`: exact match on one field.
//! * `playcount>3`, `playtime<60`, `playcount=0`: numeric comparisons.
//! * `installed:yes`: boolean comparisons.
//! * a leading `-` negates any of the above.

use arcade_protocol::search::BoolField;
use arcade_protocol::search::FilterField;
use arcade_protocol::search::GameFilter;
use arcade_protocol::search::NumericField;

const GENERIC_FIELDS: &[FilterField] = &[
    FilterField::Title,
    FilterField::AlternateTitles,
    FilterField::Developer,
    FilterField::Publisher,
    FilterField::Series,
];

/// Turns what the user typed into a base filter.
pub trait SearchInputParser: Send + Sync {
    fn parse(&self, text: &str) -> GameFilter;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BasicInputParser;

impl SearchInputParser for BasicInputParser {
    fn parse(&self, text: &str) -> GameFilter {
        let mut filter = GameFilter::default();
        for token in split_words(text) {
            apply_token(&mut filter, &token);
        }
        filter
    }
}

fn apply_token(filter: &mut GameFilter, token: &str) {
    let (negated, body) = match token.strip_prefix('-') {
        Some(rest) if !rest.is_empty() => (true, rest),
        _ => (false, token),
    };
    if let Some((key, op, value)) = split_clause(body)
        && apply_clause(filter, negated, key, op, value)
    {
        return;
    }
    filter.subfilters.push(generic_clause(negated, body));
}

fn split_clause(body: &str) -> Option<(&str, char, &str)> {
    let at = body.find([':', '=', '<', '>'])?;
    let (key, rest) = body.split_at(at);
    let op = rest.chars().next()?;
    let value = &rest[op.len_utf8()..];
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, op, value))
}

/// Returns `false` when the key names no known field, in which case the
/// token is searched as plain text.
fn apply_clause(filter: &mut GameFilter, negated: bool, key: &str, op: char, value: &str) -> bool {
    if let Ok(field) = key.parse::<NumericField>() {
        let Ok(number) = value.parse::<i64>() else {
            return false;
        };
        let target = match (op, negated) {
            ('>', false) | ('<', true) => &mut filter.higher_than,
            ('<', false) | ('>', true) => &mut filter.lower_than,
            ('=' | ':', false) => &mut filter.equal_to,
            _ => return false,
        };
        target.insert(field, number);
        return true;
    }
    if let Ok(field) = key.parse::<BoolField>() {
        let Some(flag) = parse_flag(value) else {
            return false;
        };
        filter.bool_comp.insert(field, flag != negated);
        return true;
    }
    let Ok(field) = key.parse::<FilterField>() else {
        return false;
    };
    let target = match (op, negated) {
        (':', false) => &mut filter.whitelist,
        (':', true) => &mut filter.blacklist,
        ('=', false) => &mut filter.exact_whitelist,
        ('=', true) => &mut filter.exact_blacklist,
        _ => return false,
    };
    target.entry(field).or_default().push(value.to_string());
    true
}

/// A bare word matches any of the generic fields; a negated one must
/// match none of them.
fn generic_clause(negated: bool, word: &str) -> GameFilter {
    let mut clause = if negated {
        GameFilter::default()
    } else {
        GameFilter::any_of()
    };
    let target = if negated {
        &mut clause.blacklist
    } else {
        &mut clause.whitelist
    };
    for field in GENERIC_FIELDS {
        target.insert(*field, vec![word.to_string()]);
    }
    clause
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Whitespace tokenizer honouring double quotes and backslash escapes.
/// An unterminated quote runs to the end of the input.
fn split_words(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut escape = false;
    for ch in input.chars() {
        if escape {
            current.push(ch);
            escape = false;
            continue;
        }
        match ch {
            '\\' => escape = true,
            '"' => in_quote = !in_quote,
            c if c.is_whitespace() && !in_quote => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
