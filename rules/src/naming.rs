//! Pure naming-convention checks.
//!
//! Each check takes a symbol (or pieces of one) plus the resolved
//! settings and returns at most one [`Violation`]. No I/O; never panics
//! on a well-formed symbol.

use std::sync::LazyLock;

use regex::Regex;

use djalint_config::AnalysisSettings;
use djalint_types::{Range, RuleCode, Symbol};

/// A rule decision: which rule fired, why, and where.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub code: RuleCode,
    pub message: String,
    pub range: Range,
}

/// Negative boolean phrasing: `not_ready`, `is_not_valid`, `NeverFails`,
/// `NoResults`, `no_cache`.
static NEGATIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|_)(?:not|never|no)(?:_|$)|(?:Not|Never|No)[A-Z]")
        .expect("negative pattern regex is valid")
});

/// `True`/`False` literals, case-insensitive (covers Python and JSON forms).
static BOOLEAN_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)(?:true|false)$").expect("boolean literal regex is valid"));

#[must_use]
pub fn has_negative_pattern(name: &str) -> bool {
    NEGATIVE_PATTERN.is_match(name)
}

#[must_use]
pub fn is_boolean_value(value: Option<&str>) -> bool {
    value.is_some_and(|v| BOOLEAN_LITERAL.is_match(v.trim()))
}

/// Identifier-length check shared by variables, functions, and dict keys.
///
/// Leading underscores are stripped before measuring; the ignore list and
/// ALL-CAPS settings constants are exempt.
#[must_use]
pub fn check_name_length(
    name: &str,
    range: Range,
    settings: &AnalysisSettings,
) -> Option<Violation> {
    let stripped = name.trim_start_matches('_');
    if stripped.is_empty() || name == "_" || settings.is_ignored_name(stripped) {
        return None;
    }
    if stripped.chars().count() < settings.name_length_limit {
        return Some(Violation {
            code: RuleCode::NameTooShort,
            message: format!(
                "Name '{name}' is too short. Names should be at least {} characters long.",
                settings.name_length_limit
            ),
            range,
        });
    }
    None
}

/// Boolean naming checks: negative phrasing first (it is flagged
/// regardless of prefix correctness), then the prefix convention.
#[must_use]
pub fn check_boolean_name(
    name: &str,
    range: Range,
    settings: &AnalysisSettings,
) -> Option<Violation> {
    let stripped = name.trim_start_matches('_');
    if has_negative_pattern(stripped) {
        return Some(Violation {
            code: RuleCode::BooleanNegativePattern,
            message: format!(
                "Boolean '{name}' uses negative phrasing. Prefer positive naming so call sites avoid double negatives."
            ),
            range,
        });
    }
    let has_prefix = settings
        .boolean_prefixes
        .iter()
        .any(|prefix| stripped.starts_with(prefix.as_str()));
    if !has_prefix {
        return Some(Violation {
            code: RuleCode::BooleanNoPrefix,
            message: format!(
                "Boolean '{name}' should start with one of: {}.",
                settings.boolean_prefixes.join(", ")
            ),
            range,
        });
    }
    None
}

/// Variable rules: length, then boolean conventions when the assigned
/// value is a boolean literal.
#[must_use]
pub fn check_variable(symbol: &Symbol, settings: &AnalysisSettings) -> Option<Violation> {
    if symbol.name == "_" || settings.is_ignored_name(symbol.name.trim_start_matches('_')) {
        return None;
    }
    if let Some(violation) = check_name_length(&symbol.name, symbol.range, settings) {
        return Some(violation);
    }
    if is_boolean_value(symbol.value.as_deref()) {
        return check_boolean_name(&symbol.name, symbol.range, settings);
    }
    None
}

/// Function rules, evaluated in order: short name, missing verb, body too
/// long. The length check runs first so a one-letter name reports as too
/// short rather than as a missing verb.
#[must_use]
pub fn check_function(symbol: &Symbol, settings: &AnalysisSettings) -> Option<Violation> {
    if settings.ignored_functions.contains(&symbol.name) {
        return None;
    }
    let stripped = symbol.name.trim_start_matches('_');
    if stripped.is_empty() {
        return None;
    }
    if stripped.chars().count() < settings.name_length_limit {
        return Some(Violation {
            code: RuleCode::NameTooShort,
            message: format!(
                "Function name '{}' is too short. Names should be at least {} characters long.",
                symbol.name, settings.name_length_limit
            ),
            range: symbol.range,
        });
    }
    if !crate::verbs::starts_with_verb(stripped) {
        return Some(Violation {
            code: RuleCode::FunctionNameNoVerb,
            message: format!(
                "Function name '{}' should start with a verb describing what it does.",
                symbol.name
            ),
            range: symbol.range,
        });
    }
    let body_length = symbol.body_lines.len();
    if body_length > settings.function_length_limit {
        return Some(Violation {
            code: RuleCode::FunctionTooLong,
            message: format!(
                "Function '{}' is {body_length} lines long, exceeding the limit of {} lines.",
                symbol.name, settings.function_length_limit
            ),
            range: symbol.range,
        });
    }
    None
}

/// Dictionary-key rules mirror variable rules, with a sub-range pointing
/// at the key token only (quotes excluded).
#[must_use]
pub fn check_dictionary_key(symbol: &Symbol, settings: &AnalysisSettings) -> Option<Violation> {
    let range = key_token_range(symbol);
    if let Some(violation) = check_name_length(&symbol.name, range, settings) {
        return Some(violation);
    }
    if is_boolean_value(symbol.value.as_deref()) {
        return check_boolean_name(&symbol.name, range, settings);
    }
    None
}

/// Shrink the extractor-reported key range by one column on each side
/// when the raw token is quoted, so the diagnostic underlines the key
/// text itself.
fn key_token_range(symbol: &Symbol) -> Range {
    let range = symbol.range;
    let quoted = range.end.col.saturating_sub(range.start.col)
        >= symbol.name.chars().count() as u32 + 2;
    if quoted {
        Range::on_line(
            range.start.line,
            range.start.col + 1,
            range.end.col.saturating_sub(1),
        )
    } else {
        range
    }
}
