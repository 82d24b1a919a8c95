//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Up to two initials for an avatar badge.
///
/// Emails use the part before `@`; words are split on spaces, dots,
/// underscores and dashes.
///
/// Usage in templates: `{{ account.label|initials }}`
#[askama::filter_fn]
pub fn initials(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(initials_of(&value.to_string()))
}

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

fn initials_of(label: &str) -> String {
    let name = label.split('@').next().unwrap_or(label);
    let letters: String = name
        .split([' ', '.', '_', '-'])
        .filter_map(|word| word.chars().next())
        .filter(|c| c.is_alphanumeric())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();
    if letters.is_empty() {
        "?".to_string()
    } else {
        letters
    }
}
