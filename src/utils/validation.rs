//! Input validation primitives.
//!
//! Free-form user text (commit messages, regexes, name lists, thresholds)
//! passes through these helpers before it reaches the core.

use crate::error::{Error, Result};

/// Require a string to be non-empty after trimming.
///
/// Returns a reference to the trimmed string on success.
pub fn require_non_empty<'a>(value: &'a str, field: &str, message: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation_invalid_argument(field, message, None, None))
    } else {
        Ok(trimmed)
    }
}

/// Parse an integer argument, reporting the offending text on failure.
pub fn parse_integer(value: &str, field: &str) -> Result<i64> {
    value.trim().parse::<i64>().map_err(|_| {
        Error::validation_invalid_argument(
            field,
            format!("Expected a whole number, got '{}'", value.trim()),
            None,
            None,
        )
    })
}

/// Split newline separated input into trimmed, non-blank entries.
pub fn non_blank_lines(value: &str) -> Vec<String> {
    value
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
