//! Input validation helpers

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::CoreError;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// `local@domain.tld` shape check
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Trimmed `value`, rejecting empty input and input longer than `max` chars
pub fn required(field: &str, value: &str, max: usize) -> Result<String, CoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::validation(format!("{} is required", field)));
    }
    if value.chars().count() > max {
        return Err(CoreError::validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

/// Trimmed non-empty `value` with no length cap
pub fn non_empty(field: &str, value: &str) -> Result<String, CoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}
