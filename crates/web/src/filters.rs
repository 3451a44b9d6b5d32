//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Returns the content hash for main.css.
///
/// The hash is computed at build time from the CSS file content.
///
/// Usage in templates: `{{ ""|css_hash }}`
#[askama::filter_fn]
pub fn css_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("CSS_HASH"))
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM`.
///
/// Usage in templates: `{{ order.created_at|datetime }}`
#[askama::filter_fn]
pub fn datetime(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(minutes_prefix(&value.to_string()).to_string())
}

// chrono's Display is `2024-05-01 12:34:56.789 UTC`
fn minutes_prefix(s: &str) -> &str {
    s.get(..16).unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::minutes_prefix;

    #[test]
    fn test_minutes_prefix() {
        let ts = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 34, 56)
            .single()
            .map(|t| t.to_string())
            .unwrap_or_default();
        assert_eq!(minutes_prefix(&ts), "2024-05-01 12:34");
        assert_eq!(minutes_prefix("short"), "short");
    }
}
