//! Date-input normalization
//!
//! User-facing dates arrive in whatever format people type them in; the
//! archive's capture index only speaks `YYYYMMDD`. This module converts the
//! accepted formats (and a handful of relative keywords) into that canonical
//! form, or reports a typed error. Nothing here ever guesses.

use crate::DateError;
use chrono::{Duration, Local, NaiveDate};

/// Accepted explicit formats, tried in order. Year-first forms come before
/// day-first forms so unambiguous inputs never hit the wrong pattern.
const DATE_FORMATS: &[&str] = &[
    "%Y%m%d",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

/// Normalizes a user-supplied date string to canonical `YYYYMMDD`.
///
/// Accepts `YYYYMMDD`, `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD`,
/// `DD/MM/YYYY`, `DD-MM-YYYY`, `DD.MM.YYYY` and the relative keywords
/// `today`, `yesterday`, `last_week`, `last_month`, `last_year`.
pub fn normalize_date(input: &str) -> Result<String, DateError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DateError::Unrecognized(input.to_string()));
    }

    if let Some(date) = relative_date(&trimmed.to_lowercase()) {
        return Ok(date.format("%Y%m%d").to_string());
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(date.format("%Y%m%d").to_string());
        }
    }

    // Eight digits that failed every format is a real-looking date with an
    // impossible day or month, which deserves a different message.
    if trimmed.len() == 8 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(DateError::OutOfRange(trimmed.to_string()));
    }

    Err(DateError::Unrecognized(input.to_string()))
}

/// Checks that a normalized `[start, end]` pair is ordered.
pub fn ensure_ordered(start: &str, end: &str) -> Result<(), DateError> {
    if start > end {
        return Err(DateError::InvertedRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(())
}

/// Today's date in canonical form.
pub fn today() -> String {
    Local::now().date_naive().format("%Y%m%d").to_string()
}

fn relative_date(keyword: &str) -> Option<NaiveDate> {
    let now = Local::now().date_naive();
    match keyword {
        "today" => Some(now),
        "yesterday" => Some(now - Duration::days(1)),
        "last_week" => Some(now - Duration::weeks(1)),
        "last_month" => Some(now - Duration::days(30)),
        "last_year" => Some(now - Duration::days(365)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canonical_form() {
        assert_eq!(normalize_date("20240115").unwrap(), "20240115");
    }

    #[test]
    fn accepts_iso_form() {
        assert_eq!(normalize_date("2024-01-15").unwrap(), "20240115");
    }

    #[test]
    fn accepts_slash_forms() {
        assert_eq!(normalize_date("2024/01/15").unwrap(), "20240115");
        assert_eq!(normalize_date("15/01/2024").unwrap(), "20240115");
    }

    #[test]
    fn accepts_dash_and_dot_day_first_forms() {
        assert_eq!(normalize_date("15-01-2024").unwrap(), "20240115");
        assert_eq!(normalize_date("15.01.2024").unwrap(), "20240115");
        assert_eq!(normalize_date("2024.01.15").unwrap(), "20240115");
    }

    #[test]
    fn accepts_relative_keywords() {
        assert_eq!(normalize_date("today").unwrap(), today());
        assert_eq!(normalize_date("TODAY").unwrap(), today());
        assert!(normalize_date("yesterday").unwrap() < today());
        assert!(normalize_date("last_year").unwrap() < normalize_date("last_month").unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            normalize_date("not a date"),
            Err(DateError::Unrecognized(_))
        ));
        assert!(matches!(normalize_date(""), Err(DateError::Unrecognized(_))));
    }

    #[test]
    fn rejects_impossible_calendar_dates() {
        assert!(matches!(
            normalize_date("20240245"),
            Err(DateError::OutOfRange(_))
        ));
    }

    #[test]
    fn normalization_is_deterministic() {
        assert_eq!(
            normalize_date("15/01/2024").unwrap(),
            normalize_date("2024-01-15").unwrap()
        );
    }

    #[test]
    fn ordered_range_check() {
        assert!(ensure_ordered("20200101", "20210101").is_ok());
        assert!(ensure_ordered("20200101", "20200101").is_ok());
        assert!(matches!(
            ensure_ordered("20210101", "20200101"),
            Err(DateError::InvertedRange { .. })
        ));
    }
}
