//! Date-range partitioning and earliest-capture detection
//!
//! The capture index caps how many rows one query may return, so a sweep
//! over a long-lived domain has to be issued as a series of bounded windows.
//! Splitting the span into consecutive sub-ranges of at most `WINDOW_DAYS`
//! keeps every query under the cap while still covering each day exactly
//! once: the merged (and deduplicated) result must equal what a single
//! unbounded query would have returned.

use crate::catalog::query::{parse_rows, CatalogQuery};
use chrono::{Duration, Local, NaiveDate};
use reqwest::Client;

/// Maximum width of one index query window, in days.
pub const WINDOW_DAYS: i64 = 90;

/// Earliest date the archive has practical coverage for.
pub const ORIGIN_DATE: &str = "19960101";

/// Start date used when auto-detection is turned off.
pub const FIXED_FALLBACK_DATE: &str = "20000101";

/// Years back from today for the dynamic fallback.
const DYNAMIC_FALLBACK_YEARS: i64 = 5;

/// Splits `[from, to]` into consecutive windows no wider than `WINDOW_DAYS`.
///
/// Windows are inclusive on both ends, ordered, and non-overlapping; the last
/// one may be shorter. Unparseable bounds fall back to a single full-span
/// window so a sweep still happens.
pub fn split_date_range(from: &str, to: &str) -> Vec<(String, String)> {
    let (Ok(start), Ok(end)) = (parse_day(from), parse_day(to)) else {
        tracing::warn!("Could not parse date range {}..{}, using one window", from, to);
        return vec![(from.to_string(), to.to_string())];
    };

    if (end - start).num_days() <= WINDOW_DAYS {
        return vec![(from.to_string(), to.to_string())];
    }

    let mut windows = Vec::new();
    let mut current = start;
    while current <= end {
        let window_end = (current + Duration::days(WINDOW_DAYS)).min(end);
        windows.push((format_day(current), format_day(window_end)));
        current = window_end + Duration::days(1);
    }
    windows
}

/// Finds the earliest known capture date for a domain, or resolves the start
/// date from the user/detected/fallback tiers.
pub struct DateRangeDetector {
    client: Client,
    cdx_url: String,
    domain: String,
}

impl DateRangeDetector {
    pub fn new(client: Client, cdx_url: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            client,
            cdx_url: cdx_url.into(),
            domain: domain.into(),
        }
    }

    /// Queries the index for the single oldest capture and returns its
    /// 8-digit date prefix. Transport failures and empty results are logged
    /// and reported as `None`, never raised.
    pub async fn detect_earliest(&self) -> Option<String> {
        let url = CatalogQuery::for_domain(&self.cdx_url, &self.domain)
            .fields(&["timestamp"])
            .limit(1)
            .sort("timestamp:asc")
            .build();

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Earliest-date detection failed: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(
                "Earliest-date detection failed: status {}",
                response.status()
            );
            return None;
        }
        let body = response.text().await.ok()?;

        let rows = parse_rows(&body);
        let timestamp = rows.get(1).and_then(|row| row.first())?;
        if timestamp.len() >= 8 {
            let date = timestamp[..8].to_string();
            tracing::info!("Detected earliest capture date: {}", date);
            Some(date)
        } else {
            None
        }
    }

    /// Resolves the sweep's start date. A user-supplied date wins; otherwise
    /// detection runs when enabled, falling back to "now minus five years";
    /// with detection disabled a fixed historical date is used. This always
    /// produces a usable date.
    pub async fn resolve_start_date(&self, user_date: Option<&str>, auto_detect: bool) -> String {
        if let Some(date) = user_date {
            tracing::info!("Using user-supplied start date: {}", date);
            return date.to_string();
        }

        if auto_detect {
            if let Some(detected) = self.detect_earliest().await {
                return detected;
            }
            let fallback = dynamic_fallback_date();
            tracing::warn!("Detection failed, falling back to {}", fallback);
            return fallback;
        }

        tracing::info!("Auto-detection disabled, using {}", FIXED_FALLBACK_DATE);
        FIXED_FALLBACK_DATE.to_string()
    }
}

/// Today minus five years, in canonical form.
pub fn dynamic_fallback_date() -> String {
    let date = Local::now().date_naive() - Duration::days(365 * DYNAMIC_FALLBACK_YEARS);
    format_day(date)
}

fn parse_day(date: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date, "%Y%m%d")
}

fn format_day(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}
