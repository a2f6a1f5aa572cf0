//! Capture catalog: discovery of every archived capture for a domain
//!
//! Queries the archive's capture index over a date span, splitting the span
//! into windows to stay under the service's per-query row cap, then merges
//! and deduplicates the results by `(url, timestamp)` identity.

mod dates;
pub mod query;

pub use dates::{
    dynamic_fallback_date, split_date_range, DateRangeDetector, FIXED_FALLBACK_DATE, ORIGIN_DATE,
    WINDOW_DAYS,
};
pub use query::CatalogQuery;

use crate::config::dates::today;
use crate::model::Capture;
use reqwest::Client;
use std::collections::HashSet;

/// Rows requested per index query; chosen to stay comfortably under the
/// service's row cap.
pub const PAGE_LIMIT: usize = 500;

const CAPTURE_FIELDS: &[&str] = &["timestamp", "original", "statuscode", "mimetype", "digest"];

/// Client for the archive's capture index.
pub struct CaptureCatalog {
    client: Client,
    cdx_url: String,
    domain: String,
}

impl CaptureCatalog {
    pub fn new(client: Client, cdx_url: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            client,
            cdx_url: cdx_url.into(),
            domain: domain.into(),
        }
    }

    /// Fetches every HTML capture of the domain in `[from, to]`.
    ///
    /// With `all_versions` the span is swept window by window; otherwise one
    /// collapsed query returns only the newest capture of each URL. Windows
    /// are queried sequentially and a failure in one window never aborts the
    /// others. Stops early once `max_results` captures have accumulated.
    pub async fn fetch_all(
        &self,
        from: Option<&str>,
        to: Option<&str>,
        max_results: Option<usize>,
        all_versions: bool,
    ) -> Vec<Capture> {
        tracing::info!("Discovering captures for domain: {}", self.domain);

        if !all_versions {
            let captures = self.fetch_window(from, to, Some("urlkey")).await;
            return dedup_captures(captures);
        }

        let from = from.map(str::to_string).unwrap_or_else(|| ORIGIN_DATE.to_string());
        let to = to.map(str::to_string).unwrap_or_else(today);

        let windows = split_date_range(&from, &to);
        tracing::info!("Sweeping {} query windows ({} to {})", windows.len(), from, to);

        let mut all = Vec::new();
        for (start, end) in &windows {
            let batch = self.fetch_window(Some(start), Some(end), None).await;
            tracing::info!("Window {}..{}: {} captures", start, end, batch.len());
            all.extend(batch);

            if let Some(max) = max_results {
                if all.len() >= max {
                    tracing::info!("Capture limit reached ({})", max);
                    break;
                }
            }
        }

        let unique = dedup_captures(all);
        tracing::info!("Total unique captures: {}", unique.len());
        unique
    }

    /// Issues one index query. Non-200 responses, transport failures, and
    /// malformed bodies are logged and yield an empty batch.
    async fn fetch_window(
        &self,
        from: Option<&str>,
        to: Option<&str>,
        collapse: Option<&str>,
    ) -> Vec<Capture> {
        let mut query = CatalogQuery::for_domain(&self.cdx_url, &self.domain)
            .fields(CAPTURE_FIELDS)
            .filter("statuscode:200")
            .limit(PAGE_LIMIT);
        if let Some(from) = from {
            query = query.from_date(from);
        }
        if let Some(to) = to {
            query = query.to_date(to);
        }
        if let Some(collapse) = collapse {
            query = query.collapse(collapse);
        }

        let url = query.build();
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Capture-index query failed: {}", e);
                return Vec::new();
            }
        };
        if !response.status().is_success() {
            tracing::error!("Capture-index query failed: status {}", response.status());
            return Vec::new();
        }
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!("Capture-index response unreadable: {}", e);
                return Vec::new();
            }
        };

        query::parse_captures(&body)
    }
}

/// Deduplicates captures by `(url, timestamp)` identity, preserving
/// first-seen order. Idempotent: running it twice changes nothing.
pub fn dedup_captures(captures: Vec<Capture>) -> Vec<Capture> {
    let mut seen = HashSet::new();
    captures
        .into_iter()
        .filter(|capture| {
            let key = (capture.original_url.clone(), capture.timestamp.clone());
            seen.insert(key)
        })
        .collect()
}
