//! Browsable index page generation
//!
//! After a run completes, the sidecar records under `metadata/` are read
//! back, grouped by original URL with versions newest-first, categorized by
//! URL shape, and rendered into a static `index.html` at the mirror root.

use crate::extract::PageRecord;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Summary counts reported after the index is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    /// Distinct original URLs
    pub urls: usize,
    /// Saved page versions across all URLs
    pub pages: usize,
}

/// Rough content category derived from the URL, used to section the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PageCategory {
    Home,
    Forums,
    Topics,
    Profiles,
    Files,
    Other,
}

impl PageCategory {
    fn classify(url: &str) -> Self {
        let lower = url.to_lowercase();
        let path = lower
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&lower);
        let path = path.split_once('/').map(|(_, p)| p).unwrap_or("");

        const FILE_EXTS: &[&str] = &[
            ".zip", ".tar", ".gz", ".pdf", ".txt", ".iso", ".exe", ".deb", ".rpm",
        ];
        if path.is_empty() || path.starts_with("index") {
            Self::Home
        } else if path.contains("viewtopic") || path.contains("showthread") || path.contains("topic") {
            Self::Topics
        } else if path.contains("viewforum") || path.contains("forum") || path.contains("board") {
            Self::Forums
        } else if path.contains("profile") || path.contains("member") || path.contains("user") {
            Self::Profiles
        } else if FILE_EXTS.iter().any(|ext| path.ends_with(ext)) {
            Self::Files
        } else {
            Self::Other
        }
    }

    fn heading(&self) -> &'static str {
        match self {
            Self::Home => "Home & Index Pages",
            Self::Forums => "Forums",
            Self::Topics => "Topics & Threads",
            Self::Profiles => "Profiles & Members",
            Self::Files => "Files & Downloads",
            Self::Other => "Other Pages",
        }
    }
}

/// Builds `index.html` from the sidecars of a finished run.
pub struct IndexBuilder {
    domain: String,
    output_dir: PathBuf,
}

impl IndexBuilder {
    pub fn new(domain: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            domain: domain.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Reads every sidecar, renders the index, and writes it to the mirror
    /// root. Unreadable sidecars are skipped with a warning.
    pub fn build(&self) -> crate::Result<IndexStats> {
        let records = self.load_records()?;
        let grouped = group_by_url(records);

        let stats = IndexStats {
            urls: grouped.len(),
            pages: grouped.values().map(Vec::len).sum(),
        };

        let html = self.render(&grouped, stats);
        let path = self.output_dir.join("index.html");
        std::fs::write(&path, html)?;
        tracing::info!(
            "Index written to {} ({} URLs, {} versions)",
            path.display(),
            stats.urls,
            stats.pages
        );
        Ok(stats)
    }

    fn load_records(&self) -> crate::Result<Vec<PageRecord>> {
        let metadata_dir = self.output_dir.join("metadata");
        let mut records = Vec::new();
        if !metadata_dir.is_dir() {
            return Ok(records);
        }

        for entry in std::fs::read_dir(&metadata_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            match read_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping sidecar {}: {}", path.display(), e),
            }
        }
        Ok(records)
    }

    fn render(&self, grouped: &BTreeMap<String, Vec<PageRecord>>, stats: IndexStats) -> String {
        let mut sections: BTreeMap<PageCategory, Vec<(&String, &Vec<PageRecord>)>> =
            BTreeMap::new();
        for (url, versions) in grouped {
            sections
                .entry(PageCategory::classify(url))
                .or_default()
                .push((url, versions));
        }

        let mut body = String::new();
        for (category, entries) in &sections {
            let _ = write!(
                body,
                "<h2>{} <span class=\"count\">({})</span></h2>\n<ul>\n",
                escape_html(category.heading()),
                entries.len()
            );
            for (url, versions) in entries {
                let newest = &versions[0];
                let _ = write!(
                    body,
                    "<li><a href=\"html/{}\">{}</a>",
                    newest.version_path,
                    escape_html(&display_url(url))
                );
                if versions.len() > 1 {
                    body.push_str(" <span class=\"versions\">");
                    for version in versions.iter() {
                        let _ = write!(
                            body,
                            " <a href=\"html/{}\">[{}]</a>",
                            version.version_path,
                            format_timestamp(&version.wayback_timestamp)
                        );
                    }
                    body.push_str("</span>");
                }
                body.push_str("</li>\n");
            }
            body.push_str("</ul>\n");
        }

        let year_counts = per_year_counts(grouped);
        let mut years = String::new();
        for (year, count) in &year_counts {
            let _ = write!(years, "<li>{}: {} versions</li>\n", year, count);
        }

        let month_counts = per_month_counts(grouped);
        let mut months = String::new();
        for (month, count) in &month_counts {
            let _ = write!(months, "<li>{}: {} versions</li>\n", month, count);
        }

        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
             <title>Mirror of {domain}</title>\n\
             <style>\n\
             body {{ font-family: sans-serif; margin: 2em auto; max-width: 60em; }}\n\
             h1 {{ border-bottom: 2px solid #444; }}\n\
             .count {{ color: #888; font-size: 0.8em; }}\n\
             .versions {{ color: #666; font-size: 0.85em; }}\n\
             .versions a {{ color: #39c; text-decoration: none; }}\n\
             ul {{ list-style: none; padding-left: 1em; }}\n\
             li {{ margin: 0.3em 0; }}\n\
             </style>\n</head>\n<body>\n\
             <h1>Mirror of {domain}</h1>\n\
             <p>{urls} URLs, {pages} saved versions.</p>\n\
             {body}\
             <h2>Versions by year</h2>\n<ul>\n{years}</ul>\n\
             <h2>Versions by month</h2>\n<ul>\n{months}</ul>\n\
             </body>\n</html>\n",
            domain = escape_html(&self.domain),
            urls = stats.urls,
            pages = stats.pages,
            body = body,
            years = years,
            months = months,
        )
    }
}

fn read_record(path: &Path) -> crate::Result<PageRecord> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Groups records per original URL, versions newest-first.
fn group_by_url(records: Vec<PageRecord>) -> BTreeMap<String, Vec<PageRecord>> {
    let mut grouped: BTreeMap<String, Vec<PageRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.original_url.clone()).or_default().push(record);
    }
    for versions in grouped.values_mut() {
        versions.sort_by(|a, b| b.wayback_timestamp.cmp(&a.wayback_timestamp));
    }
    grouped
}

fn per_year_counts(grouped: &BTreeMap<String, Vec<PageRecord>>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for versions in grouped.values() {
        for record in versions {
            if record.wayback_timestamp.len() >= 4 {
                *counts
                    .entry(record.wayback_timestamp[..4].to_string())
                    .or_insert(0) += 1;
            }
        }
    }
    counts
}

fn per_month_counts(grouped: &BTreeMap<String, Vec<PageRecord>>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for versions in grouped.values() {
        for record in versions {
            if record.wayback_timestamp.len() >= 6 {
                let month = format!(
                    "{}-{}",
                    &record.wayback_timestamp[..4],
                    &record.wayback_timestamp[4..6]
                );
                *counts.entry(month).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Shortens a URL for display: scheme stripped, long middles elided.
fn display_url(url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
        .trim_end_matches('/');

    if stripped.chars().count() <= 70 {
        return stripped.to_string();
    }
    let head: String = stripped.chars().take(35).collect();
    let tail: String = stripped
        .chars()
        .rev()
        .take(30)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{}...{}", head, tail)
}

/// `YYYYMMDDhhmmss` to `YYYY-MM-DD`.
fn format_timestamp(ts: &str) -> String {
    if ts.len() >= 8 {
        format!("{}-{}-{}", &ts[..4], &ts[4..6], &ts[6..8])
    } else {
        ts.to_string()
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
