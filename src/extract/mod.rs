//! Page rewriting and resource discovery
//!
//! Each fetched page is parsed once, every resource-bearing attribute is
//! rewritten to a relative local path, and every same-domain reference is
//! handed to the download queue. Rewriting happens for every occurrence of a
//! URL (the local path is deterministic), while the queue admits each URL
//! only once per run. The rewritten page is written under `html/` together
//! with a JSON sidecar under `metadata/` describing the capture and the
//! resources it referenced.

pub mod filename;
pub mod rules;

pub use filename::safe_filename;
pub use rules::{classify_kind, RewriteRule, REWRITE_RULES};

use crate::model::{Capture, ResourceRef};
use crate::queue::ResourceQueue;
use scraper::{Html, Node};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Sidecar record written next to every saved page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub original_url: String,
    pub wayback_timestamp: String,
    pub wayback_url: String,
    pub saved_path: String,
    pub extracted_date: String,
    pub version_path: String,
    pub resources: Vec<ResourceEntry>,
}

/// One resource reference as recorded in a page's sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub tag: String,
    pub attr: String,
}

/// Rewrites fetched pages into self-contained local files.
pub struct PageRewriter {
    domain: String,
    html_dir: PathBuf,
    metadata_dir: PathBuf,
    replay_base: String,
}

impl PageRewriter {
    pub fn new(
        domain: impl Into<String>,
        html_dir: impl Into<PathBuf>,
        metadata_dir: impl Into<PathBuf>,
        replay_base: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            html_dir: html_dir.into(),
            metadata_dir: metadata_dir.into(),
            replay_base: replay_base.into(),
        }
    }

    /// Rewrites one capture's content, enqueues its resources, and writes
    /// the page plus its sidecar. Content is consumed either way; returns
    /// false when the capture had no content or the output could not be
    /// written.
    pub fn process(&self, capture: &mut Capture, queue: &mut ResourceQueue) -> bool {
        let Some(content) = capture.content.take() else {
            tracing::warn!(
                "No content to process for {} @ {}",
                capture.original_url,
                capture.timestamp
            );
            return false;
        };

        let mut document = Html::parse_document(&String::from_utf8_lossy(&content));
        drop(content);

        let base = self.resolution_base(&capture.original_url, &document);
        let mut discovered: Vec<ResourceEntry> = Vec::new();

        for node in document.tree.values_mut() {
            let Node::Element(el) = node else { continue };
            let tag = el.name().to_string();

            // A relative <base href> would point the saved page at the local
            // filesystem; pin it to the resolved absolute form instead.
            if tag == "base" {
                let relative_href = el
                    .attrs
                    .iter()
                    .find(|(k, _)| k.local.as_ref() == "href")
                    .filter(|(_, v)| !v.contains("://"))
                    .map(|(k, _)| k.clone());
                if let (Some(key), Some(abs)) = (relative_href, &base) {
                    el.attrs.insert(key, abs.as_str().into());
                }
                continue;
            }

            for rule in REWRITE_RULES.iter().filter(|r| r.tag == tag) {
                if let Some(required) = rule.rel {
                    let has_rel = el.attrs.iter().any(|(k, v)| {
                        k.local.as_ref() == "rel" && v.to_lowercase().contains(required)
                    });
                    if !has_rel {
                        continue;
                    }
                }

                let Some((key, value)) = el
                    .attrs
                    .iter()
                    .find(|(k, _)| k.local.as_ref() == rule.attr)
                    .map(|(k, v)| (k.clone(), v.to_string()))
                else {
                    continue;
                };

                let rewritten = if rule.srcset {
                    self.rewrite_srcset(&value, &base, &capture.timestamp, rule, queue, &mut discovered)
                } else {
                    self.rewrite_single(&value, &base, &capture.timestamp, rule, queue, &mut discovered)
                };

                if let Some(new_value) = rewritten {
                    el.attrs.insert(key, new_value.as_str().into());
                }
            }
        }

        let version_path = version_filename(&capture.original_url, &capture.timestamp);
        let rendered = format!("<!DOCTYPE html>\n{}", document.root_element().html());
        let page_path = self.html_dir.join(&version_path);
        if let Err(e) = std::fs::write(&page_path, rendered) {
            tracing::error!("Failed to write {}: {}", page_path.display(), e);
            return false;
        }

        let record = PageRecord {
            original_url: capture.original_url.clone(),
            wayback_timestamp: capture.timestamp.clone(),
            wayback_url: format!(
                "{}{}/{}",
                self.replay_base, capture.timestamp, capture.original_url
            ),
            saved_path: page_path.to_string_lossy().into_owned(),
            extracted_date: chrono::Utc::now().to_rfc3339(),
            version_path: version_path.clone(),
            resources: discovered,
        };
        if !self.write_sidecar(&version_path, &record) {
            return false;
        }

        capture.processed = true;
        true
    }

    /// Base URL used to resolve relative references: the page's origin
    /// (scheme and host only, never its path), adjusted by a `<base href>`
    /// when the document carries one.
    fn resolution_base(&self, original_url: &str, document: &Html) -> Option<Url> {
        let mut origin = Url::parse(original_url)
            .or_else(|_| Url::parse(&format!("http://{}/", self.domain)))
            .ok()?;
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);

        for node in document.tree.values() {
            let Node::Element(el) = node else { continue };
            if el.name() != "base" {
                continue;
            }
            if let Some(href) = el.attr("href") {
                if let Ok(resolved) = origin.join(href) {
                    return Some(resolved);
                }
            }
        }
        Some(origin)
    }

    /// Resolves one attribute value. Returns the replacement attribute
    /// value, or None when the reference should be left untouched.
    fn rewrite_single(
        &self,
        value: &str,
        base: &Option<Url>,
        timestamp: &str,
        rule: &RewriteRule,
        queue: &mut ResourceQueue,
        discovered: &mut Vec<ResourceEntry>,
    ) -> Option<String> {
        let value = value.trim();
        if value.is_empty() || is_non_fetchable(value) {
            return None;
        }

        let resolved = match Url::parse(value) {
            Ok(url) => url,
            Err(_) => base.as_ref()?.join(value).ok()?,
        };
        if !resolved.host_str().is_some_and(|h| h.contains(&self.domain)) {
            return None;
        }

        let url = resolved.to_string();
        let kind = classify_kind(&url, rule.tag);
        let local = format!(
            "../resources/{}/{}_{}",
            kind.dir_name(),
            timestamp,
            safe_filename(&url)
        );

        discovered.push(ResourceEntry {
            url: url.clone(),
            kind: kind.dir_name().to_string(),
            tag: rule.tag.to_string(),
            attr: rule.attr.to_string(),
        });
        if !queue.is_seen(&url) {
            queue.enqueue(ResourceRef::new(&url, timestamp, kind, rule.tag, rule.attr));
        }
        Some(local)
    }

    /// Rewrites every candidate URL of a srcset list, keeping descriptors.
    fn rewrite_srcset(
        &self,
        value: &str,
        base: &Option<Url>,
        timestamp: &str,
        rule: &RewriteRule,
        queue: &mut ResourceQueue,
        discovered: &mut Vec<ResourceEntry>,
    ) -> Option<String> {
        let mut changed = false;
        let candidates: Vec<String> = value
            .split(',')
            .filter_map(|candidate| {
                let mut parts = candidate.split_whitespace();
                let url = parts.next()?;
                let descriptor: Vec<&str> = parts.collect();

                let rewritten =
                    match self.rewrite_single(url, base, timestamp, rule, queue, discovered) {
                        Some(local) => {
                            changed = true;
                            local
                        }
                        None => url.to_string(),
                    };
                if descriptor.is_empty() {
                    Some(rewritten)
                } else {
                    Some(format!("{} {}", rewritten, descriptor.join(" ")))
                }
            })
            .collect();

        if changed {
            Some(candidates.join(", "))
        } else {
            None
        }
    }

    fn write_sidecar(&self, version_path: &str, record: &PageRecord) -> bool {
        let path = self.metadata_dir.join(format!("{}.json", version_path));
        let json = match serde_json::to_string_pretty(record) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize sidecar for {}: {}", version_path, e);
                return false;
            }
        };
        if let Err(e) = std::fs::write(&path, json) {
            tracing::error!("Failed to write {}: {}", path.display(), e);
            return false;
        }
        true
    }
}

/// Filename a page version is saved under, always with an HTML extension.
pub fn version_filename(original_url: &str, timestamp: &str) -> String {
    let name = format!("{}_{}", timestamp, safe_filename(original_url));
    let lower = name.to_lowercase();
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        name
    } else {
        format!("{}.html", name)
    }
}

/// Schemes and fragments that never resolve to a downloadable resource.
fn is_non_fetchable(value: &str) -> bool {
    value.starts_with('#')
        || value.starts_with("data:")
        || value.starts_with("javascript:")
        || value.starts_with("mailto:")
}
