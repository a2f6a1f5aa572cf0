//! Run coordination
//!
//! Ties the pipeline together: disk preflight, capture discovery, the
//! bounded-concurrency page pass (fetch, rewrite, sidecar), the resource
//! drain, and index generation. A shutdown signal stops new work from being
//! dispatched while in-flight fetches finish.

use crate::cache::ContentCache;
use crate::catalog::{CaptureCatalog, DateRangeDetector};
use crate::config::Config;
use crate::extract::PageRewriter;
use crate::fetch::{build_http_client, ContentFetcher};
use crate::governor::{available_disk_gb, MemoryGovernor};
use crate::index::{IndexBuilder, IndexStats};
use crate::model::{Capture, ResourceKind};
use crate::queue::{self, ResourceQueue};
use crate::MirrorError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Semaphore};

/// Free space demanded before a run starts.
const REQUIRED_DISK_GB: f64 = 10.0;

/// Counts reported when a run finishes.
#[derive(Debug, Clone, Copy)]
pub struct MirrorOutcome {
    pub pages_saved: usize,
    pub pages_total: usize,
    pub resources_saved: usize,
    pub resources_total: usize,
    pub index: IndexStats,
}

/// One full mirroring run for a validated configuration.
pub struct MirrorRunner {
    config: Config,
    shutdown: watch::Receiver<bool>,
}

impl MirrorRunner {
    pub fn new(config: Config, shutdown: watch::Receiver<bool>) -> Self {
        Self { config, shutdown }
    }

    pub async fn run(&self) -> crate::Result<MirrorOutcome> {
        let output_dir = PathBuf::from(&self.config.mirror.output_dir);
        prepare_output_dirs(&output_dir)?;
        check_disk_space(&output_dir)?;

        let client = build_http_client(self.config.network.timeout_secs)?;

        let cache = if self.config.cache.enabled {
            let path = Path::new(&self.config.cache.path);
            Some(Arc::new(Mutex::new(ContentCache::open(
                path,
                self.config.cache.size_limit_bytes,
            )?)))
        } else {
            None
        };

        let fetcher = Arc::new(ContentFetcher::new(
            client.clone(),
            &self.config.network.replay_url,
            cache,
        ));
        let governor = Arc::new(MemoryGovernor::new(
            self.config.memory.safe,
            self.config.memory.threshold_percent,
        ));

        let domain = self.config.mirror.domain.clone();
        let detector = DateRangeDetector::new(
            client.clone(),
            &self.config.network.cdx_url,
            &domain,
        );
        let start_date = detector
            .resolve_start_date(
                self.config.mirror.start_date.as_deref(),
                self.config.mirror.auto_detect_date,
            )
            .await;

        let catalog = CaptureCatalog::new(client, &self.config.network.cdx_url, &domain);
        let mut captures = catalog
            .fetch_all(
                Some(&start_date),
                self.config.mirror.end_date.as_deref(),
                self.config.mirror.max_pages,
                self.config.mirror.all_versions,
            )
            .await;

        if captures.is_empty() {
            return Err(MirrorError::NoCaptures(domain));
        }
        if let Some(max) = self.config.mirror.max_pages {
            captures.truncate(max);
        }

        let rewriter = Arc::new(PageRewriter::new(
            &domain,
            output_dir.join("html"),
            output_dir.join("metadata"),
            &self.config.network.replay_url,
        ));
        let queue = Arc::new(Mutex::new(ResourceQueue::new()));

        let (pages_saved, pages_total) = self
            .page_pass(captures, &fetcher, &governor, &rewriter, &queue)
            .await;

        let batch = queue.lock().unwrap().take_pending();
        let (resources_saved, resources_total) = queue::drain_all(
            batch,
            Arc::clone(&fetcher),
            Arc::clone(&governor),
            &output_dir.join("resources"),
            self.config.network.threads,
            self.shutdown.clone(),
        )
        .await;

        let index = IndexBuilder::new(&domain, &output_dir).build()?;

        let percent = if pages_total > 0 {
            pages_saved as f64 / pages_total as f64 * 100.0
        } else {
            0.0
        };
        tracing::info!(
            "Mirror complete: {}/{} pages ({:.1}%), {}/{} resources, output in {}",
            pages_saved,
            pages_total,
            percent,
            resources_saved,
            resources_total,
            output_dir.display()
        );

        Ok(MirrorOutcome {
            pages_saved,
            pages_total,
            resources_saved,
            resources_total,
            index,
        })
    }

    /// Fetches and rewrites every capture through a bounded worker pool.
    async fn page_pass(
        &self,
        captures: Vec<Capture>,
        fetcher: &Arc<ContentFetcher>,
        governor: &Arc<MemoryGovernor>,
        rewriter: &Arc<PageRewriter>,
        queue: &Arc<Mutex<ResourceQueue>>,
    ) -> (usize, usize) {
        let total = captures.len();
        tracing::info!("Processing {} captures...", total);

        let semaphore = Arc::new(Semaphore::new(self.config.network.threads.max(1)));
        let completed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(total);
        for mut capture in captures {
            let fetcher = Arc::clone(fetcher);
            let governor = Arc::clone(governor);
            let rewriter = Arc::clone(rewriter);
            let queue = Arc::clone(queue);
            let semaphore = Arc::clone(&semaphore);
            let completed = Arc::clone(&completed);
            let shutdown = self.shutdown.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                if *shutdown.borrow() {
                    return None;
                }
                governor.gate().await;

                let content = fetcher
                    .fetch(&capture.original_url, &capture.timestamp, "page")
                    .await;

                let ok = match content {
                    Some(content) => {
                        capture.content = Some(content);
                        let mut queue = queue.lock().unwrap();
                        rewriter.process(&mut capture, &mut queue)
                    }
                    None => false,
                };

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 20 == 0 {
                    tracing::info!("Page progress: {}/{}", done, total);
                }
                Some(ok)
            }));
        }

        let mut saved = 0;
        for handle in handles {
            if let Ok(Some(true)) = handle.await {
                saved += 1;
            }
        }
        tracing::info!("Page pass finished: {}/{}", saved, total);
        (saved, total)
    }
}

/// Creates the output tree: `html/`, `metadata/`, and one resource
/// subdirectory per kind.
pub fn prepare_output_dirs(output_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(output_dir.join("html"))?;
    std::fs::create_dir_all(output_dir.join("metadata"))?;
    for kind in ResourceKind::all() {
        std::fs::create_dir_all(output_dir.join("resources").join(kind.dir_name()))?;
    }
    Ok(())
}

fn check_disk_space(output_dir: &Path) -> crate::Result<()> {
    match available_disk_gb(output_dir) {
        Some(available) if available < REQUIRED_DISK_GB => Err(MirrorError::InsufficientDisk {
            available_gb: available,
            required_gb: REQUIRED_DISK_GB,
        }),
        Some(available) => {
            tracing::debug!("Disk preflight: {:.1}GB available", available);
            Ok(())
        }
        None => {
            tracing::warn!("Could not determine free disk space, continuing");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn output_tree_is_created() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("mirror");
        prepare_output_dirs(&root).unwrap();

        assert!(root.join("html").is_dir());
        assert!(root.join("metadata").is_dir());
        for sub in ["css", "js", "images", "fonts", "other"] {
            assert!(root.join("resources").join(sub).is_dir());
        }
    }

    #[test]
    fn prepare_is_idempotent() {
        let dir = TempDir::new().unwrap();
        prepare_output_dirs(dir.path()).unwrap();
        prepare_output_dirs(dir.path()).unwrap();
    }
}
