//! Deduplicated resource download queue
//!
//! Resources discovered while rewriting pages accumulate here, each
//! `(url, timestamp)` identity at most once, then get drained by a bounded
//! pool of concurrent fetch workers after all pages have been processed.
//! Failed downloads are counted but never halt the drain, and the queue is
//! cleared when a drain completes regardless of partial failure.

use crate::fetch::ContentFetcher;
use crate::governor::MemoryGovernor;
use crate::model::ResourceRef;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};

/// Run-scoped queue of resources awaiting download.
#[derive(Default)]
pub struct ResourceQueue {
    seen_urls: HashSet<String>,
    pending: Vec<ResourceRef>,
}

impl ResourceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this URL has already been queued during this run.
    pub fn is_seen(&self, url: &str) -> bool {
        self.seen_urls.contains(url)
    }

    /// Adds a resource unless its URL is already known. Idempotent:
    /// re-adding an identical reference is a no-op.
    pub fn enqueue(&mut self, resource: ResourceRef) -> bool {
        if !self.seen_urls.insert(resource.url.clone()) {
            return false;
        }
        self.pending.push(resource);
        true
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Takes the pending batch out, leaving the queue empty (the seen set
    /// survives so later enqueues stay deduplicated).
    pub fn take_pending(&mut self) -> Vec<ResourceRef> {
        std::mem::take(&mut self.pending)
    }
}

/// Drains a batch of resources through a bounded worker pool.
///
/// Each worker gates on the governor, fetches via the shared fetcher, and
/// writes the bytes into the kind-specific subdirectory of `resources_dir`.
/// Returns `(succeeded, total)`.
pub async fn drain_all(
    batch: Vec<ResourceRef>,
    fetcher: Arc<ContentFetcher>,
    governor: Arc<MemoryGovernor>,
    resources_dir: &Path,
    concurrency: usize,
    shutdown: watch::Receiver<bool>,
) -> (usize, usize) {
    let total = batch.len();
    if total == 0 {
        tracing::info!("No resources to download");
        return (0, 0);
    }

    tracing::info!("Downloading {} resources...", total);
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let completed = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::with_capacity(total);
    for resource in batch {
        let fetcher = Arc::clone(&fetcher);
        let governor = Arc::clone(&governor);
        let semaphore = Arc::clone(&semaphore);
        let completed = Arc::clone(&completed);
        let shutdown = shutdown.clone();
        let resources_dir = resources_dir.to_path_buf();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            if *shutdown.borrow() {
                return None;
            }
            governor.gate().await;

            let ok = download_one(&fetcher, &resources_dir, resource).await;
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % 100 == 0 {
                tracing::info!("Resource progress: {}/{}", done, total);
            }
            Some(ok)
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if let Ok(Some(true)) = handle.await {
            succeeded += 1;
        }
    }

    let percent = succeeded as f64 / total as f64 * 100.0;
    tracing::info!(
        "Resource downloads finished: {}/{} ({:.1}%)",
        succeeded,
        total,
        percent
    );
    (succeeded, total)
}

/// Destination path of one downloaded resource.
pub fn resource_path(resources_dir: &Path, resource: &ResourceRef) -> PathBuf {
    let filename = format!(
        "{}_{}",
        resource.timestamp,
        crate::extract::safe_filename(&resource.url)
    );
    resources_dir.join(resource.kind.dir_name()).join(filename)
}

async fn download_one(
    fetcher: &ContentFetcher,
    resources_dir: &Path,
    mut resource: ResourceRef,
) -> bool {
    let Some(content) = fetcher
        .fetch(&resource.url, &resource.timestamp, "resource")
        .await
    else {
        return false;
    };

    let path = resource_path(resources_dir, &resource);
    if let Err(e) = std::fs::write(&path, &content) {
        tracing::error!("Failed to write {}: {}", path.display(), e);
        return false;
    }

    resource.local_path = Some(path.to_string_lossy().into_owned());
    resource.downloaded = true;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKind;

    fn resource(url: &str) -> ResourceRef {
        ResourceRef::new(url, "20040101000000", ResourceKind::Image, "img", "src")
    }

    #[test]
    fn enqueue_dedups_by_url() {
        let mut queue = ResourceQueue::new();
        assert!(queue.enqueue(resource("http://example.com/a.png")));
        assert!(!queue.enqueue(resource("http://example.com/a.png")));
        assert!(queue.enqueue(resource("http://example.com/b.png")));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn seen_survives_take() {
        let mut queue = ResourceQueue::new();
        queue.enqueue(resource("http://example.com/a.png"));
        let batch = queue.take_pending();
        assert_eq!(batch.len(), 1);
        assert!(queue.is_empty());
        assert!(queue.is_seen("http://example.com/a.png"));
        assert!(!queue.enqueue(resource("http://example.com/a.png")));
    }

    #[test]
    fn resource_path_is_kind_scoped() {
        let path = resource_path(Path::new("/out/resources"), &resource("http://example.com/x/a.png"));
        assert_eq!(
            path,
            Path::new("/out/resources/images/20040101000000_x_a.png")
        );
    }
}
