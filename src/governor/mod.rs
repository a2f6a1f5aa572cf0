//! Memory-pressure backpressure
//!
//! Before dispatching a network-bound unit of work, callers gate on the
//! governor. While system memory sits at or above the configured threshold,
//! the caller is held and the reading polled until utilization drops a
//! margin below the threshold again. Work is only ever delayed, never
//! dropped or failed.

use std::time::Duration;
use sysinfo::System;
use tokio::time::sleep;

/// How far below the threshold a reading must fall before gated callers are
/// released. Releasing right at the threshold would flap.
const RELEASE_MARGIN: f32 = 5.0;

/// Default interval between pressure polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Source of memory-utilization readings.
///
/// A trait seam so tests can script a sequence of readings instead of
/// depending on the host's actual memory state.
pub trait MemoryProbe: Send + Sync {
    /// Current system memory utilization, 0–100.
    fn used_percent(&self) -> f32;
}

/// Probe backed by real system readings.
pub struct SystemMemoryProbe {
    system: std::sync::Mutex<System>,
}

impl SystemMemoryProbe {
    pub fn new() -> Self {
        Self {
            system: std::sync::Mutex::new(System::new()),
        }
    }
}

impl Default for SystemMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn used_percent(&self) -> f32 {
        let mut system = self.system.lock().unwrap();
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return 0.0;
        }
        system.used_memory() as f32 / total as f32 * 100.0
    }
}

/// Advisory memory-pressure gate consulted before each unit of work.
pub struct MemoryGovernor {
    probe: Box<dyn MemoryProbe>,
    threshold_percent: f32,
    poll_interval: Duration,
    enabled: bool,
}

impl MemoryGovernor {
    pub fn new(enabled: bool, threshold_percent: f32) -> Self {
        Self::with_probe(Box::new(SystemMemoryProbe::new()), enabled, threshold_percent)
    }

    pub fn with_probe(probe: Box<dyn MemoryProbe>, enabled: bool, threshold_percent: f32) -> Self {
        Self {
            probe,
            threshold_percent,
            poll_interval: POLL_INTERVAL,
            enabled,
        }
    }

    /// Overrides the poll interval (tests use a short one).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Suspends the caller while memory pressure is high.
    ///
    /// Returns immediately when disabled or when utilization is below the
    /// threshold; otherwise polls until a reading falls to at least
    /// `RELEASE_MARGIN` points below the threshold.
    pub async fn gate(&self) {
        if !self.enabled {
            return;
        }

        let used = self.probe.used_percent();
        if used < self.threshold_percent {
            return;
        }

        tracing::warn!(
            "Memory at {:.1}% (threshold {:.0}%), pausing new work",
            used,
            self.threshold_percent
        );

        loop {
            sleep(self.poll_interval).await;
            let used = self.probe.used_percent();
            if used <= self.threshold_percent - RELEASE_MARGIN {
                tracing::info!("Memory back to {:.1}%, resuming", used);
                return;
            }
        }
    }
}

/// Available disk space, in GiB, on the filesystem holding `path`.
///
/// `None` when the mount point cannot be determined; callers treat that as
/// "assume enough" rather than refusing to run.
pub fn available_disk_gb(path: &std::path::Path) -> Option<f64> {
    let target = path.canonicalize().unwrap_or_else(|_| {
        path.parent()
            .and_then(|p| p.canonicalize().ok())
            .unwrap_or_else(|| std::path::PathBuf::from("/"))
    });

    let disks = sysinfo::Disks::new_with_refreshed_list();
    disks
        .iter()
        .filter(|disk| target.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space() as f64 / (1024.0 * 1024.0 * 1024.0))
}
