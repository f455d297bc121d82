//! Ingestion metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Total reports received from sources
    pub reports_received: AtomicU64,

    /// Reports dropped because the host queue was full
    pub reports_dropped: AtomicU64,

    /// Reports lost because the host had stopped
    pub host_closed: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record report received
    pub fn record_received(&self) {
        self.reports_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record report dropped
    pub fn record_dropped(&self) {
        self.reports_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_host_closed(&self) {
        self.host_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reports_received: self.reports_received.load(Ordering::Relaxed),
            reports_dropped: self.reports_dropped.load(Ordering::Relaxed),
            host_closed: self.host_closed.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub reports_received: u64,
    pub reports_dropped: u64,
    pub host_closed: u64,
}
