//! Service counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Service metrics.
pub struct Metrics {
    /// Refresh cycles started.
    pub refreshes_total: AtomicU64,
    /// Refresh cycles that persisted a new snapshot.
    pub refreshes_success: AtomicU64,
    /// Refresh cycles that failed.
    pub refreshes_failed: AtomicU64,
    /// Rates written by the last successful cycle.
    pub rates_current: AtomicU64,
    /// Successful conversions.
    pub conversions_total: AtomicU64,
    /// Conversions rejected as invalid by the caller's input.
    pub conversions_rejected: AtomicU64,
    /// Conversion records appended to history.
    pub history_appends: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            refreshes_total: AtomicU64::new(0),
            refreshes_success: AtomicU64::new(0),
            refreshes_failed: AtomicU64::new(0),
            rates_current: AtomicU64::new(0),
            conversions_total: AtomicU64::new(0),
            conversions_rejected: AtomicU64::new(0),
            history_appends: AtomicU64::new(0),
        }
    }

    /// Record a refresh cycle start.
    pub fn refresh_started(&self) {
        self.refreshes_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful refresh.
    pub fn refresh_succeeded(&self, rates: usize) {
        self.refreshes_success.fetch_add(1, Ordering::Relaxed);
        self.rates_current.store(rates as u64, Ordering::Relaxed);
    }

    /// Record a failed refresh.
    pub fn refresh_failed(&self) {
        self.refreshes_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed conversion.
    pub fn conversion_completed(&self) {
        self.conversions_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected conversion.
    pub fn conversion_rejected(&self) {
        self.conversions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a history append.
    pub fn history_appended(&self) {
        self.history_appends.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            refreshes_total: self.refreshes_total.load(Ordering::Relaxed),
            refreshes_success: self.refreshes_success.load(Ordering::Relaxed),
            refreshes_failed: self.refreshes_failed.load(Ordering::Relaxed),
            rates_current: self.rates_current.load(Ordering::Relaxed),
            conversions_total: self.conversions_total.load(Ordering::Relaxed),
            conversions_rejected: self.conversions_rejected.load(Ordering::Relaxed),
            history_appends: self.history_appends.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub refreshes_total: u64,
    pub refreshes_success: u64,
    pub refreshes_failed: u64,
    pub rates_current: u64,
    pub conversions_total: u64,
    pub conversions_rejected: u64,
    pub history_appends: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;
