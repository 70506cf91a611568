use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSnapshot {
    pub ticks: u64,
    /// Ticks dropped because the previous inference was still running.
    pub skipped_ticks: u64,
    pub inferences: u64,
    pub failures: u64,
    pub accepted: u64,
}

/// Counters shared between the loop and whoever owns the controller.
#[derive(Debug, Clone, Default)]
pub struct DetectionStats {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    skipped_ticks: AtomicU64,
    inferences: AtomicU64,
    failures: AtomicU64,
    accepted: AtomicU64,
}

impl DetectionStats {
    pub fn record_tick(&self) {
        self.inner.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip(&self) {
        self.inner.skipped_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inference(&self) {
        self.inner.inferences.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.inner.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.inner.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DetectionSnapshot {
        DetectionSnapshot {
            ticks: self.inner.ticks.load(Ordering::Relaxed),
            skipped_ticks: self.inner.skipped_ticks.load(Ordering::Relaxed),
            inferences: self.inner.inferences.load(Ordering::Relaxed),
            failures: self.inner.failures.load(Ordering::Relaxed),
            accepted: self.inner.accepted.load(Ordering::Relaxed),
        }
    }
}
