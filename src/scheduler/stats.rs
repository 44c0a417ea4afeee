//! Scheduler Statistics Module
//!
//! Counts how scheduled actions end.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Scheduler Stats ==
/// Snapshot of scheduler activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Actions accepted by `schedule`
    pub scheduled: u64,
    /// Requests refused: time not in the future, or no runtime running
    pub refused: u64,
    /// Callbacks that completed successfully
    pub fired: u64,
    /// Callbacks that returned an error or panicked
    pub failed: u64,
    /// Actions removed by `unschedule` or shutdown before firing
    pub cancelled: u64,
    /// Actions currently in the active set
    pub pending: usize,
}

#[derive(Debug, Default)]
pub(crate) struct SchedulerCounters {
    scheduled: AtomicU64,
    refused: AtomicU64,
    fired: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl SchedulerCounters {
    pub(crate) fn record_scheduled(&self) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_refused(&self) {
        self.refused.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fired(&self) {
        self.fired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, pending: usize) -> SchedulerStats {
        SchedulerStats {
            scheduled: self.scheduled.load(Ordering::Relaxed),
            refused: self.refused.load(Ordering::Relaxed),
            fired: self.fired.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            pending,
        }
    }
}
