//! Session counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of transaction outcomes since startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Incidents accepted into a transaction
    pub accepted: u64,
    /// Transactions whose outcome verified
    pub verified: u64,
    /// Transactions that rolled back
    pub rolled_back: u64,
    /// Plans denied by policy
    pub denied: u64,
    /// Transactions that failed unexpectedly
    pub failed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    accepted: AtomicU64,
    verified: AtomicU64,
    rolled_back: AtomicU64,
    denied: AtomicU64,
    failed: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn verified(&self) {
        self.verified.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn rolled_back(&self) {
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn denied(&self) {
        self.denied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SessionStats {
        SessionStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            verified: self.verified.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
