//! Offline demo signal
//!
//! When the real metric and log sources are unavailable, a sentinel file
//! stands in for the breach: present means "broken", absent means "healthy".

use std::io;
use std::path::{Path, PathBuf};

/// Default sentinel file name
pub const DEFAULT_SENTINEL: &str = "trigger_alert.txt";

/// Illustrative log window used when the log source is unavailable
pub const DEMO_LOG_LINES: &[&str] = &[
    "[ERROR] 2024-01-15T10:23:01Z mongodb-primary  Too many open files (ulimit reached: 1024)",
    "[ERROR] 2024-01-15T10:23:02Z mongodb-primary  Failed to open /data/db/WiredTiger.lock: Too many open files",
    "[ERROR] 2024-01-15T10:23:05Z app-server-1     MongoNetworkError: connect ECONNREFUSED 127.0.0.1:27017",
    "[ERROR] 2024-01-15T10:23:05Z app-server-2     MongoNetworkError: connect ECONNREFUSED 127.0.0.1:27017",
    "[ERROR] 2024-01-15T10:23:07Z nginx            upstream timed out (110) while reading response from upstream",
    "[WARN]  2024-01-15T10:23:10Z prometheus       Target scrape failed for mongodb-exporter",
    "[ERROR] 2024-01-15T10:23:12Z mongodb-primary  OOMKilled: container exceeded memory limit 4Gi",
    "[ERROR] 2024-01-15T10:23:15Z k8s-node-1       Pod mongodb-0 in CrashLoopBackOff (restart #7)",
];

/// Demo log window as one block
#[must_use]
pub fn demo_logs() -> String {
    DEMO_LOG_LINES.join("\n")
}

/// File-backed breach toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoSentinel {
    path: PathBuf,
}

impl Default for DemoSentinel {
    fn default() -> Self {
        Self::new(DEFAULT_SENTINEL)
    }
}

impl DemoSentinel {
    /// Sentinel at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sentinel location
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Simulate a breach
    pub fn arm(&self) -> io::Result<()> {
        std::fs::write(&self.path, b"aegis demo trigger\n")
    }

    /// Simulate recovery; clearing an unarmed sentinel is not an error
    pub fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// Whether a breach is being simulated
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.path.exists()
    }

    /// `armed_rate` while armed, otherwise 0.0
    #[must_use]
    pub fn simulated_rate(&self, armed_rate: f64) -> f64 {
        if self.is_armed() {
            armed_rate
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let sentinel = DemoSentinel::new(dir.path().join(DEFAULT_SENTINEL));

        assert!(!sentinel.is_armed());
        assert_eq!(sentinel.simulated_rate(0.15), 0.0);

        sentinel.arm().unwrap();
        assert!(sentinel.is_armed());
        assert_eq!(sentinel.simulated_rate(0.15), 0.15);

        sentinel.clear().unwrap();
        assert!(!sentinel.is_armed());
        sentinel.clear().unwrap();
    }

    #[test]
    fn demo_logs_are_multiline() {
        assert_eq!(demo_logs().lines().count(), DEMO_LOG_LINES.len());
    }
}
