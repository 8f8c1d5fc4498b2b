//! Breach detection
//!
//! # Critical Invariant
//!
//! A poll cycle never terminates the loop. Source failures fall back to the
//! demo signal, and a panic inside a cycle is caught and logged.

use crate::demo::demo_logs;
use crate::reader::ErrorRateReader;
use crate::source::LogSource;
use aegis_model::Incident;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Source tag stamped on emitted incidents
pub const SOURCE_TAG: &str = "prometheus+loki";

/// Detector tuning
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    /// Breach threshold; a rate at or above it emits an incident
    pub threshold: f64,
    /// Poll cadence
    pub poll_interval: Duration,
    /// Log window length
    pub log_lookback: Duration,
    /// Max lines requested from the log source
    pub log_limit: usize,
    /// Rate reported by the demo sentinel while armed
    pub simulated_breach_rate: f64,
    /// Deadline for the log query
    pub log_timeout: Duration,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            poll_interval: Duration::from_secs(30),
            log_lookback: Duration::from_secs(5 * 60),
            log_limit: 100,
            simulated_breach_rate: 0.15,
            log_timeout: Duration::from_secs(10),
        }
    }
}

/// Polls the error rate and emits incidents on breach
pub struct Detector {
    reader: ErrorRateReader,
    logs: Arc<dyn LogSource>,
    settings: DetectorSettings,
    running: AtomicBool,
}

impl Detector {
    /// Create detector
    #[must_use]
    pub fn new(
        reader: ErrorRateReader,
        logs: Arc<dyn LogSource>,
        settings: DetectorSettings,
    ) -> Self {
        Self {
            reader,
            logs,
            settings,
            running: AtomicBool::new(false),
        }
    }

    /// Detector tuning
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Whether the poll loop is active
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask the poll loop to exit at its next tick without polling again
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// One poll cycle
    pub async fn poll(&self) -> Option<Incident> {
        let rate = self.reader.read(self.settings.simulated_breach_rate).await;
        if rate < self.settings.threshold {
            debug!(error_rate = rate, "Error rate within threshold");
            return None;
        }

        warn!(
            error_rate = rate,
            threshold = self.settings.threshold,
            "Error rate at or above threshold"
        );
        let logs = self.recent_logs().await;
        Some(Incident::new(rate, logs, SOURCE_TAG))
    }

    async fn recent_logs(&self) -> String {
        let query = self
            .logs
            .recent_lines(self.settings.log_lookback, self.settings.log_limit);
        match tokio::time::timeout(self.settings.log_timeout, query).await {
            Ok(Ok(lines)) if !lines.is_empty() => lines.join("\n"),
            Ok(Ok(_)) => {
                debug!("Log source returned no lines, using demo logs");
                demo_logs()
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Log source unavailable, using demo logs");
                demo_logs()
            }
            Err(_) => {
                warn!("Log query timed out, using demo logs");
                demo_logs()
            }
        }
    }

    /// Poll until `shutdown` flips to `true` (or its sender drops) or
    /// [`stop`](Self::stop) is called
    pub async fn run<F>(&self, mut shutdown: watch::Receiver<bool>, on_incident: F)
    where
        F: Fn(Incident) + Send + Sync,
    {
        if *shutdown.borrow() {
            return;
        }
        self.running.store(true, Ordering::Release);
        info!(interval = ?self.settings.poll_interval, "Detector polling");

        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.is_running() {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if !self.is_running() {
                        break;
                    }
                    match AssertUnwindSafe(self.poll()).catch_unwind().await {
                        Ok(Some(incident)) if self.is_running() => on_incident(incident),
                        Ok(Some(_)) => debug!("Detector stopped mid-poll, discarding incident"),
                        Ok(None) => {}
                        Err(_) => error!("Poll cycle panicked, continuing on next tick"),
                    }
                }
            }
        }

        self.running.store(false, Ordering::Release);
        info!("Detector stopped");
    }
}
