//! Wait-and-verify after remediation

use crate::reader::ErrorRateReader;
use aegis_model::Incident;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Verification window tuning
#[derive(Debug, Clone, PartialEq)]
pub struct VerifierSettings {
    /// Recovery means a rate strictly below this
    pub threshold: f64,
    /// Maximum wait
    pub window: Duration,
    /// Pause before each reading
    pub interval: Duration,
    /// Rate reported by the demo sentinel while still armed
    pub simulated_broken_rate: f64,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            window: Duration::from_secs(300),
            interval: Duration::from_secs(30),
            simulated_broken_rate: 0.20,
        }
    }
}

/// Polls until the error rate recovers or the window elapses
pub struct OutcomeVerifier {
    reader: ErrorRateReader,
    settings: VerifierSettings,
}

impl OutcomeVerifier {
    /// Create verifier
    #[must_use]
    pub fn new(reader: ErrorRateReader, settings: VerifierSettings) -> Self {
        Self { reader, settings }
    }

    /// Verifier tuning
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// `true` as soon as a reading drops below threshold, `false` when the window elapses
    ///
    /// Never waits past `window`: the last sleep is shortened and a reading in
    /// flight at the deadline is abandoned.
    pub async fn verify(&self, incident: &Incident) -> bool {
        let VerifierSettings {
            threshold,
            window,
            interval,
            simulated_broken_rate,
        } = self.settings;

        info!(
            incident = %incident.id(),
            initial_rate = incident.error_rate(),
            ?window,
            threshold,
            "Verifying outcome"
        );

        let start = Instant::now();
        let deadline = start + window;
        while Instant::now() < deadline {
            let pause = interval.min(deadline.saturating_duration_since(Instant::now()));
            tokio::time::sleep(pause).await;
            let remaining = deadline.saturating_duration_since(Instant::now());
            let reading = self.reader.read(simulated_broken_rate);
            let Ok(rate) = tokio::time::timeout(remaining, reading).await else {
                warn!(elapsed = ?start.elapsed(), "Verification reading cut off at window end");
                break;
            };
            info!(elapsed = ?start.elapsed(), error_rate = rate, "Verification reading");

            if rate < threshold {
                info!(error_rate = rate, "Verification passed");
                return true;
            }
        }

        error!(?window, "Verification failed, error rate still elevated");
        false
    }
}
