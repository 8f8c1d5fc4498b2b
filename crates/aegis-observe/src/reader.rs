//! Error-rate reading with a single fallback

use crate::demo::DemoSentinel;
use crate::error::SourceError;
use crate::source::MetricsSource;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Reads the error rate, degrading to the demo sentinel
///
/// The metrics source is tried once per read under a deadline. No data or
/// any failure yields the sentinel's simulated rate instead.
#[derive(Clone)]
pub struct ErrorRateReader {
    metrics: Arc<dyn MetricsSource>,
    sentinel: DemoSentinel,
    timeout: Duration,
}

impl ErrorRateReader {
    /// Create reader
    #[must_use]
    pub fn new(metrics: Arc<dyn MetricsSource>, sentinel: DemoSentinel, timeout: Duration) -> Self {
        Self {
            metrics,
            sentinel,
            timeout,
        }
    }

    /// Demo sentinel used for fallback
    #[inline]
    #[must_use]
    pub fn sentinel(&self) -> &DemoSentinel {
        &self.sentinel
    }

    /// Current rate; `armed_rate` is reported in fallback while the sentinel is armed
    pub async fn read(&self, armed_rate: f64) -> f64 {
        let result = tokio::time::timeout(self.timeout, self.metrics.error_rate())
            .await
            .unwrap_or(Err(SourceError::Timeout));

        match result {
            Ok(Some(rate)) => rate,
            Ok(None) => {
                debug!("Metrics source has no data, using demo sentinel");
                self.sentinel.simulated_rate(armed_rate)
            }
            Err(e) => {
                warn!(error = %e, "Metrics source unavailable, using demo sentinel");
                self.sentinel.simulated_rate(armed_rate)
            }
        }
    }
}
