//! Metric and log source seams

use crate::error::SourceError;
use std::time::Duration;

/// Scalar error-ratio query
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetricsSource: Send + Sync {
    /// Current error ratio; `Ok(None)` when the source has no data
    async fn error_rate(&self) -> Result<Option<f64>, SourceError>;
}

/// Recent log lines
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LogSource: Send + Sync {
    /// Up to `limit` lines from the last `lookback`, oldest first
    async fn recent_lines(
        &self,
        lookback: Duration,
        limit: usize,
    ) -> Result<Vec<String>, SourceError>;
}
