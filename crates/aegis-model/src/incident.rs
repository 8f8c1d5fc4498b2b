//! Incidents emitted by the detector

use crate::text::truncate_bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Byte budget applied to raw logs before they reach the plan producer
pub const DEFAULT_RAW_LOG_BUDGET: usize = 3000;

/// Unique incident identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IncidentId(pub Ulid);

impl IncidentId {
    /// Generate new incident ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for IncidentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IncidentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A detected breach with its supporting log window
///
/// Created once per breach, consumed by exactly one coordinator
/// transaction. Fields are private so the value stays immutable after
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    id: IncidentId,
    observed_at: DateTime<Utc>,
    error_rate: f64,
    raw_logs: String,
    source: String,
}

impl Incident {
    /// Create incident observed now; `error_rate` is clamped to [0, 1]
    #[must_use]
    pub fn new(error_rate: f64, raw_logs: impl Into<String>, source: impl Into<String>) -> Self {
        Self::observed_at(Utc::now(), error_rate, raw_logs, source)
    }

    /// Create incident with an explicit observation time
    #[must_use]
    pub fn observed_at(
        observed_at: DateTime<Utc>,
        error_rate: f64,
        raw_logs: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        let error_rate = if error_rate.is_nan() {
            0.0
        } else {
            error_rate.clamp(0.0, 1.0)
        };
        Self {
            id: IncidentId::new(),
            observed_at,
            error_rate,
            raw_logs: raw_logs.into(),
            source: source.into(),
        }
    }

    /// Incident identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> IncidentId {
        self.id
    }

    /// When the breach was observed
    #[inline]
    #[must_use]
    pub fn observed(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Measured error ratio (0.0 - 1.0)
    #[inline]
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Full log window as captured
    #[inline]
    #[must_use]
    pub fn raw_logs(&self) -> &str {
        &self.raw_logs
    }

    /// Log window cut to `budget` bytes
    #[inline]
    #[must_use]
    pub fn logs_within(&self, budget: usize) -> &str {
        truncate_bytes(&self.raw_logs, budget)
    }

    /// Source tag (e.g. `prometheus+loki`)
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incident_clamps_error_rate() {
        assert_eq!(Incident::new(1.7, "", "test").error_rate(), 1.0);
        assert_eq!(Incident::new(-0.2, "", "test").error_rate(), 0.0);
        assert_eq!(Incident::new(f64::NAN, "", "test").error_rate(), 0.0);
    }

    #[test]
    fn incident_logs_within_budget() {
        let incident = Incident::new(0.15, "x".repeat(5000), "test");
        assert_eq!(incident.logs_within(DEFAULT_RAW_LOG_BUDGET).len(), 3000);
        assert_eq!(incident.raw_logs().len(), 5000);
    }

    #[test]
    fn incident_ids_are_unique() {
        let a = Incident::new(0.1, "", "test");
        let b = Incident::new(0.1, "", "test");
        assert_ne!(a.id(), b.id());
    }
}
