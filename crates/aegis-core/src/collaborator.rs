//! Narrow seams to the external reasoning and retrieval services
//!
//! One method each, so any backend can be swapped in without touching the
//! coordinator.

use crate::error::AegisError;
use aegis_model::{Incident, Plan};

/// Prior-knowledge lookup
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ContextProvider: Send + Sync {
    /// Up to `k` relevant entries for `text`, joined as one block
    async fn query(&self, text: &str, k: usize) -> Result<String, AegisError>;
}

/// Incident-to-plan reasoning
///
/// Implementations must reject non-conformant output with
/// [`AegisError::Schema`] rather than guess at partial structure.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PlanProducer: Send + Sync {
    /// Root-cause analysis and remediation plan
    async fn produce(&self, incident: &Incident, context: &str) -> Result<Plan, AegisError>;
}
