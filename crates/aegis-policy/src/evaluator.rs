//! Remote evaluator seam and the decision payload

use crate::error::PolicyError;
use aegis_model::{Action, Plan, PolicyVerdict};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Incident context submitted alongside a plan
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyContext {
    /// Namespace the plan targets by default
    pub namespace: String,
    /// Error rate that triggered the incident
    pub error_rate: f64,
    /// Submission time
    pub timestamp: DateTime<Utc>,
}

impl PolicyContext {
    /// Context stamped with the current time
    #[must_use]
    pub fn new(namespace: impl Into<String>, error_rate: f64) -> Self {
        Self {
            namespace: namespace.into(),
            error_rate,
            timestamp: Utc::now(),
        }
    }
}

/// Decision input: full action set plus context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyInput {
    /// Every action of the plan, in order
    pub actions: Vec<Action>,
    /// Default namespace
    pub namespace: String,
    /// Triggering error rate
    pub error_rate: f64,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl PolicyInput {
    /// Build from a plan and its context
    #[must_use]
    pub fn new(plan: &Plan, ctx: &PolicyContext) -> Self {
        Self {
            actions: plan.actions.clone(),
            namespace: ctx.namespace.clone(),
            error_rate: ctx.error_rate,
            timestamp: ctx.timestamp.to_rfc3339(),
        }
    }
}

/// Remote decision service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PolicyEvaluator: Send + Sync {
    /// Submit the input and interpret the service's verdict
    async fn evaluate(&self, input: &PolicyInput) -> Result<PolicyVerdict, PolicyError>;

    /// Probe service liveness
    async fn health(&self) -> Result<(), PolicyError>;
}
