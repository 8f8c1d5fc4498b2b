//! Remediation plans and plan-schema validation

use crate::action::Action;
use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// Hard cap on actions per plan
pub const MAX_ACTIONS: usize = 5;

/// Root-cause hypothesis plus an ordered list of remediation actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// One-paragraph description of the incident
    pub summary: String,
    /// Most likely root cause
    pub root_cause: String,
    /// Components implicated, in order of relevance
    #[serde(default)]
    pub affected_components: Vec<String>,
    /// Producer confidence (0.0 - 1.0)
    pub confidence: f64,
    /// Ordered actions; order encodes the remediation sequence
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Free-text rollback description, audit only
    #[serde(default)]
    pub rollback_plan: String,
}

impl Plan {
    /// Canonical plan used when reasoning is unavailable or malformed
    #[must_use]
    pub fn safe_fallback() -> Self {
        Self {
            summary: "Plan production failed. Manual investigation required.".to_string(),
            root_cause: "unknown — reasoning unavailable".to_string(),
            affected_components: vec!["unknown".to_string()],
            confidence: 0.0,
            actions: Vec::new(),
            rollback_plan: "No automated actions were taken.".to_string(),
        }
    }

    /// Parse producer output into a validated plan
    ///
    /// Accepts bare JSON or JSON wrapped in a markdown code fence. Unknown
    /// action types, unknown risk levels and out-of-range confidence are
    /// rejected outright.
    pub fn from_llm_output(text: &str) -> Result<Self, ModelError> {
        let body = strip_code_fence(text);
        if body.is_empty() {
            return Err(ModelError::EmptyOutput);
        }
        let plan: Plan = serde_json::from_str(body)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Check schema invariants that serde cannot express
    pub fn validate(&self) -> Result<(), ModelError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ModelError::ConfidenceOutOfRange(self.confidence));
        }
        for (index, action) in self.actions.iter().enumerate() {
            if action.target.trim().is_empty() && !action.action_type.is_passive() {
                return Err(ModelError::EmptyTarget { index });
            }
        }
        Ok(())
    }

    /// Error if the plan carries more than [`MAX_ACTIONS`]
    pub fn check_action_cap(&self) -> Result<(), ModelError> {
        if self.actions.len() > MAX_ACTIONS {
            return Err(ModelError::TooManyActions {
                count: self.actions.len(),
                max: MAX_ACTIONS,
            });
        }
        Ok(())
    }

    /// Truncate to [`MAX_ACTIONS`], returning how many were dropped
    pub fn enforce_action_cap(&mut self) -> usize {
        let dropped = self.actions.len().saturating_sub(MAX_ACTIONS);
        self.actions.truncate(MAX_ACTIONS);
        dropped
    }

    /// Whether the plan carries no actions
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Strip an optional ```` ```json ```` fence around a payload
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let inner = match rest.rfind("```") {
        Some(end) => &rest[..end],
        None => rest,
    };
    inner.trim()
}
