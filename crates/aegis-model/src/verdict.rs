//! Policy verdicts

use serde::{Deserialize, Serialize};

/// All-or-nothing decision over a whole plan
///
/// A missing `allow` field deserializes as a denial.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyVerdict {
    /// Whether every action in the plan may run
    #[serde(default)]
    pub allow: bool,
    /// Human-readable reason per denied action
    #[serde(default)]
    pub denied_actions: Vec<String>,
    /// Summary of the decision
    #[serde(default)]
    pub reason: String,
}

impl PolicyVerdict {
    /// Approving verdict
    #[must_use]
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allow: true,
            denied_actions: Vec::new(),
            reason: reason.into(),
        }
    }

    /// Denying verdict
    #[must_use]
    pub fn deny(denied_actions: Vec<String>, reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            denied_actions,
            reason: reason.into(),
        }
    }

    /// Whether the plan was denied
    #[inline]
    #[must_use]
    pub fn is_denied(&self) -> bool {
        !self.allow
    }
}
