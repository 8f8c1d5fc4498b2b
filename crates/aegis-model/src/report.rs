//! Execution results and the terminal transaction report

use crate::action::Action;
use crate::incident::Incident;
use crate::plan::Plan;
use crate::verdict::PolicyVerdict;
use serde::{Deserialize, Serialize};

/// Outcome of one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    /// The action that ran
    pub action: Action,
    /// Whether the backend reported success
    pub success: bool,
    /// Captured output, may be empty
    #[serde(default)]
    pub output: String,
    /// Failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    /// Successful result
    #[must_use]
    pub fn succeeded(action: Action, output: impl Into<String>) -> Self {
        Self {
            action,
            success: true,
            output: output.into(),
            error: None,
        }
    }

    /// Failed result
    #[must_use]
    pub fn failed(action: Action, output: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            action,
            success: false,
            output: output.into(),
            error: Some(error.into()),
        }
    }
}

/// Terminal artifact of one remediation transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Triggering incident
    pub incident: Incident,
    /// Plan that was evaluated
    pub plan: Plan,
    /// Gate decision
    pub verdict: PolicyVerdict,
    /// Per-action outcomes in plan order
    pub action_results: Vec<ActionResult>,
    /// Whether the error rate recovered within the window
    pub verified: bool,
    /// Whether rollback ran
    pub rollback_triggered: bool,
    /// Wall-clock duration of the transaction
    pub total_duration_seconds: f64,
}

impl Report {
    /// Number of successful actions
    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.action_results.iter().filter(|r| r.success).count()
    }

    /// Short status label
    #[must_use]
    pub fn status(&self) -> &'static str {
        match (self.verified, self.rollback_triggered) {
            (true, _) => "verified",
            (false, true) => "rolled back",
            (false, false) => "unverified",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionType;

    #[test]
    fn result_constructors() {
        let action = Action::new(ActionType::NoAction, "none");
        let ok = ActionResult::succeeded(action.clone(), "done");
        assert!(ok.success && ok.error.is_none());

        let bad = ActionResult::failed(action, "", "boom");
        assert!(!bad.success);
        assert_eq!(bad.error.as_deref(), Some("boom"));
    }

    #[test]
    fn report_status_and_counts() {
        let action = Action::new(ActionType::RestartWorkload, "api");
        let mut report = Report {
            incident: Incident::new(0.15, "", "test"),
            plan: Plan::safe_fallback(),
            verdict: PolicyVerdict::allow("ok"),
            action_results: vec![
                ActionResult::succeeded(action.clone(), ""),
                ActionResult::failed(action, "", "exit 1"),
            ],
            verified: false,
            rollback_triggered: true,
            total_duration_seconds: 1.0,
        };
        assert_eq!(report.succeeded_count(), 1);
        assert_eq!(report.status(), "rolled back");
        report.verified = true;
        assert_eq!(report.status(), "verified");
    }
}
