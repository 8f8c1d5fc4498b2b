//! The policy gate
//!
//! # Invariants
//!
//! - A plan over the action cap is denied before any evaluation.
//! - An empty plan is allowed without contacting the remote service.
//! - Any remote failure (transport, status, decode, deadline) yields the
//!   local verdict. The remote service is tried once per plan.

use crate::error::PolicyError;
use crate::evaluator::{PolicyContext, PolicyEvaluator, PolicyInput};
use crate::local::LocalRules;
use aegis_model::{Plan, PolicyVerdict};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Deadline applied around every remote evaluation
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Where verdicts come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Remote service configured
    Remote,
    /// Local rules only
    LocalOnly,
}

/// Allow/deny gate over whole plans
pub struct PolicyGate {
    remote: Option<Arc<dyn PolicyEvaluator>>,
    local: LocalRules,
    remote_timeout: Duration,
}

impl PolicyGate {
    /// Gate backed by a remote evaluator, degrading to default local rules
    #[must_use]
    pub fn new(remote: Arc<dyn PolicyEvaluator>) -> Self {
        Self {
            remote: Some(remote),
            local: LocalRules::default(),
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    /// Gate that only applies local rules
    #[must_use]
    pub fn local_only() -> Self {
        Self {
            remote: None,
            local: LocalRules::default(),
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    /// With custom local rules
    #[inline]
    #[must_use]
    pub fn with_local_rules(mut self, local: LocalRules) -> Self {
        self.local = local;
        self
    }

    /// With remote deadline
    #[inline]
    #[must_use]
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    /// Current mode
    #[must_use]
    pub fn mode(&self) -> GateMode {
        if self.remote.is_some() {
            GateMode::Remote
        } else {
            GateMode::LocalOnly
        }
    }

    /// Decide whether the whole plan may run
    pub async fn evaluate(&self, plan: &Plan, ctx: &PolicyContext) -> PolicyVerdict {
        if let Err(e) = plan.check_action_cap() {
            warn!(actions = plan.actions.len(), "Plan over action cap, denying");
            return PolicyVerdict::deny(
                plan.actions.iter().map(aegis_model::Action::label).collect(),
                e.to_string(),
            );
        }

        if plan.is_empty() {
            debug!("Empty plan, nothing to gate");
            return PolicyVerdict::allow("No actions to evaluate.");
        }

        let Some(remote) = &self.remote else {
            return self.local.evaluate(&plan.actions);
        };

        let input = PolicyInput::new(plan, ctx);
        match self.remote_verdict(remote.as_ref(), &input).await {
            Ok(verdict) => {
                info!(
                    allow = verdict.allow,
                    denied = verdict.denied_actions.len(),
                    "Remote policy verdict"
                );
                verdict
            }
            Err(e) => {
                warn!(error = %e, "Policy service call failed, using local safety rules");
                self.local.evaluate(&plan.actions)
            }
        }
    }

    async fn remote_verdict(
        &self,
        remote: &dyn PolicyEvaluator,
        input: &PolicyInput,
    ) -> Result<PolicyVerdict, PolicyError> {
        tokio::time::timeout(self.remote_timeout, remote.evaluate(input))
            .await
            .map_err(|_| PolicyError::Timeout(self.remote_timeout))?
    }

    /// Probe the remote service and log which mode the gate will run in
    pub async fn health_check(&self) -> bool {
        let Some(remote) = &self.remote else {
            warn!("No policy service configured, running on local safety rules");
            return false;
        };
        match tokio::time::timeout(self.remote_timeout, remote.health()).await {
            Ok(Ok(())) => {
                info!("Policy service connected and healthy");
                true
            }
            Ok(Err(e)) => {
                warn!(
                    error = %e,
                    "Policy service unreachable, high-risk actions will be auto-denied"
                );
                false
            }
            Err(_) => {
                warn!(
                    "Policy service health probe timed out, high-risk actions will be auto-denied"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::MockPolicyEvaluator;
    use aegis_model::{Action, ActionType, RiskLevel};

    fn plan_with(actions: Vec<Action>) -> Plan {
        let mut plan = Plan::safe_fallback();
        plan.actions = actions;
        plan
    }

    fn ctx() -> PolicyContext {
        PolicyContext::new("default", 0.15)
    }

    #[tokio::test]
    async fn remote_verdict_used_verbatim() {
        let mut remote = MockPolicyEvaluator::new();
        remote
            .expect_evaluate()
            .times(1)
            .returning(|input| {
                assert_eq!(input.actions.len(), 1);
                Ok(PolicyVerdict::allow("ok"))
            });
        let gate = PolicyGate::new(Arc::new(remote));

        // high risk would be denied locally; the remote authority allows it
        let plan = plan_with(vec![
            Action::new(ActionType::ScaleWorkload, "api").with_risk(RiskLevel::High)
        ]);
        assert!(gate.evaluate(&plan, &ctx()).await.allow);
    }

    #[tokio::test]
    async fn remote_failure_degrades_to_local() {
        let mut remote = MockPolicyEvaluator::new();
        remote
            .expect_evaluate()
            .times(1)
            .returning(|_| Err(PolicyError::Status(503)));
        let gate = PolicyGate::new(Arc::new(remote));

        let plan = plan_with(vec![Action::new(ActionType::InfraApply, "vpc")]);
        let verdict = gate.evaluate(&plan, &ctx()).await;
        assert!(!verdict.allow);
        assert!(verdict.reason.contains("Local safety rules"));
    }

    #[tokio::test]
    async fn empty_plan_skips_remote() {
        let mut remote = MockPolicyEvaluator::new();
        remote.expect_evaluate().times(0);
        let gate = PolicyGate::new(Arc::new(remote));

        assert!(gate.evaluate(&Plan::safe_fallback(), &ctx()).await.allow);
    }

    #[tokio::test]
    async fn over_cap_denied_before_remote() {
        let mut remote = MockPolicyEvaluator::new();
        remote.expect_evaluate().times(0);
        let gate = PolicyGate::new(Arc::new(remote));

        let plan = plan_with(
            (0..6)
                .map(|i| Action::new(ActionType::NoAction, format!("t{i}")))
                .collect(),
        );
        let verdict = gate.evaluate(&plan, &ctx()).await;
        assert!(!verdict.allow);
        assert_eq!(verdict.denied_actions.len(), 6);
    }

    #[tokio::test]
    async fn local_only_mode() {
        let gate = PolicyGate::local_only();
        assert_eq!(gate.mode(), GateMode::LocalOnly);
        assert!(!gate.health_check().await);

        let plan = plan_with(vec![Action::new(ActionType::RestartWorkload, "api")]);
        assert!(gate.evaluate(&plan, &ctx()).await.allow);
    }

    #[tokio::test]
    async fn health_check_reports_remote_status() {
        let mut remote = MockPolicyEvaluator::new();
        remote.expect_health().times(1).returning(|| Ok(()));
        assert!(PolicyGate::new(Arc::new(remote)).health_check().await);

        let mut remote = MockPolicyEvaluator::new();
        remote.expect_health().times(1).returning(|| Err(PolicyError::Status(500)));
        assert!(!PolicyGate::new(Arc::new(remote)).health_check().await);
    }
}
