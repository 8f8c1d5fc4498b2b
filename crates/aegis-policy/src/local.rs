//! Degraded-mode rule set
//!
//! Applied only when the remote decision service is unreachable. The rules
//! mirror the remote policy's intent but err on the side of denial.

use aegis_model::{Action, PolicyVerdict, RiskLevel};

/// Conservative local rules
#[derive(Debug, Clone)]
pub struct LocalRules {
    protected_keywords: Vec<String>,
}

impl Default for LocalRules {
    fn default() -> Self {
        Self {
            protected_keywords: vec!["database".to_string()],
        }
    }
}

impl LocalRules {
    /// Rules with a custom protected-resource keyword list (matched case-insensitively)
    #[must_use]
    pub fn with_protected_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            protected_keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
        }
    }

    /// Evaluate every action; any denial denies the whole set
    #[must_use]
    pub fn evaluate(&self, actions: &[Action]) -> PolicyVerdict {
        let denied: Vec<String> = actions.iter().flat_map(|a| self.denials(a)).collect();

        if denied.is_empty() {
            PolicyVerdict::allow("Local safety rules: all actions approved.")
        } else {
            PolicyVerdict::deny(
                denied,
                "Local safety rules denied one or more actions (policy service offline).",
            )
        }
    }

    fn denials(&self, action: &Action) -> Vec<String> {
        let label = action.label();
        let mut out = Vec::new();

        if action.action_type.requires_infra_apply() {
            out.push(format!("{label} (forbidden without policy service)"));
        }
        if action.risk_level == RiskLevel::High {
            out.push(format!("{label} (high-risk blocked without policy service)"));
        }
        if !action.action_type.is_passive() && self.is_protected(&action.target) {
            out.push(format!("{label} (protected resource requires policy service)"));
        }
        out
    }

    fn is_protected(&self, target: &str) -> bool {
        let target = target.to_lowercase();
        self.protected_keywords.iter().any(|k| target.contains(k.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_model::ActionType;
    use proptest::prelude::*;

    #[test]
    fn low_risk_cluster_actions_pass() {
        let actions = vec![
            Action::new(ActionType::RestartWorkload, "payment-service"),
            Action::new(ActionType::ScaleWorkload, "payment-service").with_risk(RiskLevel::Medium),
        ];
        let verdict = LocalRules::default().evaluate(&actions);
        assert!(verdict.allow);
        assert!(verdict.denied_actions.is_empty());
    }

    #[test]
    fn infra_apply_always_denied() {
        let verdict = LocalRules::default().evaluate(&[Action::new(ActionType::InfraApply, "vpc")]);
        assert!(!verdict.allow);
        assert_eq!(
            verdict.denied_actions,
            vec!["terraform_apply:vpc (forbidden without policy service)"]
        );
    }

    #[test]
    fn high_risk_denied() {
        let action = Action::new(ActionType::RestartWorkload, "api").with_risk(RiskLevel::High);
        let verdict = LocalRules::default().evaluate(&[action]);
        assert!(!verdict.allow);
        assert!(verdict.denied_actions[0].contains("high-risk blocked"));
    }

    #[test]
    fn protected_target_denied_unless_passive() {
        let rules = LocalRules::default();
        let restart = Action::new(ActionType::RestartWorkload, "orders-Database-0");
        assert!(!rules.evaluate(&[restart]).allow);

        let notify = Action::new(ActionType::Notify, "orders-database-0");
        let noop = Action::new(ActionType::NoAction, "orders-database-0");
        assert!(rules.evaluate(&[notify, noop]).allow);
    }

    #[test]
    fn one_denial_denies_all() {
        let actions = vec![
            Action::new(ActionType::Notify, "oncall"),
            Action::new(ActionType::RestartWorkload, "api"),
            Action::new(ActionType::InfraApply, "network"),
        ];
        let verdict = LocalRules::default().evaluate(&actions);
        assert!(!verdict.allow);
        assert_eq!(verdict.denied_actions.len(), 1);
    }

    #[test]
    fn custom_keywords() {
        let rules = LocalRules::with_protected_keywords(["Vault"]);
        assert!(!rules.evaluate(&[Action::new(ActionType::RestartWorkload, "vault-0")]).allow);
        assert!(rules.evaluate(&[Action::new(ActionType::RestartWorkload, "database")]).allow);
    }

    fn any_action_type() -> impl Strategy<Value = ActionType> {
        proptest::sample::select(ActionType::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_any_high_risk_action_denies(
            types in proptest::collection::vec(any_action_type(), 0..5),
            high_at in 0usize..5,
            ty in any_action_type(),
        ) {
            let mut actions: Vec<Action> = types
                .into_iter()
                .map(|t| Action::new(t, "svc"))
                .collect();
            let idx = high_at.min(actions.len());
            actions.insert(idx, Action::new(ty, "svc").with_risk(RiskLevel::High));
            prop_assert!(!LocalRules::default().evaluate(&actions).allow);
        }
    }
}
