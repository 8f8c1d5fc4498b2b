//! Remediation actions and their closed type vocabulary
//!
//! The wire names (`kubectl_restart_pod`, `ssh_exec_command`, ...) are the
//! contract with the plan producer. A few extra names that producers tend to
//! invent are accepted as aliases and routed to an existing handler; see
//! [`ActionType::ALIASES`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Namespace used when a plan omits one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Closed action vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// Rolling restart of a workload
    #[serde(rename = "kubectl_restart_pod")]
    RestartWorkload,
    /// Change a workload's replica count
    #[serde(rename = "kubectl_scale")]
    ScaleWorkload,
    /// Patch container resource limits
    #[serde(rename = "kubectl_patch_resource_limits")]
    PatchResourceLimits,
    /// Run a command inside a workload container
    #[serde(rename = "kubectl_exec_command")]
    ExecInWorkload,
    /// Infrastructure-as-code plan (and optionally apply)
    #[serde(rename = "terraform_apply")]
    InfraApply,
    /// Run a single command on a host over a transient session
    #[serde(rename = "ssh_exec_command")]
    RemoteExec,
    /// Post a message to the notification channel
    #[serde(rename = "notify_slack")]
    Notify,
    /// Explicit decision that nothing needs doing
    #[serde(rename = "no_action")]
    NoAction,
    /// Alias: kernel parameter change on a node
    #[serde(rename = "sysctl_set_value")]
    SysctlSetValue,
    /// Alias: file-descriptor limit change on a node
    #[serde(rename = "ulimit_increase")]
    UlimitIncrease,
    /// Alias: service restart
    #[serde(rename = "service_restart")]
    ServiceRestart,
    /// Alias: configuration change applied inside a workload
    #[serde(rename = "config_update")]
    ConfigUpdate,
}

impl ActionType {
    /// Types with a dedicated handler
    pub const CANONICAL: [ActionType; 8] = [
        ActionType::RestartWorkload,
        ActionType::ScaleWorkload,
        ActionType::PatchResourceLimits,
        ActionType::ExecInWorkload,
        ActionType::InfraApply,
        ActionType::RemoteExec,
        ActionType::Notify,
        ActionType::NoAction,
    ];

    /// Alias redirections: `(alias, handled as)`
    pub const ALIASES: [(ActionType, ActionType); 4] = [
        (ActionType::SysctlSetValue, ActionType::RemoteExec),
        (ActionType::UlimitIncrease, ActionType::RemoteExec),
        (ActionType::ServiceRestart, ActionType::RestartWorkload),
        (ActionType::ConfigUpdate, ActionType::ExecInWorkload),
    ];

    /// Every accepted type, canonical first
    pub const ALL: [ActionType; 12] = [
        ActionType::RestartWorkload,
        ActionType::ScaleWorkload,
        ActionType::PatchResourceLimits,
        ActionType::ExecInWorkload,
        ActionType::InfraApply,
        ActionType::RemoteExec,
        ActionType::Notify,
        ActionType::NoAction,
        ActionType::SysctlSetValue,
        ActionType::UlimitIncrease,
        ActionType::ServiceRestart,
        ActionType::ConfigUpdate,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::RestartWorkload => "kubectl_restart_pod",
            ActionType::ScaleWorkload => "kubectl_scale",
            ActionType::PatchResourceLimits => "kubectl_patch_resource_limits",
            ActionType::ExecInWorkload => "kubectl_exec_command",
            ActionType::InfraApply => "terraform_apply",
            ActionType::RemoteExec => "ssh_exec_command",
            ActionType::Notify => "notify_slack",
            ActionType::NoAction => "no_action",
            ActionType::SysctlSetValue => "sysctl_set_value",
            ActionType::UlimitIncrease => "ulimit_increase",
            ActionType::ServiceRestart => "service_restart",
            ActionType::ConfigUpdate => "config_update",
        }
    }

    /// Type whose handler executes this one
    #[must_use]
    pub fn canonical(self) -> ActionType {
        Self::ALIASES
            .iter()
            .find(|(alias, _)| *alias == self)
            .map_or(self, |(_, target)| *target)
    }

    /// Whether this name is an alias for another type
    #[inline]
    #[must_use]
    pub fn is_alias(self) -> bool {
        self.canonical() != self
    }

    /// Whether rollback can undo this action
    ///
    /// Only the workload restart/scale/patch types are reversible. Aliases
    /// are not, even when they execute through a reversible handler.
    #[inline]
    #[must_use]
    pub fn is_reversible(self) -> bool {
        matches!(
            self,
            ActionType::RestartWorkload
                | ActionType::ScaleWorkload
                | ActionType::PatchResourceLimits
        )
    }

    /// Whether this action changes infrastructure at the apply level
    #[inline]
    #[must_use]
    pub fn requires_infra_apply(self) -> bool {
        self.canonical() == ActionType::InfraApply
    }

    /// Notification or no-op: touches nothing
    #[inline]
    #[must_use]
    pub fn is_passive(self) -> bool {
        matches!(self.canonical(), ActionType::Notify | ActionType::NoAction)
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown action type: {s}"))
    }
}

/// Risk classification of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Routine, easily reversed
    #[default]
    Low,
    /// Service-affecting but bounded
    Medium,
    /// Potentially destructive
    High,
}

impl RiskLevel {
    /// Lowercase label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// One remediation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// What kind of step
    pub action_type: ActionType,
    /// Resource identifier (deployment, pod, host)
    pub target: String,
    /// Namespace, defaults to `default`
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Type-specific parameters
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Why this step fixes the problem
    #[serde(default)]
    pub justification: String,
    /// Risk classification
    #[serde(default)]
    pub risk_level: RiskLevel,
}

impl Action {
    /// Create action with default namespace and low risk
    #[must_use]
    pub fn new(action_type: ActionType, target: impl Into<String>) -> Self {
        Self {
            action_type,
            target: target.into(),
            namespace: default_namespace(),
            parameters: BTreeMap::new(),
            justification: String::new(),
            risk_level: RiskLevel::Low,
        }
    }

    /// With namespace
    #[inline]
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// With parameter
    #[inline]
    #[must_use]
    pub fn with_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// With justification
    #[inline]
    #[must_use]
    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.justification = justification.into();
        self
    }

    /// With risk level
    #[inline]
    #[must_use]
    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk_level = risk;
        self
    }

    /// Parameter rendered as a string (strings, numbers, booleans)
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<String> {
        match self.parameters.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            v @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_)) => Some(v.to_string()),
            _ => None,
        }
    }

    /// Parameter as an unsigned integer (numbers or numeric strings)
    #[must_use]
    pub fn param_u64(&self, key: &str) -> Option<u64> {
        match self.parameters.get(key)? {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Namespace, falling back when the plan left it blank
    #[must_use]
    pub fn namespace_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.namespace.trim().is_empty() {
            fallback
        } else {
            &self.namespace
        }
    }

    /// Short `type:target` label used in logs and denial reasons
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}:{}", self.action_type, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_roundtrip_through_from_str() {
        for t in ActionType::ALL {
            assert_eq!(t.as_str().parse::<ActionType>().unwrap(), t);
        }
        assert!("kubectl_delete_namespace".parse::<ActionType>().is_err());
    }

    #[test]
    fn aliases_redirect_to_canonical_handlers() {
        assert_eq!(ActionType::SysctlSetValue.canonical(), ActionType::RemoteExec);
        assert_eq!(ActionType::UlimitIncrease.canonical(), ActionType::RemoteExec);
        assert_eq!(ActionType::ServiceRestart.canonical(), ActionType::RestartWorkload);
        assert_eq!(ActionType::ConfigUpdate.canonical(), ActionType::ExecInWorkload);
        for t in ActionType::CANONICAL {
            assert!(!t.is_alias());
            assert_eq!(t.canonical(), t);
        }
    }

    #[test]
    fn alias_targets_are_canonical() {
        for (alias, target) in ActionType::ALIASES {
            assert!(alias.is_alias());
            assert!(ActionType::CANONICAL.contains(&target));
        }
    }

    #[test]
    fn reversibility_excludes_aliases() {
        assert!(ActionType::RestartWorkload.is_reversible());
        assert!(ActionType::ScaleWorkload.is_reversible());
        assert!(ActionType::PatchResourceLimits.is_reversible());
        assert!(!ActionType::ServiceRestart.is_reversible());
        assert!(!ActionType::ExecInWorkload.is_reversible());
        assert!(!ActionType::InfraApply.is_reversible());
    }

    #[test]
    fn action_deserializes_with_defaults() {
        let action: Action = serde_json::from_str(
            r#"{"action_type": "kubectl_scale", "target": "api", "parameters": {"replicas": "3"}}"#,
        )
        .unwrap();
        assert_eq!(action.namespace, DEFAULT_NAMESPACE);
        assert_eq!(action.risk_level, RiskLevel::Low);
        assert_eq!(action.param_u64("replicas"), Some(3));
    }

    #[test]
    fn action_rejects_unknown_type_and_risk() {
        let unknown = r#"{"action_type": "kubectl_delete", "target": "api"}"#;
        assert!(serde_json::from_str::<Action>(unknown).is_err());

        let bad_risk = r#"{"action_type": "no_action", "target": "x", "risk_level": "extreme"}"#;
        assert!(serde_json::from_str::<Action>(bad_risk).is_err());
    }

    #[test]
    fn param_str_renders_scalars() {
        let action = Action::new(ActionType::RemoteExec, "node-1")
            .with_param("command", "sysctl -w fs.file-max=500000")
            .with_param("port", 22)
            .with_param("nested", serde_json::json!({"a": 1}));
        assert_eq!(action.param_str("command").unwrap(), "sysctl -w fs.file-max=500000");
        assert_eq!(action.param_str("port").unwrap(), "22");
        assert!(action.param_str("nested").is_none());
        assert!(action.param_str("missing").is_none());
    }

    #[test]
    fn blank_namespace_falls_back() {
        let action = Action::new(ActionType::RestartWorkload, "api").with_namespace(" ");
        assert_eq!(action.namespace_or("prod"), "prod");
        assert_eq!(action.label(), "kubectl_restart_pod:api");
    }
}
