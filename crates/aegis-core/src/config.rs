//! Runtime configuration
//!
//! Loaded from a TOML file where every section and key is optional, then
//! overlaid with a fixed set of environment variables for endpoints and
//! secrets.

use crate::coordinator::CoordinatorSettings;
use crate::error::ConfigError;
use aegis_executor::ExecutorSettings;
use aegis_observe::{DetectorSettings, VerifierSettings, DEFAULT_ERROR_RATE_QUERY, DEFAULT_SENTINEL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variables that override file settings
pub const ENV_OVERRIDES: [&str; 5] = [
    "AEGIS_SLACK_WEBHOOK_URL",
    "AEGIS_PROMETHEUS_URL",
    "AEGIS_OPA_URL",
    "AEGIS_KUBECTL_DRY_RUN",
    "AEGIS_TERRAFORM_AUTO_APPLY",
];

/// Metrics source and breach threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus base URL
    pub url: String,
    /// Error-ratio query
    pub query: String,
    /// Seconds between polls
    pub poll_interval_secs: u64,
    /// Breach threshold (0, 1]
    pub threshold: f64,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9090".to_string(),
            query: DEFAULT_ERROR_RATE_QUERY.to_string(),
            poll_interval_secs: 30,
            threshold: 0.05,
            timeout_secs: 10,
        }
    }
}

/// Log source window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogsConfig {
    /// Loki base URL
    pub url: String,
    /// LogQL stream selector
    pub selector: String,
    /// Window length in minutes
    pub lookback_minutes: u64,
    /// Lines requested
    pub limit: usize,
    /// Newest lines kept
    pub keep_lines: usize,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3100".to_string(),
            selector: "{job=\"aegis\"}".to_string(),
            lookback_minutes: 5,
            limit: 100,
            keep_lines: 50,
            timeout_secs: 10,
        }
    }
}

/// Plan-producing chat endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Chat API base URL
    pub url: String,
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Response token cap
    pub max_tokens: u32,
    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            temperature: 0.1,
            max_tokens: 2048,
            timeout_secs: 120,
        }
    }
}

/// Runbook retrieval service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Retrieval service base URL
    pub url: String,
    /// Collection to search
    pub collection: String,
    /// Entries per query
    pub k: usize,
    /// Query text budget in characters
    pub query_budget_chars: usize,
    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            collection: "runbooks".to_string(),
            k: 3,
            query_budget_chars: 2000,
            timeout_secs: 10,
        }
    }
}

/// Policy decision service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// OPA base URL
    pub url: String,
    /// Decision document path
    pub policy_path: String,
    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8181".to_string(),
            policy_path: "aegis/remediation".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Cluster control plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// `kubectl` binary
    pub kubectl: String,
    /// Client-side dry run for mutating commands
    pub dry_run: bool,
    /// Explicit kubeconfig
    pub kubeconfig: Option<PathBuf>,
    /// Namespace when a plan omits one
    pub namespace: String,
    /// Per-command timeout
    pub timeout_secs: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".to_string(),
            dry_run: false,
            kubeconfig: None,
            namespace: aegis_model::DEFAULT_NAMESPACE.to_string(),
            timeout_secs: 60,
        }
    }
}

/// Infrastructure-as-code tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfraConfig {
    /// `terraform` binary
    pub terraform: String,
    /// Working directory
    pub dir: PathBuf,
    /// Apply without human review
    pub auto_apply: bool,
    /// Per-command timeout
    pub timeout_secs: u64,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            terraform: "terraform".to_string(),
            dir: PathBuf::from("./terraform"),
            auto_apply: false,
            timeout_secs: 600,
        }
    }
}

/// Remote host access
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// `ssh` binary
    pub ssh: String,
    /// Login user
    pub user: String,
    /// Private key
    pub key_path: String,
    /// Connection timeout
    pub connect_timeout_secs: u64,
    /// Per-command timeout
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            ssh: "ssh".to_string(),
            user: "ubuntu".to_string(),
            key_path: "~/.ssh/id_rsa".to_string(),
            connect_timeout_secs: 10,
            timeout_secs: 120,
        }
    }
}

/// Notification channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Slack-style incoming webhook; unset disables notifications
    pub webhook_url: Option<String>,
    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 5,
        }
    }
}

/// Transaction tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemediationConfig {
    /// Maximum wait for recovery
    pub verify_window_secs: u64,
    /// Pause between verification readings
    pub verify_interval_secs: u64,
    /// Undo reversible actions when verification fails
    pub rollback_on_failure: bool,
    /// Retrieved-context budget in characters
    pub context_budget_chars: usize,
    /// Raw-log budget in bytes
    pub raw_log_budget_bytes: usize,
    /// Deadline per action; must cover terraform `plan` plus `apply`
    pub action_timeout_secs: u64,
    /// Wait for an in-flight transaction at shutdown
    pub shutdown_grace_secs: u64,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            verify_window_secs: 300,
            verify_interval_secs: 30,
            rollback_on_failure: true,
            context_budget_chars: 4000,
            raw_log_budget_bytes: aegis_model::DEFAULT_RAW_LOG_BUDGET,
            action_timeout_secs: 1260,
            shutdown_grace_secs: 30,
        }
    }
}

/// Offline demo signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Sentinel file
    pub sentinel_path: PathBuf,
    /// Rate reported at detection while armed
    pub breach_rate: f64,
    /// Rate reported during verification while armed
    pub still_broken_rate: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            sentinel_path: PathBuf::from(DEFAULT_SENTINEL),
            breach_rate: 0.15,
            still_broken_rate: 0.20,
        }
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AegisConfig {
    /// Metrics source
    pub metrics: MetricsConfig,
    /// Log source
    pub logs: LogsConfig,
    /// Plan producer
    pub reasoning: ReasoningConfig,
    /// Context retrieval
    pub retrieval: RetrievalConfig,
    /// Policy gate
    pub policy: PolicyConfig,
    /// Cluster backend
    pub cluster: ClusterConfig,
    /// Infrastructure backend
    pub infra: InfraConfig,
    /// Remote-exec backend
    pub remote: RemoteConfig,
    /// Notifications
    pub notify: NotifyConfig,
    /// Transaction tuning
    pub remediation: RemediationConfig,
    /// Demo signal
    pub demo: DemoConfig,
}

impl AegisConfig {
    /// Load `path` (defaults when absent), apply process env overrides, validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_toml(&text)?
        } else {
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Overlay [`ENV_OVERRIDES`] using `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("AEGIS_SLACK_WEBHOOK_URL") {
            self.notify.webhook_url = (!url.trim().is_empty()).then_some(url);
        }
        if let Some(url) = lookup("AEGIS_PROMETHEUS_URL") {
            self.metrics.url = url;
        }
        if let Some(url) = lookup("AEGIS_OPA_URL") {
            self.policy.url = url;
        }
        if let Some(flag) = lookup("AEGIS_KUBECTL_DRY_RUN") {
            self.cluster.dry_run = parse_bool("AEGIS_KUBECTL_DRY_RUN", &flag)?;
        }
        if let Some(flag) = lookup("AEGIS_TERRAFORM_AUTO_APPLY") {
            self.infra.auto_apply = parse_bool("AEGIS_TERRAFORM_AUTO_APPLY", &flag)?;
        }
        Ok(())
    }

    /// Reject out-of-range or inconsistent settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.metrics.threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(ConfigError::invalid("metrics.threshold", format!("{t} not in (0, 1]")));
        }
        if self.metrics.poll_interval_secs == 0 {
            return Err(ConfigError::invalid("metrics.poll_interval_secs", "must be positive"));
        }
        let r = &self.remediation;
        if r.verify_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "remediation.verify_interval_secs",
                "must be positive",
            ));
        }
        if r.verify_window_secs == 0 {
            return Err(ConfigError::invalid("remediation.verify_window_secs", "must be positive"));
        }
        if r.verify_interval_secs > r.verify_window_secs {
            return Err(ConfigError::invalid(
                "remediation.verify_interval_secs",
                "larger than remediation.verify_window_secs",
            ));
        }
        // An infra action runs two terraform commands; cutting it short kills `apply`.
        let infra_budget = self.infra.timeout_secs.saturating_mul(2);
        if r.action_timeout_secs < infra_budget {
            return Err(ConfigError::invalid(
                "remediation.action_timeout_secs",
                format!(
                    "{} below twice infra.timeout_secs ({infra_budget})",
                    r.action_timeout_secs
                ),
            ));
        }
        if self.retrieval.k == 0 {
            return Err(ConfigError::invalid("retrieval.k", "must be positive"));
        }
        for (key, rate) in [
            ("demo.breach_rate", self.demo.breach_rate),
            ("demo.still_broken_rate", self.demo.still_broken_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::invalid(key, format!("{rate} not in [0, 1]")));
            }
        }
        Ok(())
    }

    /// Detector tuning
    #[must_use]
    pub fn detector_settings(&self) -> DetectorSettings {
        DetectorSettings {
            threshold: self.metrics.threshold,
            poll_interval: Duration::from_secs(self.metrics.poll_interval_secs),
            log_lookback: Duration::from_secs(self.logs.lookback_minutes * 60),
            log_limit: self.logs.limit,
            simulated_breach_rate: self.demo.breach_rate,
            log_timeout: Duration::from_secs(self.logs.timeout_secs),
        }
    }

    /// Verifier tuning
    #[must_use]
    pub fn verifier_settings(&self) -> VerifierSettings {
        VerifierSettings {
            threshold: self.metrics.threshold,
            window: Duration::from_secs(self.remediation.verify_window_secs),
            interval: Duration::from_secs(self.remediation.verify_interval_secs),
            simulated_broken_rate: self.demo.still_broken_rate,
        }
    }

    /// Handler defaults
    #[must_use]
    pub fn executor_settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            default_namespace: self.cluster.namespace.clone(),
            infra_dir: self.infra.dir.clone(),
            infra_auto_apply: self.infra.auto_apply,
            remote_user: self.remote.user.clone(),
            remote_key_path: self.remote.key_path.clone(),
            action_timeout: Duration::from_secs(self.remediation.action_timeout_secs),
        }
    }

    /// Coordinator tuning
    #[must_use]
    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            context_budget_chars: self.remediation.context_budget_chars,
            raw_log_budget_bytes: self.remediation.raw_log_budget_bytes,
            retrieval_k: self.retrieval.k,
            rollback_on_failure: self.remediation.rollback_on_failure,
            default_namespace: self.cluster.namespace.clone(),
            context_timeout: Duration::from_secs(self.retrieval.timeout_secs),
            plan_timeout: Duration::from_secs(self.reasoning.timeout_secs),
        }
    }

    /// Shutdown grace period
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.remediation.shutdown_grace_secs)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(key, format!("'{other}' is not a boolean"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = AegisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.metrics.poll_interval_secs, 30);
        assert_eq!(config.remediation.verify_window_secs, 300);
        assert!(!config.infra.auto_apply);
        assert!(config.notify.webhook_url.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AegisConfig::from_toml(
            r#"
            [metrics]
            threshold = 0.1

            [cluster]
            dry_run = true
            namespace = "payments"
            "#,
        )
        .unwrap();
        assert_eq!(config.metrics.threshold, 0.1);
        assert_eq!(config.metrics.url, "http://localhost:9090");
        assert!(config.cluster.dry_run);
        assert_eq!(config.executor_settings().default_namespace, "payments");
        assert_eq!(config.coordinator_settings().default_namespace, "payments");
    }

    #[test]
    fn unknown_types_rejected() {
        assert!(matches!(
            AegisConfig::from_toml("[metrics]\nthreshold = \"high\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = [
            ("AEGIS_SLACK_WEBHOOK_URL", "https://hooks.example.com/T000"),
            ("AEGIS_OPA_URL", "http://opa.internal:8181"),
            ("AEGIS_KUBECTL_DRY_RUN", "yes"),
        ]
        .into_iter()
        .collect();
        let mut config = AegisConfig::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| (*v).to_string()))
            .unwrap();
        assert_eq!(config.notify.webhook_url.as_deref(), Some("https://hooks.example.com/T000"));
        assert_eq!(config.policy.url, "http://opa.internal:8181");
        assert!(config.cluster.dry_run);
        assert!(!config.infra.auto_apply);

        let err = config
            .apply_env_overrides(|k| {
                (k == "AEGIS_TERRAFORM_AUTO_APPLY").then(|| "maybe".to_string())
            })
            .unwrap_err();
        assert!(err.to_string().contains("AEGIS_TERRAFORM_AUTO_APPLY"));
    }

    #[test]
    fn validation() {
        let mut config = AegisConfig::default();
        config.metrics.threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = AegisConfig::default();
        config.remediation.verify_interval_secs = 600;
        assert!(config.validate().is_err());

        let mut config = AegisConfig::default();
        config.metrics.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn action_timeout_covers_terraform_plan_and_apply() {
        let config = AegisConfig::default();
        assert!(config.remediation.action_timeout_secs >= 2 * config.infra.timeout_secs);

        let mut config = AegisConfig::default();
        config.infra.timeout_secs = 600;
        config.remediation.action_timeout_secs = 900;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("remediation.action_timeout_secs"));

        config.remediation.action_timeout_secs = 1200;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AegisConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.metrics, AegisConfig::default().metrics);
    }

    #[test]
    fn load_file_and_render() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aegis.toml");
        std::fs::write(
            &path,
            "[remediation]\nverify_window_secs = 120\nverify_interval_secs = 10\n",
        )
        .unwrap();

        let config = AegisConfig::load(&path).unwrap();
        assert_eq!(config.verifier_settings().window, Duration::from_secs(120));

        let rendered = config.to_toml().unwrap();
        assert_eq!(AegisConfig::from_toml(&rendered).unwrap(), config);
    }
}
