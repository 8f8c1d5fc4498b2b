//! Handler defaults

use aegis_model::DEFAULT_NAMESPACE;
use std::path::PathBuf;
use std::time::Duration;

/// Defaults applied when an action omits a parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorSettings {
    /// Namespace when the action's is blank
    pub default_namespace: String,
    /// Working directory for the infrastructure tool
    pub infra_dir: PathBuf,
    /// Apply infrastructure plans without human review
    pub infra_auto_apply: bool,
    /// Remote login user
    pub remote_user: String,
    /// Remote login key
    pub remote_key_path: String,
    /// Deadline per action
    pub action_timeout: Duration,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            infra_dir: PathBuf::from("./terraform"),
            infra_auto_apply: false,
            remote_user: "ubuntu".to_string(),
            remote_key_path: "~/.ssh/id_rsa".to_string(),
            action_timeout: Duration::from_secs(120),
        }
    }
}
