//! Backend seams
//!
//! Handlers never talk to a tool directly; they go through these traits so
//! the cluster, infrastructure, remote-shell and notification layers can be
//! swapped (or stubbed in tests) without touching dispatch.

use crate::error::BackendError;
use crate::process::CommandOutput;
use std::path::Path;
use std::sync::Arc;

/// Container resource limits for a patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Container name inside the pod template
    pub container: String,
    /// Memory limit (e.g. `2Gi`)
    pub memory: String,
    /// CPU limit (e.g. `1000m`)
    pub cpu: String,
}

/// Cluster control plane
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ControlPlane: Send + Sync {
    /// Rolling restart of a deployment
    async fn rollout_restart(
        &self,
        deployment: &str,
        namespace: &str,
    ) -> Result<CommandOutput, BackendError>;

    /// Set replica count
    async fn scale(
        &self,
        deployment: &str,
        namespace: &str,
        replicas: u64,
    ) -> Result<CommandOutput, BackendError>;

    /// Patch container resource limits
    async fn patch_limits(
        &self,
        deployment: &str,
        namespace: &str,
        limits: &ResourceLimits,
    ) -> Result<CommandOutput, BackendError>;

    /// Run a shell command inside a workload
    async fn exec(
        &self,
        target: &str,
        namespace: &str,
        command: &str,
    ) -> Result<CommandOutput, BackendError>;

    /// Revert a deployment to its previous revision
    async fn rollout_undo(
        &self,
        deployment: &str,
        namespace: &str,
    ) -> Result<CommandOutput, BackendError>;
}

/// Infrastructure-as-code tool
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait InfraTool: Send + Sync {
    /// Produce a saved plan in `dir`
    async fn plan(&self, dir: &Path) -> Result<CommandOutput, BackendError>;

    /// Apply the saved plan in `dir`
    async fn apply(&self, dir: &Path) -> Result<CommandOutput, BackendError>;
}

/// Remote host login for a single command
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RemoteShell: Send + Sync {
    /// Open a transient session, run `command`, close it
    async fn exec(
        &self,
        host: &str,
        user: &str,
        key_path: &str,
        command: &str,
    ) -> Result<CommandOutput, BackendError>;
}

/// Fire-and-forget notification channel
///
/// Returns whether the message was delivered. Never fails.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Post a message
    async fn send(&self, text: &str) -> bool;
}

/// The set of backends a handler table dispatches to
#[derive(Clone)]
pub struct Backends {
    /// Cluster control plane
    pub control_plane: Arc<dyn ControlPlane>,
    /// Infrastructure tool
    pub infra: Arc<dyn InfraTool>,
    /// Remote shell
    pub shell: Arc<dyn RemoteShell>,
    /// Notification channel
    pub notifier: Arc<dyn Notifier>,
}
