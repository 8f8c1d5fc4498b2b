//! Per-type action handlers

use crate::backend::{ControlPlane, InfraTool, Notifier, RemoteShell, ResourceLimits};
use crate::error::BackendError;
use crate::process::CommandOutput;
use crate::settings::ExecutorSettings;
use aegis_model::{Action, ActionResult};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Executes one action type
#[async_trait::async_trait]
pub trait ActionHandler: Send + Sync {
    /// Run the action; backend errors become failed results upstream
    async fn handle(&self, action: &Action) -> Result<ActionResult, BackendError>;
}

fn from_output(action: &Action, out: &CommandOutput) -> ActionResult {
    if out.success {
        ActionResult::succeeded(action.clone(), out.combined())
    } else {
        ActionResult::failed(action.clone(), out.stdout.clone(), out.combined())
    }
}

/// Rolling restart
pub struct RestartHandler {
    pub(crate) control_plane: Arc<dyn ControlPlane>,
    pub(crate) settings: Arc<ExecutorSettings>,
}

#[async_trait::async_trait]
impl ActionHandler for RestartHandler {
    async fn handle(&self, action: &Action) -> Result<ActionResult, BackendError> {
        let ns = action.namespace_or(&self.settings.default_namespace);
        let out = self.control_plane.rollout_restart(&action.target, ns).await?;
        Ok(from_output(action, &out))
    }
}

/// Replica count change
pub struct ScaleHandler {
    pub(crate) control_plane: Arc<dyn ControlPlane>,
    pub(crate) settings: Arc<ExecutorSettings>,
}

#[async_trait::async_trait]
impl ActionHandler for ScaleHandler {
    async fn handle(&self, action: &Action) -> Result<ActionResult, BackendError> {
        let ns = action.namespace_or(&self.settings.default_namespace);
        let replicas = match action.parameters.get("replicas") {
            None => 1,
            Some(_) => action.param_u64("replicas").ok_or_else(|| {
                BackendError::invalid_parameter("replicas", "expected a non-negative integer")
            })?,
        };
        let out = self.control_plane.scale(&action.target, ns, replicas).await?;
        Ok(from_output(action, &out))
    }
}

/// Resource-limit patch
pub struct PatchLimitsHandler {
    pub(crate) control_plane: Arc<dyn ControlPlane>,
    pub(crate) settings: Arc<ExecutorSettings>,
}

#[async_trait::async_trait]
impl ActionHandler for PatchLimitsHandler {
    async fn handle(&self, action: &Action) -> Result<ActionResult, BackendError> {
        let ns = action.namespace_or(&self.settings.default_namespace);
        let limits = ResourceLimits {
            container: action.param_str("container").unwrap_or_else(|| action.target.clone()),
            memory: action.param_str("memory_limit").unwrap_or_else(|| "2Gi".to_string()),
            cpu: action.param_str("cpu_limit").unwrap_or_else(|| "1000m".to_string()),
        };
        let out = self.control_plane.patch_limits(&action.target, ns, &limits).await?;
        Ok(from_output(action, &out))
    }
}

/// Command inside a workload
pub struct ExecHandler {
    pub(crate) control_plane: Arc<dyn ControlPlane>,
    pub(crate) settings: Arc<ExecutorSettings>,
}

#[async_trait::async_trait]
impl ActionHandler for ExecHandler {
    async fn handle(&self, action: &Action) -> Result<ActionResult, BackendError> {
        let ns = action.namespace_or(&self.settings.default_namespace);
        let command = action.param_str("command").unwrap_or_else(|| "echo ok".to_string());
        let out = self.control_plane.exec(&action.target, ns, &command).await?;
        Ok(from_output(action, &out))
    }
}

/// Infrastructure plan, applied only when auto-apply is on
pub struct InfraApplyHandler {
    pub(crate) infra: Arc<dyn InfraTool>,
    pub(crate) settings: Arc<ExecutorSettings>,
}

#[async_trait::async_trait]
impl ActionHandler for InfraApplyHandler {
    async fn handle(&self, action: &Action) -> Result<ActionResult, BackendError> {
        let dir = action
            .param_str("directory")
            .map_or_else(|| self.settings.infra_dir.clone(), PathBuf::from);

        let plan = self.infra.plan(&dir).await?;
        if !plan.success {
            return Ok(ActionResult::failed(action.clone(), plan.stdout, plan.stderr));
        }

        if !self.settings.infra_auto_apply {
            let msg = "Infrastructure plan generated. Auto-apply disabled; human review required.";
            warn!(target_dir = %dir.display(), "{msg}");
            return Ok(ActionResult::succeeded(
                action.clone(),
                format!("{}\n{msg}", plan.stdout),
            ));
        }

        let apply = self.infra.apply(&dir).await?;
        if apply.success {
            Ok(ActionResult::succeeded(action.clone(), apply.stdout))
        } else {
            Ok(ActionResult::failed(action.clone(), apply.stdout, apply.stderr))
        }
    }
}

/// Single command on a remote host
///
/// A session-level failure (ssh exit 255) fails the action. Otherwise the
/// command is judged by its standard error: success unless it mentions an
/// error.
pub struct RemoteExecHandler {
    pub(crate) shell: Arc<dyn RemoteShell>,
    pub(crate) settings: Arc<ExecutorSettings>,
}

/// Session-level failure exit code of `ssh`
const SESSION_FAILURE: i32 = 255;

#[async_trait::async_trait]
impl ActionHandler for RemoteExecHandler {
    async fn handle(&self, action: &Action) -> Result<ActionResult, BackendError> {
        let command = action.param_str("command").unwrap_or_else(|| "echo ok".to_string());
        let user = action
            .param_str("username")
            .unwrap_or_else(|| self.settings.remote_user.clone());
        let key = action
            .param_str("key_path")
            .unwrap_or_else(|| self.settings.remote_key_path.clone());

        let out = self.shell.exec(&action.target, &user, &key, &command).await?;
        if out.code == Some(SESSION_FAILURE) {
            return Ok(ActionResult::failed(action.clone(), out.stdout, out.stderr));
        }

        let ok = stderr_looks_clean(&out.stderr);
        let error = (!out.stderr.is_empty()).then(|| out.stderr.clone());
        Ok(ActionResult {
            action: action.clone(),
            success: ok,
            output: out.stdout,
            error,
        })
    }
}

/// Remote-command success heuristic
#[must_use]
pub fn stderr_looks_clean(stderr: &str) -> bool {
    stderr.is_empty() || !stderr.to_lowercase().contains("error")
}

/// Notification; always succeeds
pub struct NotifyHandler {
    pub(crate) notifier: Arc<dyn Notifier>,
}

#[async_trait::async_trait]
impl ActionHandler for NotifyHandler {
    async fn handle(&self, action: &Action) -> Result<ActionResult, BackendError> {
        let message = action.param_str("message").unwrap_or_else(|| "Aegis alert".to_string());
        let delivered = self.notifier.send(&message).await;
        let output = if delivered {
            "Notification sent."
        } else {
            "Notification skipped (channel not configured or unavailable)."
        };
        Ok(ActionResult::succeeded(action.clone(), output))
    }
}

/// No remediation needed
pub struct NoActionHandler;

#[async_trait::async_trait]
impl ActionHandler for NoActionHandler {
    async fn handle(&self, action: &Action) -> Result<ActionResult, BackendError> {
        info!("Plan decided no action is needed, monitoring continues");
        Ok(ActionResult::succeeded(
            action.clone(),
            "No action taken per plan recommendation.",
        ))
    }
}
