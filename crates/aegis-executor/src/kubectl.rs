//! `kubectl`-backed control plane

use crate::backend::{ControlPlane, ResourceLimits};
use crate::error::BackendError;
use crate::process::{run_command, CommandOutput};
use std::path::PathBuf;
use std::time::Duration;

/// Control plane driven through the `kubectl` CLI
///
/// In dry-run mode mutating commands carry `--dry-run=client`; `exec` cannot
/// be dry-run, so it is reported instead of executed.
#[derive(Debug, Clone)]
pub struct KubectlCli {
    binary: String,
    dry_run: bool,
    kubeconfig: Option<PathBuf>,
    timeout: Duration,
}

impl KubectlCli {
    /// Create client for `binary`
    #[must_use]
    pub fn new(
        binary: impl Into<String>,
        dry_run: bool,
        kubeconfig: Option<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            binary: binary.into(),
            dry_run,
            kubeconfig,
            timeout,
        }
    }

    /// Whether mutating commands run with client-side dry run
    #[inline]
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Full argument list for a mutating subcommand
    #[must_use]
    pub fn mutating_args(&self, sub: &[&str]) -> Vec<String> {
        let mut args = self.global_args();
        args.extend(sub.iter().map(|s| (*s).to_string()));
        if self.dry_run {
            args.push("--dry-run=client".to_string());
        }
        args
    }

    fn global_args(&self) -> Vec<String> {
        self.kubeconfig
            .iter()
            .map(|p| format!("--kubeconfig={}", p.display()))
            .collect()
    }

    async fn run(&self, args: Vec<String>) -> Result<CommandOutput, BackendError> {
        run_command(&self.binary, &args, None, self.timeout).await
    }
}

/// Reject plan-supplied names kubectl would parse as flags
fn checked_arg<'a>(name: &str, value: &'a str) -> Result<&'a str, BackendError> {
    if value.starts_with('-') {
        let reason = format!("{value:?} may not start with '-'");
        return Err(BackendError::invalid_parameter(name, reason));
    }
    Ok(value)
}

/// Strategic-merge patch raising one container's limits
#[must_use]
pub fn limits_patch(limits: &ResourceLimits) -> String {
    serde_json::json!({
        "spec": {"template": {"spec": {"containers": [{
            "name": limits.container,
            "resources": {"limits": {"memory": limits.memory, "cpu": limits.cpu}}
        }]}}}
    })
    .to_string()
}

#[async_trait::async_trait]
impl ControlPlane for KubectlCli {
    async fn rollout_restart(
        &self,
        deployment: &str,
        namespace: &str,
    ) -> Result<CommandOutput, BackendError> {
        let target = format!("deployment/{deployment}");
        self.run(self.mutating_args(&["rollout", "restart", &target, "-n", namespace]))
            .await
    }

    async fn scale(
        &self,
        deployment: &str,
        namespace: &str,
        replicas: u64,
    ) -> Result<CommandOutput, BackendError> {
        let target = format!("deployment/{deployment}");
        let replicas = format!("--replicas={replicas}");
        self.run(self.mutating_args(&["scale", &target, &replicas, "-n", namespace]))
            .await
    }

    async fn patch_limits(
        &self,
        deployment: &str,
        namespace: &str,
        limits: &ResourceLimits,
    ) -> Result<CommandOutput, BackendError> {
        let deployment = checked_arg("target", deployment)?;
        let patch = limits_patch(limits);
        let args = ["patch", "deployment", deployment, "-p", &patch, "-n", namespace];
        self.run(self.mutating_args(&args)).await
    }

    async fn exec(
        &self,
        target: &str,
        namespace: &str,
        command: &str,
    ) -> Result<CommandOutput, BackendError> {
        let target = checked_arg("target", target)?;
        if self.dry_run {
            return Ok(CommandOutput::ok(format!(
                "dry run: would exec `{command}` in {namespace}/{target}"
            )));
        }
        let mut args = self.global_args();
        args.extend(
            ["exec", target, "-n", namespace, "--", "sh", "-c", command]
                .iter()
                .map(|s| (*s).to_string()),
        );
        self.run(args).await
    }

    async fn rollout_undo(
        &self,
        deployment: &str,
        namespace: &str,
    ) -> Result<CommandOutput, BackendError> {
        let target = format!("deployment/{deployment}");
        self.run(self.mutating_args(&["rollout", "undo", &target, "-n", namespace]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_flag_appended() {
        let cli = KubectlCli::new("kubectl", true, None, Duration::from_secs(30));
        assert_eq!(
            cli.mutating_args(&["scale", "deployment/api", "--replicas=3", "-n", "prod"]),
            vec!["scale", "deployment/api", "--replicas=3", "-n", "prod", "--dry-run=client"]
        );
    }

    #[test]
    fn kubeconfig_leads() {
        let kubeconfig = Some(PathBuf::from("/etc/kube/config"));
        let cli = KubectlCli::new("kubectl", false, kubeconfig, Duration::from_secs(30));
        let args = cli.mutating_args(&["rollout", "undo", "deployment/api"]);
        assert_eq!(args[0], "--kubeconfig=/etc/kube/config");
        assert!(!args.iter().any(|a| a.starts_with("--dry-run")));
    }

    #[test]
    fn patch_document_shape() {
        let patch = limits_patch(&ResourceLimits {
            container: "api".into(),
            memory: "2Gi".into(),
            cpu: "1000m".into(),
        });
        let v: serde_json::Value = serde_json::from_str(&patch).unwrap();
        let container = &v["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["name"], "api");
        assert_eq!(container["resources"]["limits"]["memory"], "2Gi");
        assert_eq!(container["resources"]["limits"]["cpu"], "1000m");
    }

    #[tokio::test]
    async fn dry_run_exec_is_reported_not_run() {
        let cli = KubectlCli::new("aegis-no-such-kubectl", true, None, Duration::from_secs(5));
        let out = cli.exec("api-0", "default", "ulimit -n").await.unwrap();
        assert!(out.success);
        assert!(out.stdout.contains("would exec"));
    }

    #[tokio::test]
    async fn flag_like_targets_rejected_before_spawn() {
        let cli = KubectlCli::new("aegis-no-such-kubectl", false, None, Duration::from_secs(5));
        let err = cli.exec("--kubeconfig=/tmp/evil", "default", "id").await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidParameter { .. }), "{err:?}");

        let limits = ResourceLimits {
            container: "api".into(),
            memory: "1Gi".into(),
            cpu: "500m".into(),
        };
        let err = cli.patch_limits("-A", "default", &limits).await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidParameter { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn missing_binary_surfaces_as_error() {
        let cli = KubectlCli::new("aegis-no-such-kubectl", false, None, Duration::from_secs(5));
        let err = cli.rollout_restart("api", "default").await.unwrap_err();
        assert!(matches!(err, BackendError::ToolMissing(_)));
    }
}
