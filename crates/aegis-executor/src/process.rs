//! Subprocess helper shared by the CLI backends

use crate::error::BackendError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tracing::debug;

/// Captured result of one subprocess
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit status was zero
    pub success: bool,
    /// Exit code, `None` if killed by a signal
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Synthetic successful output (dry runs, stubs)
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Synthetic failed output
    #[must_use]
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(1),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Stdout if non-empty, otherwise stderr
    #[must_use]
    pub fn combined(&self) -> &str {
        if self.stdout.trim().is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

/// Run `program` with `args`, killing it if `timeout` elapses
pub async fn run_command(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<CommandOutput, BackendError> {
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = cwd {
        if !dir.is_dir() {
            return Err(BackendError::invalid_parameter(
                "directory",
                format!("{} is not a directory", dir.display()),
            ));
        }
        cmd.current_dir(dir);
    }

    debug!(program, ?args, "Spawning");
    let child = cmd.spawn().map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            BackendError::ToolMissing(program.to_string())
        } else {
            BackendError::Spawn {
                program: program.to_string(),
                source,
            }
        }
    })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| BackendError::Timeout {
            program: program.to_string(),
            after: timeout,
        })?
        .map_err(|source| BackendError::Spawn {
            program: program.to_string(),
            source,
        })?;

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn captures_stdout_and_status() {
        let out = run_command("sh", &sh("echo hello"), None, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(out.success);
        assert_eq!(out.code, Some(0));
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_not_an_error() {
        let out = run_command("sh", &sh("echo oops >&2; exit 3"), None, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert_eq!(out.combined().trim(), "oops");
    }

    #[tokio::test]
    async fn missing_tool() {
        let err = run_command("aegis-no-such-binary", &[], None, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::ToolMissing(p) if p == "aegis-no-such-binary"));
    }

    #[tokio::test]
    async fn deadline_kills_process() {
        let err = run_command("sh", &sh("sleep 5"), None, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Timeout { .. }));
    }

    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.tf"), "").unwrap();
        let out = run_command("sh", &sh("ls"), Some(dir.path()), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(out.stdout.contains("main.tf"));

        let missing = dir.path().join("nope");
        let err = run_command("sh", &sh("ls"), Some(&missing), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidParameter { .. }));
    }
}
