//! `ssh`-backed remote shell

use crate::backend::RemoteShell;
use crate::error::BackendError;
use crate::process::{run_command, CommandOutput};
use std::time::Duration;

/// One `ssh` process per command, non-interactive
#[derive(Debug, Clone)]
pub struct SshCli {
    binary: String,
    connect_timeout: Duration,
    timeout: Duration,
}

impl SshCli {
    /// Create client for `binary`
    #[must_use]
    pub fn new(binary: impl Into<String>, connect_timeout: Duration, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            connect_timeout,
            timeout,
        }
    }

    /// Argument list for one remote command
    #[must_use]
    pub fn args(&self, host: &str, user: &str, key_path: &str, command: &str) -> Vec<String> {
        vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
            "-i".to_string(),
            key_path.to_string(),
            "-l".to_string(),
            user.to_string(),
            host.to_string(),
            "--".to_string(),
            command.to_string(),
        ]
    }
}

#[async_trait::async_trait]
impl RemoteShell for SshCli {
    async fn exec(
        &self,
        host: &str,
        user: &str,
        key_path: &str,
        command: &str,
    ) -> Result<CommandOutput, BackendError> {
        if host.starts_with('-') {
            return Err(BackendError::invalid_parameter("target", "host may not start with '-'"));
        }
        let args = self.args(host, user, key_path, command);
        run_command(&self.binary, &args, None, self.timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_are_batch_mode_and_end_with_command() {
        let ssh = SshCli::new("ssh", Duration::from_secs(10), Duration::from_secs(60));
        let args = ssh.args("10.0.0.5", "ubuntu", "~/.ssh/id_rsa", "sysctl -w fs.file-max=500000");
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"ConnectTimeout=10".to_string()));
        assert_eq!(args[args.len() - 2], "--");
        assert_eq!(args.last().unwrap(), "sysctl -w fs.file-max=500000");
    }

    #[tokio::test]
    async fn option_like_host_rejected() {
        let ssh = SshCli::new("ssh", Duration::from_secs(10), Duration::from_secs(60));
        let err = ssh.exec("-oProxyCommand=x", "ubuntu", "k", "true").await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidParameter { .. }));
    }
}
