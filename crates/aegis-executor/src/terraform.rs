//! `terraform`-backed infrastructure tool

use crate::backend::InfraTool;
use crate::error::BackendError;
use crate::process::{run_command, CommandOutput};
use std::path::Path;
use std::time::Duration;

/// Saved plan file written by [`InfraTool::plan`]
pub const PLAN_FILE: &str = "aegis.tfplan";

/// Infrastructure tool driven through the `terraform` CLI
#[derive(Debug, Clone)]
pub struct TerraformCli {
    binary: String,
    timeout: Duration,
}

impl TerraformCli {
    /// Create client for `binary`
    #[must_use]
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl InfraTool for TerraformCli {
    async fn plan(&self, dir: &Path) -> Result<CommandOutput, BackendError> {
        let args = vec![
            "plan".to_string(),
            "-input=false".to_string(),
            format!("-out={PLAN_FILE}"),
        ];
        run_command(&self.binary, &args, Some(dir), self.timeout).await
    }

    async fn apply(&self, dir: &Path) -> Result<CommandOutput, BackendError> {
        let args = vec![
            "apply".to_string(),
            "-input=false".to_string(),
            "-auto-approve".to_string(),
            PLAN_FILE.to_string(),
        ];
        run_command(&self.binary, &args, Some(dir), self.timeout).await
    }
}
