//! Error types for action backends

use std::time::Duration;

/// Failure reaching or driving an action backend
///
/// A backend error never aborts a batch; the executor turns it into a
/// failed [`ActionResult`](aegis_model::ActionResult) for that action.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Tool binary not installed or not on PATH
    #[error("{0} not found on PATH")]
    ToolMissing(String),

    /// Process could not be started or awaited
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Process exceeded its deadline and was killed
    #[error("{program} timed out after {after:?}")]
    Timeout {
        /// Program name
        program: String,
        /// Deadline that elapsed
        after: Duration,
    },

    /// Action parameter unusable for this backend
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Why it was rejected
        reason: String,
    },
}

impl BackendError {
    /// Create invalid-parameter error
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_display() {
        assert_eq!(
            BackendError::ToolMissing("kubectl".into()).to_string(),
            "kubectl not found on PATH"
        );
        let err = BackendError::invalid_parameter("replicas", "not a number");
        assert!(err.to_string().contains("replicas"));
    }
}
