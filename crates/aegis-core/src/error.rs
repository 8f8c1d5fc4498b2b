//! Error types for Aegis Core
//!
//! Collaborator errors are always recoverable inside a transaction: the
//! coordinator substitutes a defined fallback and carries on. Configuration
//! errors are fatal at startup only.

use crate::phase::PhaseError;
use aegis_model::ModelError;
use std::path::PathBuf;
use std::time::Duration;

/// Main Aegis error type
#[derive(Debug, thiserror::Error)]
pub enum AegisError {
    /// External collaborator unreachable or misbehaving
    #[error("{service} unavailable: {message}")]
    Collaborator {
        /// Which collaborator
        service: &'static str,
        /// What went wrong
        message: String,
    },

    /// Collaborator call exceeded its deadline
    #[error("{service} timed out after {after:?}")]
    Timeout {
        /// Which collaborator
        service: &'static str,
        /// Deadline that elapsed
        after: Duration,
    },

    /// Collaborator output violated the plan schema
    #[error("schema violation: {0}")]
    Schema(#[from] ModelError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Coordinator state machine violated
    #[error(transparent)]
    Phase(#[from] PhaseError),
}

impl AegisError {
    /// Create collaborator error
    pub fn collaborator(service: &'static str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            service,
            message: message.into(),
        }
    }

    /// Check if error is a transient collaborator condition
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Collaborator { .. } | Self::Timeout { .. })
    }
}

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Effective config could not be rendered
    #[error("cannot render config: {0}")]
    Render(#[from] toml::ser::Error),

    /// Value out of range or inconsistent
    #[error("invalid setting {key}: {reason}")]
    Invalid {
        /// Dotted setting name
        key: String,
        /// Why it was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Create invalid-setting error
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(AegisError::collaborator("retrieval", "connection refused").is_transient());
        assert!(AegisError::Timeout {
            service: "reasoning",
            after: Duration::from_secs(120)
        }
        .is_transient());
        assert!(!AegisError::Schema(ModelError::EmptyOutput).is_transient());
    }

    #[test]
    fn error_display() {
        let err = AegisError::collaborator("reasoning", "HTTP 503");
        assert_eq!(err.to_string(), "reasoning unavailable: HTTP 503");

        let err = ConfigError::invalid("metrics.threshold", "must be in (0, 1]");
        assert!(err.to_string().contains("metrics.threshold"));
    }
}
