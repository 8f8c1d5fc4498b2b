//! Error types for remote policy evaluation

/// Failure talking to the remote decision service
///
/// Every variant is recoverable: the gate answers with local rules instead.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Connection, TLS or request timeout
    #[error("policy service transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("policy service returned HTTP {0}")]
    Status(u16),

    /// Response body did not match the decision format
    #[error("undecodable policy decision: {0}")]
    Decode(String),

    /// Gate-level deadline elapsed
    #[error("policy evaluation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl PolicyError {
    /// Whether the service was never reached
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        match self {
            PolicyError::Transport(e) => e.is_connect() || e.is_timeout(),
            PolicyError::Timeout(_) => true,
            PolicyError::Status(_) | PolicyError::Decode(_) => false,
        }
    }
}
