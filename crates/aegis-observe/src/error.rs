//! Error types for metric and log sources

/// Failure querying a metrics or log source
///
/// Callers treat every variant as "no data" and fall back; none is fatal.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Connection, TLS or request timeout
    #[error("source transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("source returned HTTP {0}")]
    Status(u16),

    /// Response body not in the expected format
    #[error("undecodable source response: {0}")]
    Decode(String),

    /// Caller-side deadline elapsed
    #[error("source query timed out")]
    Timeout,
}
