//! Error types for the data model
//!
//! Model errors are schema violations: a collaborator handed us something
//! that does not conform to the plan contract. They are never repaired by
//! guessing at partial structure.

/// Schema violation while building or validating a model value
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Producer returned nothing usable
    #[error("empty plan output")]
    EmptyOutput,

    /// Output was not valid JSON or did not match the plan schema
    #[error("malformed plan: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Confidence outside the closed unit interval
    #[error("confidence {0} outside [0.0, 1.0]")]
    ConfidenceOutOfRange(f64),

    /// More actions than a plan may carry
    #[error("plan has {count} actions (max: {max})")]
    TooManyActions {
        /// Number of actions found
        count: usize,
        /// Hard cap
        max: usize,
    },

    /// Action with an empty target identifier
    #[error("action {index} has an empty target")]
    EmptyTarget {
        /// Position in the plan
        index: usize,
    },
}
