//! Aegis Model - shared value types for one remediation transaction
//!
//! Every component of the remediation loop speaks in these types:
//! - [`Incident`]: a detected breach with its supporting log window
//! - [`Action`] / [`ActionType`]: one remediation step from a closed vocabulary
//! - [`Plan`]: root-cause hypothesis plus an ordered, capped list of actions
//! - [`PolicyVerdict`]: all-or-nothing allow/deny over a whole plan
//! - [`ActionResult`]: per-action execution outcome
//! - [`Report`]: terminal artifact of a transaction
//!
//! # Example
//!
//! ```rust
//! use aegis_model::{Plan, MAX_ACTIONS};
//!
//! let plan = Plan::safe_fallback();
//! assert!(plan.actions.is_empty());
//! assert!(plan.actions.len() <= MAX_ACTIONS);
//! ```

#![warn(unreachable_pub)]

pub mod action;
pub mod error;
pub mod incident;
pub mod plan;
pub mod report;
pub mod text;
pub mod verdict;

pub use action::{Action, ActionType, RiskLevel, DEFAULT_NAMESPACE};
pub use error::ModelError;
pub use incident::{Incident, IncidentId, DEFAULT_RAW_LOG_BUDGET};
pub use plan::{Plan, MAX_ACTIONS};
pub use report::{ActionResult, Report};
pub use verdict::PolicyVerdict;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Aegis types
    pub use crate::{
        Action, ActionResult, ActionType, Incident, ModelError, Plan, PolicyVerdict, Report,
        RiskLevel,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
