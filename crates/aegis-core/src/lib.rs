//! Aegis Core - the remediation coordinator
//!
//! Glues detection, reasoning, policy, execution and verification into one
//! single-flight transaction per incident:
//!
//! ```text
//! Incident → context → plan → policy gate → execute → verify → (rollback) → report
//! ```
//!
//! - [`Coordinator`]: the state machine, built from [`CoordinatorParts`]
//! - [`ContextProvider`] / [`PlanProducer`]: narrow seams to external services
//! - [`AegisConfig`]: TOML configuration with environment overrides
//!
//! # Example
//!
//! ```rust
//! use aegis_core::{validate_transition, Phase};
//!
//! assert!(validate_transition(Phase::Idle, Phase::Processing).is_ok());
//! assert!(validate_transition(Phase::Idle, Phase::Done).is_err());
//! ```

#![warn(unreachable_pub)]

pub mod collaborator;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod phase;
pub mod report;
pub mod stats;

pub use aegis_executor::Notifier;
pub use collaborator::{ContextProvider, PlanProducer};
pub use config::AegisConfig;
pub use coordinator::{Coordinator, CoordinatorParts, CoordinatorSettings, Disposition};
pub use error::{AegisError, ConfigError};
pub use phase::{allowed_transitions, validate_transition, Phase, PhaseError};
pub use report::{log_report, render_denial, render_report};
pub use stats::SessionStats;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the coordinator
    pub use crate::{
        AegisConfig, AegisError, ContextProvider, Coordinator, CoordinatorParts, Disposition,
        Notifier, Phase, PlanProducer, SessionStats,
    };
    pub use aegis_model::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
