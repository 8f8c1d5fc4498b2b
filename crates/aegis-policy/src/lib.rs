//! Aegis Policy - the gate between a plan and live infrastructure
//!
//! A [`PolicyGate`] submits the full action set of a plan, together with the
//! incident context, to a remote decision service. When that service cannot
//! be reached the gate degrades to [`LocalRules`], a fixed conservative rule
//! set. Either way the verdict is atomic: one denied action denies the plan.
//!
//! ```rust
//! use aegis_model::{Action, ActionType, Plan, RiskLevel};
//! use aegis_policy::LocalRules;
//!
//! let mut plan = Plan::safe_fallback();
//! plan.actions.push(Action::new(ActionType::ScaleWorkload, "api").with_risk(RiskLevel::High));
//! assert!(!LocalRules::default().evaluate(&plan.actions).allow);
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod evaluator;
pub mod gate;
pub mod local;
pub mod opa;

pub use error::PolicyError;
pub use evaluator::{PolicyContext, PolicyEvaluator, PolicyInput};
pub use gate::{GateMode, PolicyGate, DEFAULT_REMOTE_TIMEOUT};
pub use local::LocalRules;
pub use opa::{interpret_decision, OpaClient};
