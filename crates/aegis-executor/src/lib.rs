//! Aegis Executor - turns approved actions into backend calls
//!
//! Each [`ActionType`](aegis_model::ActionType) maps to one
//! [`ActionHandler`] through a [`HandlerTable`]. Handlers reach
//! infrastructure only through the backend seams in [`backend`], with CLI
//! implementations for `kubectl`, `terraform` and `ssh`.
//!
//! # Architecture
//!
//! ```text
//! ActionExecutor ─▶ HandlerTable ─▶ ActionHandler ─▶ ControlPlane / InfraTool
//!       │                                           RemoteShell / Notifier
//!       └── rollback ──────────────────────────────▶ ControlPlane::rollout_undo
//! ```

#![warn(unreachable_pub)]

pub mod backend;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod kubectl;
pub mod process;
pub mod settings;
pub mod ssh;
pub mod table;
pub mod terraform;

pub use backend::{Backends, ControlPlane, InfraTool, Notifier, RemoteShell, ResourceLimits};
pub use error::BackendError;
pub use executor::ActionExecutor;
pub use handlers::ActionHandler;
pub use kubectl::KubectlCli;
pub use process::CommandOutput;
pub use settings::ExecutorSettings;
pub use ssh::SshCli;
pub use table::HandlerTable;
pub use terraform::TerraformCli;
