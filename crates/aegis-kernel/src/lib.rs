//! Aegis Kernel - the `aegisd` daemon
//!
//! Loads configuration, installs tracing, wires the HTTP and CLI backends
//! into a [`aegis_core::Coordinator`], and drives it from the detector until
//! shutdown.

#![warn(unreachable_pub)]

pub mod app;
pub mod cli;
pub mod telemetry;

pub use app::{build, App};
pub use cli::{Cli, CliCommand, DEFAULT_CONFIG};
