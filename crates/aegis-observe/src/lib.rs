//! Aegis Observe - the eyes of the remediation loop
//!
//! - [`Detector`]: polls the error rate and emits an [`Incident`](aegis_model::Incident) on breach
//! - [`OutcomeVerifier`]: bounded wait for the error rate to recover
//! - [`PrometheusSource`] / [`LokiSource`]: HTTP metric and log sources
//! - [`DemoSentinel`]: file toggle that simulates a breach when sources are down

#![warn(unreachable_pub)]

pub mod demo;
pub mod detector;
pub mod error;
pub mod loki;
pub mod prometheus;
pub mod reader;
pub mod source;
pub mod verifier;

pub use demo::{demo_logs, DemoSentinel, DEFAULT_SENTINEL};
pub use detector::{Detector, DetectorSettings, SOURCE_TAG};
pub use error::SourceError;
pub use loki::LokiSource;
pub use prometheus::{PrometheusSource, DEFAULT_ERROR_RATE_QUERY};
pub use reader::ErrorRateReader;
pub use source::{LogSource, MetricsSource};
pub use verifier::{OutcomeVerifier, VerifierSettings};
