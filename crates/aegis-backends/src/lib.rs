//! Aegis Backends - HTTP implementations of the coordinator's collaborators
//!
//! - [`ChatPlanProducer`]: root-cause analysis from an Ollama-compatible chat API
//! - [`RunbookRetriever`]: runbook context with a built-in fallback set
//! - [`WebhookNotifier`]: Slack-style webhook posts
//!
//! None of these retry. Each call has one deadline and the coordinator
//! supplies the fallback when a call fails.

#![warn(unreachable_pub)]

pub mod chat;
pub mod retrieval;
pub mod webhook;

pub use chat::{user_prompt, ChatPlanProducer, SYSTEM_PROMPT};
pub use retrieval::{builtin_context, RunbookRetriever, BUILTIN_RUNBOOKS, ENTRY_SEPARATOR};
pub use webhook::WebhookNotifier;
