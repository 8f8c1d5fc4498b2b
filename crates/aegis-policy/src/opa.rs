//! HTTP client for an OPA-style decision service
//!
//! Request: `POST {base}/v1/data/{policy_path}` with `{"input": ...}`.
//! Response: `{"result": {"allow": bool, "denied_actions": [...], "reason": "..."}}`.
//! An absent `result` (undefined policy path) is a denial, not an error.

use crate::error::PolicyError;
use crate::evaluator::{PolicyEvaluator, PolicyInput};
use aegis_model::PolicyVerdict;
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
struct DecisionRequest<'a> {
    input: &'a PolicyInput,
}

/// Decision-service client
#[derive(Debug, Clone)]
pub struct OpaClient {
    client: reqwest::Client,
    base_url: String,
    policy_path: String,
}

impl OpaClient {
    /// Create client with a per-request timeout
    pub fn new(
        base_url: impl Into<String>,
        policy_path: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PolicyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy_path: policy_path.into().trim_matches('/').to_string(),
        })
    }

    /// Decision endpoint
    #[must_use]
    pub fn decision_url(&self) -> String {
        format!("{}/v1/data/{}", self.base_url, self.policy_path)
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}

/// Interpret a decision-service response body
pub fn interpret_decision(body: &serde_json::Value) -> Result<PolicyVerdict, PolicyError> {
    match body.get("result") {
        None | Some(serde_json::Value::Null) => Ok(PolicyVerdict::deny(
            Vec::new(),
            "policy service returned no decision",
        )),
        Some(result) => serde_json::from_value(result.clone())
            .map_err(|e| PolicyError::Decode(e.to_string())),
    }
}

#[async_trait::async_trait]
impl PolicyEvaluator for OpaClient {
    async fn evaluate(&self, input: &PolicyInput) -> Result<PolicyVerdict, PolicyError> {
        let resp = self
            .client
            .post(self.decision_url())
            .json(&DecisionRequest { input })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PolicyError::Status(status.as_u16()));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| PolicyError::Decode(e.to_string()))?;
        interpret_decision(&body)
    }

    async fn health(&self) -> Result<(), PolicyError> {
        let resp = self.client.get(self.health_url()).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PolicyError::Status(status.as_u16()))
        }
    }
}
