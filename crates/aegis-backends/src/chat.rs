//! Plan producer backed by an Ollama-compatible chat endpoint

use aegis_core::{AegisError, PlanProducer};
use aegis_model::{Incident, Plan, DEFAULT_RAW_LOG_BUDGET};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

const SERVICE: &str = "reasoning";

/// Instructions sent with every request
pub const SYSTEM_PROMPT: &str = r#"You are Aegis, an expert Site Reliability Engineer.
You analyze infrastructure logs and provide root cause analysis with remediation plans.

CRITICAL RULES:
- Respond with ONLY valid JSON. No markdown, no explanation, no code blocks.
- Never suggest deleting databases, dropping tables, or destroying production resources.
- Never suggest actions with risk_level "high" unless confidence > 0.85.
- Maximum 5 actions. Prefer the least invasive fix first.
- Never suggest exposing ports externally.

Your JSON must exactly match this structure:
{
  "summary": "1-2 sentence plain English summary",
  "root_cause": "technical root cause",
  "affected_components": ["list", "of", "components"],
  "confidence": 0.85,
  "actions": [
    {
      "action_type": "kubectl_restart_pod",
      "target": "mongodb-0",
      "namespace": "default",
      "parameters": {},
      "justification": "why this fixes it",
      "risk_level": "low"
    }
  ],
  "rollback_plan": "how to undo these changes"
}

Valid action_type values: kubectl_restart_pod, kubectl_scale, kubectl_patch_resource_limits, kubectl_exec_command, terraform_apply, ssh_exec_command, notify_slack, no_action
Valid risk_level values: low, medium, high
"#;

/// Per-incident prompt; raw logs are cut to `log_budget` bytes
#[must_use]
pub fn user_prompt(incident: &Incident, context: &str, log_budget: usize) -> String {
    format!(
        "## Alert Summary\n\
         - Timestamp: {}\n\
         - Error Rate: {:.2}%\n\n\
         ## Raw Logs (last 5 minutes)\n{}\n\n\
         ## Relevant Runbook Context\n{}\n\n\
         ## Task\n\
         Analyze the logs, identify the root cause, and produce a remediation plan.\n\
         Respond with ONLY the JSON object, no other text.\n",
        incident.observed().to_rfc3339(),
        incident.error_rate() * 100.0,
        incident.logs_within(log_budget),
        context,
    )
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    format: &'a str,
    stream: bool,
    options: ChatOptions,
}

/// Extract the assistant message from a chat response body
pub fn message_content(body: &serde_json::Value) -> Result<&str, AegisError> {
    body.pointer("/message/content")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| AegisError::collaborator(SERVICE, "response without message.content"))
}

/// Sends incident + context to a chat model and parses the reply as a [`Plan`]
#[derive(Debug, Clone)]
pub struct ChatPlanProducer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    raw_log_budget: usize,
}

impl ChatPlanProducer {
    /// Create producer; `timeout` bounds each request
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AegisError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AegisError::collaborator(SERVICE, e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: 0.1,
            max_tokens: 2048,
            raw_log_budget: DEFAULT_RAW_LOG_BUDGET,
        })
    }

    /// Set sampling temperature
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set response token cap
    #[inline]
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the byte budget for raw logs in the prompt
    #[inline]
    #[must_use]
    pub fn with_raw_log_budget(mut self, bytes: usize) -> Self {
        self.raw_log_budget = bytes;
        self
    }

    /// Model name
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn prompt(&self, incident: &Incident, context: &str) -> String {
        user_prompt(incident, context, self.raw_log_budget)
    }
}

#[async_trait::async_trait]
impl PlanProducer for ChatPlanProducer {
    async fn produce(&self, incident: &Incident, context: &str) -> Result<Plan, AegisError> {
        let prompt = self.prompt(incident, context);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            format: "json",
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        debug!(model = %self.model, "Requesting root cause analysis");
        let resp = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| AegisError::collaborator(SERVICE, e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AegisError::collaborator(SERVICE, format!("HTTP {status}")));
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AegisError::collaborator(SERVICE, e.to_string()))?;

        let plan = Plan::from_llm_output(message_content(&body)?)?;
        info!(
            root_cause = %plan.root_cause,
            confidence = plan.confidence,
            actions = plan.actions.len(),
            "Root cause analysis complete"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prompt_carries_incident() {
        let incident = Incident::new(0.153, "x".repeat(5000), "test");
        let prompt = user_prompt(&incident, "runbook: restart it", DEFAULT_RAW_LOG_BUDGET);
        assert!(prompt.contains("Error Rate: 15.30%"));
        assert!(prompt.contains("runbook: restart it"));
        assert!(!prompt.contains(&"x".repeat(3001)));
        assert!(prompt.contains(&"x".repeat(3000)));
    }

    #[test]
    fn prompt_honours_configured_log_budget() {
        let incident = Incident::new(0.2, "y".repeat(5000), "test");
        let producer =
            ChatPlanProducer::new("http://127.0.0.1:9", "llama3", Duration::from_secs(1))
                .unwrap()
                .with_raw_log_budget(100);
        let prompt = producer.prompt(&incident, "");
        assert!(prompt.contains(&"y".repeat(100)));
        assert!(!prompt.contains(&"y".repeat(101)));
    }

    #[test]
    fn request_shape() {
        let request = ChatRequest {
            model: "llama3",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "s",
                },
                ChatMessage {
                    role: "user",
                    content: "u",
                },
            ],
            format: "json",
            stream: false,
            options: ChatOptions {
                temperature: 0.1,
                num_predict: 2048,
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["format"], "json");
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["num_predict"], 2048);
        assert_eq!(value["messages"][1]["role"], "user");
    }

    #[test]
    fn content_extraction() {
        let body = json!({
            "model": "llama3",
            "message": {"role": "assistant", "content": "{}"},
            "done": true
        });
        assert_eq!(message_content(&body).unwrap(), "{}");
        assert!(message_content(&json!({"error": "model not found"})).is_err());
    }

    #[test]
    fn system_prompt_lists_every_canonical_type() {
        for action_type in aegis_model::ActionType::CANONICAL {
            assert!(SYSTEM_PROMPT.contains(action_type.as_str()), "{action_type}");
        }
    }
}
