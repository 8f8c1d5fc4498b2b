//! Runbook retrieval client
//!
//! Ranking happens in the retrieval service. When it cannot be reached the
//! client answers from a small built-in runbook set so reasoning still gets
//! some grounding.

use aegis_core::{AegisError, ContextProvider};
use aegis_model::text::truncate_chars;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const SERVICE: &str = "retrieval";

/// Separator between retrieved entries
pub const ENTRY_SEPARATOR: &str = "\n\n---\n\n";

/// Built-in runbook entries, in fallback order
pub const BUILTIN_RUNBOOKS: [&str; 5] = [
    "CrashLoopBackOff Runbook: Pod is restarting repeatedly. \
     Steps: 1) kubectl describe pod <name> to get exit code. \
     2) If OOMKilled, increase memory limits with kubectl patch. \
     3) If config error, check ConfigMap. \
     4) kubectl logs --previous <pod> for last crash output. \
     Root causes: OOMKilled (increase limits), bad env vars (fix ConfigMap), \
     missing secrets (check kubectl get secrets).",
    "OOMKilled Runbook: Container exceeded memory limit and was killed. \
     Fix: kubectl patch deployment <name> with a higher resources.limits.memory (e.g. 2Gi). \
     For MongoDB specifically: increase to 4Gi, also check mongostat for query patterns. \
     Prevention: set resource requests = 70% of limits.",
    "Too Many Open Files / ulimit Runbook: Process hit OS file descriptor limit. \
     Symptoms: 'Too many open files', EMFILE errors in logs. \
     Fix on Linux node: sudo sysctl -w fs.file-max=500000, \
     also edit /etc/security/limits.conf: '* soft nofile 65536' and '* hard nofile 65536'. \
     For Kubernetes: add securityContext or init container to set ulimits.",
    "MongoDB Connection Refused Runbook: App cannot connect to MongoDB. \
     Diagnose: kubectl exec -it mongodb-0 -- mongosh --eval 'db.serverStatus()'. \
     Common causes: 1) MongoDB crashed (check pod status), \
     2) Network policy blocking port 27017, \
     3) Too many connections (check maxIncomingConnections in mongod.conf). \
     Fix: kubectl rollout restart deployment/mongodb. \
     Never expose the MongoDB port externally.",
    "Configuration Drift Runbook: Terraform state differs from actual infra. \
     Diagnose: terraform plan -out=drift.tfplan. \
     Fix: terraform apply drift.tfplan (after human review). \
     Never terraform destroy in production without a backup. \
     Always run terraform plan before apply and review the diff carefully.",
];

/// First `k` built-in entries, joined
#[must_use]
pub fn builtin_context(k: usize) -> String {
    BUILTIN_RUNBOOKS
        .iter()
        .take(k)
        .copied()
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR)
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    k: usize,
    collection: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<String>,
}

/// Client for a `POST {base}/query` retrieval service
#[derive(Debug, Clone)]
pub struct RunbookRetriever {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    query_budget_chars: usize,
}

impl RunbookRetriever {
    /// Create client; queries are cut to `query_budget_chars`
    pub fn new(
        base_url: impl Into<String>,
        collection: impl Into<String>,
        query_budget_chars: usize,
        timeout: Duration,
    ) -> Result<Self, AegisError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AegisError::collaborator(SERVICE, e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            query_budget_chars,
        })
    }

    async fn remote(&self, text: &str, k: usize) -> Result<Vec<String>, AegisError> {
        let request = QueryRequest {
            query: truncate_chars(text, self.query_budget_chars),
            k,
            collection: &self.collection,
        };
        let resp = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| AegisError::collaborator(SERVICE, e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AegisError::collaborator(SERVICE, format!("HTTP {status}")));
        }
        let body: QueryResponse = resp
            .json()
            .await
            .map_err(|e| AegisError::collaborator(SERVICE, e.to_string()))?;
        Ok(body.documents)
    }
}

#[async_trait::async_trait]
impl ContextProvider for RunbookRetriever {
    async fn query(&self, text: &str, k: usize) -> Result<String, AegisError> {
        match self.remote(text, k).await {
            Ok(documents) => {
                debug!(entries = documents.len(), "Runbook context retrieved");
                Ok(documents.into_iter().take(k).collect::<Vec<_>>().join(ENTRY_SEPARATOR))
            }
            Err(e) => {
                warn!(error = %e, "Retrieval service unavailable, using built-in runbooks");
                Ok(builtin_context(k))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_fallback_takes_first_k() {
        let context = builtin_context(3);
        assert_eq!(context.split(ENTRY_SEPARATOR).count(), 3);
        assert!(context.starts_with("CrashLoopBackOff"));
        assert!(!context.contains("Configuration Drift"));
        assert_eq!(builtin_context(99).split(ENTRY_SEPARATOR).count(), 5);
        assert!(builtin_context(0).is_empty());
    }

    #[test]
    fn response_without_documents_is_empty() {
        let body: QueryResponse = serde_json::from_str("{}").unwrap();
        assert!(body.documents.is_empty());
    }
}
