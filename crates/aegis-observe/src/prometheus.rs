//! Prometheus instant-query source

use crate::error::SourceError;
use crate::source::MetricsSource;
use std::time::Duration;

/// 5xx share of all HTTP requests over five minutes
pub const DEFAULT_ERROR_RATE_QUERY: &str =
    "sum(rate(http_requests_total{status=~'5..'}[5m])) / sum(rate(http_requests_total[5m]))";

/// Error ratio from a Prometheus `/api/v1/query` endpoint
#[derive(Debug, Clone)]
pub struct PrometheusSource {
    client: reqwest::Client,
    base_url: String,
    query: String,
}

impl PrometheusSource {
    /// Create source for `base_url` running `query`
    pub fn new(
        base_url: impl Into<String>,
        query: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            query: query.into(),
        })
    }
}

/// Extract the first sample of an instant-vector response
///
/// An empty result or a `NaN` sample (no traffic) is "no data".
pub fn parse_instant_vector(body: &serde_json::Value) -> Result<Option<f64>, SourceError> {
    let Some(result) = body.pointer("/data/result").and_then(|r| r.as_array()) else {
        return Err(SourceError::Decode("missing data.result".to_string()));
    };
    let Some(first) = result.first() else {
        return Ok(None);
    };
    let raw = first
        .pointer("/value/1")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SourceError::Decode("sample without value".to_string()))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| SourceError::Decode(format!("non-numeric sample: {raw}")))?;
    Ok((!value.is_nan()).then_some(value))
}

#[async_trait::async_trait]
impl MetricsSource for PrometheusSource {
    async fn error_rate(&self) -> Result<Option<f64>, SourceError> {
        let resp = self
            .client
            .get(format!("{}/api/v1/query", self.base_url))
            .query(&[("query", self.query.as_str())])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;
        parse_instant_vector(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_first_sample() {
        let body = json!({"status": "success", "data": {"resultType": "vector",
            "result": [{"metric": {}, "value": [1_700_000_000.0, "0.153"]}]}});
        assert_eq!(parse_instant_vector(&body).unwrap(), Some(0.153));
    }

    #[test]
    fn empty_and_nan_are_no_data() {
        let empty = json!({"data": {"result": []}});
        assert_eq!(parse_instant_vector(&empty).unwrap(), None);

        let nan = json!({"data": {"result": [{"value": [1.0, "NaN"]}]}});
        assert_eq!(parse_instant_vector(&nan).unwrap(), None);
    }

    #[test]
    fn malformed_is_decode_error() {
        assert!(matches!(parse_instant_vector(&json!({})), Err(SourceError::Decode(_))));
        let bad = json!({"data": {"result": [{"value": [1.0, "high"]}]}});
        assert!(matches!(parse_instant_vector(&bad), Err(SourceError::Decode(_))));
    }
}
