//! Loki range-query log source

use crate::error::SourceError;
use crate::source::LogSource;
use chrono::Utc;
use std::time::Duration;

/// Recent log lines from a Loki `/loki/api/v1/query_range` endpoint
#[derive(Debug, Clone)]
pub struct LokiSource {
    client: reqwest::Client,
    base_url: String,
    selector: String,
    keep: usize,
}

impl LokiSource {
    /// Create source for `selector`, keeping at most `keep` of the newest lines
    pub fn new(
        base_url: impl Into<String>,
        selector: impl Into<String>,
        keep: usize,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            selector: selector.into(),
            keep,
        })
    }
}

/// Merge all streams by timestamp and keep the newest `keep` lines, oldest first
pub fn parse_streams(body: &serde_json::Value, keep: usize) -> Result<Vec<String>, SourceError> {
    let Some(streams) = body.pointer("/data/result").and_then(|r| r.as_array()) else {
        return Err(SourceError::Decode("missing data.result".to_string()));
    };

    let mut entries: Vec<(u128, String)> = Vec::new();
    for stream in streams {
        let Some(values) = stream.get("values").and_then(|v| v.as_array()) else {
            continue;
        };
        for pair in values {
            let ts = pair
                .get(0)
                .and_then(|t| t.as_str())
                .and_then(|t| t.parse::<u128>().ok())
                .unwrap_or(0);
            if let Some(line) = pair.get(1).and_then(|l| l.as_str()) {
                entries.push((ts, line.to_string()));
            }
        }
    }

    entries.sort_by_key(|(ts, _)| *ts);
    let skip = entries.len().saturating_sub(keep);
    Ok(entries.into_iter().skip(skip).map(|(_, line)| line).collect())
}

#[async_trait::async_trait]
impl LogSource for LokiSource {
    async fn recent_lines(
        &self,
        lookback: Duration,
        limit: usize,
    ) -> Result<Vec<String>, SourceError> {
        let end = Utc::now();
        let lookback =
            chrono::Duration::from_std(lookback).map_err(|e| SourceError::Decode(e.to_string()))?;
        let start = end - lookback;
        let nanos =
            |t: chrono::DateTime<Utc>| t.timestamp_nanos_opt().unwrap_or_default().to_string();

        let resp = self
            .client
            .get(format!("{}/loki/api/v1/query_range", self.base_url))
            .query(&[
                ("query", self.selector.clone()),
                ("start", nanos(start)),
                ("end", nanos(end)),
                ("limit", limit.to_string()),
                ("direction", "backward".to_string()),
            ])
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
        parse_streams(&body, self.keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_streams_chronologically_and_keeps_newest() {
        let body = json!({"data": {"resultType": "streams", "result": [
            {"stream": {"app": "api"}, "values": [["300", "api c"], ["100", "api a"]]},
            {"stream": {"app": "db"}, "values": [["200", "db b"], ["400", "db d"]]}
        ]}});
        assert_eq!(parse_streams(&body, 10).unwrap(), vec!["api a", "db b", "api c", "db d"]);
        assert_eq!(parse_streams(&body, 2).unwrap(), vec!["api c", "db d"]);
    }

    #[test]
    fn empty_result_is_empty() {
        assert!(parse_streams(&json!({"data": {"result": []}}), 50).unwrap().is_empty());
        assert!(parse_streams(&json!({"status": "error"}), 50).is_err());
    }
}
