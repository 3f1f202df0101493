// src/executor/remote.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::{AutotuneError, Result};
use crate::executor::{short_id, ExecutionRequest, ExecutionResult, ExecutionStatus, TrialExecutor};

/// Submits trials to an executor service over HTTP.
pub struct RemoteExecutor {
    client: Client,
    url: String,
    timeout: Duration,
}

/// Lenient view of an executor response. Some deployments nest the result
/// under `experiment_result`, others return it flat.
#[derive(Deserialize)]
struct RemoteResult {
    #[serde(default, alias = "experiment_id")]
    id: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    exit_code: Option<i32>,
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
}

impl RemoteExecutor {
    pub fn new(client: Client, url: String, timeout: Duration) -> Self {
        Self { client, url, timeout }
    }

    fn parse_body(body: serde_json::Value, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let inner = match body {
            serde_json::Value::Object(mut map) => match map.remove("experiment_result") {
                Some(nested @ serde_json::Value::Object(_)) => nested,
                _ => serde_json::Value::Object(map),
            },
            other => {
                return Err(AutotuneError::UnexpectedResponse(format!(
                    "expected a JSON object, got {}",
                    other
                )));
            }
        };
        let remote: RemoteResult = serde_json::from_value(inner)?;

        let status = match remote.status.as_deref() {
            Some("timed_out") | Some("timeout") => ExecutionStatus::TimedOut,
            _ => ExecutionStatus::Completed,
        };

        Ok(ExecutionResult {
            id: remote.id.unwrap_or_else(short_id),
            timestamp: remote
                .timestamp
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
            description: remote
                .description
                .unwrap_or_else(|| request.description.clone()),
            status,
            exit_code: remote.exit_code,
            stdout: remote.stdout.unwrap_or_default(),
            stderr: remote.stderr.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl TrialExecutor for RemoteExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        log::debug!("Submitting '{}' to {}", request.description, self.url);

        let resp = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            return Err(AutotuneError::ApiError { status: status.as_u16(), body });
        }

        let body: serde_json::Value = resp.json().await?;
        Self::parse_body(body, request)
    }
}
