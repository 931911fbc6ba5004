//! HTTP client for a runbook automation service

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AutomationExecutor, RunbookParameters};
use crate::error::{Result, TriageError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct StartExecutionRequest<'a> {
    runbook: &'a str,
    parameters: &'a RunbookParameters,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartExecutionResponse {
    #[serde(default)]
    execution_id: Option<String>,
}

/// Starts runbooks through `POST <endpoint>/v1/executions`
pub struct HttpAutomationExecutor {
    client: Client,
    endpoint: String,
}

impl HttpAutomationExecutor {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| TriageError::Configuration(format!("automation HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AutomationExecutor for HttpAutomationExecutor {
    async fn start_execution(&self, runbook: &str, parameters: &RunbookParameters) -> Result<String> {
        let url = format!("{}/v1/executions", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&StartExecutionRequest {
                runbook,
                parameters,
            })
            .send()
            .await
            .map_err(|e| TriageError::Dispatch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TriageError::Dispatch(format!(
                "executor returned {} for {}: {}",
                status, runbook, text
            )));
        }

        let body: StartExecutionResponse = response
            .json()
            .await
            .map_err(|e| TriageError::Dispatch(format!("invalid executor response: {}", e)))?;

        match body.execution_id {
            Some(id) if !id.is_empty() => {
                debug!(runbook = %runbook, execution_id = %id, "Runbook started");
                Ok(id)
            }
            _ => Err(TriageError::Dispatch(format!(
                "executor returned no execution id for {}",
                runbook
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn params() -> RunbookParameters {
        let mut params = RunbookParameters::new();
        params.insert("InstanceId".to_string(), vec!["i-1234".to_string()]);
        params
    }

    #[tokio::test]
    async fn test_start_execution_returns_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/executions")
            .match_body(Matcher::Json(serde_json::json!({
                "runbook": "Restart",
                "parameters": {"InstanceId": ["i-1234"]}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"executionId": "exec-42"}"#)
            .create_async()
            .await;

        let executor = HttpAutomationExecutor::new(format!("{}/", server.url())).unwrap();
        let id = executor.start_execution("Restart", &params()).await.unwrap();

        assert_eq!(id, "exec-42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_dispatch_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/executions")
            .with_status(403)
            .with_body("access denied")
            .create_async()
            .await;

        let executor = HttpAutomationExecutor::new(server.url()).unwrap();
        let err = executor.start_execution("Restart", &params()).await.unwrap_err();

        assert!(matches!(err, TriageError::Dispatch(ref msg) if msg.contains("403")));
    }

    #[tokio::test]
    async fn test_missing_execution_id_is_dispatch_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/executions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"executionId": ""}"#)
            .create_async()
            .await;

        let executor = HttpAutomationExecutor::new(server.url()).unwrap();
        let err = executor.start_execution("Restart", &params()).await.unwrap_err();

        assert!(matches!(err, TriageError::Dispatch(_)));
    }
}
