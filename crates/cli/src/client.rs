//! API client for communicating with the triage agent

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

/// API client for the triage agent
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request and return the status alongside the parsed body
    ///
    /// Health endpoints answer 503 with a JSON body, so any status whose body
    /// parses is returned to the caller.
    pub async fn get_with_status<T: DeserializeOwned>(&self, path: &str) -> Result<(StatusCode, T)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read response")?;

        match serde_json::from_str(&body) {
            Ok(parsed) => Ok((status, parsed)),
            Err(_) if !status.is_success() => anyhow::bail!("API error ({}): {}", status, body),
            Err(e) => Err(e).context("Failed to parse response"),
        }
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use triage_lib::{BatchResponse, HealthResponse};

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_post_signals() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/signals")
            .match_body(mockito::Matcher::Json(json!({"detail": {"resourceId": "i-1"}})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"ok": true, "results": [{"resource": "i-1", "risk": 0.0, "autoHealStarted": false, "automationId": null}]}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response: BatchResponse = client
            .post("v1/signals", &json!({"detail": {"resourceId": "i-1"}}))
            .await
            .unwrap();

        assert!(response.ok);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].resource, "i-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/signals")
            .with_status(422)
            .with_body("unprocessable")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let result: Result<Value> = client.post("v1/signals", &json!(42)).await;

        let err = result.unwrap_err().to_string();
        assert!(err.contains("422"));
    }

    #[tokio::test]
    async fn test_get_with_status_accepts_unavailable_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/healthz")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "unhealthy", "components": {}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let (status, health): (StatusCode, HealthResponse) =
            client.get_with_status("healthz").await.unwrap();

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(health.status, triage_lib::ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_get_with_status_rejects_non_json_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/healthz")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let result: Result<(StatusCode, HealthResponse)> = client.get_with_status("healthz").await;

        assert!(result.unwrap_err().to_string().contains("502"));
    }
}
