//! Alertmanager-compatible webhook sink
//!
//! Wraps the published risk record in a single firing alert and POSTs it to
//! the configured alert sink URL.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::AlertSink;
use crate::error::{Result, TriageError};

const ALERT_NAME: &str = "EarlyOutageSignal";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl AlertSeverity {
    /// Maximum risk is critical, anything else above threshold is a warning
    pub fn for_risk(risk: f64) -> Self {
        if risk >= 1.0 {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Alertmanager webhook alert format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertmanagerAlert {
    /// Alert status (firing or resolved)
    pub status: String,
    /// Alert labels for routing and grouping
    pub labels: HashMap<String, String>,
    /// Alert annotations with details
    pub annotations: HashMap<String, String>,
    /// Start time in RFC3339 format
    pub starts_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_url: Option<String>,
}

/// Alertmanager webhook payload (array of alerts)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertmanagerPayload {
    pub alerts: Vec<AlertmanagerAlert>,
}

impl AlertmanagerAlert {
    /// Build a firing alert from a published risk record
    pub fn from_record(subject: &str, record: &Value) -> Self {
        let resource = record
            .get("resource")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let risk = record.get("risk").and_then(Value::as_f64).unwrap_or_default();
        let starts_at = record
            .get("ts")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));

        let mut labels = HashMap::new();
        labels.insert("alertname".to_string(), ALERT_NAME.to_string());
        labels.insert(
            "severity".to_string(),
            AlertSeverity::for_risk(risk).to_string(),
        );
        labels.insert("resource".to_string(), resource.clone());

        let mut annotations = HashMap::new();
        annotations.insert("summary".to_string(), subject.to_string());
        annotations.insert(
            "description".to_string(),
            format!("Resource {} scored risk {:.2}", resource, risk),
        );
        annotations.insert("risk".to_string(), format!("{:.2}", risk));
        annotations.insert("record".to_string(), record.to_string());

        Self {
            status: "firing".to_string(),
            labels,
            annotations,
            starts_at,
            ends_at: None,
            generator_url: None,
        }
    }
}

/// Sink that POSTs Alertmanager payloads to a webhook URL
pub struct WebhookAlertSink {
    client: Client,
    url: String,
}

impl WebhookAlertSink {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| TriageError::Configuration(format!("alert HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn publish(&self, subject: &str, payload: &Value) -> Result<()> {
        let body = AlertmanagerPayload {
            alerts: vec![AlertmanagerAlert::from_record(subject, payload)],
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TriageError::Publish(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TriageError::Publish(format!("webhook returned {}: {}", status, text)));
        }

        debug!(url = %self.url, "Alert delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(risk: f64) -> Value {
        json!({
            "id": "i-1234-2024-01-01T00:00:00.000000Z",
            "resource": "i-1234",
            "latency_ms": 250.0,
            "error_rate_pct": 2.0,
            "nxdomain_anomaly": false,
            "risk": risk,
            "ts": "2024-01-01T00:00:00Z"
        })
    }

    #[test]
    fn test_alert_from_record() {
        let alert = AlertmanagerAlert::from_record("subject", &record(0.9));

        assert_eq!(alert.status, "firing");
        assert_eq!(alert.labels["alertname"], ALERT_NAME);
        assert_eq!(alert.labels["severity"], "warning");
        assert_eq!(alert.labels["resource"], "i-1234");
        assert_eq!(alert.annotations["risk"], "0.90");
        assert_eq!(alert.starts_at, "2024-01-01T00:00:00Z");
        assert!(alert.annotations["record"].contains("latency_ms"));
    }

    #[test]
    fn test_max_risk_is_critical() {
        let alert = AlertmanagerAlert::from_record("subject", &record(1.0));
        assert_eq!(alert.labels["severity"], "critical");
    }

    #[tokio::test]
    async fn test_publish_posts_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/alerts")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::Regex(r#""status":"firing""#.to_string()),
                mockito::Matcher::Regex(r#""resource":"i-1234""#.to_string()),
            ]))
            .with_status(200)
            .create_async()
            .await;

        let sink = WebhookAlertSink::new(format!("{}/alerts", server.url())).unwrap();
        sink.publish("subject", &record(0.9)).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_publish_rejects_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/alerts")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let sink = WebhookAlertSink::new(format!("{}/alerts", server.url())).unwrap();
        let err = sink.publish("subject", &record(0.9)).await.unwrap_err();

        assert!(matches!(err, TriageError::Publish(_)));
    }
}
