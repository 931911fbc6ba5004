//! Alert delivery for at-risk signals
//!
//! This module provides:
//! - The `AlertSink` publish contract
//! - A log-only sink
//! - An Alertmanager-compatible webhook sink

mod webhook;

pub use webhook::{AlertSeverity, AlertmanagerAlert, AlertmanagerPayload, WebhookAlertSink};

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::Result;

/// Subject line for early outage alerts
pub const ALERT_SUBJECT: &str = "[Triage] Early outage signal";

/// Trait for alert sink implementations
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Publish a structured payload under `subject`
    async fn publish(&self, subject: &str, payload: &Value) -> Result<()>;
}

/// Sink that only writes the alert to the log
#[derive(Debug, Clone, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn publish(&self, subject: &str, payload: &Value) -> Result<()> {
        warn!(event = "alert", subject = %subject, payload = %payload, "Alert raised");
        Ok(())
    }
}
