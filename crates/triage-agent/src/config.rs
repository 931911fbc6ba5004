//! Agent configuration

use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use triage_lib::{
    config::{
        EngineConfig, DEFAULT_REDEPLOY_RUNBOOK, DEFAULT_RESTART_RUNBOOK, DEFAULT_RISK_TABLE,
        DEFAULT_RISK_THRESHOLD,
    },
    AlertSink, AutomationExecutor, DryRunExecutor, HttpAutomationExecutor, InMemoryStore,
    JsonFileStore, KeyValueStore, LogAlertSink, WebhookAlertSink,
};

/// Environment variable prefix (`TRIAGE_RISK_THRESHOLD`, ...)
pub const ENV_PREFIX: &str = "TRIAGE";

/// Alert sink value selecting the log-only sink
pub const LOG_ALERT_SINK: &str = "log";

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Instance name attached to log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for signal intake, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_risk_table")]
    pub risk_table: String,

    /// `log`, a webhook URL, or unset for no alerts
    #[serde(default)]
    pub alert_sink: Option<String>,

    #[serde(default = "default_risk_threshold")]
    pub risk_threshold: Decimal,

    #[serde(default = "default_restart_runbook")]
    pub restart_runbook: String,

    #[serde(default = "default_redeploy_runbook")]
    pub redeploy_runbook: String,

    #[serde(default)]
    pub automation_role: Option<String>,

    /// Remediation cooldown per resource; 0 disables it
    #[serde(default)]
    pub cooldown_seconds: i64,

    /// JSON-lines log file for the key-value store; in-memory when unset
    #[serde(default)]
    pub store_path: Option<String>,

    /// Automation service base URL; runbooks are only logged when unset
    #[serde(default)]
    pub executor_endpoint: Option<String>,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "triage-agent".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_risk_table() -> String {
    DEFAULT_RISK_TABLE.to_string()
}

fn default_risk_threshold() -> Decimal {
    DEFAULT_RISK_THRESHOLD
}

fn default_restart_runbook() -> String {
    DEFAULT_RESTART_RUNBOOK.to_string()
}

fn default_redeploy_runbook() -> String {
    DEFAULT_REDEPLOY_RUNBOOK.to_string()
}

impl AgentConfig {
    /// Load configuration from `TRIAGE_*` environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> Result<Self> {
        config
            .try_deserialize()
            .context("invalid triage configuration")
    }

    /// Settings consumed by the decision engine
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            risk_table: self.risk_table.clone(),
            risk_threshold: self.risk_threshold,
            restart_runbook: self.restart_runbook.clone(),
            redeploy_runbook: self.redeploy_runbook.clone(),
            automation_role: non_empty(&self.automation_role),
            cooldown_seconds: self.cooldown_seconds,
        }
    }

    /// Open the key-value store named after the risk table
    pub async fn open_store(&self) -> Arc<dyn KeyValueStore> {
        match non_empty(&self.store_path) {
            Some(path) => Arc::new(JsonFileStore::open(&self.risk_table, path).await),
            None => Arc::new(InMemoryStore::new(&self.risk_table)),
        }
    }

    pub fn alert_sink(&self) -> Result<Option<Arc<dyn AlertSink>>> {
        let Some(target) = non_empty(&self.alert_sink) else {
            return Ok(None);
        };

        if target == LOG_ALERT_SINK {
            return Ok(Some(Arc::new(LogAlertSink)));
        }

        let sink = WebhookAlertSink::new(target).context("failed to create webhook alert sink")?;
        Ok(Some(Arc::new(sink)))
    }

    pub fn executor(&self) -> Result<Arc<dyn AutomationExecutor>> {
        match non_empty(&self.executor_endpoint) {
            Some(endpoint) => {
                let executor = HttpAutomationExecutor::new(endpoint)
                    .context("failed to create automation executor")?;
                Ok(Arc::new(executor))
            }
            None => Ok(Arc::new(DryRunExecutor)),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
