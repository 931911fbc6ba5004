//! Engine configuration
//!
//! Every recognized option lives here and is handed to the engine at
//! construction. Loading from the environment is the binary's job.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RISK_TABLE: &str = "triage_risk";
pub const DEFAULT_RESTART_RUNBOOK: &str = "Triage-RestartComputeInstance";
pub const DEFAULT_REDEPLOY_RUNBOOK: &str = "Triage-RedeployManagedService";

/// 0.75
pub const DEFAULT_RISK_THRESHOLD: Decimal = Decimal::from_parts(75, 0, 0, false, 2);

/// Decision engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Name of the table holding risk records and cooldown entries
    #[serde(default = "default_risk_table")]
    pub risk_table: String,

    /// Risk at or above this value alerts and is eligible for remediation
    #[serde(default = "default_risk_threshold")]
    pub risk_threshold: Decimal,

    /// Runbook invoked for compute instances
    #[serde(default = "default_restart_runbook")]
    pub restart_runbook: String,

    /// Runbook invoked for managed services
    #[serde(default = "default_redeploy_runbook")]
    pub redeploy_runbook: String,

    /// Role the automation assumes; required for any dispatch
    #[serde(default)]
    pub automation_role: Option<String>,

    /// Cooldown window per resource; zero or negative disables it
    #[serde(default)]
    pub cooldown_seconds: i64,
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

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_table: default_risk_table(),
            risk_threshold: default_risk_threshold(),
            restart_runbook: default_restart_runbook(),
            redeploy_runbook: default_redeploy_runbook(),
            automation_role: None,
            cooldown_seconds: 0,
        }
    }
}

impl EngineConfig {
    pub fn cooldown_enabled(&self) -> bool {
        self.cooldown_seconds > 0
    }

    /// Cooldown window, or `None` when disabled
    pub fn cooldown_window(&self) -> Option<Duration> {
        self.cooldown_enabled()
            .then(|| Duration::from_secs(self.cooldown_seconds as u64))
    }

    pub fn with_threshold(mut self, threshold: Decimal) -> Self {
        self.risk_threshold = threshold;
        self
    }

    pub fn with_automation_role(mut self, role: impl Into<String>) -> Self {
        self.automation_role = Some(role.into());
        self
    }

    pub fn with_cooldown_seconds(mut self, seconds: i64) -> Self {
        self.cooldown_seconds = seconds;
        self
    }
}
