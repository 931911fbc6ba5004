//! Remote runbook execution
//!
//! This module provides:
//! - The `AutomationExecutor` start-execution contract
//! - An HTTP executor client
//! - A dry-run executor that only logs

mod http;

pub use http::HttpAutomationExecutor;

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;

/// Runbook parameters: each name maps to a list of values
pub type RunbookParameters = BTreeMap<String, Vec<String>>;

/// Trait for automation executor implementations
#[async_trait]
pub trait AutomationExecutor: Send + Sync {
    /// Start `runbook` and return the remote execution id
    async fn start_execution(&self, runbook: &str, parameters: &RunbookParameters) -> Result<String>;
}

/// Executor that logs the request and returns a synthetic execution id
#[derive(Debug, Clone, Default)]
pub struct DryRunExecutor;

#[async_trait]
impl AutomationExecutor for DryRunExecutor {
    async fn start_execution(&self, runbook: &str, parameters: &RunbookParameters) -> Result<String> {
        let execution_id = format!("dry-run-{}", time_hex());
        info!(
            event = "dry_run_execution",
            runbook = %runbook,
            parameters = ?parameters,
            execution_id = %execution_id,
            "Dry run: runbook not started"
        );
        Ok(execution_id)
    }
}

fn time_hex() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{:x}{:08x}", now.as_secs(), now.subsec_nanos())
}
