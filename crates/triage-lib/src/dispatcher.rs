//! Remediation dispatch
//!
//! Maps a classified target to its runbook and parameters and starts it on
//! the automation executor. No retries happen here.

use std::sync::Arc;

use crate::automation::{AutomationExecutor, RunbookParameters};
use crate::classifier::ClassifiedTarget;
use crate::config::EngineConfig;
use crate::error::{Result, TriageError};

pub const PARAM_INSTANCE_ID: &str = "InstanceId";
pub const PARAM_CLUSTER: &str = "Cluster";
pub const PARAM_SERVICE: &str = "Service";
pub const PARAM_ASSUME_ROLE: &str = "AssumeRole";

/// A runbook invocation ready to be started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunbookRequest {
    pub runbook: String,
    pub parameters: RunbookParameters,
}

/// Starts the runbook matching a target's kind
pub struct RemediationDispatcher {
    executor: Arc<dyn AutomationExecutor>,
    restart_runbook: String,
    redeploy_runbook: String,
    assume_role: Option<String>,
}

impl RemediationDispatcher {
    pub fn new(
        executor: Arc<dyn AutomationExecutor>,
        restart_runbook: impl Into<String>,
        redeploy_runbook: impl Into<String>,
        assume_role: Option<String>,
    ) -> Self {
        Self {
            executor,
            restart_runbook: restart_runbook.into(),
            redeploy_runbook: redeploy_runbook.into(),
            assume_role,
        }
    }

    pub fn from_config(executor: Arc<dyn AutomationExecutor>, config: &EngineConfig) -> Self {
        Self::new(
            executor,
            config.restart_runbook.clone(),
            config.redeploy_runbook.clone(),
            config.automation_role.clone(),
        )
    }

    pub fn runbook_for(&self, target: &ClassifiedTarget) -> Option<&str> {
        match target {
            ClassifiedTarget::ComputeInstance { .. } => Some(&self.restart_runbook),
            ClassifiedTarget::ManagedService { .. } => Some(&self.redeploy_runbook),
            ClassifiedTarget::Unrecognized => None,
        }
    }

    /// Build the runbook request for `target` without starting it
    pub fn plan(&self, target: &ClassifiedTarget) -> Result<RunbookRequest> {
        let role = self
            .assume_role
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| TriageError::Configuration("automation assume-role is not set".to_string()))?;

        let mut parameters = RunbookParameters::new();
        let runbook = match target {
            ClassifiedTarget::ComputeInstance { instance_id } => {
                parameters.insert(PARAM_INSTANCE_ID.to_string(), vec![instance_id.clone()]);
                self.restart_runbook.clone()
            }
            ClassifiedTarget::ManagedService { cluster, service } => {
                parameters.insert(PARAM_CLUSTER.to_string(), vec![cluster.clone()]);
                parameters.insert(PARAM_SERVICE.to_string(), vec![service.clone()]);
                self.redeploy_runbook.clone()
            }
            ClassifiedTarget::Unrecognized => {
                return Err(TriageError::Dispatch(
                    "unrecognized resources have no runbook".to_string(),
                ))
            }
        };
        parameters.insert(PARAM_ASSUME_ROLE.to_string(), vec![role.to_string()]);

        Ok(RunbookRequest {
            runbook,
            parameters,
        })
    }

    /// Start remediation for `target`, returning the automation id
    pub async fn dispatch(&self, target: &ClassifiedTarget) -> Result<String> {
        let request = self.plan(target)?;
        self.executor
            .start_execution(&request.runbook, &request.parameters)
            .await
    }
}
