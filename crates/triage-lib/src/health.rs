//! Health check infrastructure for the triage service
//!
//! Tracks each external collaborator (store, alert sink, automation
//! executor). A failing collaborator is degraded on its first failure and
//! unhealthy after a run of consecutive failures; one success restores it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consecutive failures after which a collaborator is reported unhealthy
pub const DEFAULT_UNHEALTHY_AFTER: u32 = 5;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Recent failures, still serving
    Degraded,
    /// Failing persistently
    Unhealthy,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Healthy => "healthy",
            ComponentStatus::Degraded => "degraded",
            ComponentStatus::Unhealthy => "unhealthy",
        }
    }

    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Health of one collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            last_error: None,
            consecutive_failures: 0,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    fn failed(previous: Option<&ComponentHealth>, error: String, unhealthy_after: u32) -> Self {
        let consecutive_failures = previous.map_or(0, |h| h.consecutive_failures) + 1;
        let status = if consecutive_failures >= unhealthy_after {
            ComponentStatus::Unhealthy
        } else {
            ComponentStatus::Degraded
        };

        Self {
            status,
            last_error: Some(error),
            consecutive_failures,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across all components
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|h| h.status)
            .fold(ComponentStatus::Healthy, |worst, s| match (worst, s) {
                (ComponentStatus::Unhealthy, _) | (_, ComponentStatus::Unhealthy) => {
                    ComponentStatus::Unhealthy
                }
                (ComponentStatus::Degraded, _) | (_, ComponentStatus::Degraded) => {
                    ComponentStatus::Degraded
                }
                _ => ComponentStatus::Healthy,
            })
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const STORE: &str = "store";
    pub const ALERT_SINK: &str = "alert_sink";
    pub const EXECUTOR: &str = "executor";

    pub const ALL: [&str; 3] = [STORE, ALERT_SINK, EXECUTOR];
}

/// Shared registry of collaborator health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
    unhealthy_after: u32,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
            unhealthy_after: DEFAULT_UNHEALTHY_AFTER,
        }
    }

    pub fn with_unhealthy_after(mut self, failures: u32) -> Self {
        self.unhealthy_after = failures.max(1);
        self
    }

    /// Register every collaborator as healthy
    pub async fn register_all(&self) {
        let mut components = self.components.write().await;
        for name in components::ALL {
            components.insert(name.to_string(), ComponentHealth::healthy());
        }
    }

    /// A call to `name` succeeded
    pub async fn record_success(&self, name: &str) {
        {
            let components = self.components.read().await;
            if components
                .get(name)
                .is_some_and(|h| h.status == ComponentStatus::Healthy)
            {
                return;
            }
        }
        let mut components = self.components.write().await;
        components.insert(name.to_string(), ComponentHealth::healthy());
    }

    /// A call to `name` failed
    pub async fn record_failure(&self, name: &str, error: impl Into<String>) {
        let mut components = self.components.write().await;
        let next = ComponentHealth::failed(components.get(name), error.into(), self.unhealthy_after);
        components.insert(name.to_string(), next);
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Ready once initialized and while no collaborator is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        if !*self.ready.read().await {
            return ReadinessResponse {
                ready: false,
                reason: Some("Service not yet initialized".to_string()),
            };
        }

        let health = self.health().await;
        let failing: Vec<&str> = health
            .components
            .iter()
            .filter(|(_, h)| h.status == ComponentStatus::Unhealthy)
            .map(|(name, _)| name.as_str())
            .collect();

        if failing.is_empty() {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some(format!("Unhealthy components: {}", failing.join(", "))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_register_all_components() {
        let registry = HealthRegistry::new();
        registry.register_all().await;

        let health = registry.health().await;
        assert_eq!(health.components.len(), 3);
        assert_eq!(
            health.components[components::ALERT_SINK].status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_first_failure_degrades() {
        let registry = HealthRegistry::new();
        registry.register_all().await;
        registry.record_failure(components::STORE, "write failed").await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(health.components[components::STORE].consecutive_failures, 1);
        assert_eq!(
            health.components[components::STORE].last_error.as_deref(),
            Some("write failed")
        );
    }

    #[tokio::test]
    async fn test_repeated_failures_become_unhealthy() {
        let registry = HealthRegistry::new().with_unhealthy_after(3);
        registry.register_all().await;
        registry.set_ready(true).await;

        for _ in 0..3 {
            registry.record_failure(components::EXECUTOR, "timeout").await;
        }

        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.unwrap().contains(components::EXECUTOR));
    }

    #[tokio::test]
    async fn test_success_restores_component() {
        let registry = HealthRegistry::new();
        registry.register_all().await;
        registry.record_failure(components::EXECUTOR, "timeout").await;
        registry.record_success(components::EXECUTOR).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.components[components::EXECUTOR].consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_readiness_requires_initialization() {
        let registry = HealthRegistry::new();
        assert!(!registry.readiness().await.ready);

        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_degraded_is_still_ready() {
        let registry = HealthRegistry::new();
        registry.register_all().await;
        registry.set_ready(true).await;
        registry.record_failure(components::ALERT_SINK, "503").await;

        assert!(registry.readiness().await.ready);
        assert!(registry.health().await.status.is_operational());
    }
}
