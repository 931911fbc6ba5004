//! Core library for incident triage
//!
//! This crate provides the core functionality for:
//! - Risk scoring of health signals
//! - Resource classification and runbook dispatch
//! - Per-resource remediation cooldown
//! - Alert publishing and audit persistence
//! - Health checks and observability

pub mod alert;
pub mod automation;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod cooldown;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod scoring;
pub mod store;

pub use alert::{AlertSink, LogAlertSink, WebhookAlertSink, ALERT_SUBJECT};
pub use automation::{AutomationExecutor, DryRunExecutor, HttpAutomationExecutor, RunbookParameters};
pub use classifier::{classify, ClassifiedTarget};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use cooldown::CooldownGate;
pub use dispatcher::RemediationDispatcher;
pub use engine::{DecisionEngine, DecisionEngineBuilder};
pub use error::{Result, TriageError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{StructuredLogger, TriageMetrics};
pub use scoring::{score, RiskScore};
pub use store::{InMemoryStore, JsonFileStore, KeyValueStore};
