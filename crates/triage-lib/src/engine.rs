//! Per-signal decision pipeline
//!
//! Each signal is scored, persisted as a [`RiskRecord`], optionally alerted
//! on, and, when at risk and outside its cooldown window, remediated through
//! the runbook matching its resource type. Signals in a batch are handled
//! sequentially and no collaborator failure aborts the batch: every input
//! yields exactly one [`RemediationOutcome`], in input order.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::alert::{AlertSink, ALERT_SUBJECT};
use crate::automation::AutomationExecutor;
use crate::classifier::{classify, ClassifiedTarget};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::cooldown::CooldownGate;
use crate::dispatcher::RemediationDispatcher;
use crate::error::{Result, TriageError};
use crate::health::{components, HealthRegistry};
use crate::models::{BatchResponse, Invocation, RemediationOutcome, RiskRecord, Signal};
use crate::observability::{StructuredLogger, TriageMetrics};
use crate::scoring::{score, RiskScore};
use crate::store::KeyValueStore;

const DEFAULT_INSTANCE: &str = "triage";

/// Decision engine wiring the scorer, store, alert sink, cooldown gate and
/// dispatcher together
pub struct DecisionEngine {
    config: EngineConfig,
    store: Arc<dyn KeyValueStore>,
    alert_sink: Option<Arc<dyn AlertSink>>,
    dispatcher: RemediationDispatcher,
    cooldown: CooldownGate,
    clock: Arc<dyn Clock>,
    health: HealthRegistry,
    metrics: TriageMetrics,
    logger: StructuredLogger,
}

impl DecisionEngine {
    pub fn builder() -> DecisionEngineBuilder {
        DecisionEngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Handle one invocation (single event or batch)
    pub async fn handle(&self, invocation: Invocation) -> BatchResponse {
        BatchResponse::new(self.process_batch(invocation.into_signals()).await)
    }

    /// Process signals in order, one outcome per signal
    pub async fn process_batch(&self, signals: Vec<Signal>) -> Vec<RemediationOutcome> {
        let start = Instant::now();
        let mut outcomes = Vec::with_capacity(signals.len());

        for signal in signals {
            outcomes.push(self.process_signal(signal).await);
        }

        let started = outcomes.iter().filter(|o| o.auto_heal_started).count();
        self.metrics
            .observe_batch_latency(start.elapsed().as_secs_f64());
        self.logger
            .log_batch_complete(outcomes.len(), started, start.elapsed().as_millis());

        outcomes
    }

    /// Run the full pipeline for a single signal
    pub async fn process_signal(&self, signal: Signal) -> RemediationOutcome {
        self.metrics.inc_signals_processed();

        let resource = signal.resource_id.clone();
        let risk = score(
            signal.latency_ms,
            signal.error_rate_pct,
            signal.nxdomain_anomaly,
        );
        let at_risk = risk.meets(self.config.risk_threshold);
        self.logger.log_risk_scored(&resource, risk, at_risk);

        let record = RiskRecord::new(&signal, risk, self.clock.now());
        match serde_json::to_value(&record) {
            Ok(payload) => {
                self.persist(&record.id, &resource, payload.clone()).await;
                if at_risk {
                    self.alert(&resource, risk, &payload).await;
                }
            }
            Err(e) => {
                let e = TriageError::from(e);
                self.logger
                    .log_stage_failure(&resource, "encode", &e.to_string());
            }
        }

        if !at_risk {
            return RemediationOutcome::skipped(resource, risk);
        }

        if !self.cooldown.is_clear(&resource).await {
            self.metrics.inc_cooldown_suppressed();
            self.logger
                .log_remediation_skipped(&resource, "cooldown active");
            return RemediationOutcome::skipped(resource, risk);
        }

        let target = classify(&resource);
        if !target.is_remediable() {
            self.logger
                .log_remediation_skipped(&resource, "unrecognized resource type");
            return RemediationOutcome::skipped(resource, risk);
        }

        match self.remediate(&resource, &target).await {
            Ok(automation_id) => RemediationOutcome::started(resource, risk, automation_id),
            Err(_) => RemediationOutcome::skipped(resource, risk),
        }
    }

    async fn persist(&self, key: &str, resource: &str, payload: Value) {
        match self.store.put(key, payload).await {
            Ok(()) => self.health.record_success(components::STORE).await,
            Err(e) => {
                self.metrics.inc_storage_errors();
                self.health
                    .record_failure(components::STORE, e.to_string())
                    .await;
                self.logger
                    .log_stage_failure(resource, "persist", &e.to_string());
            }
        }
    }

    async fn alert(&self, resource: &str, risk: RiskScore, payload: &Value) {
        let Some(sink) = &self.alert_sink else {
            return;
        };

        match sink.publish(ALERT_SUBJECT, payload).await {
            Ok(()) => {
                self.metrics.inc_alerts_published();
                self.health.record_success(components::ALERT_SINK).await;
                self.logger
                    .log_alert_published(resource, risk, ALERT_SUBJECT);
            }
            Err(e) => {
                self.metrics.inc_alert_failures();
                self.health
                    .record_failure(components::ALERT_SINK, e.to_string())
                    .await;
                self.logger
                    .log_stage_failure(resource, "alert", &e.to_string());
            }
        }
    }

    async fn remediate(&self, resource: &str, target: &ClassifiedTarget) -> Result<String> {
        let start = Instant::now();
        let result = self.dispatcher.dispatch(target).await;
        self.metrics
            .observe_dispatch_latency(start.elapsed().as_secs_f64());

        match result {
            Ok(automation_id) => {
                self.metrics.inc_remediations_started();
                self.health.record_success(components::EXECUTOR).await;
                self.logger.log_remediation_started(
                    resource,
                    target.kind(),
                    self.dispatcher.runbook_for(target).unwrap_or_default(),
                    &automation_id,
                );
                self.cooldown.arm(resource).await;
                Ok(automation_id)
            }
            Err(e) => {
                self.metrics.inc_remediation_failures();
                if matches!(e, TriageError::Dispatch(_)) {
                    self.health
                        .record_failure(components::EXECUTOR, e.to_string())
                        .await;
                }
                self.logger
                    .log_stage_failure(resource, "dispatch", &e.to_string());
                Err(e)
            }
        }
    }
}

/// Builder for [`DecisionEngine`]
pub struct DecisionEngineBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    alert_sink: Option<Arc<dyn AlertSink>>,
    executor: Option<Arc<dyn AutomationExecutor>>,
    clock: Option<Arc<dyn Clock>>,
    health: Option<HealthRegistry>,
    instance: String,
}

impl DecisionEngineBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            store: None,
            alert_sink: None,
            executor: None,
            clock: None,
            health: None,
            instance: DEFAULT_INSTANCE.to_string(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the key-value store used for risk records and cooldown entries
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the alert sink; without one no alerts are published
    pub fn alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alert_sink = Some(sink);
        self
    }

    /// Set the automation executor
    pub fn executor(mut self, executor: Arc<dyn AutomationExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Set the time source (defaults to the system clock)
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Set the instance name attached to log events
    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<DecisionEngine> {
        let store = self
            .store
            .ok_or_else(|| TriageError::Configuration("Store is required".to_string()))?;
        let executor = self
            .executor
            .ok_or_else(|| TriageError::Configuration("Executor is required".to_string()))?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let health = self.health.unwrap_or_default();

        let cooldown = CooldownGate::new(store.clone(), clock.clone(), self.config.cooldown_seconds)
            .with_health(health.clone());
        let dispatcher = RemediationDispatcher::from_config(executor, &self.config);

        Ok(DecisionEngine {
            config: self.config,
            store,
            alert_sink: self.alert_sink,
            dispatcher,
            cooldown,
            clock,
            health,
            metrics: TriageMetrics::new(),
            logger: StructuredLogger::new(self.instance),
        })
    }
}

impl Default for DecisionEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
