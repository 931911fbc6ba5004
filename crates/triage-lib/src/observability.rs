//! Observability infrastructure for the triage engine
//!
//! Provides:
//! - Prometheus metrics (signals, alerts, remediations, cooldown suppressions, storage errors)
//! - Structured JSON logging with tracing

use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::scoring::RiskScore;

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<TriageMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct TriageMetricsInner {
    batch_latency_seconds: Histogram,
    dispatch_latency_seconds: Histogram,
    signals_processed: IntCounter,
    alerts_published: IntCounter,
    alert_failures: IntCounter,
    remediations_started: IntCounter,
    remediation_failures: IntCounter,
    cooldown_suppressed: IntCounter,
    storage_errors: IntCounter,
}

impl TriageMetricsInner {
    fn new() -> Self {
        Self {
            batch_latency_seconds: register_histogram!(
                "triage_batch_latency_seconds",
                "Time spent processing one invocation batch",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register batch_latency_seconds"),

            dispatch_latency_seconds: register_histogram!(
                "triage_dispatch_latency_seconds",
                "Time spent starting a remediation runbook",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register dispatch_latency_seconds"),

            signals_processed: register_int_counter!(
                "triage_signals_processed_total",
                "Total number of signals scored"
            )
            .expect("Failed to register signals_processed"),

            alerts_published: register_int_counter!(
                "triage_alerts_published_total",
                "Total number of alerts delivered to the alert sink"
            )
            .expect("Failed to register alerts_published"),

            alert_failures: register_int_counter!(
                "triage_alert_failures_total",
                "Total number of alerts the sink failed to deliver"
            )
            .expect("Failed to register alert_failures"),

            remediations_started: register_int_counter!(
                "triage_remediations_started_total",
                "Total number of remediation runbooks started"
            )
            .expect("Failed to register remediations_started"),

            remediation_failures: register_int_counter!(
                "triage_remediation_failures_total",
                "Total number of remediation dispatch failures"
            )
            .expect("Failed to register remediation_failures"),

            cooldown_suppressed: register_int_counter!(
                "triage_cooldown_suppressed_total",
                "Total number of remediations suppressed by an active cooldown"
            )
            .expect("Failed to register cooldown_suppressed"),

            storage_errors: register_int_counter!(
                "triage_storage_errors_total",
                "Total number of key-value store read or write failures"
            )
            .expect("Failed to register storage_errors"),
        }
    }
}

/// Triage metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct TriageMetrics {
    _private: (),
}

impl Default for TriageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TriageMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(TriageMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &TriageMetricsInner {
        GLOBAL_METRICS.get_or_init(TriageMetricsInner::new)
    }

    pub fn observe_batch_latency(&self, duration_secs: f64) {
        self.inner().batch_latency_seconds.observe(duration_secs);
    }

    pub fn observe_dispatch_latency(&self, duration_secs: f64) {
        self.inner().dispatch_latency_seconds.observe(duration_secs);
    }

    pub fn inc_signals_processed(&self) {
        self.inner().signals_processed.inc();
    }

    pub fn inc_alerts_published(&self) {
        self.inner().alerts_published.inc();
    }

    pub fn inc_alert_failures(&self) {
        self.inner().alert_failures.inc();
    }

    pub fn inc_remediations_started(&self) {
        self.inner().remediations_started.inc();
    }

    pub fn inc_remediation_failures(&self) {
        self.inner().remediation_failures.inc();
    }

    pub fn inc_cooldown_suppressed(&self) {
        self.inner().cooldown_suppressed.inc();
    }

    pub fn inc_storage_errors(&self) {
        self.inner().storage_errors.inc();
    }

    pub fn signals_processed(&self) -> u64 {
        self.inner().signals_processed.get()
    }

    pub fn remediations_started(&self) -> u64 {
        self.inner().remediations_started.get()
    }
}

/// Structured logger for triage decisions
///
/// Provides consistent JSON-formatted logging for scores, alerts and
/// remediation decisions.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Log a scored signal
    pub fn log_risk_scored(&self, resource: &str, risk: RiskScore, at_risk: bool) {
        info!(
            event = "risk_scored",
            instance = %self.instance,
            resource = %resource,
            risk = risk.as_f64(),
            at_risk = at_risk,
            "Scored health signal"
        );
    }

    /// Log a published alert
    pub fn log_alert_published(&self, resource: &str, risk: RiskScore, subject: &str) {
        warn!(
            event = "alert_published",
            instance = %self.instance,
            resource = %resource,
            risk = risk.as_f64(),
            subject = %subject,
            "Early outage signal published"
        );
    }

    /// Log a started remediation
    pub fn log_remediation_started(
        &self,
        resource: &str,
        target_kind: &str,
        runbook: &str,
        automation_id: &str,
    ) {
        warn!(
            event = "remediation_started",
            instance = %self.instance,
            resource = %resource,
            target_kind = %target_kind,
            runbook = %runbook,
            automation_id = %automation_id,
            "Auto-heal runbook started"
        );
    }

    /// Log a remediation that was eligible but not started
    pub fn log_remediation_skipped(&self, resource: &str, reason: &str) {
        info!(
            event = "remediation_skipped",
            instance = %self.instance,
            resource = %resource,
            reason = %reason,
            "Auto-heal not started"
        );
    }

    /// Log a failure that the pipeline continued past
    pub fn log_stage_failure(&self, resource: &str, stage: &str, error: &str) {
        warn!(
            event = "stage_failed",
            instance = %self.instance,
            resource = %resource,
            stage = %stage,
            error = %error,
            "Pipeline stage failed, continuing"
        );
    }

    /// Log a completed batch
    pub fn log_batch_complete(&self, signals: usize, remediations: usize, elapsed_ms: u128) {
        info!(
            event = "batch_complete",
            instance = %self.instance,
            signals = signals,
            remediations = remediations,
            elapsed_ms = elapsed_ms as u64,
            "Processed signal batch"
        );
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, threshold: &str, cooldown_seconds: i64) {
        info!(
            event = "triage_started",
            instance = %self.instance,
            version = %version,
            risk_threshold = %threshold,
            cooldown_seconds = cooldown_seconds,
            "Triage service started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "triage_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Triage service shutting down"
        );
    }
}
