//! Core data models for the triage engine

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::scoring::RiskScore;

/// Resource name used when an event carries no identifier
pub const UNKNOWN_RESOURCE: &str = "unknown";

/// Prefix for cooldown entries in the key-value store
pub const COOLDOWN_KEY_PREFIX: &str = "cooldown::";

/// One inbound health observation for a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub resource_id: String,
    #[serde(default)]
    pub latency_ms: Option<f64>,
    #[serde(default)]
    pub error_rate_pct: Option<f64>,
    #[serde(default)]
    pub nxdomain_anomaly: bool,
}

impl Signal {
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            latency_ms: None,
            error_rate_pct: None,
            nxdomain_anomaly: false,
        }
    }

    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    pub fn with_error_rate(mut self, error_rate_pct: f64) -> Self {
        self.error_rate_pct = Some(error_rate_pct);
        self
    }

    pub fn with_nxdomain_anomaly(mut self, anomaly: bool) -> Self {
        self.nxdomain_anomaly = anomaly;
        self
    }
}

/// Health measurements carried in an event's `detail` block
///
/// Producers are loosely typed: measurements may arrive as numbers or
/// numeric strings, and a value that cannot be read counts as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalDetail {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(
        default,
        alias = "latencyMs",
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub latency: Option<f64>,
    #[serde(
        default,
        alias = "errorRatePct",
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_flag", skip_serializing_if = "Option::is_none")]
    pub nxdomain_anomaly: Option<bool>,
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// `true`, a non-zero number, or one of `"true"`, `"yes"`, `"1"`
fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => Some(n.as_f64().is_some_and(|v| v != 0.0)),
        Some(Value::String(s)) => Some(matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "1"
        )),
        _ => None,
    })
}

/// Event-bus envelope around a signal; fields other than `detail` are ignored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalEvent {
    #[serde(default)]
    pub detail: Option<SignalDetail>,
}

impl SignalEvent {
    /// Decode one event, degrading to an event without detail when the
    /// shape is unusable so that it still yields a signal
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "Unreadable signal event, treating as unknown resource");
            Self::default()
        })
    }

    pub fn from_signal(signal: &Signal) -> Self {
        Self {
            detail: Some(SignalDetail {
                resource_id: Some(signal.resource_id.clone()),
                resource_name: None,
                latency: signal.latency_ms,
                error_rate: signal.error_rate_pct,
                nxdomain_anomaly: Some(signal.nxdomain_anomaly),
            }),
        }
    }

    /// Extract the signal, falling back from `resourceId` to `resourceName`
    /// to [`UNKNOWN_RESOURCE`]
    pub fn into_signal(self) -> Signal {
        let detail = self.detail.unwrap_or_default();
        let resource_id = detail
            .resource_id
            .or(detail.resource_name)
            .unwrap_or_else(|| UNKNOWN_RESOURCE.to_string());

        Signal {
            resource_id,
            latency_ms: detail.latency,
            error_rate_pct: detail.error_rate,
            nxdomain_anomaly: detail.nxdomain_anomaly.unwrap_or(false),
        }
    }
}

/// Invocation body: a single event or a list of them
///
/// Events are decoded one by one, so a malformed event never rejects the
/// rest of its batch.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Invocation {
    Batch(Vec<SignalEvent>),
    Single(SignalEvent),
}

impl<'de> Deserialize<'de> for Invocation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Invocation::from_value(Value::deserialize(deserializer)?))
    }
}

impl Invocation {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(events) => {
                Invocation::Batch(events.into_iter().map(SignalEvent::from_value).collect())
            }
            event => Invocation::Single(SignalEvent::from_value(event)),
        }
    }

    pub fn into_signals(self) -> Vec<Signal> {
        match self {
            Invocation::Batch(events) => events.into_iter().map(SignalEvent::into_signal).collect(),
            Invocation::Single(event) => vec![event.into_signal()],
        }
    }
}

/// Append-only audit record written once per processed signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    pub id: String,
    pub resource: String,
    pub latency_ms: Option<f64>,
    pub error_rate_pct: Option<f64>,
    pub nxdomain_anomaly: bool,
    pub risk: RiskScore,
    pub ts: DateTime<Utc>,
}

impl RiskRecord {
    pub fn new(signal: &Signal, risk: RiskScore, ts: DateTime<Utc>) -> Self {
        Self {
            id: format!(
                "{}-{}",
                signal.resource_id,
                ts.to_rfc3339_opts(SecondsFormat::Micros, true)
            ),
            resource: signal.resource_id.clone(),
            latency_ms: signal.latency_ms,
            error_rate_pct: signal.error_rate_pct,
            nxdomain_anomaly: signal.nxdomain_anomaly,
            risk,
            ts,
        }
    }
}

/// Cooldown bookkeeping for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownEntry {
    pub id: String,
    /// Epoch seconds after which remediation is allowed again
    pub cooldown_until: f64,
    pub ts: DateTime<Utc>,
}

impl CooldownEntry {
    pub fn key_for(resource: &str) -> String {
        format!("{}{}", COOLDOWN_KEY_PREFIX, resource)
    }

    /// Compared at millisecond resolution so float rounding cannot extend a window
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        let until_millis = (self.cooldown_until * 1000.0).round() as i64;
        until_millis > now.timestamp_millis()
    }
}

/// Seconds since the epoch with millisecond precision
pub fn epoch_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64 / 1000.0
}

/// Per-signal result, emitted in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationOutcome {
    pub resource: String,
    pub risk: RiskScore,
    pub auto_heal_started: bool,
    pub automation_id: Option<String>,
}

impl RemediationOutcome {
    pub fn skipped(resource: impl Into<String>, risk: RiskScore) -> Self {
        Self {
            resource: resource.into(),
            risk,
            auto_heal_started: false,
            automation_id: None,
        }
    }

    pub fn started(resource: impl Into<String>, risk: RiskScore, automation_id: String) -> Self {
        Self {
            resource: resource.into(),
            risk,
            auto_heal_started: true,
            automation_id: Some(automation_id),
        }
    }
}

/// Response to one invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub ok: bool,
    pub results: Vec<RemediationOutcome>,
}

impl BatchResponse {
    pub fn new(results: Vec<RemediationOutcome>) -> Self {
        Self { ok: true, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_event_parsing() {
        let body = json!({
            "source": "monitoring",
            "detail": {"resourceId": "i-1234", "latency": 250, "errorRate": 2.0}
        });
        let invocation: Invocation = serde_json::from_value(body).unwrap();
        let signals = invocation.into_signals();

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].resource_id, "i-1234");
        assert_eq!(signals[0].latency_ms, Some(250.0));
        assert_eq!(signals[0].error_rate_pct, Some(2.0));
        assert!(!signals[0].nxdomain_anomaly);
    }

    #[test]
    fn test_batch_parsing_preserves_order() {
        let body = json!([
            {"detail": {"resourceId": "a"}},
            {"detail": {"resourceId": "b", "nxdomainAnomaly": true}},
            {"detail": {"resourceId": "c"}}
        ]);
        let invocation: Invocation = serde_json::from_value(body).unwrap();
        let ids: Vec<_> = invocation
            .into_signals()
            .into_iter()
            .map(|s| s.resource_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_resource_fallbacks() {
        let by_name: SignalEvent =
            serde_json::from_value(json!({"detail": {"resourceName": "db-primary"}})).unwrap();
        assert_eq!(by_name.into_signal().resource_id, "db-primary");

        let missing: SignalEvent = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.into_signal().resource_id, UNKNOWN_RESOURCE);

        let null_detail: SignalEvent = serde_json::from_value(json!({"detail": null})).unwrap();
        let signal = null_detail.into_signal();
        assert_eq!(signal.resource_id, UNKNOWN_RESOURCE);
        assert_eq!(signal.latency_ms, None);
    }

    #[test]
    fn test_long_field_aliases() {
        let event: SignalEvent = serde_json::from_value(json!({
            "detail": {"resourceId": "x", "latencyMs": 12.5, "errorRatePct": 0.3, "nxdomainAnomaly": null}
        }))
        .unwrap();
        let signal = event.into_signal();
        assert_eq!(signal.latency_ms, Some(12.5));
        assert_eq!(signal.error_rate_pct, Some(0.3));
        assert!(!signal.nxdomain_anomaly);
    }

    #[test]
    fn test_loosely_typed_measurements() {
        let event: SignalEvent = serde_json::from_value(json!({
            "detail": {"resourceId": 42, "latency": " 250 ", "errorRate": "2.5", "nxdomainAnomaly": "TRUE"}
        }))
        .unwrap();
        let signal = event.into_signal();
        assert_eq!(signal.resource_id, "42");
        assert_eq!(signal.latency_ms, Some(250.0));
        assert_eq!(signal.error_rate_pct, Some(2.5));
        assert!(signal.nxdomain_anomaly);

        let event: SignalEvent = serde_json::from_value(json!({
            "detail": {"resourceId": "i-1", "latency": "fast", "errorRate": [1], "nxdomainAnomaly": 0}
        }))
        .unwrap();
        let signal = event.into_signal();
        assert_eq!(signal.latency_ms, None);
        assert_eq!(signal.error_rate_pct, None);
        assert!(!signal.nxdomain_anomaly);
    }

    #[test]
    fn test_bad_event_does_not_reject_batch() {
        let body = json!([
            {"detail": {"resourceId": "i-1234", "latency": 250, "errorRate": 2.0}},
            {"detail": {"resourceId": "i-5678", "latency": "250"}},
            {"detail": "not an object"},
            7
        ]);
        let signals = serde_json::from_value::<Invocation>(body)
            .unwrap()
            .into_signals();

        assert_eq!(signals.len(), 4);
        assert_eq!(signals[0].resource_id, "i-1234");
        assert_eq!(signals[1].resource_id, "i-5678");
        assert_eq!(signals[1].latency_ms, Some(250.0));
        assert_eq!(signals[2].resource_id, UNKNOWN_RESOURCE);
        assert_eq!(signals[3].resource_id, UNKNOWN_RESOURCE);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = RemediationOutcome::skipped("i-1", RiskScore::ZERO);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["autoHealStarted"], false);
        assert!(json["automationId"].is_null());
        assert_eq!(json["risk"], 0.0);

        let response = serde_json::to_value(BatchResponse::new(vec![outcome])).unwrap();
        assert_eq!(response["ok"], true);
        assert_eq!(response["results"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_record_id_combines_resource_and_timestamp() {
        let ts = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = RiskRecord::new(&Signal::new("i-1234"), RiskScore::ZERO, ts);
        assert_eq!(record.id, "i-1234-2024-01-01T00:00:00.000000Z");
    }

    #[test]
    fn test_cooldown_entry_expiry() {
        let now = Utc::now();
        let entry = CooldownEntry {
            id: CooldownEntry::key_for("i-1"),
            cooldown_until: epoch_seconds(now) + 60.0,
            ts: now,
        };
        assert_eq!(entry.id, "cooldown::i-1");
        assert!(entry.is_active_at(now));
        assert!(!entry.is_active_at(now + chrono::Duration::seconds(60)));
    }
}
