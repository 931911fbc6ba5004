//! Per-resource remediation cooldown
//!
//! Rate-limits repeated automation against the same resource (flapping
//! metrics would otherwise cause restart loops). Entries live in the shared
//! key-value store and expire by time, checked on read.
//!
//! The gate fails open: if the store cannot be read the resource is treated
//! as clear, and a failed write after a dispatch is only logged.
//!
//! Two signals for one resource can both pass [`CooldownGate::is_clear`]
//! before either calls [`CooldownGate::arm`]; no lock prevents that.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::health::{components, HealthRegistry};
use crate::models::{epoch_seconds, CooldownEntry};
use crate::observability::TriageMetrics;
use crate::store::KeyValueStore;

/// Store-backed cooldown gate
pub struct CooldownGate {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    window_seconds: i64,
    metrics: TriageMetrics,
    health: Option<HealthRegistry>,
}

impl CooldownGate {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, window_seconds: i64) -> Self {
        Self {
            store,
            clock,
            window_seconds,
            metrics: TriageMetrics::new(),
            health: None,
        }
    }

    /// Report store failures to a health registry
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.window_seconds > 0
    }

    pub fn window_seconds(&self) -> i64 {
        self.window_seconds
    }

    /// Whether remediation against `resource` may proceed now
    pub async fn is_clear(&self, resource: &str) -> bool {
        if !self.is_enabled() {
            return true;
        }

        let key = CooldownEntry::key_for(resource);
        let record = match self.store.get(&key).await {
            Ok(record) => {
                self.store_ok().await;
                record
            }
            Err(e) => {
                warn!(resource = %resource, error = %e, "Cooldown check failed, treating as clear");
                self.store_failed(e.to_string()).await;
                return true;
            }
        };

        let Some(record) = record else {
            return true;
        };

        match serde_json::from_value::<CooldownEntry>(record) {
            Ok(entry) if entry.is_active_at(self.clock.now()) => {
                debug!(resource = %resource, until = entry.cooldown_until, "Cooldown active");
                false
            }
            Ok(_) => true,
            Err(e) => {
                warn!(resource = %resource, error = %e, "Unreadable cooldown entry, treating as clear");
                self.store_failed(format!("unreadable cooldown entry: {}", e)).await;
                true
            }
        }
    }

    /// Start (or restart) the cooldown window for `resource`
    pub async fn arm(&self, resource: &str) {
        if !self.is_enabled() {
            return;
        }

        let now = self.clock.now();
        let entry = CooldownEntry {
            id: CooldownEntry::key_for(resource),
            cooldown_until: epoch_seconds(self.window_end(now)),
            ts: now,
        };

        let record = match serde_json::to_value(&entry) {
            Ok(record) => record,
            Err(e) => {
                warn!(resource = %resource, error = %e, "Failed to encode cooldown entry");
                return;
            }
        };

        match self.store.put(&entry.id, record).await {
            Ok(()) => {
                debug!(resource = %resource, until = entry.cooldown_until, "Cooldown armed");
                self.store_ok().await;
            }
            Err(e) => {
                warn!(resource = %resource, error = %e, "Failed to arm cooldown");
                self.store_failed(e.to_string()).await;
            }
        }
    }

    /// End of a window starting at `now`, saturating at the latest
    /// representable time
    fn window_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        Duration::try_seconds(self.window_seconds)
            .and_then(|window| now.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    async fn store_ok(&self) {
        if let Some(health) = &self.health {
            health.record_success(components::STORE).await;
        }
    }

    async fn store_failed(&self, error: String) {
        self.metrics.inc_storage_errors();
        if let Some(health) = &self.health {
            health.record_failure(components::STORE, error).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::{Result, TriageError};
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    /// Store whose reads and writes always fail
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<Value>> {
            Err(TriageError::Storage("connection refused".to_string()))
        }

        async fn put(&self, _key: &str, _record: Value) -> Result<()> {
            Err(TriageError::Storage("connection refused".to_string()))
        }
    }

    fn gate(window: i64) -> (CooldownGate, Arc<InMemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(InMemoryStore::new("risk"));
        let clock = Arc::new(ManualClock::default());
        let gate = CooldownGate::new(store.clone(), clock.clone(), window);
        (gate, store, clock)
    }

    #[tokio::test]
    async fn test_arm_blocks_until_window_passes() {
        let (gate, _store, clock) = gate(60);
        assert!(gate.is_clear("i-1").await);

        gate.arm("i-1").await;
        assert!(!gate.is_clear("i-1").await);

        clock.advance(Duration::seconds(59));
        assert!(!gate.is_clear("i-1").await);

        clock.advance(Duration::seconds(1));
        assert!(gate.is_clear("i-1").await);
    }

    #[tokio::test]
    async fn test_cooldown_is_per_resource() {
        let (gate, _store, _clock) = gate(60);
        gate.arm("i-1").await;

        assert!(!gate.is_clear("i-1").await);
        assert!(gate.is_clear("i-2").await);
    }

    #[tokio::test]
    async fn test_rearm_extends_window() {
        let (gate, _store, clock) = gate(60);
        gate.arm("i-1").await;
        clock.advance(Duration::seconds(45));
        gate.arm("i-1").await;
        clock.advance(Duration::seconds(30));

        assert!(!gate.is_clear("i-1").await);
    }

    #[tokio::test]
    async fn test_disabled_gate_always_clear() {
        for window in [0, -10] {
            let (gate, store, _clock) = gate(window);
            gate.arm("i-1").await;

            assert!(gate.is_clear("i-1").await);
            assert!(store.is_empty());
        }
    }

    #[tokio::test]
    async fn test_entry_written_under_prefixed_key() {
        let (gate, store, clock) = gate(120);
        gate.arm("ecs-service/prod/api").await;

        let record = store
            .get("cooldown::ecs-service/prod/api")
            .await
            .unwrap()
            .unwrap();
        let entry: CooldownEntry = serde_json::from_value(record).unwrap();
        assert_eq!(entry.ts, clock.now());
        assert_eq!(
            (entry.cooldown_until * 1000.0).round() as i64,
            clock.now().timestamp_millis() + 120_000
        );
    }

    #[tokio::test]
    async fn test_read_failure_fails_open() {
        let health = HealthRegistry::new();
        health.register_all().await;
        let gate = CooldownGate::new(Arc::new(BrokenStore), Arc::new(ManualClock::default()), 60)
            .with_health(health.clone());

        assert!(gate.is_clear("i-1").await);
        assert_eq!(
            health.health().await.components[components::STORE].consecutive_failures,
            1
        );
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let gate = CooldownGate::new(Arc::new(BrokenStore), Arc::new(ManualClock::default()), 60);
        gate.arm("i-1").await;
        assert!(gate.is_clear("i-1").await);
    }

    #[tokio::test]
    async fn test_corrupt_entry_fails_open() {
        let (gate, store, _clock) = gate(60);
        store
            .put("cooldown::i-1", json!({"cooldown_until": "soon"}))
            .await
            .unwrap();

        assert!(gate.is_clear("i-1").await);
    }

    #[tokio::test]
    async fn test_corrupt_entry_reported_to_health() {
        let health = HealthRegistry::new();
        health.register_all().await;
        let store = Arc::new(InMemoryStore::new("risk"));
        store
            .put("cooldown::i-1", json!({"cooldown_until": "soon"}))
            .await
            .unwrap();
        let gate = CooldownGate::new(store, Arc::new(ManualClock::default()), 60)
            .with_health(health.clone());

        assert!(gate.is_clear("i-1").await);

        let response = health.health().await;
        let store_health = &response.components[components::STORE];
        assert_eq!(store_health.consecutive_failures, 1);
        assert!(store_health
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("unreadable cooldown entry")));
    }

    #[tokio::test]
    async fn test_huge_window_saturates_instead_of_overflowing() {
        for window in [10_000_000_000_000, i64::MAX] {
            let (gate, store, clock) = gate(window);
            gate.arm("i-1").await;

            assert!(!gate.is_clear("i-1").await);
            clock.advance(Duration::days(365 * 1000));
            assert!(!gate.is_clear("i-1").await);

            let record = store.get("cooldown::i-1").await.unwrap().unwrap();
            let entry: CooldownEntry = serde_json::from_value(record).unwrap();
            assert_eq!(
                (entry.cooldown_until * 1000.0).round() as i64,
                DateTime::<Utc>::MAX_UTC.timestamp_millis()
            );
        }
    }
}
