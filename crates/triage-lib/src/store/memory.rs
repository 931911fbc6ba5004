//! In-memory key-value store

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use super::KeyValueStore;
use crate::error::Result;

/// Concurrent in-memory store, named after the table it stands in for
pub struct InMemoryStore {
    table: String,
    records: DashMap<String, Value>,
}

impl InMemoryStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            records: DashMap::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keys currently stored, in no particular order
    pub fn keys(&self) -> Vec<String> {
        self.records.iter().map(|r| r.key().clone()).collect()
    }

    pub(super) fn insert(&self, key: String, record: Value) {
        self.records.insert(key, record);
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    async fn put(&self, key: &str, record: Value) -> Result<()> {
        debug!(table = %self.table, key = %key, "Storing record");
        self.records.insert(key.to_string(), record);
        Ok(())
    }
}
