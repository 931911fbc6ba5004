//! Key-value persistence for risk records and cooldown entries
//!
//! The engine only needs single-key `get`/`put`. Implementations:
//! - In-memory map for tests and ephemeral deployments
//! - Append-only JSON-lines file for single-node durability

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::InMemoryStore;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Trait for key-value store implementations
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the record stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `record` under `key`, replacing any previous value
    async fn put(&self, key: &str, record: Value) -> Result<()>;
}
