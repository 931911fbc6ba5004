//! Error taxonomy for the triage engine
//!
//! None of these abort a batch. The engine logs them and reflects the
//! failure in the per-signal outcome, metrics and component health.

use thiserror::Error;

/// Errors raised by the engine's collaborators
#[derive(Debug, Error)]
pub enum TriageError {
    /// Required configuration is missing (e.g. no automation assume-role)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Key-value store read or write failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Alert sink rejected or failed to deliver a notification
    #[error("publish error: {0}")]
    Publish(String),

    /// Automation executor failed to start a runbook
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// A record could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TriageError>;
