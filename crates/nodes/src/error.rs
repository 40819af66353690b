//! Node-level error types.

use thiserror::Error;

/// Errors returned by a node's `process` method.
///
/// The engine uses the variant to decide retry behaviour:
/// - `Retryable` — the node is re-run up to `retry.maxTries - 1` more times.
/// - `Fatal`     — no retry is attempted; the node stays `Failed`.
#[derive(Debug, Error, Clone)]
pub enum NodeError {
    /// Transient failure; the engine should retry per the node's retry policy.
    #[error("retryable node error: {0}")]
    Retryable(String),

    /// Permanent failure; no retry should be attempted.
    #[error("fatal node error: {0}")]
    Fatal(String),
}

impl NodeError {
    pub fn message(&self) -> &str {
        match self {
            NodeError::Retryable(m) | NodeError::Fatal(m) => m,
        }
    }
}

/// Error returned by `NodeHandle::setup` when the supplied config is
/// rejected by the node's validator. The engine treats this as a fatal
/// precondition — execution never starts for a node whose setup failed.
#[derive(Debug, Error, Clone)]
#[error("config validation failed for node: {0}")]
pub struct ValidationError(pub String);
