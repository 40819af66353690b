//! The `NodeProcessor` trait — the contract every node type must fulfil.

use async_trait::async_trait;
use uuid::Uuid;

use crate::data::{DataRecord, NodeOutput, NodeInput};
use crate::error::NodeError;

/// Shared context passed to a node's `process` call.
///
/// Defined here (in the nodes crate) so both the engine and individual node
/// implementations can depend on it without a circular crate dependency.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// ID of the parent workflow.
    pub workflow_id: Uuid,
    /// ID of the current execution run.
    pub execution_id: Uuid,
    /// Name of the node being executed (its addressing key in the workflow).
    pub node_name: String,
    /// This node's config, as stored by its most recent `setup` call.
    pub config: DataRecord,
    /// Assembled per-port input, produced by the engine's data-flow protocol.
    pub input: NodeInput,
    /// Arbitrary per-run scratch space. Not persisted across runs; a fresh
    /// `Value::Null` is handed to every node at the start of each run.
    pub state: DataRecord,
    /// Cooperative cancellation signal. Nodes that ignore it simply run to
    /// completion.
    pub cancelled: CancelSignal,
}

/// A cheap, clonable cancellation flag. Kept independent of any particular
/// async runtime's cancellation primitive so `nodes` has no hard dependency
/// on `tokio`; the engine wires this to a real `tokio_util::sync::CancellationToken`.
#[derive(Debug, Clone)]
pub struct CancelSignal(std::sync::Arc<std::sync::atomic::AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self(std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// The node-specific behaviour every node type supplies.
///
/// This is the only node-specific code the engine calls; everything else
/// (state transitions, retry, continue-on-fail, reset) is handled uniformly
/// by [`crate::lifecycle::NodeHandle`].
#[async_trait]
pub trait NodeProcessor: Send + Sync {
    /// Validate a proposed config before it is stored. The default
    /// implementation accepts anything; concrete node types override this
    /// to delegate to an injected schema validator (out of scope here —
    /// concrete validation lives with the concrete node implementation).
    fn validate_config(&self, _config: &DataRecord) -> Result<(), crate::error::ValidationError> {
        Ok(())
    }

    /// Execute the node's behaviour for one run.
    async fn process(&self, ctx: &ExecutionContext) -> Result<NodeOutput, NodeError>;
}
