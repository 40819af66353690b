//! Per-node state machine.
//!
//! `NodeHandle` owns everything about one node instance except the
//! node-type-specific behaviour, which lives behind a shared
//! [`crate::traits::NodeProcessor`]. Valid transitions:
//! `Idle -> Running -> {Completed, Failed}`, `{Completed, Failed} -> Idle`.
//! Any other attempted transition is rejected.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::data::{DataRecord, NodeOutput, PortValue};
use crate::error::{NodeError, ValidationError};
use crate::ports::Port;
use crate::traits::{CancelSignal, ExecutionContext, NodeProcessor};

/// Per-node execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Retry tuning for a node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first. `1` means no retry.
    pub max_tries: u32,
    /// Fixed wait between attempts, in milliseconds — a fixed wait, not
    /// exponential back-off.
    pub wait_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_tries: 1, wait_ms: 0 }
    }
}

/// The error record a failed node carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorData {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cause: Option<String>,
}

impl From<&NodeError> for ErrorData {
    fn from(err: &NodeError) -> Self {
        Self { message: err.message().to_string(), stack: None, cause: None }
    }
}

/// One node instance within a workflow: identity, wiring, config, and
/// lifecycle state. The node-specific `process` behaviour is supplied
/// externally (by a `NodeTypeRegistry` lookup) so many `NodeHandle`
/// instances of the same `node_type` can share one `NodeProcessor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeHandle {
    pub id: String,
    pub name: String,
    pub node_type: String,
    pub version: u32,
    pub position: (f64, f64),
    pub is_trigger: bool,
    pub disabled: bool,
    pub retry: RetryPolicy,
    pub continue_on_fail: bool,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
    pub config: DataRecord,
    state: NodeState,
    result_data: Option<NodeOutput>,
    error_data: Option<ErrorData>,
}

impl NodeHandle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        node_type: impl Into<String>,
        version: u32,
        position: (f64, f64),
        is_trigger: bool,
        disabled: bool,
        retry: RetryPolicy,
        continue_on_fail: bool,
        inputs: Vec<Port>,
        outputs: Vec<Port>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type: node_type.into(),
            version,
            position,
            is_trigger,
            disabled,
            retry,
            continue_on_fail,
            inputs,
            outputs,
            config: DataRecord::Null,
            state: NodeState::Idle,
            result_data: None,
            error_data: None,
        }
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn result(&self, port: &str) -> Option<&PortValue> {
        self.result_data.as_ref().and_then(|o| o.get(port))
    }

    pub fn result_data(&self) -> Option<&NodeOutput> {
        self.result_data.as_ref()
    }

    pub fn error_data(&self) -> Option<&ErrorData> {
        self.error_data.as_ref()
    }

    /// Store a validated config. Never changes `state`.
    pub fn setup(
        &mut self,
        processor: &dyn NodeProcessor,
        config: DataRecord,
    ) -> Result<(), ValidationError> {
        processor.validate_config(&config)?;
        self.config = config;
        Ok(())
    }

    /// Run the node once. Transitions `Idle -> Running` on entry and
    /// `Running -> {Completed, Failed}` on return.
    pub async fn run(
        &mut self,
        processor: &dyn NodeProcessor,
        input: crate::data::NodeInput,
        workflow_id: Uuid,
        execution_id: Uuid,
        state: DataRecord,
        cancelled: CancelSignal,
    ) -> Result<&NodeOutput, NodeError> {
        if self.state != NodeState::Idle {
            let message = format!(
                "cannot run node '{}' from state {:?}",
                self.name, self.state
            );
            warn!(node = %self.name, from = ?self.state, "rejected run: not idle");
            self.state = NodeState::Failed;
            self.error_data = Some(ErrorData { message: message.clone(), stack: None, cause: None });
            return Err(NodeError::Fatal(message));
        }

        self.state = NodeState::Running;
        let ctx = ExecutionContext {
            workflow_id,
            execution_id,
            node_name: self.name.clone(),
            config: self.config.clone(),
            input,
            state,
            cancelled,
        };

        match processor.process(&ctx).await {
            Ok(output) => {
                self.state = NodeState::Completed;
                debug!(node = %self.name, "completed");
                self.result_data = Some(output);
                self.error_data = None;
                Ok(self.result_data.as_ref().unwrap())
            }
            Err(err) => {
                self.state = NodeState::Failed;
                debug!(node = %self.name, error = %err, "failed");
                self.error_data = Some(ErrorData::from(&err));
                Err(err)
            }
        }
    }

    /// Fire a trigger node: run its processor and land on `Completed` or
    /// `Failed` regardless of the node's current state. Unlike [`run`],
    /// this has no `Idle`-only precondition — triggers carry their state
    /// across runs and are re-fired from whatever state their previous
    /// fire left them in.
    pub async fn fire(
        &mut self,
        processor: &dyn NodeProcessor,
        input: crate::data::NodeInput,
        workflow_id: Uuid,
        execution_id: Uuid,
        state: DataRecord,
        cancelled: CancelSignal,
    ) -> Result<&NodeOutput, NodeError> {
        debug_assert!(self.is_trigger, "fire() called on a non-trigger node");
        self.state = NodeState::Running;
        let ctx = ExecutionContext {
            workflow_id,
            execution_id,
            node_name: self.name.clone(),
            config: self.config.clone(),
            input,
            state,
            cancelled,
        };

        match processor.process(&ctx).await {
            Ok(output) => {
                self.state = NodeState::Completed;
                debug!(node = %self.name, "fired");
                self.result_data = Some(output);
                self.error_data = None;
                Ok(self.result_data.as_ref().unwrap())
            }
            Err(err) => {
                self.state = NodeState::Failed;
                debug!(node = %self.name, error = %err, "fire failed");
                self.error_data = Some(ErrorData::from(&err));
                Err(err)
            }
        }
    }

    /// Transition `Idle -> Running` without invoking a processor. Used by
    /// the level-parallel executor, which assembles input and dispatches
    /// the actual `process` call on a spawned task (an owned future can't
    /// hold `&mut self` borrowed from the shared workflow) and applies the
    /// result afterwards via [`apply_result`](Self::apply_result).
    pub fn begin_run(&mut self) -> Result<(), NodeError> {
        if self.state != NodeState::Idle {
            let message = format!("cannot run node '{}' from state {:?}", self.name, self.state);
            warn!(node = %self.name, from = ?self.state, "rejected run: not idle");
            self.state = NodeState::Failed;
            self.error_data = Some(ErrorData { message: message.clone(), stack: None, cause: None });
            return Err(NodeError::Fatal(message));
        }
        self.state = NodeState::Running;
        Ok(())
    }

    /// Apply a `process` result computed off of this handle, completing
    /// the `Running -> {Completed, Failed}` transition `begin_run` started.
    pub fn apply_result(&mut self, result: Result<NodeOutput, NodeError>) -> Result<&NodeOutput, NodeError> {
        match result {
            Ok(output) => {
                self.state = NodeState::Completed;
                debug!(node = %self.name, "completed");
                self.result_data = Some(output);
                self.error_data = None;
                Ok(self.result_data.as_ref().unwrap())
            }
            Err(err) => {
                self.state = NodeState::Failed;
                debug!(node = %self.name, error = %err, "failed");
                self.error_data = Some(ErrorData::from(&err));
                Err(err)
            }
        }
    }

    /// Mark a disabled node as having completed instantly with an empty
    /// array on every declared output port.
    pub fn complete_as_disabled(&mut self) {
        self.state = NodeState::Completed;
        let mut output = NodeOutput::new();
        for port in &self.outputs {
            output.insert(port.name.clone(), PortValue::Many(Vec::new()));
        }
        self.result_data = Some(output);
        self.error_data = None;
    }

    /// Reset to `Idle`, clearing `resultData`/`errorData`; preserves
    /// `config`. Valid from any state.
    pub fn reset(&mut self) {
        self.state = NodeState::Idle;
        self.result_data = None;
        self.error_data = None;
    }
}
