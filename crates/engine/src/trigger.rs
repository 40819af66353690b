//! Trigger interface.
//!
//! A trigger node owns an external event source (manual call, schedule
//! tick, webhook delivery). Firing it runs its processor, lands it on
//! `Completed`/`Failed`, and then calls into the execution engine for the
//! rest of the graph. The engine's own contract with triggers stays
//! narrow: identify by name, read its output, never reset it.

use nodes::{CancelSignal, NodeInput, NodeTypeRegistry};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::EngineError;
use crate::executor::{ExecutionReport, WorkflowExecutor};
use crate::workflow::Workflow;

/// Fire `trigger_name` with `input`, then execute the rest of the graph
/// reachable from it.
pub async fn fire(
    executor: &WorkflowExecutor,
    registry: &NodeTypeRegistry,
    workflow: &mut Workflow,
    trigger_name: &str,
    input: NodeInput,
    cancel: CancellationToken,
) -> Result<ExecutionReport, EngineError> {
    let workflow_id = workflow.id;

    let node = workflow.get_node(trigger_name).ok_or_else(|| EngineError::UnknownTrigger(trigger_name.to_string()))?;
    if !node.is_trigger {
        return Err(EngineError::NotATrigger(trigger_name.to_string()));
    }
    let processor = registry
        .get(&node.node_type)
        .ok_or_else(|| EngineError::UnknownNodeType(node.node_type.clone()))?;

    let fire_id = Uuid::new_v4();
    let node = workflow.get_node_mut(trigger_name).expect("checked above");
    node.fire(processor.as_ref(), input, workflow_id, fire_id, serde_json::Value::Null, CancelSignal::new())
        .await
        .map_err(|err| EngineError::NodeFatal { node: trigger_name.to_string(), message: err.message().to_string() })?;

    executor.execute(workflow, trigger_name, cancel).await
}
