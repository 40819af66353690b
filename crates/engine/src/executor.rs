//! Workflow execution engine.
//!
//! `WorkflowExecutor::execute` is the central orchestrator:
//! 1. Checks preconditions (workflow Idle, trigger Completed).
//! 2. Isolation: resets every regular node and the execution-state
//!    manager; triggers are untouched.
//! 3. Analysis: builds the dependency graph and levels it, failing loudly
//!    on cycles before any node runs.
//! 4. Run loop: each level's non-disabled nodes are dispatched onto
//!    `tokio::spawn`, bounded by a `maxParallelExecutions` semaphore, and
//!    joined before the next level starts.
//! 5. Per node: assemble input, run with the node's fixed-wait retry
//!    policy, apply continue-on-fail, record output.
//! 6. A node failure without continue-on-fail stops scheduling of further
//!    levels; nodes already dispatched in the current level are allowed
//!    to finish.
//! 7. Termination sets the workflow to Completed or Failed.

use std::sync::Arc;
use std::time::Duration;

use nodes::{CancelSignal, ExecutionContext, NodeError, NodeOutput, NodeState, NodeTypeRegistry, RetryPolicy};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::dag::DependencyAnalyzer;
use crate::dataflow;
use crate::error::EngineError;
use crate::state_manager::ExecutionStateManager;
use crate::workflow::{Workflow, WorkflowState};

/// Summary of a completed (or failed) run.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub execution_id: Uuid,
    pub run_state: WorkflowState,
    /// Names of the nodes that were actually dispatched this run, in the
    /// order their level was scheduled.
    pub executed_nodes: Vec<String>,
}

/// Runs workflows against a shared node type registry. Stateless aside
/// from the registry; construct one per process and reuse it.
pub struct WorkflowExecutor {
    registry: Arc<NodeTypeRegistry>,
}

enum Dispatched {
    Success { name: String, output: NodeOutput },
    Failed { name: String, error: NodeError },
}

impl WorkflowExecutor {
    pub fn new(registry: Arc<NodeTypeRegistry>) -> Self {
        Self { registry }
    }

    #[instrument(skip(self, workflow, cancel), fields(workflow = %workflow.name, trigger = %trigger_name))]
    pub async fn execute(
        &self,
        workflow: &mut Workflow,
        trigger_name: &str,
        cancel: CancellationToken,
    ) -> Result<ExecutionReport, EngineError> {
        if workflow.run_state() != WorkflowState::Idle {
            return Err(EngineError::NotIdle);
        }
        if !workflow.triggers().contains_key(trigger_name) {
            return Err(EngineError::UnknownTrigger(trigger_name.to_string()));
        }
        let trigger_state = workflow.get_node(trigger_name).expect("checked above").state();
        if trigger_state != NodeState::Completed {
            return Err(EngineError::TriggerNotCompleted(trigger_name.to_string()));
        }

        // Isolation: reset regular nodes and the state manager; triggers
        // are untouched in both.
        let mut state = ExecutionStateManager::new();
        state.reset_for_new_run(workflow);
        for (name, trigger) in workflow.triggers() {
            if let Some(output) = trigger.result_data() {
                state.record_node_output(name, output);
            }
        }
        for node in workflow.nodes_mut().values_mut() {
            node.reset();
        }

        // Validation/cycle errors are raised here, before the workflow
        // ever leaves Idle.
        let analysis = DependencyAnalyzer::analyze(workflow)?;

        workflow.set_run_state(WorkflowState::Running);
        let execution_id = Uuid::new_v4();
        info!(%execution_id, levels = analysis.levels.len(), "execution starting");

        // `enable_parallel_execution = false` forces nodes within a level to
        // run one at a time, same as an explicit `max_parallel_executions = 1`;
        // otherwise the configured cap applies (0 = unlimited).
        let effective_cap = if !workflow.settings.enable_parallel_execution {
            1
        } else {
            workflow.settings.max_parallel_executions
        };
        let semaphore = (effective_cap > 0).then(|| Arc::new(Semaphore::new(effective_cap as usize)));

        let mut executed_nodes = Vec::new();
        let mut first_failure: Option<EngineError> = None;
        let mut cancelled = false;

        for level in &analysis.levels {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if first_failure.is_some() {
                break;
            }

            let runnable: Vec<&str> =
                level.iter().map(String::as_str).filter(|name| !workflow.is_trigger(name)).collect();
            if runnable.is_empty() {
                continue;
            }

            let mut handles = Vec::new();
            let mut dispatched_this_level = Vec::new();
            for &name in &runnable {
                let node = workflow.get_node(name).expect("level member must exist");
                if node.disabled {
                    let handle = workflow.get_node_mut(name).expect("checked above");
                    handle.complete_as_disabled();
                    let output = handle.result_data().cloned().expect("complete_as_disabled always sets a result");
                    state.record_node_output(name, &output);
                    continue;
                }
                dispatched_this_level.push(name.to_string());

                let input = dataflow::assemble_input(workflow, &state, name);
                workflow.get_node_mut(name).expect("checked above").begin_run().map_err(|err| {
                    EngineError::Internal(format!("node '{name}' was not Idle at dispatch: {err}"))
                })?;

                let node = workflow.get_node(name).expect("checked above");
                let processor = self
                    .registry
                    .get(&node.node_type)
                    .ok_or_else(|| EngineError::Internal(format!("node type '{}' vanished from registry", node.node_type)))?;
                let retry = node.retry;
                let name_owned = name.to_string();
                let ctx = ExecutionContext {
                    workflow_id: workflow.id,
                    execution_id,
                    node_name: name_owned.clone(),
                    config: node.config.clone(),
                    input,
                    state: serde_json::Value::Null,
                    cancelled: CancelSignal::new(),
                };

                let permits = semaphore.clone();
                let watcher_token = cancel.clone();
                let watcher_signal = ctx.cancelled.clone();
                let watcher = tokio::spawn(async move {
                    watcher_token.cancelled().await;
                    watcher_signal.cancel();
                });

                handles.push(tokio::spawn(async move {
                    let _permit = match &permits {
                        Some(sema) => Some(sema.clone().acquire_owned().await.expect("semaphore never closes")),
                        None => None,
                    };
                    let result = run_with_retry(processor, ctx, retry).await;
                    watcher.abort();
                    match result {
                        Ok(output) => Dispatched::Success { name: name_owned, output },
                        Err(error) => Dispatched::Failed { name: name_owned, error },
                    }
                }));
            }

            executed_nodes.extend(dispatched_this_level);

            for handle in handles {
                let dispatched = handle.await.map_err(|join_err| {
                    EngineError::Internal(format!("node task panicked: {join_err}"))
                })?;
                match dispatched {
                    Dispatched::Success { name, output } => {
                        state.record_node_output(&name, &output);
                        workflow.get_node_mut(&name).expect("dispatched node must exist").apply_result(Ok(output)).ok();
                    }
                    Dispatched::Failed { name, error } => {
                        let node = workflow.get_node_mut(&name).expect("dispatched node must exist");
                        let continue_on_fail = node.continue_on_fail;
                        let message = error.message().to_string();
                        let exhausted_retry = matches!(error, NodeError::Retryable(_));
                        let _ = node.apply_result(Err(error));
                        warn!(node = %name, %message, continue_on_fail, "node failed");

                        if continue_on_fail {
                            let node = workflow.get_node(&name).expect("dispatched node must exist");
                            let error_output = dataflow::error_output(node, &message, None);
                            state.record_node_output(&name, &error_output);
                        } else if first_failure.is_none() {
                            first_failure = Some(if exhausted_retry {
                                EngineError::NodeRetryExhausted { node: name, message }
                            } else {
                                EngineError::NodeFatal { node: name, message }
                            });
                        }
                    }
                }
            }
        }

        if cancelled {
            workflow.set_run_state(WorkflowState::Failed);
            error!("execution cancelled");
            return Err(EngineError::Cancelled);
        }
        if let Some(err) = first_failure {
            workflow.set_run_state(WorkflowState::Failed);
            error!(%err, "execution failed");
            return Err(err);
        }

        workflow.set_run_state(WorkflowState::Completed);
        info!(%execution_id, "execution completed");
        Ok(ExecutionReport { execution_id, run_state: WorkflowState::Completed, executed_nodes })
    }
}

/// Run a node's processor with its fixed-wait retry policy — a fixed wait
/// between attempts, not exponential back-off. `Fatal` errors are never
/// retried; `Retryable` errors are retried up to
/// `max(1, retry.max_tries)` total attempts.
async fn run_with_retry(
    processor: Arc<dyn nodes::NodeProcessor>,
    ctx: ExecutionContext,
    retry: RetryPolicy,
) -> Result<NodeOutput, NodeError> {
    let max_tries = retry.max_tries.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match processor.process(&ctx).await {
            Ok(output) => return Ok(output),
            Err(NodeError::Fatal(message)) => return Err(NodeError::Fatal(message)),
            Err(NodeError::Retryable(message)) => {
                if attempt >= max_tries {
                    return Err(NodeError::Retryable(message));
                }
                warn!(node = %ctx.node_name, attempt, max_tries, %message, "retrying");
                if retry.wait_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(retry.wait_ms)).await;
                }
            }
        }
    }
}
