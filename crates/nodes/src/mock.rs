//! `MockProcessor` — a test double for `NodeProcessor`.
//!
//! Useful in unit and integration tests where a real node implementation is
//! either unavailable or irrelevant.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use crate::data::{Item, NodeOutput, PortValue};
use crate::error::NodeError;
use crate::traits::{ExecutionContext, NodeProcessor};

/// One outcome a `MockProcessor` can produce on a given call.
#[derive(Clone)]
pub enum MockBehaviour {
    /// Return a specific JSON value on the `"main"` output port.
    ReturnValue(Value),
    /// Fail with a `Retryable` error.
    FailRetryable(String),
    /// Fail with a `Fatal` error.
    FailFatal(String),
}

/// A mock node that records every call it receives and returns a
/// programmer-specified result. Supports a fixed behaviour or a sequence
/// of behaviours consumed one per call (the last entry repeats once the
/// sequence is exhausted) — the shape needed to script "fails twice, then
/// succeeds" retry scenarios.
pub struct MockProcessor {
    /// Label merged into the output so tests can trace data flow.
    pub name: String,
    behaviours: Vec<MockBehaviour>,
    /// All inputs seen by this processor (in call order).
    pub calls: Arc<Mutex<Vec<Value>>>,
}

impl MockProcessor {
    /// Create a mock that always succeeds with the given value.
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self::with_behaviours(name, vec![MockBehaviour::ReturnValue(value)])
    }

    /// Create a mock that always fails with a `Fatal` error.
    pub fn failing_fatal(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_behaviours(name, vec![MockBehaviour::FailFatal(msg.into())])
    }

    /// Create a mock that always fails with a `Retryable` error.
    pub fn failing_retryable(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_behaviours(name, vec![MockBehaviour::FailRetryable(msg.into())])
    }

    /// Create a mock that replays `behaviours` one per call, repeating the
    /// final entry once exhausted.
    pub fn with_behaviours(name: impl Into<String>, behaviours: Vec<MockBehaviour>) -> Self {
        assert!(!behaviours.is_empty(), "MockProcessor needs at least one behaviour");
        Self { name: name.into(), behaviours, calls: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Number of times this processor has been called.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl NodeProcessor for MockProcessor {
    async fn process(&self, ctx: &ExecutionContext) -> Result<NodeOutput, NodeError> {
        let input_snapshot = serde_json::to_value(&ctx.input).unwrap_or(Value::Null);
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(input_snapshot);
            calls.len() - 1
        };
        let behaviour = &self.behaviours[call_index.min(self.behaviours.len() - 1)];

        match behaviour {
            MockBehaviour::ReturnValue(v) => {
                let mut out = json!({ "node": self.name });
                if let (Some(out_obj), Some(v_obj)) = (out.as_object_mut(), v.as_object()) {
                    for (k, val) in v_obj {
                        out_obj.insert(k.clone(), val.clone());
                    }
                }
                let mut output = NodeOutput::new();
                output.insert("main".to_string(), PortValue::Single(Item::new(out)));
                Ok(output)
            }
            MockBehaviour::FailRetryable(msg) => Err(NodeError::Retryable(msg.clone())),
            MockBehaviour::FailFatal(msg) => Err(NodeError::Fatal(msg.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NodeInput;
    use crate::traits::CancelSignal;
    use uuid::Uuid;

    #[tokio::test]
    async fn sequence_fails_then_succeeds() {
        let proc = MockProcessor::with_behaviours(
            "flaky",
            vec![
                MockBehaviour::FailRetryable("try again".into()),
                MockBehaviour::FailRetryable("try again".into()),
                MockBehaviour::ReturnValue(json!({"ok": true})),
            ],
        );
        let ctx = ExecutionContext {
            workflow_id: Uuid::nil(),
            execution_id: Uuid::nil(),
            node_name: "flaky".into(),
            config: Value::Null,
            input: NodeInput::new(),
            state: Value::Null,
            cancelled: CancelSignal::new(),
        };

        assert!(proc.process(&ctx).await.is_err());
        assert!(proc.process(&ctx).await.is_err());
        assert!(proc.process(&ctx).await.is_ok());
        assert_eq!(proc.call_count(), 3);
    }
}
