//! Execution-state manager.
//!
//! Per-run ephemeral store of every node's latest output, keyed by
//! `(node name, port name)`. Fully cleared at the start of every `execute`
//! for regular nodes; trigger outputs survive so a trigger carries state
//! across runs.

use std::collections::HashMap;

use nodes::{NodeOutput, NormalizedPort, PortValue};

use crate::workflow::Workflow;

#[derive(Debug, Default)]
pub struct ExecutionStateManager {
    outputs: HashMap<(String, String), NormalizedPort>,
}

impl ExecutionStateManager {
    pub fn new() -> Self {
        Self { outputs: HashMap::new() }
    }

    /// Record one port's value for `node`, normalizing it for storage.
    pub fn record_output(&mut self, node: &str, port: &str, value: PortValue) {
        self.outputs.insert((node.to_string(), port.to_string()), NormalizedPort::from(value));
    }

    /// Record every port of a node's full output at once.
    pub fn record_node_output(&mut self, node: &str, output: &NodeOutput) {
        for (port, value) in output {
            self.record_output(node, port, value.clone());
        }
    }

    pub fn get(&self, node: &str, port: &str) -> Option<&NormalizedPort> {
        self.outputs.get(&(node.to_string(), port.to_string()))
    }

    /// Drop every recorded output belonging to a regular (non-trigger)
    /// node, leaving trigger outputs in place.
    pub fn reset_for_new_run(&mut self, workflow: &Workflow) {
        self.outputs.retain(|(node, _), _| workflow.is_trigger(node));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodes::{Item, NodeHandle, NodeTypeRegistry, Port, RetryPolicy};

    fn registry() -> NodeTypeRegistry {
        let mut r = NodeTypeRegistry::new();
        r.register("mock", || {
            std::sync::Arc::new(nodes::mock::MockProcessor::returning("mock", serde_json::json!({})))
        });
        nodes::builtin::register_builtins(&mut r);
        r
    }

    #[test]
    fn reset_for_new_run_keeps_trigger_output_and_drops_regular_output() {
        let reg = registry();
        let mut wf = Workflow::new("t");
        wf.add_trigger_node(
            NodeHandle::new(
                "trig", "trig", "manual-trigger", 1, (0.0, 0.0), true, false,
                RetryPolicy::default(), false, vec![], vec![Port::new("main", "any")],
            ),
            &reg,
        )
        .unwrap();
        wf.add_node(
            NodeHandle::new(
                "a", "a", "mock", 1, (0.0, 0.0), false, false,
                RetryPolicy::default(), false, vec![Port::new("main", "any")], vec![Port::new("main", "any")],
            ),
            &reg,
        )
        .unwrap();

        let mut state = ExecutionStateManager::new();
        state.record_output("trig", "main", PortValue::Single(Item::new(serde_json::json!({}))));
        state.record_output("a", "main", PortValue::Single(Item::new(serde_json::json!({}))));

        state.reset_for_new_run(&wf);

        assert!(state.get("trig", "main").is_some());
        assert!(state.get("a", "main").is_none());
    }
}
