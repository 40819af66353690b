//! Data-flow assembly: turning recorded producer outputs into the input a
//! consumer node observes.
//!
//! Rules:
//! 1. Every port value is normalized to an array of items internally.
//! 2. A consumer observes a single record (not a one-element array) only
//!    when its input port has exactly one incoming link *and* the producer
//!    originally emitted a single record on that port.
//! 3. Items without explicit lineage get a default `paired_item` assigned
//!    by index at normalization time (handled in `PortValue::into_items`).
//! 4. Binary content travels attached to its `Item`, untouched.
//! 5. A node's error output is a logically separate port (`"error"`),
//!    never merged into its regular output ports.

use nodes::{Item, NodeInput, NodeOutput, PortValue};

use crate::state_manager::ExecutionStateManager;
use crate::workflow::Workflow;

/// The name of the port a failed, `continueOnFail` node's error record is
/// published on for downstream consumers.
pub const ERROR_PORT: &str = "error";

/// Assemble the input a node observes this run, reading every upstream
/// port value its input links reference out of `state`.
pub fn assemble_input(workflow: &Workflow, state: &ExecutionStateManager, node_name: &str) -> NodeInput {
    let mut input = NodeInput::new();
    let Some(node) = workflow.get_node(node_name) else { return input };

    for port in &node.inputs {
        let links: Vec<_> = workflow.links_into(node_name, &port.name).collect();
        if links.is_empty() {
            continue;
        }

        let mut items: Vec<Item> = Vec::new();
        for link in &links {
            if let Some(normalized) = state.get(&link.source_node, &link.source_port) {
                items.extend(normalized.items.iter().cloned());
            }
        }

        let single_passthrough = links.len() == 1
            && state
                .get(&links[0].source_node, &links[0].source_port)
                .is_some_and(|normalized| normalized.was_single);

        let value = if single_passthrough && items.len() == 1 {
            PortValue::Single(items.into_iter().next().expect("checked len == 1"))
        } else {
            PortValue::Many(items)
        };
        input.insert(port.name.clone(), value);
    }

    input
}

/// Build the output of a node that failed but is configured to continue:
/// every declared output port gets an empty array (so nothing stale is
/// observed downstream) except `ERROR_PORT`, which carries the failure as
/// a single record.
pub fn error_output(node: &nodes::NodeHandle, message: &str, cause: Option<&str>) -> NodeOutput {
    let mut output = NodeOutput::new();
    for port in &node.outputs {
        output.insert(port.name.clone(), PortValue::Many(Vec::new()));
    }
    let mut record = serde_json::json!({ "message": message });
    if let Some(cause) = cause {
        record["cause"] = serde_json::Value::String(cause.to_string());
    }
    output.insert(ERROR_PORT.to_string(), PortValue::Single(Item::new(record)));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodes::{DataSource, NodeTypeRegistry, Port};
    use pretty_assertions::assert_eq;

    fn registry() -> NodeTypeRegistry {
        let mut r = NodeTypeRegistry::new();
        r.register("mock", || {
            std::sync::Arc::new(nodes::mock::MockProcessor::returning("mock", serde_json::json!({})))
        });
        r
    }

    fn node(name: &str) -> nodes::NodeHandle {
        nodes::NodeHandle::new(
            name,
            name,
            "mock",
            1,
            (0.0, 0.0),
            false,
            false,
            nodes::RetryPolicy::default(),
            false,
            vec![Port::new("main", "any")],
            vec![Port::new("main", "any")],
        )
    }

    #[test]
    fn single_incoming_link_with_single_producer_passes_through_unwrapped() {
        let reg = registry();
        let mut wf = Workflow::new("t");
        wf.add_node(node("a"), &reg).unwrap();
        wf.add_node(node("b"), &reg).unwrap();
        wf.link_nodes("a", "main", "b", "main").unwrap();

        let mut state = ExecutionStateManager::new();
        state.record_output("a", "main", PortValue::Single(Item::new(serde_json::json!({"x": 1}))));

        let input = assemble_input(&wf, &state, "b");
        match input.get("main").unwrap() {
            PortValue::Single(item) => assert_eq!(item.json, serde_json::json!({"x": 1})),
            PortValue::Many(_) => panic!("expected single passthrough"),
        }
    }

    #[test]
    fn two_incoming_links_concatenate_as_array() {
        let reg = registry();
        let mut wf = Workflow::new("t");
        wf.add_node(node("a"), &reg).unwrap();
        wf.add_node(node("b"), &reg).unwrap();
        wf.add_node(node("c"), &reg).unwrap();
        wf.link_nodes("a", "main", "c", "main").unwrap();
        wf.link_nodes("b", "main", "c", "main").unwrap();

        let mut state = ExecutionStateManager::new();
        state.record_output("a", "main", PortValue::Single(Item::new(serde_json::json!(1))));
        state.record_output("b", "main", PortValue::Single(Item::new(serde_json::json!(2))));

        let input = assemble_input(&wf, &state, "c");
        match input.get("main").unwrap() {
            PortValue::Many(items) => assert_eq!(items.len(), 2),
            PortValue::Single(_) => panic!("expected array from two links"),
        }
    }

    #[test]
    fn single_link_from_array_producer_stays_array() {
        let reg = registry();
        let mut wf = Workflow::new("t");
        wf.add_node(node("a"), &reg).unwrap();
        wf.add_node(node("b"), &reg).unwrap();
        wf.link_nodes("a", "main", "b", "main").unwrap();

        let mut state = ExecutionStateManager::new();
        state.record_output(
            "a",
            "main",
            PortValue::Many(vec![Item::new(serde_json::json!(1)), Item::new(serde_json::json!(2))]),
        );

        let input = assemble_input(&wf, &state, "b");
        match input.get("main").unwrap() {
            PortValue::Many(items) => assert_eq!(items.len(), 2),
            PortValue::Single(_) => panic!("producer emitted an array, consumer must see an array"),
        }
    }

    #[test]
    fn default_paired_item_assigned_by_index() {
        let value = PortValue::Many(vec![Item::new(serde_json::json!("a")), Item::new(serde_json::json!("b"))]);
        let items = value.into_items();
        assert_eq!(items[0].paired_item, Some(DataSource::new(0, Some(0))));
        assert_eq!(items[1].paired_item, Some(DataSource::new(1, Some(0))));
    }
}
