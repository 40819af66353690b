//! Graph model: nodes, ports, links, and the workflow that owns them.

use std::collections::HashMap;

use nodes::{DataRecord, NodeHandle, NodeTypeRegistry};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// Workflow-level run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Tuning knobs that govern a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSettings {
    pub enable_parallel_execution: bool,
    /// `0` means unlimited.
    pub max_parallel_executions: u32,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self { enable_parallel_execution: true, max_parallel_executions: 0 }
    }
}

/// A directed connection from one node's output port to another node's
/// input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source_node: String,
    pub source_port: String,
    pub target_node: String,
    pub target_port: String,
}

/// The JSON wire format for a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExport {
    pub version: u32,
    pub id: Uuid,
    pub name: String,
    pub nodes: Vec<NodeHandle>,
    pub triggers: Vec<NodeHandle>,
    pub links: Vec<Link>,
    pub static_data: DataRecord,
    pub settings: WorkflowSettings,
}

/// A complete workflow definition: nodes and triggers in separate maps
/// (spec invariant: "the two maps are disjoint on name"), links, and the
/// derived forward/reverse link indices.
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    pub settings: WorkflowSettings,
    nodes: HashMap<String, NodeHandle>,
    triggers: HashMap<String, NodeHandle>,
    links: Vec<Link>,
    links_by_source: HashMap<(String, String), Vec<usize>>,
    links_by_target: HashMap<(String, String), Vec<usize>>,
    pub static_data: DataRecord,
    run_state: WorkflowState,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            settings: WorkflowSettings::default(),
            nodes: HashMap::new(),
            triggers: HashMap::new(),
            links: Vec::new(),
            links_by_source: HashMap::new(),
            links_by_target: HashMap::new(),
            static_data: DataRecord::Null,
            run_state: WorkflowState::Idle,
        }
    }

    pub fn run_state(&self) -> WorkflowState {
        self.run_state
    }

    pub(crate) fn set_run_state(&mut self, state: WorkflowState) {
        self.run_state = state;
    }

    pub fn nodes(&self) -> &HashMap<String, NodeHandle> {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut HashMap<String, NodeHandle> {
        &mut self.nodes
    }

    pub fn triggers(&self) -> &HashMap<String, NodeHandle> {
        &self.triggers
    }

    pub fn triggers_mut(&mut self) -> &mut HashMap<String, NodeHandle> {
        &mut self.triggers
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Look up a node by name, searching both maps transparently (see
    /// DESIGN.md).
    pub fn get_node(&self, name: &str) -> Option<&NodeHandle> {
        self.nodes.get(name).or_else(|| self.triggers.get(name))
    }

    pub fn get_node_mut(&mut self, name: &str) -> Option<&mut NodeHandle> {
        if self.nodes.contains_key(name) {
            self.nodes.get_mut(name)
        } else {
            self.triggers.get_mut(name)
        }
    }

    pub fn is_trigger(&self, name: &str) -> bool {
        self.triggers.contains_key(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name) || self.triggers.contains_key(name)
    }

    /// Links whose target is `(node, port)`, in insertion order.
    pub fn links_into(&self, node: &str, port: &str) -> impl Iterator<Item = &Link> {
        self.links_by_target
            .get(&(node.to_string(), port.to_string()))
            .into_iter()
            .flatten()
            .map(move |&idx| &self.links[idx])
    }

    /// Add a regular (non-trigger) node. Rejects trigger nodes, nodes with
    /// an unregistered `node_type`, and duplicate names.
    pub fn add_node(&mut self, node: NodeHandle, registry: &NodeTypeRegistry) -> Result<(), EngineError> {
        if node.is_trigger {
            return Err(EngineError::IsATrigger(node.name));
        }
        self.insert_checked(node, registry, false, &mut |w, n| {
            w.nodes.insert(n.name.clone(), n);
        })
    }

    /// Add a trigger node. Rejects non-trigger nodes, nodes with an
    /// unregistered `node_type`, and duplicate names.
    pub fn add_trigger_node(&mut self, node: NodeHandle, registry: &NodeTypeRegistry) -> Result<(), EngineError> {
        if !node.is_trigger {
            return Err(EngineError::NotATrigger(node.name));
        }
        self.insert_checked(node, registry, false, &mut |w, n| {
            w.triggers.insert(n.name.clone(), n);
        })
    }

    /// Like [`add_node`](Self::add_node), but skips the `node_type`
    /// registration check when `allow_missing` is set. Used by `import` to
    /// accept plugin node types this build doesn't have registered while
    /// still enforcing the disjoint-map and unique-name invariants.
    fn add_node_allow_missing(
        &mut self,
        node: NodeHandle,
        registry: &NodeTypeRegistry,
        allow_missing: bool,
    ) -> Result<(), EngineError> {
        if node.is_trigger {
            return Err(EngineError::IsATrigger(node.name));
        }
        self.insert_checked(node, registry, allow_missing, &mut |w, n| {
            w.nodes.insert(n.name.clone(), n);
        })
    }

    /// Like [`add_trigger_node`](Self::add_trigger_node), but skips the
    /// `node_type` registration check when `allow_missing` is set.
    fn add_trigger_node_allow_missing(
        &mut self,
        node: NodeHandle,
        registry: &NodeTypeRegistry,
        allow_missing: bool,
    ) -> Result<(), EngineError> {
        if !node.is_trigger {
            return Err(EngineError::NotATrigger(node.name));
        }
        self.insert_checked(node, registry, allow_missing, &mut |w, n| {
            w.triggers.insert(n.name.clone(), n);
        })
    }

    fn insert_checked(
        &mut self,
        node: NodeHandle,
        registry: &NodeTypeRegistry,
        allow_missing: bool,
        insert: &mut dyn FnMut(&mut Self, NodeHandle),
    ) -> Result<(), EngineError> {
        if !allow_missing && !registry.has(&node.node_type) {
            return Err(EngineError::UnknownNodeType(node.node_type.clone()));
        }
        if self.contains(&node.name) {
            return Err(EngineError::DuplicateNodeName(node.name.clone()));
        }
        insert(self, node);
        Ok(())
    }

    /// Remove a node (trigger or regular) by name, along with every link
    /// that references it. Returns whether a node was removed.
    pub fn remove_node(&mut self, name: &str) -> bool {
        let removed = self.nodes.remove(name).is_some() || self.triggers.remove(name).is_some();
        if removed {
            self.links.retain(|l| l.source_node != name && l.target_node != name);
            self.rebuild_indices();
        }
        removed
    }

    /// Connect an output port to an input port. Both endpoints must exist
    /// and expose the named port. Duplicate links (same 4-tuple) are
    /// idempotent.
    pub fn link_nodes(
        &mut self,
        source_node: impl Into<String>,
        source_port: impl Into<String>,
        target_node: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Result<(), EngineError> {
        let link = Link {
            source_node: source_node.into(),
            source_port: source_port.into(),
            target_node: target_node.into(),
            target_port: target_port.into(),
        };
        self.validate_link(&link)?;
        if self.links.contains(&link) {
            return Ok(());
        }
        let index = self.links.len();
        self.links_by_source
            .entry((link.source_node.clone(), link.source_port.clone()))
            .or_default()
            .push(index);
        self.links_by_target
            .entry((link.target_node.clone(), link.target_port.clone()))
            .or_default()
            .push(index);
        self.links.push(link);
        Ok(())
    }

    fn validate_link(&self, link: &Link) -> Result<(), EngineError> {
        let source = self.get_node(&link.source_node).ok_or_else(|| EngineError::UnknownNodeReference {
            node: link.source_node.clone(),
            side: "source",
        })?;
        let target = self.get_node(&link.target_node).ok_or_else(|| EngineError::UnknownNodeReference {
            node: link.target_node.clone(),
            side: "target",
        })?;
        if !source.outputs.iter().any(|p| p.name == link.source_port) {
            return Err(EngineError::UnknownPort {
                node: link.source_node.clone(),
                port: link.source_port.clone(),
                side: "source",
            });
        }
        if !target.inputs.iter().any(|p| p.name == link.target_port) {
            return Err(EngineError::UnknownPort {
                node: link.target_node.clone(),
                port: link.target_port.clone(),
                side: "target",
            });
        }
        Ok(())
    }

    fn rebuild_indices(&mut self) {
        self.links_by_source.clear();
        self.links_by_target.clear();
        for (index, link) in self.links.iter().enumerate() {
            self.links_by_source
                .entry((link.source_node.clone(), link.source_port.clone()))
                .or_default()
                .push(index);
            self.links_by_target
                .entry((link.target_node.clone(), link.target_port.clone()))
                .or_default()
                .push(index);
        }
    }

    /// Produce a pure-data round-trip representation of this workflow.
    pub fn export(&self) -> WorkflowExport {
        WorkflowExport {
            version: 1,
            id: self.id,
            name: self.name.clone(),
            nodes: self.nodes.values().cloned().collect(),
            triggers: self.triggers.values().cloned().collect(),
            links: self.links.clone(),
            static_data: self.static_data.clone(),
            settings: WorkflowSettings {
                enable_parallel_execution: self.settings.enable_parallel_execution,
                max_parallel_executions: self.settings.max_parallel_executions,
            },
        }
    }

    /// Parse and reconstruct a workflow straight from its JSON wire form.
    /// Malformed JSON is reported as [`EngineError::MalformedExport`];
    /// everything else is delegated to [`Self::import`].
    pub fn import_json(
        json: &str,
        registry: &NodeTypeRegistry,
        allow_missing: bool,
    ) -> Result<Workflow, EngineError> {
        let export: WorkflowExport =
            serde_json::from_str(json).map_err(|err| EngineError::MalformedExport(err.to_string()))?;
        Self::import(export, registry, allow_missing)
    }

    /// Reconstruct a workflow from its exported form. Fails loudly on an
    /// unregistered `nodeType` unless `allow_missing` is set, and on any
    /// dangling link.
    pub fn import(
        export: WorkflowExport,
        registry: &NodeTypeRegistry,
        allow_missing: bool,
    ) -> Result<Workflow, EngineError> {
        let mut workflow = Workflow {
            id: export.id,
            name: export.name,
            settings: export.settings,
            nodes: HashMap::new(),
            triggers: HashMap::new(),
            links: Vec::new(),
            links_by_source: HashMap::new(),
            links_by_target: HashMap::new(),
            static_data: export.static_data,
            run_state: WorkflowState::Idle,
        };

        for node in export.nodes {
            workflow.add_node_allow_missing(node, registry, allow_missing)?;
        }
        for trigger in export.triggers {
            workflow.add_trigger_node_allow_missing(trigger, registry, allow_missing)?;
        }
        for link in export.links {
            workflow.link_nodes(link.source_node, link.source_port, link.target_node, link.target_port)?;
        }

        Ok(workflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodes::{NodeHandle, Port, RetryPolicy};
    use pretty_assertions::assert_eq;

    fn registry() -> NodeTypeRegistry {
        let mut r = NodeTypeRegistry::new();
        r.register("mock", || {
            std::sync::Arc::new(nodes::mock::MockProcessor::returning("mock", serde_json::json!({})))
        });
        r
    }

    fn regular(name: &str) -> NodeHandle {
        NodeHandle::new(
            name, name, "mock", 1, (0.0, 0.0), false, false,
            RetryPolicy::default(), false,
            vec![Port::new("in", "any")], vec![Port::new("out", "any")],
        )
    }

    fn trigger(name: &str) -> NodeHandle {
        NodeHandle::new(
            name, name, "mock", 1, (0.0, 0.0), true, false,
            RetryPolicy::default(), false, vec![], vec![Port::new("out", "any")],
        )
    }

    #[test]
    fn add_node_rejects_a_trigger_node() {
        let reg = registry();
        let mut wf = Workflow::new("t");
        let err = wf.add_node(trigger("trig"), &reg).unwrap_err();
        assert!(matches!(err, EngineError::IsATrigger(name) if name == "trig"));
    }

    #[test]
    fn add_trigger_node_rejects_a_regular_node() {
        let reg = registry();
        let mut wf = Workflow::new("t");
        let err = wf.add_trigger_node(regular("a"), &reg).unwrap_err();
        assert!(matches!(err, EngineError::NotATrigger(name) if name == "a"));
    }

    #[test]
    fn add_node_rejects_unregistered_node_type() {
        let reg = NodeTypeRegistry::new();
        let mut wf = Workflow::new("t");
        let err = wf.add_node(regular("a"), &reg).unwrap_err();
        assert!(matches!(err, EngineError::UnknownNodeType(t) if t == "mock"));
    }

    #[test]
    fn add_node_rejects_duplicate_name_across_either_map() {
        let reg = registry();
        let mut wf = Workflow::new("t");
        wf.add_node(regular("a"), &reg).unwrap();
        let err = wf.add_node(regular("a"), &reg).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateNodeName(name) if name == "a"));
    }

    #[test]
    fn link_nodes_rejects_unknown_port() {
        let reg = registry();
        let mut wf = Workflow::new("t");
        wf.add_node(regular("a"), &reg).unwrap();
        wf.add_node(regular("b"), &reg).unwrap();
        let err = wf.link_nodes("a", "nope", "b", "in").unwrap_err();
        assert!(matches!(err, EngineError::UnknownPort { side: "source", .. }));
    }

    #[test]
    fn link_nodes_rejects_unknown_node() {
        let reg = registry();
        let mut wf = Workflow::new("t");
        wf.add_node(regular("a"), &reg).unwrap();
        let err = wf.link_nodes("a", "out", "ghost", "in").unwrap_err();
        assert!(matches!(err, EngineError::UnknownNodeReference { side: "target", .. }));
    }

    #[test]
    fn duplicate_links_are_idempotent() {
        let reg = registry();
        let mut wf = Workflow::new("t");
        wf.add_node(regular("a"), &reg).unwrap();
        wf.add_node(regular("b"), &reg).unwrap();
        wf.link_nodes("a", "out", "b", "in").unwrap();
        wf.link_nodes("a", "out", "b", "in").unwrap();
        assert_eq!(wf.links().len(), 1);
    }

    #[test]
    fn remove_node_drops_its_links_and_rebuilds_indices() {
        let reg = registry();
        let mut wf = Workflow::new("t");
        wf.add_node(regular("a"), &reg).unwrap();
        wf.add_node(regular("b"), &reg).unwrap();
        wf.link_nodes("a", "out", "b", "in").unwrap();

        assert!(wf.remove_node("a"));
        assert!(wf.get_node("a").is_none());
        assert!(wf.links().is_empty());
        assert_eq!(wf.links_into("b", "in").count(), 0);
    }

    #[test]
    fn remove_node_reports_false_for_an_unknown_name() {
        let mut wf = Workflow::new("t");
        assert!(!wf.remove_node("ghost"));
    }

    #[test]
    fn get_node_searches_both_maps_and_is_trigger_distinguishes_them() {
        let reg = registry();
        let mut wf = Workflow::new("t");
        wf.add_trigger_node(trigger("trig"), &reg).unwrap();
        wf.add_node(regular("a"), &reg).unwrap();

        assert!(wf.get_node("trig").is_some());
        assert!(wf.get_node("a").is_some());
        assert!(wf.is_trigger("trig"));
        assert!(!wf.is_trigger("a"));
    }

    #[test]
    fn import_rejects_the_same_name_present_in_both_nodes_and_triggers() {
        let reg = registry();
        let export = WorkflowExport {
            version: 1,
            id: Uuid::new_v4(),
            name: "t".to_string(),
            nodes: vec![regular("dup")],
            triggers: vec![trigger("dup")],
            links: vec![],
            static_data: DataRecord::Null,
            settings: WorkflowSettings::default(),
        };
        let err = Workflow::import(export, &reg, false).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateNodeName(name) if name == "dup"));
    }

    #[test]
    fn import_rejects_a_trigger_flagged_node_placed_in_the_nodes_array() {
        let reg = registry();
        let export = WorkflowExport {
            version: 1,
            id: Uuid::new_v4(),
            name: "t".to_string(),
            nodes: vec![trigger("mislabeled")],
            triggers: vec![],
            links: vec![],
            static_data: DataRecord::Null,
            settings: WorkflowSettings::default(),
        };
        let err = Workflow::import(export, &reg, false).unwrap_err();
        assert!(matches!(err, EngineError::IsATrigger(name) if name == "mislabeled"));
    }
}
