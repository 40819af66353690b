//! Node type registry.
//!
//! Maps a registry key (lowercase kebab-case, e.g. `"manual-trigger"`) to a
//! factory producing a shared, stateless [`NodeProcessor`]. One processor
//! instance backs every `NodeHandle` of that `node_type` in a workflow —
//! per-instance data (config, state, results) lives on the `NodeHandle`,
//! not on the processor.

use std::collections::HashMap;
use std::sync::Arc;

use crate::traits::NodeProcessor;

type Factory = Arc<dyn Fn() -> Arc<dyn NodeProcessor> + Send + Sync>;

/// Process-wide registry of node type constructors. Construct one at
/// startup, register built-ins and plugins into it, and share it (behind
/// an `Arc`) with every `Workflow` and the execution engine.
#[derive(Clone, Default)]
pub struct NodeTypeRegistry {
    factories: HashMap<String, Factory>,
}

impl NodeTypeRegistry {
    pub fn new() -> Self {
        Self { factories: HashMap::new() }
    }

    /// Register a node type under `node_type`. Registering the same key
    /// twice replaces the previous factory — callers that want strict
    /// uniqueness should check `has` first.
    pub fn register<F>(&mut self, node_type: impl Into<String>, ctor: F)
    where
        F: Fn() -> Arc<dyn NodeProcessor> + Send + Sync + 'static,
    {
        self.factories.insert(node_type.into(), Arc::new(ctor));
    }

    pub fn has(&self, node_type: &str) -> bool {
        self.factories.contains_key(node_type)
    }

    /// Instantiate the processor registered for `node_type`, if any.
    pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeProcessor>> {
        self.factories.get(node_type).map(|ctor| ctor())
    }

    pub fn registered_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProcessor;

    #[test]
    fn register_and_get_roundtrip() {
        let mut registry = NodeTypeRegistry::new();
        registry.register("mock", || {
            Arc::new(MockProcessor::returning("mock", serde_json::json!({})))
        });
        assert!(registry.has("mock"));
        assert!(registry.get("mock").is_some());
        assert!(registry.get("missing").is_none());
    }
}
