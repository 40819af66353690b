//! `schedule-trigger` — a stand-in for a cron-style trigger. Advances an
//! internal per-node tick counter on every fire, demonstrating the one
//! thing the kernel cares about a real schedule trigger doing: carrying a
//! cursor across runs. Real cron parsing and wall-clock scheduling are out
//! of scope.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::data::{Item, NodeOutput, PortValue};
use crate::error::NodeError;
use crate::traits::{ExecutionContext, NodeProcessor};

pub struct ScheduleTriggerProcessor {
    ticks: Mutex<HashMap<String, u64>>,
}

impl ScheduleTriggerProcessor {
    pub fn new() -> Self {
        Self { ticks: Mutex::new(HashMap::new()) }
    }
}

impl Default for ScheduleTriggerProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeProcessor for ScheduleTriggerProcessor {
    async fn process(&self, ctx: &ExecutionContext) -> Result<NodeOutput, NodeError> {
        let tick = {
            let mut ticks = self.ticks.lock().unwrap();
            let entry = ticks.entry(ctx.node_name.clone()).or_insert(0);
            *entry += 1;
            *entry
        };

        let mut output = NodeOutput::new();
        output.insert("main".to_string(), PortValue::Single(Item::new(json!({ "tick": tick }))));
        Ok(output)
    }
}
