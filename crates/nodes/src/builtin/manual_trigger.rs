//! `manual-trigger` — fires once, on demand, with whatever payload the
//! caller supplied as config. No external event source to speak of.

use async_trait::async_trait;

use crate::data::{Item, NodeOutput, PortValue};
use crate::error::NodeError;
use crate::traits::{ExecutionContext, NodeProcessor};

pub struct ManualTriggerProcessor;

#[async_trait]
impl NodeProcessor for ManualTriggerProcessor {
    async fn process(&self, ctx: &ExecutionContext) -> Result<NodeOutput, NodeError> {
        let mut output = NodeOutput::new();
        output.insert("main".to_string(), PortValue::Single(Item::new(ctx.config.clone())));
        Ok(output)
    }
}
