//! `javascript` — stand-in for the sandboxed JS execution node. Running
//! arbitrary script bodies is an external collaborator's concern (its own
//! sandbox, its own expression language); the kernel only needs the
//! registry contract to hold for it.

use async_trait::async_trait;

use crate::data::NodeOutput;
use crate::error::NodeError;
use crate::traits::{ExecutionContext, NodeProcessor};

pub struct JavaScriptProcessor;

#[async_trait]
impl NodeProcessor for JavaScriptProcessor {
    async fn process(&self, ctx: &ExecutionContext) -> Result<NodeOutput, NodeError> {
        Err(NodeError::Fatal(format!(
            "node '{}': javascript execution is provided by an external sandbox, not the kernel",
            ctx.node_name
        )))
    }
}
