//! `http-request` — stand-in for the HTTP node. Issuing real network
//! requests is an external collaborator's concern; the kernel only needs
//! the registry contract to hold for it.

use async_trait::async_trait;

use crate::data::NodeOutput;
use crate::error::NodeError;
use crate::traits::{ExecutionContext, NodeProcessor};

pub struct HttpRequestProcessor;

#[async_trait]
impl NodeProcessor for HttpRequestProcessor {
    async fn process(&self, ctx: &ExecutionContext) -> Result<NodeOutput, NodeError> {
        Err(NodeError::Fatal(format!(
            "node '{}': http requests are provided by an external client, not the kernel",
            ctx.node_name
        )))
    }
}
