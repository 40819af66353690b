//! Built-in node type stand-ins.
//!
//! These are thin external-collaborator stubs proving the registry
//! contract for `manual-trigger`, `schedule-trigger`, `javascript`, and
//! `http-request`. Concrete HTTP/JS/schedule semantics are out of scope
//! for the execution kernel.

mod http_request;
mod javascript;
mod manual_trigger;
mod schedule_trigger;

pub use http_request::HttpRequestProcessor;
pub use javascript::JavaScriptProcessor;
pub use manual_trigger::ManualTriggerProcessor;
pub use schedule_trigger::ScheduleTriggerProcessor;

use std::sync::Arc;

use crate::registry::NodeTypeRegistry;
use crate::traits::NodeProcessor;

/// Register every built-in stand-in under its registry key.
pub fn register_builtins(registry: &mut NodeTypeRegistry) {
    registry.register("manual-trigger", || {
        Arc::new(ManualTriggerProcessor) as Arc<dyn NodeProcessor>
    });
    registry.register("schedule-trigger", || {
        Arc::new(ScheduleTriggerProcessor::new()) as Arc<dyn NodeProcessor>
    });
    registry.register("javascript", || Arc::new(JavaScriptProcessor) as Arc<dyn NodeProcessor>);
    registry.register("http-request", || Arc::new(HttpRequestProcessor) as Arc<dyn NodeProcessor>);
}
