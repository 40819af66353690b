//! `nodes` crate — the `NodeProcessor` trait, per-node lifecycle state
//! machine, the node type registry, and built-in node stand-ins.
//!
//! Every node type — built-in and plugin alike — implements
//! [`NodeProcessor`]. The engine crate dispatches execution through this
//! trait object and drives lifecycle transitions via [`lifecycle::NodeHandle`].

pub mod builtin;
pub mod data;
pub mod error;
pub mod lifecycle;
pub mod mock;
pub mod ports;
pub mod registry;
pub mod traits;

pub use data::{BinaryData, DataRecord, DataSource, Item, NodeInput, NodeOutput, NormalizedPort, PortValue};
pub use error::{NodeError, ValidationError};
pub use lifecycle::{ErrorData, NodeHandle, NodeState, RetryPolicy};
pub use ports::{LinkType, Port};
pub use registry::NodeTypeRegistry;
pub use traits::{CancelSignal, ExecutionContext, NodeProcessor};
