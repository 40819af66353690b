//! Port and link-type definitions.

use serde::{Deserialize, Serialize};

/// How a link between two ports behaves. Only `Standard` is defined; the
/// variant exists so the wire format has room for future link kinds
/// without a breaking change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Standard,
}

impl Default for LinkType {
    fn default() -> Self {
        LinkType::Standard
    }
}

/// A named, typed connection point on a node. `data_type` is a free-form
/// human-visible tag used only for compatibility diagnostics — the engine
/// never coerces values based on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub link_type: LinkType,
}

impl Port {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self { name: name.into(), data_type: data_type.into(), link_type: LinkType::Standard }
    }
}
