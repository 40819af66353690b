//! Item data carried between node ports.
//!
//! A [`DataRecord`] is the recursively-nested key/value tree a node produces
//! or consumes. The engine never inspects its contents — it only moves
//! items from producer ports to consumer ports and stamps lineage on them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A recursively nested key/value tree (scalars, nulls, nested records,
/// arrays of records). `serde_json::Value` already has exactly this shape.
pub type DataRecord = serde_json::Value;

/// Lineage annotation recording which input item produced a given output
/// item. Composes across a chain of nodes: a node that derives N outputs
/// from N inputs should propagate the input items' `DataSource` onto the
/// corresponding outputs; a node that cannot determine a correspondence
/// (aggregations, merges) omits it and the engine fills in a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    /// Index of the source item within the producing node's output array.
    pub source_index: usize,
    /// Index of the input port the producing node read that item from, if
    /// the producer is itself a consumer of an upstream port.
    pub input_port_index: Option<usize>,
}

impl DataSource {
    pub fn new(source_index: usize, input_port_index: Option<usize>) -> Self {
        Self { source_index, input_port_index }
    }
}

/// Binary content (base64 blob + MIME) carried alongside a `DataRecord`.
/// The engine carries the pairing intact but never inspects the bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryData {
    pub mime_type: String,
    pub data_base64: String,
}

/// A single item flowing through a port: its JSON record, lineage, and any
/// attached binary content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub json: DataRecord,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub paired_item: Option<DataSource>,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub binary: HashMap<String, BinaryData>,
}

impl Item {
    pub fn new(json: DataRecord) -> Self {
        Self { json, paired_item: None, binary: HashMap::new() }
    }

    pub fn with_paired_item(mut self, source: DataSource) -> Self {
        self.paired_item = Some(source);
        self
    }
}

/// The caller-visible shape of a port's value: either a single record or an
/// array of records. Producers may return either shape; the engine
/// normalizes to an array internally (data-flow protocol rule 1) and
/// restores the appropriate shape to a consumer per rule 2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Single(Item),
    Many(Vec<Item>),
}

impl PortValue {
    /// Normalize to an array of items, assigning default `paired_item`
    /// lineage (`source_index = item-index, input_port_index = 0`) to any
    /// item that lacks one (rule 3).
    pub fn into_items(self) -> Vec<Item> {
        let mut items = match self {
            PortValue::Single(item) => vec![item],
            PortValue::Many(items) => items,
        };
        for (index, item) in items.iter_mut().enumerate() {
            if item.paired_item.is_none() {
                item.paired_item = Some(DataSource::new(index, Some(0)));
            }
        }
        items
    }

    /// Whether this value was provided as a single record rather than an
    /// array — load-bearing for data-flow protocol rule 2.
    pub fn was_single(&self) -> bool {
        matches!(self, PortValue::Single(_))
    }
}

/// A node's output: a mapping from output port name to that port's value.
pub type NodeOutput = HashMap<String, PortValue>;

/// A node's assembled input: a mapping from input port name to that port's
/// value, as observed by the consumer after data-flow assembly.
pub type NodeInput = HashMap<String, PortValue>;

/// The normalized, array-of-items form of a port's output as held by the
/// execution-state manager, together with whether the original producer
/// value was a single record (needed to reconstruct rule 2's single-item
/// passthrough for a lone incoming link).
#[derive(Debug, Clone, Default)]
pub struct NormalizedPort {
    pub items: Vec<Item>,
    pub was_single: bool,
}

impl From<PortValue> for NormalizedPort {
    fn from(value: PortValue) -> Self {
        let was_single = value.was_single();
        Self { items: value.into_items(), was_single }
    }
}
