//! Core types for dataflow graphs
//!
//! These types define node handles, the record type flowing between nodes,
//! and the per-pass frame context supplied by a driving loop.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key/value record passed into and out of node transforms
pub type Record = serde_json::Map<String, Value>;

/// Identifier of a `NodeGraph` arena
pub type GraphId = u64;

/// Handle to a node stored in a `NodeGraph`
///
/// Handles are cheap to copy and compare by identity. A handle is only
/// meaningful for the graph that issued it; slots are never reused, so a
/// handle never refers to a different node later on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) graph: GraphId,
    pub(crate) index: usize,
}

impl NodeId {
    /// Slot index of this node within its graph
    pub fn index(&self) -> usize {
        self.index
    }

    /// Identifier of the graph that issued this handle
    pub fn graph(&self) -> GraphId {
        self.graph
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@graph{}", self.index, self.graph)
    }
}

/// Merge `source` into `target`, overwriting colliding keys
pub fn merge_into(target: &mut Record, source: &Record) {
    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }
}

/// Convert a transform result into an output record
///
/// Objects become the record; any other value counts as an empty output.
pub fn record_from_value(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

/// Timing data supplied by an external update loop for a single pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameContext {
    /// Frame counter, starting at zero
    pub frame: u64,
    /// Milliseconds since the previous frame
    pub delta_ms: f64,
    /// Milliseconds since the loop started
    pub elapsed_ms: f64,
}

impl FrameContext {
    pub fn new(frame: u64, delta_ms: f64, elapsed_ms: f64) -> Self {
        Self {
            frame,
            delta_ms,
            elapsed_ms,
        }
    }

    /// Serialize into a record usable as a pipeline context
    pub fn to_record(&self) -> Record {
        serde_json::to_value(self)
            .map(record_from_value)
            .unwrap_or_default()
    }
}
