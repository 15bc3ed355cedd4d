//! Node state and transforms
//!
//! A `Node` is a labelled unit of computation living in a `NodeGraph`.
//! It stores its links as handles into the same arena, the transform that
//! computes its output, and the cached result of the current pass.

use std::fmt;

use serde_json::Value;

use crate::types::{NodeId, Record};

/// User-supplied computation for a node
///
/// Receives the merged input record (context overlaid with parent outputs)
/// and returns the node's output. Returning anything other than a JSON object
/// produces an empty output record.
pub trait Transform: Send {
    fn apply(&mut self, inputs: Record) -> Value;
}

impl<F> Transform for F
where
    F: FnMut(Record) -> Value + Send,
{
    fn apply(&mut self, inputs: Record) -> Value {
        self(inputs)
    }
}

/// Transform installed on destroyed nodes
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransform;

impl Transform for NoopTransform {
    fn apply(&mut self, _inputs: Record) -> Value {
        Value::Object(Record::new())
    }
}

/// Passes every input through unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl Transform for PassThrough {
    fn apply(&mut self, inputs: Record) -> Value {
        Value::Object(inputs)
    }
}

/// A single node stored in a `NodeGraph`
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) label: String,
    pub(crate) parents: Vec<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) transform: Box<dyn Transform>,
    pub(crate) has_executed: bool,
    pub(crate) output: Record,
    pub(crate) destroyed: bool,
}

impl Node {
    pub(crate) fn new(id: NodeId, label: String, transform: Box<dyn Transform>) -> Self {
        Self {
            id,
            label,
            parents: Vec::new(),
            children: Vec::new(),
            transform,
            has_executed: false,
            output: Record::new(),
            destroyed: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Upstream nodes, in link order
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// Downstream nodes, in link order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the transform has run in the current pass
    pub fn has_executed(&self) -> bool {
        self.has_executed
    }

    /// Output of the last transform call, empty until executed
    pub fn output(&self) -> &Record {
        &self.output
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Whether `other` is one of this node's children
    pub fn is_parent_of(&self, other: NodeId) -> bool {
        self.children.contains(&other)
    }

    /// Whether `other` is one of this node's parents
    pub fn is_child_of(&self, other: NodeId) -> bool {
        self.parents.contains(&other)
    }

    pub(crate) fn reset(&mut self) {
        self.has_executed = false;
        self.output = Record::new();
    }

    pub(crate) fn run(&mut self, inputs: Record) {
        self.output = crate::types::record_from_value(self.transform.apply(inputs));
        self.has_executed = true;
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("parents", &self.parents)
            .field("children", &self.children)
            .field("has_executed", &self.has_executed)
            .field("output", &self.output)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(transform: Box<dyn Transform>) -> Node {
        Node::new(NodeId { graph: 0, index: 0 }, "n".to_string(), transform)
    }

    #[test]
    fn test_closure_transform() {
        let mut n = node(Box::new(|mut inputs: Record| {
            inputs.insert("seen".to_string(), json!(true));
            Value::Object(inputs)
        }));
        let mut inputs = Record::new();
        inputs.insert("a".to_string(), json!(1));
        n.run(inputs);

        assert!(n.has_executed());
        assert_eq!(Value::Object(n.output().clone()), json!({"a": 1, "seen": true}));
    }

    #[test]
    fn test_non_object_output_is_empty() {
        let mut n = node(Box::new(|_inputs: Record| Value::Null));
        n.run(Record::new());
        assert!(n.has_executed());
        assert!(n.output().is_empty());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut n = node(Box::new(PassThrough));
        let mut inputs = Record::new();
        inputs.insert("a".to_string(), json!("a"));
        n.run(inputs);
        assert_eq!(n.output().len(), 1);

        n.reset();
        assert!(!n.has_executed());
        assert!(n.output().is_empty());
    }

    #[test]
    fn test_noop_transform() {
        let mut noop = NoopTransform;
        let mut inputs = Record::new();
        inputs.insert("a".to_string(), json!(1));
        assert_eq!(noop.apply(inputs), json!({}));
    }

    #[test]
    fn test_stateful_closure() {
        let mut calls = 0u32;
        let mut n = node(Box::new(move |_inputs: Record| {
            calls += 1;
            json!({ "calls": calls })
        }));
        n.run(Record::new());
        n.reset();
        n.run(Record::new());
        assert_eq!(n.output().get("calls"), Some(&json!(2)));
    }
}
