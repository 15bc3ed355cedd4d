//! Construction parameters for nodes and pipelines
//!
//! Provides a fluent API for describing a node or pipeline before handing it
//! to `NodeGraph::add_node` or `Pipeline::new`.

use crate::node::Transform;
use crate::types::{NodeId, Record};

/// Parameters for creating a node
///
/// # Example
///
/// ```ignore
/// let source = graph.add_node(NodeParams::new(|_: Record| json!({"two": "two"})).with_label("source"))?;
/// let sink = graph.add_node(NodeParams::new(PassThrough).with_parents([source]))?;
/// ```
pub struct NodeParams {
    pub(crate) label: Option<String>,
    pub(crate) parents: Vec<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) transform: Box<dyn Transform>,
}

impl NodeParams {
    /// Describe a node computing its output with `transform`
    pub fn new(transform: impl Transform + 'static) -> Self {
        Self {
            label: None,
            parents: Vec::new(),
            children: Vec::new(),
            transform: Box::new(transform),
        }
    }

    /// Use an explicit label instead of a generated one
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Link these nodes as parents on creation
    pub fn with_parents(mut self, parents: impl IntoIterator<Item = NodeId>) -> Self {
        self.parents.extend(parents);
        self
    }

    /// Link these nodes as children on creation
    pub fn with_children(mut self, children: impl IntoIterator<Item = NodeId>) -> Self {
        self.children.extend(children);
        self
    }
}

/// Parameters for creating a pipeline
///
/// # Example
///
/// ```ignore
/// let pipeline = Pipeline::new(
///     &mut graph,
///     PipelineParams::new(vec![source, sink]).with_label("render"),
/// )?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct PipelineParams {
    pub(crate) label: Option<String>,
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) globals: Record,
}

impl PipelineParams {
    /// Describe a pipeline over the given member nodes
    pub fn new(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            label: None,
            nodes: nodes.into_iter().collect(),
            globals: Record::new(),
        }
    }

    /// Use an explicit label instead of a generated one
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the globals merged into every node's input on every pass
    pub fn with_globals(mut self, globals: Record) -> Self {
        self.globals = globals;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::PassThrough;
    use serde_json::json;

    fn id(index: usize) -> NodeId {
        NodeId { graph: 0, index }
    }

    #[test]
    fn test_node_params() {
        let params = NodeParams::new(PassThrough)
            .with_label("n")
            .with_parents([id(0)])
            .with_children(vec![id(1), id(2)]);

        assert_eq!(params.label.as_deref(), Some("n"));
        assert_eq!(params.parents, vec![id(0)]);
        assert_eq!(params.children, vec![id(1), id(2)]);
    }

    #[test]
    fn test_node_params_accepts_closures() {
        let params = NodeParams::new(|_inputs: Record| json!({"k": 1}));
        assert!(params.label.is_none());
        assert!(params.parents.is_empty());
    }

    #[test]
    fn test_pipeline_params() {
        let mut globals = Record::new();
        globals.insert("info".to_string(), json!("info"));

        let params = PipelineParams::new([id(0), id(1)])
            .with_label("p")
            .with_globals(globals);

        assert_eq!(params.label.as_deref(), Some("p"));
        assert_eq!(params.nodes.len(), 2);
        assert_eq!(params.globals.get("info"), Some(&json!("info")));
    }
}
