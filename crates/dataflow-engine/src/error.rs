//! Error types for the dataflow engine

use thiserror::Error;

use crate::types::NodeId;

/// Result type alias using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while building, linking or running a graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// A live node already holds this label
    #[error("Node '{label}' has already been created (labels must be unique)")]
    DuplicateLabel { label: String },

    /// Self-link, re-link of an existing edge, or unlink of a missing edge
    #[error("Invalid link between '{node}' and '{other}': {reason}")]
    InvalidLink {
        node: String,
        other: String,
        reason: String,
    },

    /// Pipeline constructed with zero nodes
    #[error("At least one node is required to build a pipeline")]
    EmptyPipeline,

    /// The same node was listed twice
    #[error("Node '{label}' was provided to the pipeline more than once")]
    DuplicateMember { label: String },

    /// Node is already owned by another live pipeline
    #[error("Node '{label}' already belongs to another pipeline")]
    CrossPipelineNode { label: String },

    /// A recorded parent/child relationship is one-sided
    #[error("Nodes '{node}' and '{other}' have a broken parent/child connection")]
    BrokenLinkInvariant { node: String, other: String },

    /// A member links to a node outside the pipeline
    #[error("Node '{node}' is linked to '{other}', which was not provided to the pipeline")]
    DanglingReference { node: String, other: String },

    /// No member without parents
    #[error("No entry node detected (every node has at least one parent)")]
    NoEntryPoint,

    /// The graph contains a cycle
    #[error("Cycle detected in graph at node '{label}'")]
    CycleDetected { label: String },

    /// Handle does not belong to this graph
    #[error("Unknown node handle {id}")]
    UnknownNode { id: NodeId },

    /// Handle refers to a node that has been destroyed
    #[error("Node '{label}' has been destroyed")]
    DestroyedNode { label: String },

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    /// Create an invalid link error
    pub fn invalid_link(
        node: impl Into<String>,
        other: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidLink {
            node: node.into(),
            other: other.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error was raised by pipeline validation
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyPipeline
                | Self::DuplicateMember { .. }
                | Self::CrossPipelineNode { .. }
                | Self::BrokenLinkInvariant { .. }
                | Self::DanglingReference { .. }
                | Self::NoEntryPoint
                | Self::CycleDetected { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_labels() {
        let err = GraphError::invalid_link("a", "b", "already linked");
        assert_eq!(
            err.to_string(),
            "Invalid link between 'a' and 'b': already linked"
        );

        let err = GraphError::DanglingReference {
            node: "child".to_string(),
            other: "stray".to_string(),
        };
        assert!(err.to_string().contains("'stray'"));
    }

    #[test]
    fn test_is_validation() {
        assert!(GraphError::NoEntryPoint.is_validation());
        assert!(GraphError::CycleDetected {
            label: "a".to_string()
        }
        .is_validation());
        assert!(!GraphError::DuplicateLabel {
            label: "a".to_string()
        }
        .is_validation());
        assert!(!GraphError::Config("bad".to_string()).is_validation());
    }
}
