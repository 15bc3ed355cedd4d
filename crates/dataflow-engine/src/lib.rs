//! Dataflow Engine - push-once, pull-complete node graphs
//!
//! This crate provides a small synchronous dataflow engine. Nodes wrap a
//! user transform, are wired into a directed graph, and are grouped into
//! validated pipelines that run as one pass:
//!
//! - A node runs only once all of its parents have run in the current pass
//! - Parent outputs are merged over the caller's context and fed to the node
//! - After running, the node attempts each of its children
//!
//! # Architecture
//!
//! - `NodeGraph`: arena owning every node, addressed by `NodeId` handles
//! - `Pipeline`: fixed-membership DAG with entry nodes, globals and outputs
//! - `Registries`: caller-owned label and ownership ledgers, shareable
//!   between graphs
//! - `EventSink`: observer for pipeline passes (not tied to any transport)
//!
//! # Example
//!
//! ```ignore
//! use dataflow_engine::{NodeGraph, NodeParams, PassThrough, Pipeline, PipelineParams, Record};
//! use serde_json::json;
//!
//! let mut graph = NodeGraph::new();
//! let source = graph.add_node(NodeParams::new(|_: Record| json!({"info": "info"})))?;
//! let sink = graph.add_node(NodeParams::new(PassThrough).with_parents([source]))?;
//!
//! let mut pipeline = Pipeline::new(&mut graph, PipelineParams::new([source, sink]))?;
//! pipeline.execute(&mut graph, None)?;
//! assert!(pipeline.output("node_1").is_some());
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod events;
pub mod graph;
pub mod node;
pub mod pipeline;
pub mod registry;
pub mod types;
pub mod validation;

// Re-export key types
pub use builder::{NodeParams, PipelineParams};
pub use config::EngineConfig;
pub use error::{GraphError, Result};
pub use events::{CollectingEventSink, EventError, EventSink, NullEventSink, PipelineEvent};
pub use graph::NodeGraph;
pub use node::{Node, NoopTransform, PassThrough, Transform};
pub use pipeline::Pipeline;
pub use registry::{LabelRegistry, OwnershipRegistry, Registrar, Registries};
pub use types::{merge_into, record_from_value, FrameContext, GraphId, NodeId, Record};
