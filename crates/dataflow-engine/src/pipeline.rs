//! Validated, fixed-membership pipelines
//!
//! A `Pipeline` claims a set of nodes from a `NodeGraph`, checks that they
//! form a closed acyclic graph with at least one entry node, and drives them
//! through passes. Each pass runs every entry node with the pipeline's
//! globals overlaid by an optional per-pass context, then snapshots every
//! member's output by label.
//!
//! Ownership claims are released by `destroy` or when the pipeline is
//! dropped, whichever comes first.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::builder::PipelineParams;
use crate::error::{GraphError, Result};
use crate::events::{EventSink, NullEventSink, PipelineEvent};
use crate::graph::NodeGraph;
use crate::registry::Registries;
use crate::types::{merge_into, GraphId, NodeId, Record};
use crate::validation::validate_pipeline;

/// A validated group of nodes executed together as one pass
pub struct Pipeline {
    label: String,
    graph: GraphId,
    registries: Arc<Registries>,
    nodes: Vec<NodeId>,
    /// Members without parents, in member order
    exec_nodes: Vec<NodeId>,
    globals: Record,
    has_executed: bool,
    outputs: HashMap<String, Record>,
    events: Arc<dyn EventSink>,
}

impl Pipeline {
    /// Validate `params` against `graph` and claim its nodes
    ///
    /// On failure nothing is registered and the graph is left untouched.
    pub fn new(graph: &mut NodeGraph, params: PipelineParams) -> Result<Self> {
        let PipelineParams {
            label,
            nodes,
            globals: own_globals,
        } = params;

        let exec_nodes = validate_pipeline(graph, &nodes).map_err(|err| {
            log::warn!("Pipeline validation failed: {}", err);
            err
        })?;

        if let Err(id) = graph.registries().owners().register_all(nodes.iter()) {
            return Err(GraphError::CrossPipelineNode {
                label: graph.label(id)?.to_string(),
            });
        }

        let label = label.unwrap_or_else(|| graph.next_pipeline_label());
        graph.pipeline_created();

        let mut globals = graph.config().globals.clone();
        merge_into(&mut globals, &own_globals);

        log::info!(
            "Created pipeline '{}' with {} nodes ({} entry)",
            label,
            nodes.len(),
            exec_nodes.len()
        );

        Ok(Self {
            label,
            graph: graph.id(),
            registries: graph.registries().clone(),
            nodes,
            exec_nodes,
            globals,
            has_executed: false,
            outputs: HashMap::new(),
            events: Arc::new(NullEventSink),
        })
    }

    /// Report lifecycle events to `sink`
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Identifier of the graph this pipeline's nodes live in
    pub fn graph_id(&self) -> GraphId {
        self.graph
    }

    /// Member nodes, in the order they were supplied
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Entry nodes, in member order
    pub fn exec_nodes(&self) -> &[NodeId] {
        &self.exec_nodes
    }

    pub fn globals(&self) -> &Record {
        &self.globals
    }

    /// Whether a pass completed since the last reset
    pub fn has_executed(&self) -> bool {
        self.has_executed
    }

    /// Output of every member by label, as of the last pass
    pub fn outputs(&self) -> &HashMap<String, Record> {
        &self.outputs
    }

    /// Output of a single member by label
    pub fn output(&self, label: &str) -> Option<&Record> {
        self.outputs.get(label)
    }

    /// Run one pass
    ///
    /// Every entry node is executed with `globals` overlaid by `context`
    /// (context wins on collisions). A no-op until `reset` once a pass has
    /// completed.
    pub fn execute(&mut self, graph: &mut NodeGraph, context: Option<&Record>) -> Result<()> {
        self.check_graph(graph)?;
        if self.has_executed {
            log::trace!("Pipeline '{}' already executed, skipping", self.label);
            return Ok(());
        }

        let mut merged = self.globals.clone();
        if let Some(context) = context {
            merge_into(&mut merged, context);
        }

        self.emit(PipelineEvent::PassStarted {
            pipeline: self.label.clone(),
        });

        let mut executed = 0;
        for &entry in &self.exec_nodes {
            for id in graph.cascade(entry, &merged)? {
                executed += 1;
                self.emit(PipelineEvent::NodeExecuted {
                    pipeline: self.label.clone(),
                    label: graph.label(id)?.to_string(),
                });
            }
        }

        self.outputs.clear();
        for &id in &self.nodes {
            let node = graph.node(id)?;
            self.outputs
                .insert(node.label().to_string(), node.output().clone());
        }
        self.has_executed = true;

        let skipped = self.nodes.len().saturating_sub(executed);
        log::debug!(
            "Pipeline '{}' pass complete: {} executed, {} skipped",
            self.label,
            executed,
            skipped
        );
        self.emit(PipelineEvent::PassCompleted {
            pipeline: self.label.clone(),
            executed,
            skipped,
        });
        Ok(())
    }

    /// Reset every member so the next `execute` runs a fresh pass
    pub fn reset(&mut self, graph: &mut NodeGraph) -> Result<()> {
        self.check_graph(graph)?;
        for &id in &self.nodes {
            graph.reset_node(id)?;
        }
        self.outputs.clear();
        self.has_executed = false;

        self.emit(PipelineEvent::PipelineReset {
            pipeline: self.label.clone(),
        });
        Ok(())
    }

    /// Destroy every member and release them
    ///
    /// Leaves an empty pipeline behind; executing it afterwards does nothing.
    pub fn destroy(&mut self, graph: &mut NodeGraph) -> Result<()> {
        self.check_graph(graph)?;
        self.outputs.clear();
        for &id in &self.nodes {
            graph.destroy_node(id)?;
        }
        self.release();
        self.nodes.clear();
        self.exec_nodes.clear();
        self.has_executed = false;

        log::info!("Destroyed pipeline '{}'", self.label);
        self.emit(PipelineEvent::PipelineDestroyed {
            pipeline: self.label.clone(),
        });
        Ok(())
    }

    fn check_graph(&self, graph: &NodeGraph) -> Result<()> {
        match self.nodes.first() {
            Some(&id) => graph.check(id),
            None => Ok(()),
        }
    }

    fn release(&self) {
        let owners = self.registries.owners();
        for id in &self.nodes {
            owners.delist(id);
        }
    }

    fn emit(&self, event: PipelineEvent) {
        if let Err(err) = self.events.send(event) {
            log::warn!("Pipeline '{}' failed to send event: {}", self.label, err);
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("label", &self.label)
            .field("graph", &self.graph)
            .field("nodes", &self.nodes)
            .field("exec_nodes", &self.exec_nodes)
            .field("globals", &self.globals)
            .field("has_executed", &self.has_executed)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}
