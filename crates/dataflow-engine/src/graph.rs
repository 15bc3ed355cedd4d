//! Node arena and per-node operations
//!
//! `NodeGraph` owns every node and addresses them through `NodeId` handles.
//! Links are stored on both ends as handles, so the graph never holds an
//! ownership cycle.
//!
//! # Execution
//!
//! Executing a node follows a push-once, pull-complete discipline:
//!
//! - A node that already ran this pass is skipped
//! - A node runs only once every parent has run; parent outputs are merged in
//!   link order over the caller's context (later parents win on collisions)
//! - After running, its children are attempted in link order
//!
//! Cascading uses an explicit work stack with children pushed in reverse, so
//! nodes are visited in the same depth-first order a recursive walk would
//! produce, without recursion depth limits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::builder::NodeParams;
use crate::config::EngineConfig;
use crate::error::{GraphError, Result};
use crate::node::{Node, NoopTransform};
use crate::registry::Registries;
use crate::types::{merge_into, GraphId, NodeId, Record};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(0);

/// Arena of nodes sharing one set of registries
pub struct NodeGraph {
    id: GraphId,
    nodes: Vec<Node>,
    registries: Arc<Registries>,
    config: EngineConfig,
    /// Nodes successfully created, used for generated labels
    nodes_created: usize,
    /// Pipelines successfully created, used for generated labels
    pipelines_created: usize,
}

impl NodeGraph {
    /// Create a graph with its own private registries
    pub fn new() -> Self {
        Self::with_registries(Arc::new(Registries::new()))
    }

    /// Create a graph enforcing uniqueness against shared registries
    pub fn with_registries(registries: Arc<Registries>) -> Self {
        Self::with_config(EngineConfig::default(), registries)
    }

    /// Create a graph with an explicit configuration
    pub fn with_config(config: EngineConfig, registries: Arc<Registries>) -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
            registries,
            config,
            nodes_created: 0,
            pipelines_created: 0,
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn registries(&self) -> &Arc<Registries> {
        &self.registries
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of slots in the arena, destroyed nodes included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over every node in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Look up a node by handle
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.check(id)?;
        Ok(&self.nodes[id.index])
    }

    /// Label of a node
    pub fn label(&self, id: NodeId) -> Result<&str> {
        Ok(self.node(id)?.label())
    }

    /// Find a live node by label
    pub fn find(&self, label: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| !n.destroyed && n.label == label)
            .map(|n| n.id)
    }

    pub(crate) fn check(&self, id: NodeId) -> Result<()> {
        if id.graph != self.id || id.index >= self.nodes.len() {
            return Err(GraphError::UnknownNode { id });
        }
        Ok(())
    }

    /// Like `check`, but also rejects destroyed nodes
    pub(crate) fn check_live(&self, id: NodeId) -> Result<()> {
        self.check(id)?;
        let node = &self.nodes[id.index];
        if node.destroyed {
            return Err(GraphError::DestroyedNode {
                label: node.label.clone(),
            });
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index]
    }

    pub(crate) fn next_pipeline_label(&self) -> String {
        format!(
            "{}_{}",
            self.config.pipeline_label_prefix, self.pipelines_created
        )
    }

    pub(crate) fn pipeline_created(&mut self) {
        self.pipelines_created += 1;
    }

    // ---------------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------------

    /// Create a node, applying its initial links
    ///
    /// Initial parents are linked first, then children, using the same
    /// routine as `link_parent`/`link_child`. On failure nothing is left
    /// behind: links made so far are undone and the label is released.
    pub fn add_node(&mut self, params: NodeParams) -> Result<NodeId> {
        for &other in params.parents.iter().chain(params.children.iter()) {
            self.check_live(other)?;
        }

        let label = params.label.unwrap_or_else(|| {
            format!("{}_{}", self.config.node_label_prefix, self.nodes_created)
        });
        if !self.registries.labels().register(label.clone()) {
            return Err(GraphError::DuplicateLabel { label });
        }

        let id = NodeId {
            graph: self.id,
            index: self.nodes.len(),
        };
        self.nodes.push(Node::new(id, label, params.transform));

        if let Err(err) = self.apply_initial_links(id, &params.parents, &params.children) {
            self.rollback_node(id);
            return Err(err);
        }

        self.nodes_created += 1;
        log::debug!("Created node '{}' ({})", self.nodes[id.index].label, id);
        Ok(id)
    }

    fn apply_initial_links(
        &mut self,
        id: NodeId,
        parents: &[NodeId],
        children: &[NodeId],
    ) -> Result<()> {
        for &parent in parents {
            self.link_parent(id, parent)?;
        }
        for &child in children {
            self.link_child(id, child)?;
        }
        Ok(())
    }

    /// Undo a partially constructed node. Only valid for the last slot.
    fn rollback_node(&mut self, id: NodeId) {
        let node = &self.nodes[id.index];
        let parents = node.parents.clone();
        let children = node.children.clone();
        for parent in parents {
            self.detach(parent, id);
        }
        for child in children {
            self.detach(id, child);
        }
        if let Some(node) = self.nodes.pop() {
            self.registries.labels().delist(&node.label);
        }
    }

    // ---------------------------------------------------------------------
    // Linking
    // ---------------------------------------------------------------------

    /// Make `parent` a parent of `node`
    pub fn link_parent(&mut self, node: NodeId, parent: NodeId) -> Result<()> {
        self.link(parent, node, node)
    }

    /// Make `child` a child of `node`
    pub fn link_child(&mut self, node: NodeId, child: NodeId) -> Result<()> {
        self.link(node, child, node)
    }

    /// Remove `parent` from the parents of `node`
    pub fn unlink_parent(&mut self, node: NodeId, parent: NodeId) -> Result<()> {
        self.unlink(parent, node, node)
    }

    /// Remove `child` from the children of `node`
    pub fn unlink_child(&mut self, node: NodeId, child: NodeId) -> Result<()> {
        self.unlink(node, child, node)
    }

    /// Whether `parent -> child` is recorded on both ends
    pub fn is_linked(&self, parent: NodeId, child: NodeId) -> bool {
        if self.check(parent).is_err() || self.check(child).is_err() {
            return false;
        }
        self.nodes[parent.index].is_parent_of(child) && self.nodes[child.index].is_child_of(parent)
    }

    fn link(&mut self, parent: NodeId, child: NodeId, caller: NodeId) -> Result<()> {
        self.check_live(parent)?;
        self.check_live(child)?;
        let other = if caller == parent { child } else { parent };
        if parent == child {
            return Err(self.link_error(caller, other, "nodes cannot be linked to themselves"));
        }
        if self.is_linked(parent, child) {
            return Err(self.link_error(caller, other, "nodes are already linked"));
        }

        self.nodes[parent.index].children.push(child);
        self.nodes[child.index].parents.push(parent);
        log::debug!(
            "Linked '{}' -> '{}'",
            self.nodes[parent.index].label,
            self.nodes[child.index].label
        );
        Ok(())
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId, caller: NodeId) -> Result<()> {
        self.check_live(parent)?;
        self.check_live(child)?;
        let other = if caller == parent { child } else { parent };
        if parent == child {
            return Err(self.link_error(caller, other, "nodes cannot be unlinked from themselves"));
        }
        if !self.is_linked(parent, child) {
            return Err(self.link_error(caller, other, "nodes are not linked"));
        }

        self.detach(parent, child);
        log::debug!(
            "Unlinked '{}' -> '{}'",
            self.nodes[parent.index].label,
            self.nodes[child.index].label
        );
        Ok(())
    }

    /// Remove one occurrence of the edge from both ends
    fn detach(&mut self, parent: NodeId, child: NodeId) {
        let children = &mut self.nodes[parent.index].children;
        if let Some(pos) = children.iter().position(|&c| c == child) {
            children.remove(pos);
        }
        let parents = &mut self.nodes[child.index].parents;
        if let Some(pos) = parents.iter().position(|&p| p == parent) {
            parents.remove(pos);
        }
    }

    fn link_error(&self, node: NodeId, other: NodeId, reason: &str) -> GraphError {
        GraphError::invalid_link(
            self.nodes[node.index].label.clone(),
            self.nodes[other.index].label.clone(),
            reason,
        )
    }

    // ---------------------------------------------------------------------
    // Execution lifecycle
    // ---------------------------------------------------------------------

    /// Execute a node and cascade to its children
    ///
    /// A no-op if the node already ran this pass or one of its parents has
    /// not run yet. Destroyed nodes are rejected with `DestroyedNode`.
    pub fn execute_node(&mut self, id: NodeId, context: &Record) -> Result<()> {
        self.cascade(id, context).map(|_| ())
    }

    /// Execute and cascade, returning the nodes that ran in visitation order
    pub(crate) fn cascade(&mut self, id: NodeId, context: &Record) -> Result<Vec<NodeId>> {
        self.check_live(id)?;

        let mut executed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(inputs) = self.ready_inputs(current) else {
                continue;
            };

            let mut merged = context.clone();
            merge_into(&mut merged, &inputs);

            let node = &mut self.nodes[current.index];
            node.run(merged);
            log::debug!("Executed node '{}'", node.label);
            executed.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        Ok(executed)
    }

    /// Merged parent outputs, or None if the node ran already or is not ready
    fn ready_inputs(&self, id: NodeId) -> Option<Record> {
        let node = &self.nodes[id.index];
        if node.has_executed {
            log::trace!("Skipping node '{}': already executed", node.label);
            return None;
        }

        let mut inputs = Record::new();
        for parent in &node.parents {
            let parent = &self.nodes[parent.index];
            if !parent.has_executed {
                log::trace!(
                    "Node '{}' not ready: waiting on '{}'",
                    node.label,
                    parent.label
                );
                return None;
            }
            merge_into(&mut inputs, &parent.output);
        }
        Some(inputs)
    }

    /// Clear a node's execution state, keeping its links
    pub fn reset_node(&mut self, id: NodeId) -> Result<()> {
        self.check(id)?;
        self.nodes[id.index].reset();
        Ok(())
    }

    /// Reset every node in the arena
    pub fn reset_all(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
    }

    /// Tear a node down
    ///
    /// Severs every link through the regular unlink routine, releases the
    /// label, installs a no-op transform and clears state. The slot stays in
    /// the arena so the cleared node remains inspectable, but it can no
    /// longer be linked, executed or added to a pipeline. Destroying a node
    /// twice is a no-op.
    pub fn destroy_node(&mut self, id: NodeId) -> Result<()> {
        self.check(id)?;
        if self.nodes[id.index].destroyed {
            log::debug!(
                "Node '{}' is already destroyed",
                self.nodes[id.index].label
            );
            return Ok(());
        }

        let parents = self.nodes[id.index].parents.clone();
        for parent in parents {
            self.unlink_parent(id, parent)?;
        }
        let children = self.nodes[id.index].children.clone();
        for child in children {
            self.unlink_child(id, child)?;
        }

        let node = &mut self.nodes[id.index];
        if !self.registries.labels().delist(&node.label) {
            log::warn!("Label '{}' was not registered at destroy", node.label);
        }
        node.transform = Box::new(NoopTransform);
        node.reset();
        node.destroyed = true;
        log::debug!("Destroyed node '{}'", node.label);
        Ok(())
    }
}

impl Default for NodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NodeGraph {
    /// Release labels and ownership claims still held by this arena
    fn drop(&mut self) {
        for node in &self.nodes {
            if !node.destroyed {
                self.registries.labels().delist(&node.label);
            }
            self.registries.owners().delist(&node.id);
        }
    }
}

impl std::fmt::Debug for NodeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeGraph")
            .field("id", &self.id)
            .field("nodes", &self.nodes)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
