//! Structural validation for pipelines
//!
//! Checks a candidate member list against the graph it lives in, failing on
//! the first violated rule:
//!
//! 1. At least one member
//! 2. No member listed twice
//! 3. No member owned by another live pipeline
//! 4. Every link is mutual and stays inside the member set
//! 5. At least one entry node (no parents)
//! 6. No cycles
//!
//! Validation only reads the graph and registries; it never mutates them.

use std::collections::HashSet;

use crate::error::{GraphError, Result};
use crate::graph::NodeGraph;
use crate::types::NodeId;

/// Validate a pipeline's members and return its entry nodes in member order
pub fn validate_pipeline(graph: &NodeGraph, members: &[NodeId]) -> Result<Vec<NodeId>> {
    if members.is_empty() {
        return Err(GraphError::EmptyPipeline);
    }

    let member_set = validate_unique(graph, members)?;
    validate_ownership(graph, members)?;
    validate_links(graph, members, &member_set)?;

    let entries = find_entries(graph, members)?;
    if let Some(id) = detect_cycle(graph, &entries, members)? {
        return Err(GraphError::CycleDetected {
            label: graph.label(id)?.to_string(),
        });
    }

    Ok(entries)
}

/// Reject unknown or destroyed handles and duplicate members
fn validate_unique(graph: &NodeGraph, members: &[NodeId]) -> Result<HashSet<NodeId>> {
    let mut seen = HashSet::with_capacity(members.len());
    for &id in members {
        graph.check_live(id)?;
        let node = graph.node(id)?;
        if !seen.insert(id) {
            return Err(GraphError::DuplicateMember {
                label: node.label().to_string(),
            });
        }
    }
    Ok(seen)
}

/// Reject members already claimed by a live pipeline
fn validate_ownership(graph: &NodeGraph, members: &[NodeId]) -> Result<()> {
    let owners = graph.registries().owners();
    for &id in members {
        if owners.contains(&id) {
            return Err(GraphError::CrossPipelineNode {
                label: graph.label(id)?.to_string(),
            });
        }
    }
    Ok(())
}

/// Check every parent/child link of every member
fn validate_links(
    graph: &NodeGraph,
    members: &[NodeId],
    member_set: &HashSet<NodeId>,
) -> Result<()> {
    for &id in members {
        let node = graph.node(id)?;

        for &parent in node.parents() {
            let other = graph.node(parent)?;
            if !other.is_parent_of(id) {
                return Err(GraphError::BrokenLinkInvariant {
                    node: node.label().to_string(),
                    other: other.label().to_string(),
                });
            }
            if !member_set.contains(&parent) {
                return Err(GraphError::DanglingReference {
                    node: node.label().to_string(),
                    other: other.label().to_string(),
                });
            }
        }

        for &child in node.children() {
            let other = graph.node(child)?;
            if !other.is_child_of(id) {
                return Err(GraphError::BrokenLinkInvariant {
                    node: node.label().to_string(),
                    other: other.label().to_string(),
                });
            }
            if !member_set.contains(&child) {
                return Err(GraphError::DanglingReference {
                    node: node.label().to_string(),
                    other: other.label().to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Members without parents, in member order
fn find_entries(graph: &NodeGraph, members: &[NodeId]) -> Result<Vec<NodeId>> {
    let mut entries = Vec::new();
    for &id in members {
        if graph.node(id)?.parents().is_empty() {
            entries.push(id);
        }
    }
    if entries.is_empty() {
        return Err(GraphError::NoEntryPoint);
    }
    Ok(entries)
}

/// Depth-first search over children tracking the current path
///
/// Entry nodes seed the search first. Members left unvisited afterwards are
/// then used as seeds too, so a cycle that no entry reaches is still found.
/// Returns the node that closed the first cycle found.
fn detect_cycle(
    graph: &NodeGraph,
    entries: &[NodeId],
    members: &[NodeId],
) -> Result<Option<NodeId>> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut on_path: HashSet<NodeId> = HashSet::new();

    for &seed in entries.iter().chain(members.iter()) {
        if !visited.insert(seed) {
            continue;
        }
        on_path.insert(seed);
        let mut stack: Vec<(NodeId, usize)> = vec![(seed, 0)];

        while let Some(&(current, next)) = stack.last() {
            match graph.node(current)?.children().get(next).copied() {
                Some(child) => {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    if on_path.contains(&child) {
                        log::warn!(
                            "Cycle detected: '{}' -> '{}'",
                            graph.label(current)?,
                            graph.label(child)?
                        );
                        return Ok(Some(child));
                    }
                    if visited.insert(child) {
                        on_path.insert(child);
                        stack.push((child, 0));
                    }
                }
                None => {
                    on_path.remove(&current);
                    stack.pop();
                }
            }
        }
    }

    Ok(None)
}
