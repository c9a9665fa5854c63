// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed change descriptors and their application to the canonical
//! collections.
//!
//! Changes that reference an unknown id are skipped: a change batch may be
//! applied after a concurrent removal. Applying edge changes does not touch
//! the connection lookup, the caller rebuilds it.

use crate::edge::GraphEdge;
use crate::geometry::{Dimensions, XYPosition};
use crate::node::{GraphNode, HandleBounds};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Move and/or drag-state update of a node
#[derive(Debug, Clone, PartialEq)]
pub struct NodePositionChange {
    /// Node id
    pub id: String,
    /// New position, parent-relative
    pub position: Option<XYPosition>,
    /// Position at drag start
    pub from: Option<XYPosition>,
    /// New dragging flag
    pub dragging: Option<bool>,
}

/// Measured size update of a node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDimensionChange {
    /// Node id
    pub id: String,
    /// New size
    pub dimensions: Option<Dimensions>,
    /// New handle geometry
    pub handle_bounds: Option<HandleBounds>,
    /// New resizing flag
    pub resizing: Option<bool>,
}

/// Selection update of a node or edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    /// Element id
    pub id: String,
    /// New selection state
    pub selected: bool,
}

/// A single mutation of the node collection
#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    /// Move a node
    Position(NodePositionChange),
    /// Resize a node
    Dimensions(NodeDimensionChange),
    /// Select or unselect a node
    Select(SelectionChange),
    /// Insert a node
    Add(Box<GraphNode>),
    /// Remove a node
    Remove(String),
}

impl NodeChange {
    /// Id of the node this change targets
    pub fn id(&self) -> &str {
        match self {
            Self::Position(c) => &c.id,
            Self::Dimensions(c) => &c.id,
            Self::Select(c) => &c.id,
            Self::Add(node) => &node.id,
            Self::Remove(id) => id,
        }
    }
}

/// A single mutation of the edge collection
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeChange {
    /// Select or unselect an edge
    Select(SelectionChange),
    /// Insert an edge
    Add(Box<GraphEdge>),
    /// Remove an edge
    Remove(String),
}

impl EdgeChange {
    /// Id of the edge this change targets
    pub fn id(&self) -> &str {
        match self {
            Self::Select(c) => &c.id,
            Self::Add(edge) => &edge.id,
            Self::Remove(id) => id,
        }
    }
}

/// Select or unselect a node
pub fn create_node_selection_change(id: impl Into<String>, selected: bool) -> NodeChange {
    NodeChange::Select(SelectionChange {
        id: id.into(),
        selected,
    })
}

/// Select or unselect an edge
pub fn create_edge_selection_change(id: impl Into<String>, selected: bool) -> EdgeChange {
    EdgeChange::Select(SelectionChange {
        id: id.into(),
        selected,
    })
}

/// Remove a node
pub fn create_node_removal_change(id: impl Into<String>) -> NodeChange {
    NodeChange::Remove(id.into())
}

/// Remove an edge
pub fn create_edge_removal_change(id: impl Into<String>) -> EdgeChange {
    EdgeChange::Remove(id.into())
}

/// Changes that make exactly `node_ids` and `edge_ids` selected.
///
/// Only elements whose selection state actually differs produce a change.
pub fn get_selection_changes<'a>(
    nodes: impl IntoIterator<Item = &'a GraphNode>,
    edges: impl IntoIterator<Item = &'a GraphEdge>,
    node_ids: &HashSet<&str>,
    edge_ids: &HashSet<&str>,
) -> (Vec<NodeChange>, Vec<EdgeChange>) {
    let node_changes = nodes
        .into_iter()
        .filter_map(|node| {
            let will_be_selected = node_ids.contains(node.id.as_str());
            (node.selected != will_be_selected)
                .then(|| create_node_selection_change(node.id.clone(), will_be_selected))
        })
        .collect();

    let edge_changes = edges
        .into_iter()
        .filter_map(|edge| {
            let will_be_selected = edge_ids.contains(edge.id.as_str());
            (edge.selected != will_be_selected)
                .then(|| create_edge_selection_change(edge.id.clone(), will_be_selected))
        })
        .collect();

    (node_changes, edge_changes)
}

/// Apply node changes in place.
///
/// Additions and removals are processed first, then every other change in
/// batch order.
pub fn apply_node_changes(changes: &[NodeChange], nodes: &mut IndexMap<String, GraphNode>) {
    for change in changes {
        match change {
            NodeChange::Add(node) => {
                if !nodes.contains_key(&node.id) {
                    nodes.insert(node.id.clone(), node.as_ref().clone());
                }
            }
            NodeChange::Remove(id) => {
                nodes.shift_remove(id);
            }
            _ => {}
        }
    }

    for change in changes {
        match change {
            NodeChange::Select(c) => {
                if let Some(node) = nodes.get_mut(&c.id) {
                    node.selected = c.selected;
                }
            }
            NodeChange::Position(c) => {
                let Some(node) = nodes.get_mut(&c.id) else {
                    continue;
                };
                if let Some(position) = c.position {
                    node.position = position;
                }
                if let Some(dragging) = c.dragging {
                    node.dragging = dragging;
                }
                expand_parent_of(nodes, &c.id);
            }
            NodeChange::Dimensions(c) => {
                let Some(node) = nodes.get_mut(&c.id) else {
                    continue;
                };
                if let Some(dimensions) = c.dimensions {
                    node.dimensions = dimensions;
                }
                if let Some(handle_bounds) = &c.handle_bounds {
                    node.handle_bounds = handle_bounds.clone();
                }
                if let Some(resizing) = c.resizing {
                    node.resizing = resizing;
                }
                node.initialized = true;
                expand_parent_of(nodes, &c.id);
            }
            NodeChange::Add(_) | NodeChange::Remove(_) => {}
        }
    }
}

/// Apply edge changes in place
pub fn apply_edge_changes(changes: &[EdgeChange], edges: &mut IndexMap<String, GraphEdge>) {
    for change in changes {
        match change {
            EdgeChange::Add(edge) => {
                if !edges.contains_key(&edge.id) {
                    edges.insert(edge.id.clone(), edge.as_ref().clone());
                }
            }
            EdgeChange::Remove(id) => {
                edges.shift_remove(id);
            }
            EdgeChange::Select(_) => {}
        }
    }

    for change in changes {
        if let EdgeChange::Select(c) = change {
            if let Some(edge) = edges.get_mut(&c.id) {
                edge.selected = c.selected;
            }
        }
    }
}

/// Grow the parent of `child_id` so the child fits, if the child asks for it.
///
/// A child moved past the parent's top/left edge pulls the parent's origin
/// with it and is pinned to the new edge.
fn expand_parent_of(nodes: &mut IndexMap<String, GraphNode>, child_id: &str) {
    let Some(child) = nodes.get(child_id) else {
        return;
    };
    if !child.expand_parent {
        return;
    }
    let Some(parent_id) = child.parent_node.clone() else {
        return;
    };
    let mut child_position = child.position;
    let child_size = child.size();

    let Some(parent) = nodes.get_mut(&parent_id) else {
        return;
    };
    let mut parent_size = parent.size();
    let extend_width = child_position.x + child_size.width - parent_size.width;
    let extend_height = child_position.y + child_size.height - parent_size.height;

    if extend_width <= 0.0 && extend_height <= 0.0 && child_position.x >= 0.0 && child_position.y >= 0.0 {
        return;
    }

    if extend_width > 0.0 {
        parent_size.width += extend_width;
    }
    if extend_height > 0.0 {
        parent_size.height += extend_height;
    }
    if child_position.x < 0.0 {
        let diff = child_position.x.abs();
        parent.position.x -= diff;
        parent_size.width += diff;
        child_position.x = 0.0;
    }
    if child_position.y < 0.0 {
        let diff = child_position.y.abs();
        parent.position.y -= diff;
        parent_size.height += diff;
        child_position.y = 0.0;
    }
    parent.width = Some(parent_size.width);
    parent.height = Some(parent_size.height);
    parent.dimensions = parent_size;

    if let Some(child) = nodes.get_mut(child_id) {
        child.position = child_position;
    }
}
