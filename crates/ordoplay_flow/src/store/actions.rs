// SPDX-License-Identifier: MIT OR Apache-2.0
//! Collection mutations: replace, add, remove, move and direct updates.

use super::FlowStore;
use crate::builders::{
    add_edge_to_store, check_edge_endpoints, connection_exists, create_graph_edges, create_graph_nodes, mark_parents,
    parse_node, reconnect_edge, EdgeInput, FlowElement, NodeInput,
};
use crate::changes::{create_edge_removal_change, create_node_removal_change, EdgeChange, NodeChange, NodePositionChange};
use crate::edge::{Connection, GraphEdge};
use crate::error::FlowError;
use crate::geometry::{clamp_position, snap_position, CoordinateExtent, XYPosition};
use crate::node::{GraphNode, NodeExtent};
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

/// A node taking part in a drag, in absolute coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDragItem {
    /// Node id
    pub id: String,
    /// New absolute position
    pub position: XYPosition,
    /// Absolute position at drag start
    pub from: XYPosition,
}

/// How direct updates combine with the existing record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Swap the whole record instead of merging into it
    pub replace: bool,
}

impl FlowStore {
    /// Replace the node collection.
    ///
    /// Records sharing an id with an existing node are merged into it, so
    /// measurements survive a redeclaration. Edges are kept even when an
    /// endpoint disappears; they show up as orphaned in
    /// [`FlowStore::visible_edges`].
    pub fn set_nodes(&mut self, inputs: Vec<NodeInput>) {
        if !self.initialized && inputs.is_empty() {
            return;
        }
        let mut counter = self.node_id_counter;
        let built = create_graph_nodes(
            inputs,
            &self.nodes,
            &mut || Self::next_node_id(&mut counter),
            self.is_valid_node.as_deref(),
        );
        self.node_id_counter = counter;
        self.emit_errors(built.errors);

        let previous = std::mem::replace(&mut self.nodes, built.items);
        self.refresh_computed_positions();
        self.rebuild_lookup();
        if !previous.iter().eq(self.nodes.iter()) {
            tracing::debug!(store = %self.id, count = self.nodes.len(), "Replaced nodes");
            self.touch();
        }
    }

    /// Replace the node collection with a function of the current one
    pub fn set_nodes_with(&mut self, update: impl FnOnce(&IndexMap<String, GraphNode>) -> Vec<NodeInput>) {
        let inputs = update(&self.nodes);
        self.set_nodes(inputs);
    }

    /// Replace the edge collection.
    ///
    /// Every edge is checked against the current nodes; edges with a missing
    /// endpoint are dropped and reported.
    pub fn set_edges(&mut self, inputs: Vec<EdgeInput>) {
        if !self.initialized && inputs.is_empty() {
            return;
        }
        let built = create_graph_edges(
            inputs,
            &self.nodes,
            &self.edges,
            self.config.default_edge_options.as_ref(),
            self.is_valid_connection.as_deref(),
        );
        self.emit_errors(built.errors);

        let previous = std::mem::replace(&mut self.edges, built.items);
        self.rebuild_lookup();
        if !previous.iter().eq(self.edges.iter()) {
            tracing::debug!(store = %self.id, count = self.edges.len(), "Replaced edges");
            self.touch();
        }
    }

    /// Replace the edge collection with a function of the current one
    pub fn set_edges_with(&mut self, update: impl FnOnce(&IndexMap<String, GraphEdge>) -> Vec<EdgeInput>) {
        let inputs = update(&self.edges);
        self.set_edges(inputs);
    }

    /// Replace both collections from a mixed list; nodes go in first
    pub fn set_elements(&mut self, elements: Vec<FlowElement>) {
        let (nodes, edges) = split_elements(elements);
        self.set_nodes(nodes);
        self.set_edges(edges);
    }

    /// Replace both collections with a function of the current ones
    pub fn set_elements_with(
        &mut self,
        update: impl FnOnce(&IndexMap<String, GraphNode>, &IndexMap<String, GraphEdge>) -> Vec<FlowElement>,
    ) {
        let elements = update(&self.nodes, &self.edges);
        self.set_elements(elements);
    }

    /// Insert nodes through the change channel.
    ///
    /// Ids already in the store and rejected nodes are reported as
    /// `NODE_INVALID`.
    pub fn add_nodes(&mut self, inputs: Vec<NodeInput>) {
        let mut batch: IndexMap<String, GraphNode> = IndexMap::with_capacity(inputs.len());
        let mut errors = Vec::new();

        for input in inputs {
            let id = match input.id.as_deref() {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => Self::next_node_id(&mut self.node_id_counter),
            };
            if self.nodes.contains_key(&id) || batch.contains_key(&id) {
                errors.push(FlowError::NodeInvalid(id));
                continue;
            }
            let node = parse_node(input, None, id.clone());
            if self.is_valid_node.as_deref().is_some_and(|accept| !accept(&node)) {
                errors.push(FlowError::NodeInvalid(id));
                continue;
            }
            batch.insert(id, node);
        }

        for node in batch.values() {
            if let Some(parent) = &node.parent_node {
                if !self.nodes.contains_key(parent) && !batch.contains_key(parent) {
                    errors.push(FlowError::NodeMissingParent {
                        id: node.id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }
        self.emit_errors(errors);

        let changes = batch
            .into_values()
            .map(|node| NodeChange::Add(Box::new(node)))
            .collect();
        self.dispatch_node_changes(changes);
    }

    /// Insert edges through the change channel.
    ///
    /// Edges duplicating an existing id or connection are skipped silently;
    /// invalid edges are reported.
    pub fn add_edges(&mut self, inputs: Vec<EdgeInput>) {
        let mut batch: IndexMap<String, GraphEdge> = IndexMap::with_capacity(inputs.len());

        for input in inputs {
            let result = add_edge_to_store(
                input,
                &self.nodes,
                &self.edges,
                self.config.default_edge_options.as_ref(),
                self.is_valid_connection.as_deref(),
            );
            match result {
                Ok(Some(edge)) => {
                    if batch.contains_key(&edge.id) || connection_exists(&edge.connection(), &batch) {
                        continue;
                    }
                    batch.insert(edge.id.clone(), edge);
                }
                Ok(None) => {}
                Err(err) => self.emit_error(err),
            }
        }

        let changes = batch
            .into_values()
            .map(|edge| EdgeChange::Add(Box::new(edge)))
            .collect();
        self.dispatch_edge_changes(changes);
    }

    /// Insert a single edge for a connection
    pub fn add_edge(&mut self, connection: Connection) {
        self.add_edges(vec![EdgeInput::from_connection(connection)]);
    }

    /// Remove nodes through the change channel.
    ///
    /// Targets marked non-deletable are kept. With `remove_connected_edges`
    /// every deletable edge touching a removed node goes too; with
    /// `remove_children` every descendant of a removed target follows it,
    /// whatever its own `deletable` flag. Edge removals are dispatched
    /// before node removals.
    pub fn remove_nodes(&mut self, ids: &[&str], remove_connected_edges: bool, remove_children: bool) {
        let mut node_ids: IndexSet<String> = IndexSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        for id in ids {
            if let Some(node) = self.nodes.get(*id).filter(|n| n.is_deletable()) {
                queue.push_back(node.id.clone());
            }
        }

        while let Some(id) = queue.pop_front() {
            if !node_ids.insert(id.clone()) {
                continue;
            }
            if remove_children {
                let children = self
                    .nodes
                    .values()
                    .filter(|n| n.parent_node.as_deref() == Some(id.as_str()))
                    .map(|n| n.id.clone());
                queue.extend(children);
            }
        }

        if node_ids.is_empty() {
            return;
        }

        if remove_connected_edges {
            // scan the edges rather than the lookup so a stale index cannot hide one
            let edge_changes: Vec<EdgeChange> = self
                .edges
                .values()
                .filter(|edge| {
                    edge.is_deletable() && (node_ids.contains(&edge.source) || node_ids.contains(&edge.target))
                })
                .map(|edge| create_edge_removal_change(edge.id.clone()))
                .collect();
            self.dispatch_edge_changes(edge_changes);
        }

        let node_changes = node_ids.into_iter().map(create_node_removal_change).collect();
        self.dispatch_node_changes(node_changes);
    }

    /// Remove edges through the change channel; non-deletable edges are kept
    pub fn remove_edges(&mut self, ids: &[&str]) {
        let removed: IndexSet<&str> = ids
            .iter()
            .filter_map(|id| self.edges.get(*id))
            .filter(|edge| edge.is_deletable())
            .map(|edge| edge.id.as_str())
            .collect();
        let changes = removed.into_iter().map(create_edge_removal_change).collect();
        self.dispatch_edge_changes(changes);
    }

    /// Dispatch position changes for dragged nodes.
    ///
    /// Item positions are absolute; child nodes receive positions relative
    /// to their parent. The dragging flag is sent even when nothing moved.
    pub fn update_node_positions(&mut self, items: &[NodeDragItem], changed: bool, dragging: bool) {
        let changes = items
            .iter()
            .filter_map(|item| {
                let node = self.nodes.get(&item.id)?;
                let position = changed.then(|| {
                    let parent = node.parent_node.as_deref().and_then(|p| self.nodes.get(p));
                    match parent {
                        Some(parent) => item.position - parent.computed_position.xy(),
                        None => item.position,
                    }
                });
                Some(NodeChange::Position(NodePositionChange {
                    id: item.id.clone(),
                    position,
                    from: Some(item.from),
                    dragging: Some(dragging),
                }))
            })
            .collect();
        self.dispatch_node_changes(changes);
    }

    /// Drag items for the current selection.
    ///
    /// Non-draggable nodes and nodes whose ancestor is also selected are
    /// left out; the ancestor carries them.
    pub fn drag_items_for_selection(&self) -> Vec<NodeDragItem> {
        self.nodes
            .values()
            .filter(|node| node.selected && node.is_draggable(self.config.nodes_draggable))
            .filter(|node| !self.has_selected_ancestor(node))
            .map(|node| NodeDragItem {
                id: node.id.clone(),
                position: node.computed_position.xy(),
                from: node.computed_position.xy(),
            })
            .collect()
    }

    fn has_selected_ancestor(&self, node: &GraphNode) -> bool {
        let mut seen: IndexSet<&str> = IndexSet::new();
        let mut cursor = node.parent_node.as_deref();
        while let Some(id) = cursor {
            if !seen.insert(id) {
                return false;
            }
            let Some(parent) = self.nodes.get(id) else {
                return false;
            };
            if parent.selected {
                return true;
            }
            cursor = parent.parent_node.as_deref();
        }
        false
    }

    /// Move the selection by `delta`, snapping and clamping each node
    pub fn update_node_positions_by_delta(&mut self, delta: XYPosition, dragging: bool) {
        let mut items = self.drag_items_for_selection();
        for item in &mut items {
            let mut position = item.position + delta;
            if self.config.snap_to_grid {
                position = snap_position(position, self.config.snap_grid);
            }
            if let Some(node) = self.nodes.get(&item.id) {
                let extent = self.drag_extent(node);
                position = clamp_position(position, &extent);
            }
            item.position = position;
        }
        self.update_node_positions(&items, true, dragging);
    }

    /// Absolute area the node's top-left corner may move in
    fn drag_extent(&self, node: &GraphNode) -> CoordinateExtent {
        let size = node.size();
        let parent = node.parent_node.as_deref().and_then(|p| self.nodes.get(p));

        let (min, max) = match (node.extent, parent) {
            (Some(NodeExtent::Parent), Some(parent)) => {
                let origin = parent.computed_position.xy();
                let parent_size = parent.size();
                (
                    [origin.x, origin.y],
                    [origin.x + parent_size.width, origin.y + parent_size.height],
                )
            }
            (Some(NodeExtent::Parent), None) => {
                self.emit_error(FlowError::NodeExtentInvalid(node.id.clone()));
                (self.config.node_extent.min(), self.config.node_extent.max())
            }
            (Some(NodeExtent::Coordinates(extent)), Some(parent)) => {
                let origin = parent.computed_position.xy();
                let [min, max] = extent.0;
                ([min[0] + origin.x, min[1] + origin.y], [max[0] + origin.x, max[1] + origin.y])
            }
            (Some(NodeExtent::Coordinates(extent)), None) => (extent.min(), extent.max()),
            (None, _) => (self.config.node_extent.min(), self.config.node_extent.max()),
        };
        CoordinateExtent::new(min, [max[0] - size.width, max[1] - size.height])
    }

    /// Update a node in place, without a change event
    pub fn update_node(&mut self, id: &str, update: NodeInput, options: UpdateOptions) {
        self.update_node_with(id, |_| update, options);
    }

    /// Update a node in place from a function of its current state
    pub fn update_node_with(
        &mut self,
        id: &str,
        update: impl FnOnce(&GraphNode) -> NodeInput,
        options: UpdateOptions,
    ) {
        let Some(node) = self.nodes.get_mut(id) else {
            self.emit_error(FlowError::NodeNotFound(id.to_string()));
            return;
        };
        let input = update(node);
        if options.replace {
            *node = GraphNode::from_input(input, id.to_string());
        } else {
            node.apply_input(input);
        }
        mark_parents(&mut self.nodes);
        self.refresh_computed_positions();
        self.touch();
    }

    /// Update a node's payload; merging combines object fields shallowly
    pub fn update_node_data(&mut self, id: &str, data: serde_json::Value, options: UpdateOptions) {
        let Some(node) = self.nodes.get_mut(id) else {
            self.emit_error(FlowError::NodeNotFound(id.to_string()));
            return;
        };
        merge_data(&mut node.data, data, options.replace);
        self.touch();
    }

    /// Update an edge's payload; merging combines object fields shallowly
    pub fn update_edge_data(&mut self, id: &str, data: serde_json::Value, options: UpdateOptions) {
        let Some(edge) = self.edges.get_mut(id) else {
            self.emit_error(FlowError::EdgeNotFound(id.to_string()));
            return;
        };
        merge_data(&mut edge.data, data, options.replace);
        self.touch();
    }

    /// Move an edge onto a new connection, in place.
    ///
    /// With `replace_id` the edge takes the id derived from the new
    /// connection. Edges that are not updatable are left alone. Returns the
    /// updated edge.
    pub fn update_edge(&mut self, id: &str, connection: Connection, replace_id: bool) -> Option<&GraphEdge> {
        let Some(edge) = self.edges.get(id) else {
            self.emit_error(FlowError::EdgeNotFound(id.to_string()));
            return None;
        };
        if !edge.is_updatable(self.config.edges_updatable) {
            tracing::debug!(store = %self.id, edge = id, "Edge is not updatable");
            return None;
        }
        if connection.source.is_empty() || connection.target.is_empty() {
            self.emit_error(FlowError::EdgeInvalid(id.to_string()));
            return None;
        }
        let next = reconnect_edge(edge, connection, replace_id);
        if let Err(err) = check_edge_endpoints(&next, &self.nodes) {
            self.emit_error(err);
            return None;
        }
        if next.id != id && self.edges.contains_key(&next.id) {
            self.emit_error(FlowError::EdgeInvalid(next.id));
            return None;
        }

        let index = self.edges.get_index_of(id)?;
        let next_id = next.id.clone();
        self.edges.shift_remove_index(index);
        self.edges.shift_insert(index, next_id.clone(), next);
        self.rebuild_lookup();
        self.touch();
        self.edges.get(&next_id)
    }
}

fn split_elements(elements: Vec<FlowElement>) -> (Vec<NodeInput>, Vec<EdgeInput>) {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for element in elements {
        match element {
            FlowElement::Node(node) => nodes.push(node),
            FlowElement::Edge(edge) => edges.push(edge),
        }
    }
    (nodes, edges)
}

fn merge_data(target: &mut serde_json::Value, data: serde_json::Value, replace: bool) {
    match (target, data) {
        (serde_json::Value::Object(existing), serde_json::Value::Object(update)) if !replace => {
            existing.extend(update);
        }
        (target, data) => *target = data,
    }
}
