// SPDX-License-Identifier: MIT OR Apache-2.0
//! Selection actions.
//!
//! In single-selection mode an `add_selected_*` call makes exactly the given
//! elements selected and deselects everything else. In multi-selection mode
//! it only selects the given elements and leaves the rest alone.

use super::FlowStore;
use crate::changes::{
    create_edge_selection_change, create_node_selection_change, get_selection_changes, EdgeChange, NodeChange,
};
use std::collections::HashSet;

impl FlowStore {
    /// Select nodes
    pub fn add_selected_nodes(&mut self, ids: &[&str]) {
        self.add_selected_elements(ids, &[]);
    }

    /// Select edges
    pub fn add_selected_edges(&mut self, ids: &[&str]) {
        self.add_selected_elements(&[], ids);
    }

    /// Select nodes and edges in one batch per collection
    pub fn add_selected_elements(&mut self, node_ids: &[&str], edge_ids: &[&str]) {
        let global = self.config.elements_selectable;
        let node_targets: HashSet<&str> = node_ids
            .iter()
            .filter_map(|id| self.nodes.get(*id))
            .filter(|node| node.is_selectable(global))
            .map(|node| node.id.as_str())
            .collect();
        let edge_targets: HashSet<&str> = edge_ids
            .iter()
            .filter_map(|id| self.edges.get(*id))
            .filter(|edge| edge.selectable.unwrap_or(global))
            .map(|edge| edge.id.as_str())
            .collect();

        let (node_changes, edge_changes) = if self.config.multi_selection_active {
            let node_changes: Vec<NodeChange> = self
                .nodes
                .values()
                .filter(|node| !node.selected && node_targets.contains(node.id.as_str()))
                .map(|node| create_node_selection_change(node.id.clone(), true))
                .collect();
            let edge_changes: Vec<EdgeChange> = self
                .edges
                .values()
                .filter(|edge| !edge.selected && edge_targets.contains(edge.id.as_str()))
                .map(|edge| create_edge_selection_change(edge.id.clone(), true))
                .collect();
            (node_changes, edge_changes)
        } else {
            get_selection_changes(self.nodes.values(), self.edges.values(), &node_targets, &edge_targets)
        };

        self.dispatch_node_changes(node_changes);
        self.dispatch_edge_changes(edge_changes);
    }

    /// Deselect the given nodes
    pub fn remove_selected_nodes(&mut self, ids: &[&str]) {
        self.remove_selected_elements(ids, &[]);
    }

    /// Deselect the given edges
    pub fn remove_selected_edges(&mut self, ids: &[&str]) {
        self.remove_selected_elements(&[], ids);
    }

    /// Deselect the given nodes and edges
    pub fn remove_selected_elements(&mut self, node_ids: &[&str], edge_ids: &[&str]) {
        let node_changes: Vec<NodeChange> = node_ids
            .iter()
            .filter_map(|id| self.nodes.get(*id))
            .filter(|node| node.selected)
            .map(|node| create_node_selection_change(node.id.clone(), false))
            .collect();
        let edge_changes: Vec<EdgeChange> = edge_ids
            .iter()
            .filter_map(|id| self.edges.get(*id))
            .filter(|edge| edge.selected)
            .map(|edge| create_edge_selection_change(edge.id.clone(), false))
            .collect();

        self.dispatch_node_changes(node_changes);
        self.dispatch_edge_changes(edge_changes);
    }

    /// Deselect everything
    pub fn reset_selected_elements(&mut self) {
        let empty = HashSet::new();
        let (node_changes, edge_changes) =
            get_selection_changes(self.nodes.values(), self.edges.values(), &empty, &empty);
        self.dispatch_node_changes(node_changes);
        self.dispatch_edge_changes(edge_changes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{EdgeInput, NodeInput};
    use crate::geometry::XYPosition;
    use crate::store::FlowOptions;

    fn store(multi: bool) -> FlowStore {
        let mut store = FlowStore::with_options(FlowOptions {
            multi_selection_active: Some(multi),
            ..Default::default()
        });
        store.set_nodes(vec![
            NodeInput::new("a", XYPosition::ZERO),
            NodeInput::new("b", XYPosition::ZERO),
            NodeInput {
                selectable: Some(false),
                ..NodeInput::new("locked", XYPosition::ZERO)
            },
        ]);
        store.set_edges(vec![EdgeInput::new("e1", "a", "b")]);
        store
    }

    fn selected(store: &FlowStore) -> (Vec<String>, Vec<String>) {
        (
            store.selected_nodes().into_iter().map(|n| n.id.clone()).collect(),
            store.selected_edges().into_iter().map(|e| e.id.clone()).collect(),
        )
    }

    #[test]
    fn test_single_selection_replaces() {
        let mut store = store(false);
        store.add_selected_nodes(&["a"]);
        store.add_selected_edges(&["e1"]);
        assert_eq!(selected(&store), (vec![], vec!["e1".to_string()]));

        store.add_selected_elements(&["a", "b"], &[]);
        assert_eq!(selected(&store), (vec!["a".to_string(), "b".to_string()], vec![]));
    }

    #[test]
    fn test_multi_selection_adds() {
        let mut store = store(true);
        store.add_selected_nodes(&["a"]);
        store.add_selected_edges(&["e1"]);
        store.add_selected_nodes(&["b"]);
        assert_eq!(
            selected(&store),
            (vec!["a".to_string(), "b".to_string()], vec!["e1".to_string()])
        );
    }

    #[test]
    fn test_selectable_gate() {
        let mut store = store(false);
        store.add_selected_nodes(&["locked", "ghost"]);
        assert_eq!(selected(&store), (vec![], vec![]));
    }

    #[test]
    fn test_remove_and_reset() {
        let mut store = store(true);
        store.add_selected_elements(&["a", "b"], &["e1"]);
        store.remove_selected_nodes(&["a"]);
        assert_eq!(selected(&store), (vec!["b".to_string()], vec!["e1".to_string()]));

        store.reset_selected_elements();
        assert_eq!(selected(&store), (vec![], vec![]));
    }

    #[test]
    fn test_no_change_no_event() {
        let mut store = store(false);
        store.add_selected_nodes(&["a"]);

        let calls = std::sync::Arc::new(parking_lot::Mutex::new(0));
        let counter = calls.clone();
        store.events().nodes_change.on(move |_| *counter.lock() += 1);
        store.add_selected_nodes(&["a"]);
        store.remove_selected_nodes(&["b"]);
        assert_eq!(*calls.lock(), 0);
    }
}
