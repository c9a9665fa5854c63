// SPDX-License-Identifier: MIT OR Apache-2.0
//! Derived views over the store.

use super::FlowStore;
use crate::edge::GraphEdge;
use crate::error::FlowError;
use crate::geometry::{
    get_nodes_inside, get_overlapping_area, get_rect_of_nodes, is_edge_visible, node_to_rect,
    Dimensions, EdgeVisibilityParams, Rect,
};
use crate::lookup::{ConnectionLookup, HandleConnection};
use crate::node::{GraphNode, HandleType};
use crate::type_registry::{ElementRenderer, TypeEntry};
use crate::viewport::Viewport;
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;

impl FlowStore {
    /// Every node, in insertion order
    pub fn nodes(&self) -> &IndexMap<String, GraphNode> {
        &self.nodes
    }

    /// Every edge, in insertion order
    pub fn edges(&self) -> &IndexMap<String, GraphEdge> {
        &self.edges
    }

    /// Connection lookup over the current edges
    pub fn lookup(&self) -> &ConnectionLookup {
        &self.lookup
    }

    /// Current viewport
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Pane size
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Counter bumped on every observable mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Find a node by id
    pub fn find_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// Find an edge by id
    pub fn find_edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.get(id)
    }

    /// Find a node by id
    #[deprecated(note = "use `find_node`")]
    pub fn get_node(&self, id: &str) -> Option<&GraphNode> {
        self.find_node(id)
    }

    /// Find an edge by id
    #[deprecated(note = "use `find_edge`")]
    pub fn get_edge(&self, id: &str) -> Option<&GraphEdge> {
        self.find_edge(id)
    }

    /// Whether every visible node was measured; false for an empty graph
    pub fn nodes_initialized(&self) -> bool {
        let mut visible = self.nodes.values().filter(|n| !n.hidden).peekable();
        visible.peek().is_some() && visible.all(|n| n.initialized)
    }

    /// Whether every visible node was measured
    #[deprecated(note = "use `nodes_initialized`")]
    pub fn are_nodes_initialized(&self) -> bool {
        self.nodes_initialized()
    }

    /// Nodes to render.
    ///
    /// Hidden nodes are left out. With `only_render_visible_elements` only
    /// nodes overlapping the pane remain; unmeasured and dragged nodes
    /// always remain.
    pub fn visible_nodes(&self) -> Vec<&GraphNode> {
        let ids = {
            let mut cache = self.cache.lock();
            match &cache.nodes {
                Some((revision, ids)) if *revision == self.revision => ids.clone(),
                _ => {
                    let ids = self.compute_visible_nodes();
                    cache.nodes = Some((self.revision, ids.clone()));
                    ids
                }
            }
        };
        ids.iter().filter_map(|id| self.nodes.get(id)).collect()
    }

    fn compute_visible_nodes(&self) -> Arc<[String]> {
        let candidates = self.nodes.values().filter(|n| !n.hidden);
        if !self.config.only_render_visible_elements {
            return candidates.map(|n| n.id.clone()).collect();
        }
        let pane = Rect::new(0.0, 0.0, self.dimensions.width, self.dimensions.height);
        get_nodes_inside(candidates, &pane, &self.viewport, true, false)
            .into_iter()
            .map(|n| n.id.clone())
            .collect()
    }

    /// Edges to render.
    ///
    /// An edge is left out when it or either endpoint is hidden. With
    /// `only_render_visible_elements` the box spanned by both endpoint nodes
    /// must overlap the pane. Edges with a missing endpoint are reported as
    /// `EDGE_ORPHANED` once per revision and left out.
    pub fn visible_edges(&self) -> Vec<&GraphEdge> {
        let ids = {
            let mut cache = self.cache.lock();
            match &cache.edges {
                Some((revision, ids)) if *revision == self.revision => ids.clone(),
                _ => {
                    let ids = self.compute_visible_edges();
                    cache.edges = Some((self.revision, ids.clone()));
                    ids
                }
            }
        };
        ids.iter().filter_map(|id| self.edges.get(id)).collect()
    }

    fn compute_visible_edges(&self) -> Arc<[String]> {
        let cull = self.config.only_render_visible_elements;
        let mut visible = Vec::with_capacity(self.edges.len());

        for edge in self.edges.values() {
            let (Some(source), Some(target)) = (self.nodes.get(&edge.source), self.nodes.get(&edge.target)) else {
                self.emit_error(FlowError::EdgeOrphaned(edge.id.clone()));
                continue;
            };
            if edge.hidden || source.hidden || target.hidden {
                continue;
            }
            if cull {
                let params = EdgeVisibilityParams {
                    source_pos: source.computed_position.xy(),
                    target_pos: target.computed_position.xy(),
                    source_size: source.size(),
                    target_size: target.size(),
                    pane: self.dimensions,
                    viewport: self.viewport,
                };
                if !is_edge_visible(&params) {
                    continue;
                }
            }
            visible.push(edge.id.clone());
        }
        visible.into()
    }

    /// Selected nodes
    pub fn selected_nodes(&self) -> Vec<&GraphNode> {
        self.nodes.values().filter(|n| n.selected).collect()
    }

    /// Selected edges
    pub fn selected_edges(&self) -> Vec<&GraphEdge> {
        self.edges.values().filter(|e| e.selected).collect()
    }

    /// Stacking order of an edge.
    ///
    /// With `elevate_edges_on_select` an edge without its own `z_index`
    /// sits at the level of its higher endpoint, and a selected edge is
    /// lifted above every unselected element. Edges with a missing endpoint
    /// stay at zero.
    pub fn edge_z_index(&self, id: &str) -> Option<f64> {
        let edge = self.edges.get(id)?;
        let (Some(source), Some(target)) = (self.nodes.get(&edge.source), self.nodes.get(&edge.target)) else {
            return Some(0.0);
        };
        let explicit = edge.z_index.map(f64::from);
        if !self.config.elevate_edges_on_select {
            return Some(explicit.unwrap_or(0.0));
        }
        let mut z = explicit.unwrap_or_else(|| source.computed_position.z.max(target.computed_position.z));
        if edge.selected {
            z += super::SELECTED_ELEVATION;
        }
        Some(z)
    }

    /// Node type map: built-ins, registrations and every type used by a node
    pub fn node_types(&self) -> IndexMap<String, TypeEntry> {
        self.node_types
            .types_with(self.nodes.values().map(|n| n.node_type.as_str()))
    }

    /// Edge type map: built-ins, registrations and every type used by an edge
    pub fn edge_types(&self) -> IndexMap<String, TypeEntry> {
        self.edge_types
            .types_with(self.edges.values().map(|e| e.edge_type.as_str()))
    }

    /// Renderer for a node, falling back to the default renderer.
    ///
    /// Unregistered types are reported as `NODE_TYPE_MISSING`.
    pub fn node_renderer(&self, id: &str) -> Option<Arc<dyn ElementRenderer>> {
        let node = self.nodes.get(id)?;
        Some(self.node_types.resolve(&node.node_type).unwrap_or_else(|err| {
            self.emit_error(err);
            self.node_types.default_renderer()
        }))
    }

    /// Renderer for an edge, falling back to the default renderer.
    ///
    /// Unregistered types are reported as `EDGE_TYPE_MISSING`.
    pub fn edge_renderer(&self, id: &str) -> Option<Arc<dyn ElementRenderer>> {
        let edge = self.edges.get(id)?;
        Some(self.edge_types.resolve(&edge.edge_type).unwrap_or_else(|err| {
            self.emit_error(err);
            self.edge_types.default_renderer()
        }))
    }

    /// Edges touching any of the given nodes
    pub fn connected_edges(&self, node_ids: &[&str]) -> Vec<&GraphEdge> {
        let ids: IndexSet<&str> = node_ids
            .iter()
            .flat_map(|id| self.lookup.node_connections(id))
            .collect();
        self.edges
            .values()
            .filter(|edge| ids.contains(edge.id.as_str()))
            .collect()
    }

    /// Edges attached to one handle
    pub fn handle_connections(
        &self,
        node_id: &str,
        handle_type: HandleType,
        handle_id: Option<&str>,
    ) -> Vec<&HandleConnection> {
        self.lookup.handle_connections(node_id, handle_type, handle_id)
    }

    /// Nodes with an edge into `node_id`
    pub fn incomers(&self, node_id: &str) -> Vec<&GraphNode> {
        let sources: IndexSet<&str> = self
            .edges
            .values()
            .filter(|e| e.target == node_id)
            .map(|e| e.source.as_str())
            .collect();
        sources.into_iter().filter_map(|id| self.nodes.get(id)).collect()
    }

    /// Nodes with an edge out of `node_id`
    pub fn outgoers(&self, node_id: &str) -> Vec<&GraphNode> {
        let targets: IndexSet<&str> = self
            .edges
            .values()
            .filter(|e| e.source == node_id)
            .map(|e| e.target.as_str())
            .collect();
        targets.into_iter().filter_map(|id| self.nodes.get(id)).collect()
    }

    /// Bounding rectangle of the given nodes, or of every node
    pub fn nodes_bounds(&self, node_ids: Option<&[&str]>) -> Rect {
        match node_ids {
            Some(ids) => get_rect_of_nodes(ids.iter().filter_map(|id| self.nodes.get(*id))),
            None => get_rect_of_nodes(self.nodes.values()),
        }
    }

    /// Nodes overlapping `node_id`; with `partially` off they must be fully
    /// contained in it
    pub fn intersecting_nodes(&self, node_id: &str, partially: bool) -> Vec<&GraphNode> {
        let Some(node) = self.nodes.get(node_id) else {
            self.emit_error(FlowError::NodeNotFound(node_id.to_string()));
            return Vec::new();
        };
        let rect = node_to_rect(node);
        self.nodes
            .values()
            .filter(|other| other.id != node.id)
            .filter(|other| {
                let other_rect = node_to_rect(other);
                let overlap = get_overlapping_area(&rect, &other_rect);
                if partially {
                    overlap > 0.0
                } else {
                    overlap >= other_rect.width * other_rect.height && overlap > 0.0
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::builders::{EdgeInput, NodeInput};
    use crate::error::ErrorCode;
    use crate::geometry::{Dimensions, XYPosition};
    use crate::store::{FlowOptions, FlowStore};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn store_with_graph() -> FlowStore {
        let mut store = FlowStore::with_options(FlowOptions::default());
        store.set_nodes(vec![
            NodeInput::new("a", XYPosition::ZERO),
            NodeInput::new("b", XYPosition::new(100.0, 0.0)),
            NodeInput::new("c", XYPosition::new(200.0, 0.0)).with_type("note"),
        ]);
        store.set_edges(vec![EdgeInput::new("e1", "a", "b"), EdgeInput::new("e2", "b", "c")]);
        store
    }

    #[test]
    fn test_edge_z_index_elevation() {
        let nodes = vec![
            NodeInput {
                z_index: Some(3),
                ..NodeInput::new("a", XYPosition::ZERO)
            },
            NodeInput::new("b", XYPosition::new(100.0, 0.0)),
        ];
        let edges = vec![
            EdgeInput::new("e1", "a", "b"),
            EdgeInput {
                z_index: Some(7),
                ..EdgeInput::new("e2", "b", "a")
            },
        ];

        let mut flat = FlowStore::with_options(FlowOptions::default());
        flat.set_nodes(nodes.clone());
        flat.set_edges(edges.clone());
        flat.add_selected_edges(&["e1"]);
        assert_eq!(flat.edge_z_index("e1"), Some(0.0));
        assert_eq!(flat.edge_z_index("e2"), Some(7.0));
        assert_eq!(flat.edge_z_index("nope"), None);

        let mut elevated = FlowStore::with_options(FlowOptions {
            elevate_edges_on_select: Some(true),
            ..Default::default()
        });
        elevated.set_nodes(nodes);
        elevated.set_edges(edges);
        assert_eq!(elevated.edge_z_index("e1"), Some(3.0));
        elevated.add_selected_edges(&["e1"]);
        assert_eq!(elevated.edge_z_index("e1"), Some(1003.0));
        assert_eq!(elevated.edge_z_index("e2"), Some(7.0));
    }

    #[test]
    fn test_visible_skips_hidden() {
        let mut store = store_with_graph();
        store.update_node("b", NodeInput { hidden: Some(true), ..Default::default() }, Default::default());

        let nodes: Vec<_> = store.visible_nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(nodes, vec!["a", "c"]);
        assert!(store.visible_edges().is_empty());
    }

    #[test]
    fn test_visible_nodes_culled_to_pane() {
        let mut store = FlowStore::with_options(FlowOptions {
            only_render_visible_elements: Some(true),
            ..Default::default()
        });
        store.set_nodes(vec![
            NodeInput::new("near", XYPosition::new(10.0, 10.0)),
            NodeInput::new("far", XYPosition::new(5000.0, 5000.0)),
            NodeInput::new("unmeasured", XYPosition::new(9000.0, 9000.0)),
        ]);
        store.set_dimensions(Dimensions::new(800.0, 600.0));
        for id in ["near", "far"] {
            store.update_node_dimensions(vec![crate::store::NodeDimensionUpdate::new(
                id,
                crate::store::StaticMeasurement::new(Dimensions::new(50.0, 50.0)),
            )]);
        }

        let nodes: Vec<_> = store.visible_nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(nodes, vec!["near", "unmeasured"]);
    }

    #[test]
    fn test_orphaned_edge_reported_once_per_revision() {
        let mut store = store_with_graph();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        store.events().error.on(move |err| sink.lock().push(err.code()));

        // full node replace keeps edges; e2 loses its target
        store.set_nodes(vec![NodeInput::new("a", XYPosition::ZERO), NodeInput::new("b", XYPosition::ZERO)]);
        assert_eq!(store.visible_edges().len(), 1);
        assert_eq!(store.visible_edges().len(), 1);
        assert_eq!(*errors.lock(), vec![ErrorCode::EdgeOrphaned]);
    }

    #[test]
    fn test_types_include_ad_hoc() {
        let store = store_with_graph();
        let types = store.node_types();
        assert!(types.contains_key("note"));
        assert!(types.contains_key("input"));
        assert!(store.edge_types().contains_key("step"));
    }

    #[test]
    fn test_missing_renderer_falls_back() {
        let store = store_with_graph();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        store.events().error.on(move |err| sink.lock().push(err.code()));

        let renderer = store.node_renderer("c").unwrap();
        assert_eq!(renderer.name(), "default");
        assert_eq!(*errors.lock(), vec![ErrorCode::NodeTypeMissing]);
    }

    #[test]
    fn test_adjacency() {
        let store = store_with_graph();
        let connected: Vec<_> = store.connected_edges(&["b"]).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(connected, vec!["e1", "e2"]);
        assert_eq!(store.incomers("b")[0].id, "a");
        assert_eq!(store.outgoers("b")[0].id, "c");
        assert!(store.incomers("a").is_empty());
    }

    #[test]
    #[allow(deprecated)]
    fn test_deprecated_aliases() {
        let store = store_with_graph();
        assert_eq!(store.get_node("a"), store.find_node("a"));
        assert_eq!(store.get_edge("e1"), store.find_edge("e1"));
        assert_eq!(store.are_nodes_initialized(), store.nodes_initialized());
        assert!(!store.nodes_initialized());
    }
}
