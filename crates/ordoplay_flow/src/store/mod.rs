// SPDX-License-Identifier: MIT OR Apache-2.0
//! The flow store: canonical collections, derived views and the mutation API.
//!
//! Every mutating action computes a batch of [`NodeChange`]/[`EdgeChange`]
//! values and dispatches it. Dispatch runs the optional interceptor, notifies
//! the change listeners with whatever survived, and then applies the batch
//! when `apply_default` is on. Full replaces (`set_nodes`, `set_edges`) and
//! direct updates (`update_node`, `update_edge`) write the collections
//! directly and do not emit changes.
//!
//! The store bumps a revision counter on every observable mutation; derived
//! views are cached against it.

mod actions;
mod connection;
mod dimensions;
mod getters;
mod options;
mod selection;
mod serialize;
mod view;

pub use actions::{NodeDragItem, UpdateOptions};
pub use connection::{ConnectingHandle, ConnectionGesture, ConnectionStatus};
pub use dimensions::{MeasuredHandle, NodeDimensionUpdate, NodeMeasurement, StaticMeasurement};
pub use options::{ConnectionMode, FlowConfig, FlowOptions};
pub use serialize::{FlowExportObject, SerializeError, ViewportRestore};

use crate::builders::{mark_parents, ConnectionPredicate, NodePredicate, ValidConnectionContext};
use crate::changes::{self, EdgeChange, NodeChange};
use crate::edge::{Connection, GraphEdge};
use crate::error::FlowError;
use crate::events::FlowEvents;
use crate::geometry::{CoordinateExtent, Dimensions, XYZPosition};
use crate::lookup::{update_connection_lookup, ConnectionLookup};
use crate::node::GraphNode;
use crate::readiness::Readiness;
use crate::type_registry::TypeRegistry;
use crate::viewport::{PanZoom, Viewport};
use connection::ConnectionState;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Rewrites or vetoes a node change batch before listeners see it
pub type NodeChangeInterceptor = Box<dyn FnMut(Vec<NodeChange>) -> Vec<NodeChange> + Send>;

/// Rewrites or vetoes an edge change batch before listeners see it
pub type EdgeChangeInterceptor = Box<dyn FnMut(Vec<EdgeChange>) -> Vec<EdgeChange> + Send>;

/// Z offset of selected nodes when elevation is on
const SELECTED_ELEVATION: f64 = 1000.0;

/// Configuration waiting for the pan/zoom engine
#[derive(Debug, Default)]
struct PendingEngineState {
    min_zoom: Option<f64>,
    max_zoom: Option<f64>,
    translate_extent: Option<CoordinateExtent>,
    viewport: Option<Viewport>,
    fit_view: bool,
}

#[derive(Debug, Default)]
struct ViewCache {
    nodes: Option<(u64, Arc<[String]>)>,
    edges: Option<(u64, Arc<[String]>)>,
}

/// State of one flow graph
pub struct FlowStore {
    id: String,
    nodes: IndexMap<String, GraphNode>,
    edges: IndexMap<String, GraphEdge>,
    lookup: ConnectionLookup,
    config: FlowConfig,
    initial_options: Option<FlowOptions>,
    viewport: Viewport,
    dimensions: Dimensions,
    pan_zoom: Option<Box<dyn PanZoom>>,
    pending: PendingEngineState,
    pan_zoom_ready: Readiness,
    events: FlowEvents,
    node_interceptor: Option<NodeChangeInterceptor>,
    edge_interceptor: Option<EdgeChangeInterceptor>,
    is_valid_node: Option<Box<NodePredicate>>,
    is_valid_connection: Option<Box<ConnectionPredicate>>,
    node_types: TypeRegistry,
    edge_types: TypeRegistry,
    connection: ConnectionState,
    initialized: bool,
    fit_view_on_init_done: bool,
    torn_down: bool,
    pending_dimensions: Vec<NodeDimensionUpdate>,
    node_id_counter: u64,
    revision: u64,
    cache: Mutex<ViewCache>,
}

impl fmt::Debug for FlowStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowStore")
            .field("id", &self.id)
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("viewport", &self.viewport)
            .field("initialized", &self.initialized)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl Default for FlowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowStore {
    /// Create an uninitialized store with a random id
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    /// Create an uninitialized store with a fixed id
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            lookup: ConnectionLookup::new(),
            config: FlowConfig::default(),
            initial_options: None,
            viewport: Viewport::default(),
            dimensions: Dimensions::default(),
            pan_zoom: None,
            pending: PendingEngineState::default(),
            pan_zoom_ready: Readiness::new(),
            events: FlowEvents::default(),
            node_interceptor: None,
            edge_interceptor: None,
            is_valid_node: None,
            is_valid_connection: None,
            node_types: TypeRegistry::nodes(),
            edge_types: TypeRegistry::edges(),
            connection: ConnectionState::default(),
            initialized: false,
            fit_view_on_init_done: false,
            torn_down: false,
            pending_dimensions: Vec::new(),
            node_id_counter: 0,
            revision: 0,
            cache: Mutex::new(ViewCache::default()),
        }
    }

    /// Create an initialized store from options
    pub fn with_options(options: FlowOptions) -> Self {
        let mut store = Self::new();
        store.set_state(options);
        store
    }

    /// Instance id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Event hooks
    pub fn events(&self) -> &FlowEvents {
        &self.events
    }

    /// Resolved configuration
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Whether options were applied at least once
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether [`FlowStore::teardown`](FlowStore::teardown) ran
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Node renderer registry
    pub fn node_type_registry_mut(&mut self) -> &mut TypeRegistry {
        self.touch();
        &mut self.node_types
    }

    /// Edge renderer registry
    pub fn edge_type_registry_mut(&mut self) -> &mut TypeRegistry {
        self.touch();
        &mut self.edge_types
    }

    /// Install a node change interceptor, replacing any previous one
    pub fn set_node_change_interceptor(
        &mut self,
        interceptor: impl FnMut(Vec<NodeChange>) -> Vec<NodeChange> + Send + 'static,
    ) {
        self.node_interceptor = Some(Box::new(interceptor));
    }

    /// Install an edge change interceptor, replacing any previous one
    pub fn set_edge_change_interceptor(
        &mut self,
        interceptor: impl FnMut(Vec<EdgeChange>) -> Vec<EdgeChange> + Send + 'static,
    ) {
        self.edge_interceptor = Some(Box::new(interceptor));
    }

    /// Remove both change interceptors
    pub fn clear_change_interceptors(&mut self) {
        self.node_interceptor = None;
        self.edge_interceptor = None;
    }

    /// Predicate every node must pass to enter the store
    pub fn set_node_validator(&mut self, is_valid: impl Fn(&GraphNode) -> bool + Send + Sync + 'static) {
        self.is_valid_node = Some(Box::new(is_valid));
    }

    /// Predicate every connection must pass to become an edge
    pub fn set_connection_validator(
        &mut self,
        is_valid: impl Fn(&Connection, &ValidConnectionContext<'_>) -> bool + Send + Sync + 'static,
    ) {
        self.is_valid_connection = Some(Box::new(is_valid));
    }

    /// Apply a node change batch directly, bypassing the change channel.
    ///
    /// This is what dispatch does when `apply_default` is on; consumers
    /// that turn it off call this from their listener.
    pub fn apply_node_changes(&mut self, changes: &[NodeChange]) {
        if changes.is_empty() {
            return;
        }
        let was_initialized = self.nodes_initialized();
        changes::apply_node_changes(changes, &mut self.nodes);
        mark_parents(&mut self.nodes);
        self.refresh_computed_positions();
        self.touch();

        if !was_initialized && self.nodes_initialized() {
            tracing::debug!(store = %self.id, nodes = self.nodes.len(), "All nodes measured");
            self.events.nodes_initialized.trigger(&());
        }
    }

    /// Apply an edge change batch directly, bypassing the change channel
    pub fn apply_edge_changes(&mut self, changes: &[EdgeChange]) {
        if changes.is_empty() {
            return;
        }
        changes::apply_edge_changes(changes, &mut self.edges);
        self.rebuild_lookup();
        self.touch();
    }

    fn dispatch_node_changes(&mut self, changes: Vec<NodeChange>) {
        if changes.is_empty() {
            return;
        }
        let changes = match self.node_interceptor.as_mut() {
            Some(intercept) => intercept(changes),
            None => changes,
        };
        if changes.is_empty() {
            return;
        }

        tracing::debug!(store = %self.id, count = changes.len(), "Dispatching node changes");
        self.events.nodes_change.trigger(&changes);
        if self.config.apply_default {
            self.apply_node_changes(&changes);
        }
    }

    fn dispatch_edge_changes(&mut self, changes: Vec<EdgeChange>) {
        if changes.is_empty() {
            return;
        }
        let changes = match self.edge_interceptor.as_mut() {
            Some(intercept) => intercept(changes),
            None => changes,
        };
        if changes.is_empty() {
            return;
        }

        tracing::debug!(store = %self.id, count = changes.len(), "Dispatching edge changes");
        self.events.edges_change.trigger(&changes);
        if self.config.apply_default {
            self.apply_edge_changes(&changes);
        }
    }

    /// Log an error and publish it on the error channel
    fn emit_error(&self, error: FlowError) {
        tracing::warn!(store = %self.id, code = %error.code(), "{error}");
        self.events.error.trigger(&error);
    }

    fn emit_errors(&self, errors: impl IntoIterator<Item = FlowError>) {
        for error in errors {
            self.emit_error(error);
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn rebuild_lookup(&mut self) {
        update_connection_lookup(&mut self.lookup, self.edges.values());
    }

    fn next_node_id(counter: &mut u64) -> String {
        *counter += 1;
        format!("node-{counter}")
    }

    /// Recompute every node's absolute position and stacking order.
    ///
    /// A child sits at its parent's absolute position plus its own and is
    /// stacked at least one above the parent. Parent cycles are cut at the
    /// first repeated node.
    fn refresh_computed_positions(&mut self) {
        let elevate = self.config.elevate_nodes_on_select;
        let mut resolved: HashMap<&str, XYZPosition> = HashMap::with_capacity(self.nodes.len());

        for id in self.nodes.keys() {
            let mut chain: Vec<&str> = Vec::new();
            let mut cursor = Some(id.as_str());
            while let Some(current) = cursor {
                if resolved.contains_key(current) || chain.contains(&current) {
                    break;
                }
                let Some(node) = self.nodes.get(current) else {
                    break;
                };
                chain.push(node.id.as_str());
                cursor = node.parent_node.as_deref();
            }

            for &current in chain.iter().rev() {
                let Some(node) = self.nodes.get(current) else {
                    continue;
                };
                let mut z = f64::from(node.z_index.unwrap_or(0));
                if elevate && node.selected {
                    z += SELECTED_ELEVATION;
                }
                let parent = node.parent_node.as_deref().and_then(|p| resolved.get(p));
                let position = match parent {
                    Some(parent) => XYZPosition {
                        x: parent.x + node.position.x,
                        y: parent.y + node.position.y,
                        z: z.max(parent.z + 1.0),
                    },
                    None => XYZPosition {
                        x: node.position.x,
                        y: node.position.y,
                        z,
                    },
                };
                resolved.insert(node.id.as_str(), position);
            }
        }

        let resolved: HashMap<String, XYZPosition> =
            resolved.into_iter().map(|(id, p)| (id.to_string(), p)).collect();
        for node in self.nodes.values_mut() {
            if let Some(position) = resolved.get(&node.id) {
                node.computed_position = *position;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::NodeInput;
    use crate::geometry::XYPosition;

    #[test]
    fn test_new_store_is_uninitialized() {
        let store = FlowStore::new();
        assert!(!store.is_initialized());
        assert!(store.nodes().is_empty());
        assert_eq!(store.viewport(), Viewport::default());
    }

    #[test]
    fn test_computed_positions_follow_parents() {
        let mut store = FlowStore::with_options(FlowOptions::default());
        store.set_nodes(vec![
            NodeInput::new("group", XYPosition::new(100.0, 100.0)),
            NodeInput::new("child", XYPosition::new(10.0, 20.0)).with_parent("group"),
            NodeInput::new("grandchild", XYPosition::new(1.0, 1.0)).with_parent("child"),
        ]);

        let grandchild = store.find_node("grandchild").unwrap();
        assert_eq!(grandchild.computed_position.xy(), XYPosition::new(111.0, 121.0));
        assert_eq!(grandchild.computed_position.z, 2.0);
        assert!(store.find_node("group").unwrap().is_parent);
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let mut store = FlowStore::with_options(FlowOptions::default());
        store.set_nodes(vec![
            NodeInput::new("a", XYPosition::new(1.0, 0.0)).with_parent("b"),
            NodeInput::new("b", XYPosition::new(2.0, 0.0)).with_parent("a"),
        ]);
        assert_eq!(store.nodes().len(), 2);
    }

    #[test]
    fn test_interceptor_can_veto() {
        let mut store = FlowStore::with_options(FlowOptions::default());
        store.set_nodes(vec![NodeInput::new("a", XYPosition::ZERO)]);
        store.set_node_change_interceptor(|changes| {
            changes
                .into_iter()
                .filter(|c| !matches!(c, NodeChange::Remove(_)))
                .collect()
        });

        store.remove_nodes(&["a"], true, false);
        assert!(store.find_node("a").is_some());
    }

    #[test]
    fn test_apply_default_off_leaves_collections() {
        let mut store = FlowStore::with_options(FlowOptions {
            apply_default: Some(false),
            ..Default::default()
        });
        store.set_nodes(vec![NodeInput::new("a", XYPosition::ZERO)]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        store.events().nodes_change.on(move |changes| sink.lock().extend(changes.iter().cloned()));

        store.add_selected_nodes(&["a"]);
        assert!(!store.find_node("a").unwrap().selected);

        let changes = seen.lock().clone();
        store.apply_node_changes(&changes);
        assert!(store.find_node("a").unwrap().selected);
    }
}
