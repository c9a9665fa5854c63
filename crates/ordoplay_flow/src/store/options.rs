// SPDX-License-Identifier: MIT OR Apache-2.0
//! Store configuration.
//!
//! [`FlowOptions`] is the loose, serializable form accepted by
//! [`FlowStore::set_state`](super::FlowStore::set_state) and option files.
//! [`FlowConfig`] is the resolved configuration the store reads.

use super::SerializeError;
use crate::builders::{EdgeInput, NodeInput};
use crate::edge::DefaultEdgeOptions;
use crate::geometry::CoordinateExtent;
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How strictly handle roles are checked when connecting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Source handles only connect to target handles
    Strict,
    /// Any handle connects to any other handle
    #[default]
    Loose,
}

/// Partial store configuration; unset fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowOptions {
    /// Replace the node collection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<NodeInput>>,
    /// Replace the edge collection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<EdgeInput>>,
    /// Lower zoom bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<f64>,
    /// Upper zoom bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<f64>,
    /// Viewport used on attach and reset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_viewport: Option<Viewport>,
    /// Allowed pan area
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translate_extent: Option<CoordinateExtent>,
    /// Allowed drag area for nodes without their own extent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_extent: Option<CoordinateExtent>,
    /// Snap dragged nodes to the grid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap_to_grid: Option<bool>,
    /// Grid cell size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap_grid: Option<[f64; 2]>,
    /// Cull nodes and edges outside the viewport
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_render_visible_elements: Option<bool>,
    /// Global draggable default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes_draggable: Option<bool>,
    /// Global connectable default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes_connectable: Option<bool>,
    /// Global selectable default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elements_selectable: Option<bool>,
    /// Global updatable default for edges
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edges_updatable: Option<bool>,
    /// Raise selected nodes above the rest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevate_nodes_on_select: Option<bool>,
    /// Raise selected edges above the rest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevate_edges_on_select: Option<bool>,
    /// Apply dispatched changes automatically
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_default: Option<bool>,
    /// Selection actions add to the selection instead of replacing it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_selection_active: Option<bool>,
    /// Handle role checking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_mode: Option<ConnectionMode>,
    /// Snap distance for connection end handles, in screen pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_radius: Option<f64>,
    /// Add an edge for every completed connection gesture
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_connect: Option<bool>,
    /// Fit the view once all nodes are measured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit_view_on_init: Option<bool>,
    /// Defaults for new edges
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_edge_options: Option<DefaultEdgeOptions>,
}

impl FlowOptions {
    /// Parse options from RON text
    pub fn from_ron(content: &str) -> Result<Self, SerializeError> {
        Ok(ron::from_str(content)?)
    }

    /// Load options from a RON file
    pub fn load(path: &Path) -> Result<Self, SerializeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Save options to a RON file
    pub fn save(&self, path: &Path) -> Result<(), SerializeError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Resolved store configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FlowConfig {
    /// Lower zoom bound
    pub min_zoom: f64,
    /// Upper zoom bound
    pub max_zoom: f64,
    /// Viewport used on attach and reset
    pub default_viewport: Viewport,
    /// Allowed pan area
    pub translate_extent: CoordinateExtent,
    /// Allowed drag area for nodes without their own extent
    pub node_extent: CoordinateExtent,
    /// Snap dragged nodes to the grid
    pub snap_to_grid: bool,
    /// Grid cell size
    pub snap_grid: [f64; 2],
    /// Cull nodes and edges outside the viewport
    pub only_render_visible_elements: bool,
    /// Global draggable default
    pub nodes_draggable: bool,
    /// Global connectable default
    pub nodes_connectable: bool,
    /// Global selectable default
    pub elements_selectable: bool,
    /// Global updatable default for edges
    pub edges_updatable: bool,
    /// Raise selected nodes above the rest
    pub elevate_nodes_on_select: bool,
    /// Raise selected edges above the rest
    pub elevate_edges_on_select: bool,
    /// Apply dispatched changes automatically
    pub apply_default: bool,
    /// Selection actions add to the selection instead of replacing it
    pub multi_selection_active: bool,
    /// Handle role checking
    pub connection_mode: ConnectionMode,
    /// Snap distance for connection end handles
    pub connection_radius: f64,
    /// Add an edge for every completed connection gesture
    pub auto_connect: bool,
    /// Fit the view once all nodes are measured
    pub fit_view_on_init: bool,
    /// Defaults for new edges
    pub default_edge_options: Option<DefaultEdgeOptions>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 2.0,
            default_viewport: Viewport::default(),
            translate_extent: CoordinateExtent::INFINITE,
            node_extent: CoordinateExtent::INFINITE,
            snap_to_grid: false,
            snap_grid: [15.0, 15.0],
            only_render_visible_elements: false,
            nodes_draggable: true,
            nodes_connectable: true,
            elements_selectable: true,
            edges_updatable: true,
            elevate_nodes_on_select: true,
            elevate_edges_on_select: false,
            apply_default: true,
            multi_selection_active: false,
            connection_mode: ConnectionMode::Loose,
            connection_radius: 20.0,
            auto_connect: false,
            fit_view_on_init: false,
            default_edge_options: None,
        }
    }
}

impl FlowConfig {
    /// Overlay every immediate option.
    ///
    /// Zoom bounds and the translate extent are left alone: they go through
    /// the pan/zoom engine.
    pub fn apply(&mut self, options: &FlowOptions) {
        if let Some(viewport) = options.default_viewport {
            self.default_viewport = viewport;
        }
        if let Some(extent) = options.node_extent {
            self.node_extent = extent;
        }
        if let Some(snap) = options.snap_to_grid {
            self.snap_to_grid = snap;
        }
        if let Some(grid) = options.snap_grid {
            self.snap_grid = grid;
        }
        if let Some(only_visible) = options.only_render_visible_elements {
            self.only_render_visible_elements = only_visible;
        }
        if let Some(draggable) = options.nodes_draggable {
            self.nodes_draggable = draggable;
        }
        if let Some(connectable) = options.nodes_connectable {
            self.nodes_connectable = connectable;
        }
        if let Some(selectable) = options.elements_selectable {
            self.elements_selectable = selectable;
        }
        if let Some(updatable) = options.edges_updatable {
            self.edges_updatable = updatable;
        }
        if let Some(elevate) = options.elevate_nodes_on_select {
            self.elevate_nodes_on_select = elevate;
        }
        if let Some(elevate) = options.elevate_edges_on_select {
            self.elevate_edges_on_select = elevate;
        }
        if let Some(apply_default) = options.apply_default {
            self.apply_default = apply_default;
        }
        if let Some(multi) = options.multi_selection_active {
            self.multi_selection_active = multi;
        }
        if let Some(mode) = options.connection_mode {
            self.connection_mode = mode;
        }
        if let Some(radius) = options.connection_radius {
            self.connection_radius = radius;
        }
        if let Some(auto_connect) = options.auto_connect {
            self.auto_connect = auto_connect;
        }
        if let Some(fit_view) = options.fit_view_on_init {
            self.fit_view_on_init = fit_view;
        }
        if options.default_edge_options.is_some() {
            self.default_edge_options = options.default_edge_options.clone();
        }
    }
}
