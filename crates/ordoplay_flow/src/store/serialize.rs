// SPDX-License-Identifier: MIT OR Apache-2.0
//! Export and import of the flow state.
//!
//! The export object carries the declarable fields of every node and edge
//! plus the viewport. Derived state (computed positions, measurements,
//! selection) is left out.

use super::FlowStore;
use crate::builders::{EdgeInput, NodeInput};
use crate::edge::GraphEdge;
use crate::node::GraphNode;
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from serialization helpers
#[derive(Debug, Error)]
pub enum SerializeError {
    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// RON encoding failed
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    /// RON decoding failed
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// Reading or writing a file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializable snapshot of a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowExportObject {
    /// Nodes in insertion order
    pub nodes: Vec<NodeInput>,
    /// Edges in insertion order
    pub edges: Vec<EdgeInput>,
    /// Viewport pan as `[x, y]`
    pub position: [f64; 2],
    /// Viewport zoom
    pub zoom: f64,
    /// Full viewport
    pub viewport: Viewport,
}

impl Default for FlowExportObject {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            position: [0.0, 0.0],
            zoom: 1.0,
            viewport: Viewport::default(),
        }
    }
}

impl FlowExportObject {
    /// The viewport this snapshot restores.
    ///
    /// Snapshots that only carry `position`/`zoom` are honoured too.
    pub fn restored_viewport(&self) -> Viewport {
        let legacy = Viewport::new(self.position[0], self.position[1], self.zoom);
        if self.viewport == Viewport::default() {
            legacy
        } else {
            self.viewport
        }
    }
}

/// What happened to the viewport of an imported snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportRestore {
    /// The pan/zoom engine moved to it
    Applied,
    /// Kept until the pan/zoom engine attaches
    Deferred,
}

impl FlowStore {
    /// Snapshot the flow
    pub fn to_object(&self) -> FlowExportObject {
        FlowExportObject {
            nodes: self.nodes.values().map(GraphNode::to_input).collect(),
            edges: self.edges.values().map(GraphEdge::to_input).collect(),
            position: [self.viewport.x, self.viewport.y],
            zoom: self.viewport.zoom,
            viewport: self.viewport,
        }
    }

    /// Replace the flow with a snapshot
    pub fn from_object(&mut self, object: FlowExportObject) -> ViewportRestore {
        let viewport = object.restored_viewport();
        self.initialized = true;
        self.set_nodes(object.nodes);
        self.set_edges(object.edges);
        tracing::debug!(store = %self.id, nodes = self.nodes.len(), edges = self.edges.len(), "Imported flow");

        if self.set_viewport(viewport, None) {
            ViewportRestore::Applied
        } else {
            ViewportRestore::Deferred
        }
    }

    /// Snapshot the flow as pretty JSON
    pub fn to_json(&self) -> Result<String, SerializeError> {
        Ok(serde_json::to_string_pretty(&self.to_object())?)
    }

    /// Replace the flow with a JSON snapshot
    pub fn from_json(&mut self, content: &str) -> Result<ViewportRestore, SerializeError> {
        let object: FlowExportObject = serde_json::from_str(content)?;
        Ok(self.from_object(object))
    }

    /// Snapshot the flow as pretty RON
    pub fn to_ron(&self) -> Result<String, SerializeError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(&self.to_object(), config)?)
    }

    /// Replace the flow with a RON snapshot
    pub fn from_ron(&mut self, content: &str) -> Result<ViewportRestore, SerializeError> {
        let object: FlowExportObject = ron::from_str(content)?;
        Ok(self.from_object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Dimensions, XYPosition};
    use crate::store::{FlowOptions, NodeDimensionUpdate, StaticMeasurement};
    use crate::viewport::HeadlessPanZoom;
    use serde_json::json;

    fn sample() -> FlowStore {
        let mut store = FlowStore::with_options(FlowOptions::default());
        store.set_nodes(vec![
            NodeInput::new("a", XYPosition::new(10.0, 20.0)).with_data(json!({ "label": "A" })),
            NodeInput::new("b", XYPosition::new(5.0, 5.0)).with_parent("a"),
        ]);
        store.set_edges(vec![EdgeInput::new("e1", "a", "b")]);
        store.update_node_dimensions(vec![NodeDimensionUpdate::new(
            "a",
            StaticMeasurement::new(Dimensions::new(100.0, 50.0)),
        )]);
        store
    }

    #[test]
    fn test_export_strips_derived_fields() {
        let store = sample();
        let value = serde_json::to_value(store.to_object()).unwrap();
        let a = &value["nodes"][0];
        assert_eq!(a["id"], "a");
        assert_eq!(a["data"], json!({ "label": "A" }));
        assert!(a.get("computedPosition").is_none());
        assert!(a.get("dimensions").is_none());
        assert_eq!(value["nodes"][1]["parentNode"], "a");
        assert_eq!(value["zoom"], 1.0);
    }

    #[test]
    fn test_json_import_into_fresh_store() {
        let json = sample().to_json().unwrap();

        let mut restored = FlowStore::new();
        assert_eq!(restored.from_json(&json).unwrap(), ViewportRestore::Deferred);
        assert_eq!(restored.nodes().len(), 2);
        assert_eq!(
            restored.find_node("b").unwrap().computed_position.xy(),
            XYPosition::new(15.0, 25.0)
        );
        assert!(restored.find_edge("e1").is_some());
        assert_eq!(restored.to_object(), sample().to_object());
    }

    #[test]
    fn test_ron_import_applies_viewport() {
        let mut source = sample();
        source.set_dimensions(Dimensions::new(800.0, 600.0));
        source.attach_pan_zoom(Box::new(HeadlessPanZoom::new(Dimensions::new(800.0, 600.0))));
        source.set_viewport(Viewport::new(30.0, 40.0, 1.5), None);
        let ron = source.to_ron().unwrap();

        let mut target = FlowStore::with_options(FlowOptions::default());
        target.set_dimensions(Dimensions::new(800.0, 600.0));
        target.attach_pan_zoom(Box::new(HeadlessPanZoom::new(Dimensions::new(800.0, 600.0))));
        assert_eq!(target.from_ron(&ron).unwrap(), ViewportRestore::Applied);
        assert_eq!(target.viewport(), Viewport::new(30.0, 40.0, 1.5));
    }

    #[test]
    fn test_legacy_position_and_bad_input() {
        let object: FlowExportObject = serde_json::from_value(json!({
            "nodes": [{ "id": "a" }],
            "position": [12.0, 8.0],
            "zoom": 0.75
        }))
        .unwrap();
        assert_eq!(object.restored_viewport(), Viewport::new(12.0, 8.0, 0.75));

        let mut store = FlowStore::new();
        assert!(matches!(store.from_json("{ nodes: "), Err(SerializeError::Json(_))));
        assert!(matches!(store.from_ron("(nodes: ["), Err(SerializeError::RonParse(_))));
    }
}
