// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge definitions for the flow graph.

use crate::builders::EdgeInput;
use crate::node::HandleType;
use serde::{Deserialize, Serialize};

/// Default edge type
pub const DEFAULT_EDGE_TYPE: &str = "default";

/// The endpoints of a (possible) edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Source handle id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Target handle id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Connection {
    /// Create a connection between two nodes' anonymous handles
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    /// Set the handle ids
    pub fn with_handles(mut self, source_handle: Option<&str>, target_handle: Option<&str>) -> Self {
        self.source_handle = source_handle.map(str::to_string);
        self.target_handle = target_handle.map(str::to_string);
        self
    }

    /// Deterministic edge id for this connection
    pub fn edge_id(&self) -> String {
        format!(
            "flow__edge-{}{}-{}{}",
            self.source,
            self.source_handle.as_deref().unwrap_or(""),
            self.target,
            self.target_handle.as_deref().unwrap_or("")
        )
    }
}

/// Defaults applied to every edge created by the builders
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DefaultEdgeOptions {
    /// Edge type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    /// Animated flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
    /// Updatable flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updatable: Option<bool>,
    /// Selectable flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    /// Deletable flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletable: Option<bool>,
    /// Stacking order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

/// An edge in the flow
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// Unique id
    pub id: String,
    /// Renderer type tag
    #[serde(rename = "type")]
    pub edge_type: String,
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Source handle id
    pub source_handle: Option<String>,
    /// Target handle id
    pub target_handle: Option<String>,
    /// Display label
    pub label: Option<String>,
    /// User payload
    pub data: serde_json::Value,
    /// Style class names
    pub class: Option<String>,
    /// Style payload, opaque to the store
    pub style: Option<serde_json::Value>,
    /// Animated
    pub animated: bool,
    /// Hidden
    pub hidden: bool,
    /// Selected
    pub selected: bool,
    /// Stacking order
    pub z_index: Option<i32>,
    /// Per-edge override, `None` means deletable
    pub deletable: Option<bool>,
    /// Per-edge override of the global updatable flag
    pub updatable: Option<bool>,
    /// Per-edge override of the global selectable flag
    pub selectable: Option<bool>,
}

impl GraphEdge {
    /// Create an edge in its initial state
    pub fn new(id: impl Into<String>, connection: Connection) -> Self {
        Self {
            id: id.into(),
            edge_type: DEFAULT_EDGE_TYPE.to_string(),
            source: connection.source,
            target: connection.target,
            source_handle: connection.source_handle,
            target_handle: connection.target_handle,
            label: None,
            data: serde_json::Value::Object(serde_json::Map::new()),
            class: None,
            style: None,
            animated: false,
            hidden: false,
            selected: false,
            z_index: None,
            deletable: None,
            updatable: None,
            selectable: None,
        }
    }

    /// Apply edge defaults to fields the edge does not set itself
    pub fn apply_defaults(&mut self, defaults: &DefaultEdgeOptions) {
        if let Some(edge_type) = &defaults.edge_type {
            self.edge_type = edge_type.clone();
        }
        if let Some(animated) = defaults.animated {
            self.animated = animated;
        }
        self.updatable = self.updatable.or(defaults.updatable);
        self.selectable = self.selectable.or(defaults.selectable);
        self.deletable = self.deletable.or(defaults.deletable);
        self.z_index = self.z_index.or(defaults.z_index);
    }

    /// Overwrite every field the input specifies, keep the rest
    pub fn apply_input(&mut self, input: EdgeInput) {
        let EdgeInput {
            id: _,
            edge_type,
            source,
            target,
            source_handle,
            target_handle,
            label,
            data,
            class,
            style,
            animated,
            hidden,
            selected,
            z_index,
            deletable,
            updatable,
            selectable,
        } = input;

        if let Some(edge_type) = edge_type {
            self.edge_type = edge_type;
        }
        if let Some(source) = source {
            self.source = source;
        }
        if let Some(target) = target {
            self.target = target;
        }
        self.source_handle = source_handle;
        self.target_handle = target_handle;
        if label.is_some() {
            self.label = label;
        }
        if let Some(data) = data {
            self.data = data;
        }
        if class.is_some() {
            self.class = class;
        }
        if style.is_some() {
            self.style = style;
        }
        if let Some(animated) = animated {
            self.animated = animated;
        }
        if let Some(hidden) = hidden {
            self.hidden = hidden;
        }
        if let Some(selected) = selected {
            self.selected = selected;
        }
        if z_index.is_some() {
            self.z_index = z_index;
        }
        if deletable.is_some() {
            self.deletable = deletable;
        }
        if updatable.is_some() {
            self.updatable = updatable;
        }
        if selectable.is_some() {
            self.selectable = selectable;
        }
    }

    /// Strip derived and transient state, leaving the declarable fields
    pub fn to_input(&self) -> EdgeInput {
        EdgeInput {
            id: Some(self.id.clone()),
            edge_type: Some(self.edge_type.clone()),
            source: Some(self.source.clone()),
            target: Some(self.target.clone()),
            source_handle: self.source_handle.clone(),
            target_handle: self.target_handle.clone(),
            label: self.label.clone(),
            data: Some(self.data.clone()),
            class: self.class.clone(),
            style: self.style.clone(),
            animated: self.animated.then_some(true),
            hidden: self.hidden.then_some(true),
            selected: None,
            z_index: self.z_index,
            deletable: self.deletable,
            updatable: self.updatable,
            selectable: self.selectable,
        }
    }

    /// The endpoints of this edge
    pub fn connection(&self) -> Connection {
        Connection {
            source: self.source.clone(),
            target: self.target.clone(),
            source_handle: self.source_handle.clone(),
            target_handle: self.target_handle.clone(),
        }
    }

    /// Check if this edge touches a specific node
    pub fn involves_node(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    /// Check if this edge touches a specific handle
    pub fn involves_handle(&self, node_id: &str, handle_type: HandleType, handle_id: Option<&str>) -> bool {
        match handle_type {
            HandleType::Source => self.source == node_id && self.source_handle.as_deref() == handle_id,
            HandleType::Target => self.target == node_id && self.target_handle.as_deref() == handle_id,
        }
    }

    /// Check if the edge connects the same endpoints as `connection`
    pub fn same_endpoints(&self, connection: &Connection) -> bool {
        self.source == connection.source
            && self.target == connection.target
            && self.source_handle == connection.source_handle
            && self.target_handle == connection.target_handle
    }

    /// Whether the edge may be removed
    pub fn is_deletable(&self) -> bool {
        self.deletable.unwrap_or(true)
    }

    /// Whether the edge may be moved onto another connection
    pub fn is_updatable(&self, global: bool) -> bool {
        self.updatable.unwrap_or(global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_id_is_deterministic() {
        let plain = Connection::new("a", "b");
        assert_eq!(plain.edge_id(), "flow__edge-a-b");

        let handles = Connection::new("a", "b").with_handles(Some("out"), Some("in"));
        assert_eq!(handles.edge_id(), "flow__edge-aout-bin");
    }

    #[test]
    fn test_involves() {
        let edge = GraphEdge::new("e1", Connection::new("a", "b").with_handles(Some("out"), None));
        assert!(edge.involves_node("a"));
        assert!(edge.involves_node("b"));
        assert!(!edge.involves_node("c"));
        assert!(edge.involves_handle("a", HandleType::Source, Some("out")));
        assert!(!edge.involves_handle("a", HandleType::Source, None));
        assert!(edge.involves_handle("b", HandleType::Target, None));
    }

    #[test]
    fn test_defaults_do_not_override_explicit() {
        let mut edge = GraphEdge::new("e1", Connection::new("a", "b"));
        edge.deletable = Some(true);
        edge.apply_defaults(&DefaultEdgeOptions {
            edge_type: Some("step".into()),
            animated: Some(true),
            deletable: Some(false),
            ..Default::default()
        });
        assert_eq!(edge.edge_type, "step");
        assert!(edge.animated);
        assert_eq!(edge.deletable, Some(true));
    }
}
