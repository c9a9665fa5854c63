// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the flow graph.

use crate::builders::NodeInput;
use crate::geometry::{CoordinateExtent, Dimensions, XYPosition, XYZPosition};
use serde::{Deserialize, Serialize};

/// Role of a handle in a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleType {
    /// Edges start here
    Source,
    /// Edges end here
    Target,
}

impl HandleType {
    /// The opposite role
    pub fn opposite(self) -> Self {
        match self {
            Self::Source => Self::Target,
            Self::Target => Self::Source,
        }
    }
}

/// Side of a node a handle sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Top side
    #[default]
    Top,
    /// Right side
    Right,
    /// Bottom side
    Bottom,
    /// Left side
    Left,
}

/// Measured geometry of one handle, relative to its node and unscaled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandleElement {
    /// Handle id, `None` for a node's anonymous handle
    pub id: Option<String>,
    /// Side of the node
    pub position: Position,
    /// Offset from the node's left edge
    pub x: f64,
    /// Offset from the node's top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

/// Handle geometry of a node, grouped by role
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HandleBounds {
    /// Source handles
    pub source: Vec<HandleElement>,
    /// Target handles
    pub target: Vec<HandleElement>,
}

impl HandleBounds {
    /// Handles of one role
    pub fn of(&self, handle_type: HandleType) -> &[HandleElement] {
        match handle_type {
            HandleType::Source => &self.source,
            HandleType::Target => &self.target,
        }
    }

    /// Find a handle by role and id; `None` picks the first handle of that role
    pub fn find(&self, handle_type: HandleType, id: Option<&str>) -> Option<&HandleElement> {
        let handles = self.of(handle_type);
        match id {
            Some(id) => handles.iter().find(|h| h.id.as_deref() == Some(id)),
            None => handles.first(),
        }
    }
}

/// Where a node may be dragged
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ExtentRepr", into = "ExtentRepr")]
pub enum NodeExtent {
    /// Inside the parent node's box
    Parent,
    /// Inside fixed bounds (parent-relative for child nodes)
    Coordinates(CoordinateExtent),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ExtentRepr {
    Keyword(String),
    Coordinates(CoordinateExtent),
}

impl TryFrom<ExtentRepr> for NodeExtent {
    type Error = String;

    fn try_from(repr: ExtentRepr) -> Result<Self, Self::Error> {
        match repr {
            ExtentRepr::Keyword(k) if k == "parent" => Ok(Self::Parent),
            ExtentRepr::Keyword(k) => Err(format!("unknown node extent \"{k}\"")),
            ExtentRepr::Coordinates(c) => Ok(Self::Coordinates(c)),
        }
    }
}

impl From<NodeExtent> for ExtentRepr {
    fn from(extent: NodeExtent) -> Self {
        match extent {
            NodeExtent::Parent => Self::Keyword("parent".to_string()),
            NodeExtent::Coordinates(c) => Self::Coordinates(c),
        }
    }
}

/// Default node type
pub const DEFAULT_NODE_TYPE: &str = "default";

/// A node in the flow
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Unique id
    pub id: String,
    /// Renderer type tag
    #[serde(rename = "type")]
    pub node_type: String,
    /// Position in flow coordinates, relative to the parent if any
    pub position: XYPosition,
    /// Absolute position including parent offsets, derived
    pub computed_position: XYZPosition,
    /// Measured size
    pub dimensions: Dimensions,
    /// Explicit width, used until measured
    pub width: Option<f64>,
    /// Explicit height, used until measured
    pub height: Option<f64>,
    /// Id of the parent node
    pub parent_node: Option<String>,
    /// Drag bounds
    pub extent: Option<NodeExtent>,
    /// Grow the parent when this node leaves its box
    pub expand_parent: bool,
    /// Measured handle geometry
    pub handle_bounds: HandleBounds,
    /// User payload
    pub data: serde_json::Value,
    /// Display label
    pub label: Option<String>,
    /// Style class names
    pub class: Option<String>,
    /// Style payload, opaque to the store
    pub style: Option<serde_json::Value>,
    /// Explicit stacking order
    pub z_index: Option<i32>,
    /// Hidden nodes are neither rendered nor culled
    pub hidden: bool,
    /// Selected
    pub selected: bool,
    /// Being dragged
    pub dragging: bool,
    /// Being resized
    pub resizing: bool,
    /// Measured at least once
    pub initialized: bool,
    /// Another node names this one as parent
    pub is_parent: bool,
    /// Per-node override of the global draggable flag
    pub draggable: Option<bool>,
    /// Per-node override of the global selectable flag
    pub selectable: Option<bool>,
    /// Per-node override of the global connectable flag
    pub connectable: Option<bool>,
    /// Per-node override, `None` means deletable
    pub deletable: Option<bool>,
}

impl GraphNode {
    /// Create a node in its initial state
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: DEFAULT_NODE_TYPE.to_string(),
            position: XYPosition::ZERO,
            computed_position: XYZPosition::default(),
            dimensions: Dimensions::default(),
            width: None,
            height: None,
            parent_node: None,
            extent: None,
            expand_parent: false,
            handle_bounds: HandleBounds::default(),
            data: serde_json::Value::Object(serde_json::Map::new()),
            label: None,
            class: None,
            style: None,
            z_index: None,
            hidden: false,
            selected: false,
            dragging: false,
            resizing: false,
            initialized: false,
            is_parent: false,
            draggable: None,
            selectable: None,
            connectable: None,
            deletable: None,
        }
    }

    /// Create a fresh node from loose input
    pub fn from_input(input: NodeInput, id: String) -> Self {
        let mut node = Self::new(id);
        node.apply_input(input);
        node.computed_position = XYZPosition {
            x: node.position.x,
            y: node.position.y,
            z: 0.0,
        };
        node
    }

    /// Overwrite every field the input specifies, keep the rest
    pub fn apply_input(&mut self, input: NodeInput) {
        let NodeInput {
            id: _,
            node_type,
            position,
            data,
            label,
            class,
            style,
            width,
            height,
            parent_node,
            extent,
            expand_parent,
            z_index,
            hidden,
            selected,
            draggable,
            selectable,
            connectable,
            deletable,
        } = input;

        if let Some(node_type) = node_type {
            self.node_type = node_type;
        }
        if let Some(position) = position {
            self.position = position;
        }
        if let Some(data) = data {
            self.data = data;
        }
        if label.is_some() {
            self.label = label;
        }
        if class.is_some() {
            self.class = class;
        }
        if style.is_some() {
            self.style = style;
        }
        if width.is_some() {
            self.width = width;
        }
        if height.is_some() {
            self.height = height;
        }
        if parent_node.is_some() {
            self.parent_node = parent_node;
        }
        if extent.is_some() {
            self.extent = extent;
        }
        if let Some(expand_parent) = expand_parent {
            self.expand_parent = expand_parent;
        }
        if z_index.is_some() {
            self.z_index = z_index;
        }
        if let Some(hidden) = hidden {
            self.hidden = hidden;
        }
        if let Some(selected) = selected {
            self.selected = selected;
        }
        if draggable.is_some() {
            self.draggable = draggable;
        }
        if selectable.is_some() {
            self.selectable = selectable;
        }
        if connectable.is_some() {
            self.connectable = connectable;
        }
        if deletable.is_some() {
            self.deletable = deletable;
        }
    }

    /// Strip derived and transient state, leaving the declarable fields
    pub fn to_input(&self) -> NodeInput {
        NodeInput {
            id: Some(self.id.clone()),
            node_type: Some(self.node_type.clone()),
            position: Some(self.position),
            data: Some(self.data.clone()),
            label: self.label.clone(),
            class: self.class.clone(),
            style: self.style.clone(),
            width: self.width,
            height: self.height,
            parent_node: self.parent_node.clone(),
            extent: self.extent,
            expand_parent: self.expand_parent.then_some(true),
            z_index: self.z_index,
            hidden: self.hidden.then_some(true),
            selected: None,
            draggable: self.draggable,
            selectable: self.selectable,
            connectable: self.connectable,
            deletable: self.deletable,
        }
    }

    /// Effective size: measured dimensions, falling back to explicit width/height
    pub fn size(&self) -> Dimensions {
        let width = if self.dimensions.width > 0.0 {
            self.dimensions.width
        } else {
            self.width.unwrap_or(0.0)
        };
        let height = if self.dimensions.height > 0.0 {
            self.dimensions.height
        } else {
            self.height.unwrap_or(0.0)
        };
        Dimensions::new(width, height)
    }

    /// Whether the node can be dragged given the global default
    pub fn is_draggable(&self, global: bool) -> bool {
        self.draggable.unwrap_or(global)
    }

    /// Whether the node can be selected given the global default
    pub fn is_selectable(&self, global: bool) -> bool {
        self.selectable.unwrap_or(global)
    }

    /// Whether handles on this node accept connections given the global default
    pub fn is_connectable(&self, global: bool) -> bool {
        self.connectable.unwrap_or(global)
    }

    /// Whether the node may be removed
    pub fn is_deletable(&self) -> bool {
        self.deletable.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_from_input_defaults() {
        let node = GraphNode::from_input(NodeInput::default(), "n1".to_string());
        assert_eq!(node.id, "n1");
        assert_eq!(node.node_type, DEFAULT_NODE_TYPE);
        assert_eq!(node.position, XYPosition::ZERO);
        assert_eq!(node.dimensions, Dimensions::default());
        assert!(!node.initialized);
        assert!(node.handle_bounds.source.is_empty());
    }

    #[test]
    fn test_apply_input_keeps_internal_state() {
        let mut node = GraphNode::from_input(NodeInput::new("a", XYPosition::new(1.0, 2.0)), "a".into());
        node.dimensions = Dimensions::new(100.0, 40.0);
        node.initialized = true;
        node.selected = true;

        node.apply_input(NodeInput::new("a", XYPosition::new(5.0, 5.0)));
        assert_eq!(node.position, XYPosition::new(5.0, 5.0));
        assert_eq!(node.dimensions, Dimensions::new(100.0, 40.0));
        assert!(node.initialized);
        assert!(node.selected);
    }

    #[test]
    fn test_size_falls_back_to_explicit() {
        let mut node = GraphNode::new("a");
        node.width = Some(50.0);
        node.height = Some(20.0);
        assert_eq!(node.size(), Dimensions::new(50.0, 20.0));

        node.dimensions = Dimensions::new(80.0, 30.0);
        assert_eq!(node.size(), Dimensions::new(80.0, 30.0));
    }

    #[test]
    fn test_extent_serialization() {
        let parent: NodeExtent = serde_json::from_str("\"parent\"").unwrap();
        assert_eq!(parent, NodeExtent::Parent);

        let coords: NodeExtent = serde_json::from_str("[[0.0, 0.0], [10.0, 20.0]]").unwrap();
        assert_eq!(
            coords,
            NodeExtent::Coordinates(CoordinateExtent::new([0.0, 0.0], [10.0, 20.0]))
        );

        assert!(serde_json::from_str::<NodeExtent>("\"sibling\"").is_err());
        assert_eq!(serde_json::to_string(&NodeExtent::Parent).unwrap(), "\"parent\"");
    }

    #[test]
    fn test_handle_lookup() {
        let mut bounds = HandleBounds::default();
        bounds.source.push(HandleElement {
            id: Some("out".into()),
            position: Position::Right,
            x: 90.0,
            y: 10.0,
            width: 10.0,
            height: 10.0,
        });
        assert!(bounds.find(HandleType::Source, Some("out")).is_some());
        assert!(bounds.find(HandleType::Source, None).is_some());
        assert!(bounds.find(HandleType::Target, None).is_none());
    }
}
