// SPDX-License-Identifier: MIT OR Apache-2.0
//! Builders turning loose node/edge records into validated graph entities.
//!
//! Input records may omit ids, use partial fields or redeclare an entity
//! that already exists. Builders fill defaults, merge with the existing
//! record (so measured sizes and computed positions survive a full
//! redeclaration) and report problems as [`FlowError`] values instead of
//! failing the whole batch.

use crate::edge::{Connection, DefaultEdgeOptions, GraphEdge};
use crate::error::FlowError;
use crate::geometry::XYPosition;
use crate::node::{GraphNode, NodeExtent};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder used in errors for edges without a usable id
const UNKNOWN_ID: &str = "[ID UNKNOWN]";

/// Loose node record as accepted by `set_nodes`, `add_nodes` and imports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeInput {
    /// Id, generated when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Type tag
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Position, parent-relative for child nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<XYPosition>,
    /// User payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Class names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Style payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<serde_json::Value>,
    /// Explicit width
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Explicit height
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Parent node id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_node: Option<String>,
    /// Drag bounds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<NodeExtent>,
    /// Grow the parent to fit this node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expand_parent: Option<bool>,
    /// Stacking order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    /// Hidden flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    /// Selected flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    /// Draggable override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    /// Selectable override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    /// Connectable override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectable: Option<bool>,
    /// Deletable override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletable: Option<bool>,
}

impl NodeInput {
    /// Create a node record with an id and a position
    pub fn new(id: impl Into<String>, position: XYPosition) -> Self {
        Self {
            id: Some(id.into()),
            position: Some(position),
            ..Default::default()
        }
    }

    /// Set the type tag
    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    /// Set the parent node
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_node = Some(parent.into());
        self
    }

    /// Set the user payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Loose edge record as accepted by `set_edges`, `add_edges` and imports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EdgeInput {
    /// Id, derived from the endpoints when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Type tag
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    /// Source node id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Target node id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Source handle id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Target handle id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    /// Label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// User payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Class names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Style payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<serde_json::Value>,
    /// Animated flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
    /// Hidden flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    /// Selected flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    /// Stacking order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    /// Deletable override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletable: Option<bool>,
    /// Updatable override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updatable: Option<bool>,
    /// Selectable override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
}

impl EdgeInput {
    /// Create an edge record with an explicit id
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            source: Some(source.into()),
            target: Some(target.into()),
            ..Default::default()
        }
    }

    /// Create an edge record from a connection, leaving the id to be derived
    pub fn from_connection(connection: Connection) -> Self {
        Self {
            source: Some(connection.source),
            target: Some(connection.target),
            source_handle: connection.source_handle,
            target_handle: connection.target_handle,
            ..Default::default()
        }
    }

    /// The connection this record describes, if both endpoints are named
    pub fn connection(&self) -> Option<Connection> {
        match (&self.source, &self.target) {
            (Some(source), Some(target)) if !source.is_empty() && !target.is_empty() => Some(Connection {
                source: source.clone(),
                target: target.clone(),
                source_handle: self.source_handle.clone(),
                target_handle: self.target_handle.clone(),
            }),
            _ => None,
        }
    }
}

/// Either kind of loose record, as accepted by `set_elements`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlowElement {
    /// An edge record
    Edge(EdgeInput),
    /// A node record
    Node(NodeInput),
}

impl<'de> Deserialize<'de> for FlowElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        // records naming both endpoints are edges, anything else is a node
        let value = serde_json::Value::deserialize(deserializer)?;
        let is_edge = value.get("source").is_some() && value.get("target").is_some();
        if is_edge {
            serde_json::from_value(value).map(Self::Edge).map_err(D::Error::custom)
        } else {
            serde_json::from_value(value).map(Self::Node).map_err(D::Error::custom)
        }
    }
}

/// Predicate a node must pass to enter the store
pub type NodePredicate = dyn Fn(&GraphNode) -> bool + Send + Sync;

/// Predicate a connection must pass to become an edge
pub type ConnectionPredicate = dyn Fn(&Connection, &ValidConnectionContext<'_>) -> bool + Send + Sync;

/// What a connection predicate may inspect
pub struct ValidConnectionContext<'a> {
    /// Current nodes
    pub nodes: &'a IndexMap<String, GraphNode>,
    /// Current edges
    pub edges: &'a IndexMap<String, GraphEdge>,
    /// Resolved source node
    pub source_node: Option<&'a GraphNode>,
    /// Resolved target node
    pub target_node: Option<&'a GraphNode>,
}

/// Result of a bulk build: the accepted entities and the problems found
#[derive(Debug)]
pub struct Built<T> {
    /// Accepted entities in input order
    pub items: IndexMap<String, T>,
    /// Problems to publish on the error channel
    pub errors: Vec<FlowError>,
}

/// Build one node, merging with the existing record when there is one
pub fn parse_node(input: NodeInput, existing: Option<&GraphNode>, id: String) -> GraphNode {
    let parent = input.parent_node.clone();
    let mut node = match existing {
        Some(existing) => {
            let mut node = existing.clone();
            node.apply_input(input);
            node
        }
        None => GraphNode::from_input(input, id.clone()),
    };
    node.id = id;
    // a redeclaration without a parent detaches the node
    node.parent_node = parent;
    node
}

/// Build a node collection for a full replace.
///
/// Nodes without an id get one from `next_id`. Duplicate ids report
/// `NODE_INVALID` and keep the first record. Nodes rejected by `is_valid`
/// are dropped silently.
pub fn create_graph_nodes(
    inputs: Vec<NodeInput>,
    existing: &IndexMap<String, GraphNode>,
    next_id: &mut dyn FnMut() -> String,
    is_valid: Option<&NodePredicate>,
) -> Built<GraphNode> {
    let mut items: IndexMap<String, GraphNode> = IndexMap::with_capacity(inputs.len());
    let mut errors = Vec::new();

    for input in inputs {
        let id = match input.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => next_id(),
        };
        if items.contains_key(&id) {
            errors.push(FlowError::NodeInvalid(id));
            continue;
        }

        let node = parse_node(input, existing.get(&id), id.clone());
        if is_valid.is_some_and(|accept| !accept(&node)) {
            continue;
        }
        items.insert(id, node);
    }

    for node in items.values() {
        if let Some(parent) = &node.parent_node {
            if !items.contains_key(parent) {
                errors.push(FlowError::NodeMissingParent {
                    id: node.id.clone(),
                    parent: parent.clone(),
                });
            }
        }
    }
    mark_parents(&mut items);

    Built { items, errors }
}

/// Recompute `is_parent` for every node
pub fn mark_parents(nodes: &mut IndexMap<String, GraphNode>) {
    let parents: IndexSet<String> = nodes
        .values()
        .filter_map(|n| n.parent_node.clone())
        .collect();
    for node in nodes.values_mut() {
        node.is_parent = parents.contains(&node.id);
    }
}

/// Build one edge, merging with the existing record when there is one.
///
/// Fails with `EDGE_INVALID` when either endpoint is not named.
pub fn parse_edge(
    input: EdgeInput,
    existing: Option<&GraphEdge>,
    defaults: Option<&DefaultEdgeOptions>,
) -> Result<GraphEdge, FlowError> {
    let Some(connection) = input.connection() else {
        let id = input.id.clone().unwrap_or_else(|| UNKNOWN_ID.to_string());
        return Err(FlowError::EdgeInvalid(id));
    };
    let id = match input.id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => connection.edge_id(),
    };

    let mut edge = match existing {
        Some(existing) => existing.clone(),
        None => {
            let mut edge = GraphEdge::new(id.clone(), connection);
            if let Some(defaults) = defaults {
                edge.apply_defaults(defaults);
            }
            edge
        }
    };
    edge.apply_input(input);
    edge.id = id;
    Ok(edge)
}

/// Check that both endpoints of an edge exist
pub fn check_edge_endpoints(edge: &GraphEdge, nodes: &IndexMap<String, GraphNode>) -> Result<(), FlowError> {
    let missing_source = !nodes.contains_key(&edge.source);
    let missing_target = !nodes.contains_key(&edge.target);

    match (missing_source, missing_target) {
        (true, true) => Err(FlowError::EdgeSourceTargetMissing {
            id: edge.id.clone(),
            source_node: edge.source.clone(),
            target_node: edge.target.clone(),
        }),
        (true, false) => Err(FlowError::EdgeSourceMissing {
            id: edge.id.clone(),
            source_node: edge.source.clone(),
        }),
        (false, true) => Err(FlowError::EdgeTargetMissing {
            id: edge.id.clone(),
            target_node: edge.target.clone(),
        }),
        (false, false) => Ok(()),
    }
}

/// Whether an edge with the same endpoints already exists
pub fn connection_exists(connection: &Connection, edges: &IndexMap<String, GraphEdge>) -> bool {
    edges.values().any(|edge| edge.same_endpoints(connection))
}

/// Build an edge collection for a full replace.
///
/// Edges rejected by `is_valid` are dropped silently; edges with a missing
/// endpoint are dropped and reported, one error per edge.
pub fn create_graph_edges(
    inputs: Vec<EdgeInput>,
    nodes: &IndexMap<String, GraphNode>,
    existing: &IndexMap<String, GraphEdge>,
    defaults: Option<&DefaultEdgeOptions>,
    is_valid: Option<&ConnectionPredicate>,
) -> Built<GraphEdge> {
    let mut items: IndexMap<String, GraphEdge> = IndexMap::with_capacity(inputs.len());
    let mut errors = Vec::new();

    for input in inputs {
        let existing_edge = input.id.as_deref().and_then(|id| existing.get(id));
        let edge = match parse_edge(input, existing_edge, defaults) {
            Ok(edge) => edge,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };

        if let Some(accept) = is_valid {
            let ctx = ValidConnectionContext {
                nodes,
                edges: existing,
                source_node: nodes.get(&edge.source),
                target_node: nodes.get(&edge.target),
            };
            if !accept(&edge.connection(), &ctx) {
                continue;
            }
        }

        if let Err(err) = check_edge_endpoints(&edge, nodes) {
            errors.push(err);
            continue;
        }
        if items.contains_key(&edge.id) {
            errors.push(FlowError::EdgeInvalid(edge.id));
            continue;
        }
        items.insert(edge.id.clone(), edge);
    }

    Built { items, errors }
}

/// Build an edge for a targeted insert.
///
/// Returns `Ok(None)` when an edge with the same id or endpoints already
/// exists. Rejections by `is_valid` are reported as `EDGE_INVALID`.
pub fn add_edge_to_store(
    input: EdgeInput,
    nodes: &IndexMap<String, GraphNode>,
    edges: &IndexMap<String, GraphEdge>,
    defaults: Option<&DefaultEdgeOptions>,
    is_valid: Option<&ConnectionPredicate>,
) -> Result<Option<GraphEdge>, FlowError> {
    let edge = parse_edge(input, None, defaults)?;
    check_edge_endpoints(&edge, nodes)?;

    if edge.source == edge.target && edge.source_handle == edge.target_handle {
        return Err(FlowError::EdgeSourceTargetSame {
            id: edge.id,
            node: edge.source,
        });
    }

    let connection = edge.connection();
    if let Some(accept) = is_valid {
        let ctx = ValidConnectionContext {
            nodes,
            edges,
            source_node: nodes.get(&edge.source),
            target_node: nodes.get(&edge.target),
        };
        if !accept(&connection, &ctx) {
            return Err(FlowError::EdgeInvalid(edge.id));
        }
    }

    if edges.contains_key(&edge.id) || connection_exists(&connection, edges) {
        return Ok(None);
    }
    Ok(Some(edge))
}

/// Move an edge onto new endpoints, optionally re-deriving its id
pub fn reconnect_edge(edge: &GraphEdge, connection: Connection, replace_id: bool) -> GraphEdge {
    let mut next = edge.clone();
    if replace_id {
        next.id = connection.edge_id();
    }
    next.source = connection.source;
    next.target = connection.target;
    next.source_handle = connection.source_handle;
    next.target_handle = connection.target_handle;
    next
}
