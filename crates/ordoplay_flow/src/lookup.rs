// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection lookup: which edges touch which node handles.
//!
//! The index is rebuilt wholesale from the edge collection after every edge
//! mutation, so it never holds ids of removed edges.

use crate::edge::GraphEdge;
use crate::node::HandleType;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Key of one handle on one node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandleKey {
    /// Node id
    pub node_id: String,
    /// Handle role
    pub handle_type: HandleType,
    /// Handle id, `None` for the anonymous handle
    pub handle_id: Option<String>,
}

impl HandleKey {
    fn new(node_id: &str, handle_type: HandleType, handle_id: Option<&str>) -> Self {
        Self {
            node_id: node_id.to_string(),
            handle_type,
            handle_id: handle_id.map(str::to_string),
        }
    }
}

/// One edge as seen from a handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleConnection {
    /// Edge id
    pub edge_id: String,
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Source handle id
    pub source_handle: Option<String>,
    /// Target handle id
    pub target_handle: Option<String>,
}

impl From<&GraphEdge> for HandleConnection {
    fn from(edge: &GraphEdge) -> Self {
        Self {
            edge_id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            source_handle: edge.source_handle.clone(),
            target_handle: edge.target_handle.clone(),
        }
    }
}

/// Adjacency index over the edge collection
#[derive(Debug, Clone, Default)]
pub struct ConnectionLookup {
    handles: IndexMap<HandleKey, IndexMap<String, HandleConnection>>,
    nodes: IndexMap<String, IndexSet<String>>,
}

impl ConnectionLookup {
    /// Create an empty lookup
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a lookup from an edge collection
    pub fn from_edges<'a>(edges: impl IntoIterator<Item = &'a GraphEdge>) -> Self {
        let mut lookup = Self::new();
        update_connection_lookup(&mut lookup, edges);
        lookup
    }

    /// Edges attached to one handle, in edge insertion order
    pub fn handle_connections(
        &self,
        node_id: &str,
        handle_type: HandleType,
        handle_id: Option<&str>,
    ) -> Vec<&HandleConnection> {
        self.handles
            .get(&HandleKey::new(node_id, handle_type, handle_id))
            .map(|connections| connections.values().collect())
            .unwrap_or_default()
    }

    /// Ids of all edges touching a node
    pub fn node_connections(&self, node_id: &str) -> Vec<&str> {
        self.nodes
            .get(node_id)
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether any edge touches the node
    pub fn is_connected(&self, node_id: &str) -> bool {
        self.nodes.get(node_id).is_some_and(|ids| !ids.is_empty())
    }

    /// Number of indexed handles
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    fn clear(&mut self) {
        self.handles.clear();
        self.nodes.clear();
    }

    fn insert(&mut self, edge: &GraphEdge) {
        let connection = HandleConnection::from(edge);
        let endpoints = [
            HandleKey::new(&edge.source, HandleType::Source, edge.source_handle.as_deref()),
            HandleKey::new(&edge.target, HandleType::Target, edge.target_handle.as_deref()),
        ];
        for key in endpoints {
            self.nodes
                .entry(key.node_id.clone())
                .or_default()
                .insert(edge.id.clone());
            self.handles
                .entry(key)
                .or_default()
                .insert(edge.id.clone(), connection.clone());
        }
    }
}

/// Clear `lookup` and re-index every edge
pub fn update_connection_lookup<'a>(lookup: &mut ConnectionLookup, edges: impl IntoIterator<Item = &'a GraphEdge>) {
    lookup.clear();
    for edge in edges {
        lookup.insert(edge);
    }
}
