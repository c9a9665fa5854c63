// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors published on the store's error channel.
//!
//! Store actions never return these. They are published through
//! [`FlowEvents::error`](crate::events::FlowEvents) and the offending
//! entity is skipped.

use serde::Serialize;
use std::fmt;

/// Stable error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The pane has no size
    MissingViewportDimensions,
    /// Node record rejected
    NodeInvalid,
    /// Node id does not resolve
    NodeNotFound,
    /// Parent id does not resolve
    NodeMissingParent,
    /// No renderer registered for the node type
    NodeTypeMissing,
    /// `parent` extent on a node without a parent
    NodeExtentInvalid,
    /// Edge record rejected
    EdgeInvalid,
    /// Edge id does not resolve
    EdgeNotFound,
    /// Source node does not resolve
    EdgeSourceMissing,
    /// Target node does not resolve
    EdgeTargetMissing,
    /// Source and target are the same handle
    EdgeSourceTargetSame,
    /// Neither endpoint resolves
    EdgeSourceTargetMissing,
    /// No renderer registered for the edge type
    EdgeTypeMissing,
    /// Stored edge lost an endpoint
    EdgeOrphaned,
}

impl ErrorCode {
    /// The wire name of this code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingViewportDimensions => "MISSING_VIEWPORT_DIMENSIONS",
            Self::NodeInvalid => "NODE_INVALID",
            Self::NodeNotFound => "NODE_NOT_FOUND",
            Self::NodeMissingParent => "NODE_MISSING_PARENT",
            Self::NodeTypeMissing => "NODE_TYPE_MISSING",
            Self::NodeExtentInvalid => "NODE_EXTENT_INVALID",
            Self::EdgeInvalid => "EDGE_INVALID",
            Self::EdgeNotFound => "EDGE_NOT_FOUND",
            Self::EdgeSourceMissing => "EDGE_SOURCE_MISSING",
            Self::EdgeTargetMissing => "EDGE_TARGET_MISSING",
            Self::EdgeSourceTargetSame => "EDGE_SOURCE_TARGET_SAME",
            Self::EdgeSourceTargetMissing => "EDGE_SOURCE_TARGET_MISSING",
            Self::EdgeTypeMissing => "EDGE_TYPE_MISSING",
            Self::EdgeOrphaned => "EDGE_ORPHANED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem found while building or reading the graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// The pane has no size
    #[error("The flow pane has no width or height, viewport dependent features are disabled")]
    MissingViewportDimensions,

    /// Node record rejected
    #[error("Node is invalid: {0}")]
    NodeInvalid(String),

    /// Node id does not resolve
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Parent id does not resolve
    #[error("Node {id} has parent {parent}, which does not exist")]
    NodeMissingParent {
        /// Child node id
        id: String,
        /// Missing parent id
        parent: String,
    },

    /// No renderer registered for the node type
    #[error("Node type \"{0}\" is not registered, using the default renderer")]
    NodeTypeMissing(String),

    /// `parent` extent on a node without a parent
    #[error("Node {0} uses a parent extent but has no parent")]
    NodeExtentInvalid(String),

    /// Edge record rejected
    #[error("Edge is invalid: {0}")]
    EdgeInvalid(String),

    /// Edge id does not resolve
    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    /// Source node does not resolve
    #[error("Edge {id} has source {source_node}, which does not exist")]
    EdgeSourceMissing {
        /// Edge id
        id: String,
        /// Missing source id
        source_node: String,
    },

    /// Target node does not resolve
    #[error("Edge {id} has target {target_node}, which does not exist")]
    EdgeTargetMissing {
        /// Edge id
        id: String,
        /// Missing target id
        target_node: String,
    },

    /// Source and target are the same handle
    #[error("Edge {id} connects a handle of node {node} to itself")]
    EdgeSourceTargetSame {
        /// Edge id
        id: String,
        /// Node id
        node: String,
    },

    /// Neither endpoint resolves
    #[error("Edge {id} has source {source_node} and target {target_node}, neither exists")]
    EdgeSourceTargetMissing {
        /// Edge id
        id: String,
        /// Missing source id
        source_node: String,
        /// Missing target id
        target_node: String,
    },

    /// No renderer registered for the edge type
    #[error("Edge type \"{0}\" is not registered, using the default renderer")]
    EdgeTypeMissing(String),

    /// Stored edge lost an endpoint
    #[error("Edge {0} references a node that no longer exists")]
    EdgeOrphaned(String),
}

impl FlowError {
    /// The stable kind of this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingViewportDimensions => ErrorCode::MissingViewportDimensions,
            Self::NodeInvalid(_) => ErrorCode::NodeInvalid,
            Self::NodeNotFound(_) => ErrorCode::NodeNotFound,
            Self::NodeMissingParent { .. } => ErrorCode::NodeMissingParent,
            Self::NodeTypeMissing(_) => ErrorCode::NodeTypeMissing,
            Self::NodeExtentInvalid(_) => ErrorCode::NodeExtentInvalid,
            Self::EdgeInvalid(_) => ErrorCode::EdgeInvalid,
            Self::EdgeNotFound(_) => ErrorCode::EdgeNotFound,
            Self::EdgeSourceMissing { .. } => ErrorCode::EdgeSourceMissing,
            Self::EdgeTargetMissing { .. } => ErrorCode::EdgeTargetMissing,
            Self::EdgeSourceTargetSame { .. } => ErrorCode::EdgeSourceTargetSame,
            Self::EdgeSourceTargetMissing { .. } => ErrorCode::EdgeSourceTargetMissing,
            Self::EdgeTypeMissing(_) => ErrorCode::EdgeTypeMissing,
            Self::EdgeOrphaned(_) => ErrorCode::EdgeOrphaned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_wire_names() {
        let err = FlowError::EdgeTargetMissing {
            id: "e1".into(),
            target_node: "b".into(),
        };
        assert_eq!(err.code(), ErrorCode::EdgeTargetMissing);
        assert_eq!(err.code().to_string(), "EDGE_TARGET_MISSING");
        assert_eq!(
            serde_json::to_string(&err.code()).unwrap(),
            "\"EDGE_TARGET_MISSING\""
        );
    }

    #[test]
    fn test_messages_carry_context() {
        let err = FlowError::NodeMissingParent {
            id: "child".into(),
            parent: "group".into(),
        };
        assert_eq!(err.to_string(), "Node child has parent group, which does not exist");
    }
}
