// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection gestures.
//!
//! A drag gesture and a click gesture are tracked in separate slots, so a
//! click-to-connect can stay armed while the user drags from another handle.
//! Ending a gesture always clears its slot.

use super::{ConnectionMode, FlowStore};
use crate::builders::ValidConnectionContext;
use crate::edge::Connection;
use crate::geometry::XYPosition;
use crate::node::HandleType;
use serde::{Deserialize, Serialize};

/// A handle taking part in a connection gesture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectingHandle {
    /// Node the handle belongs to
    pub node_id: String,
    /// Handle id, `None` for the node's anonymous handle
    pub handle_id: Option<String>,
    /// Role of the handle
    #[serde(rename = "type")]
    pub handle_type: HandleType,
}

impl ConnectingHandle {
    /// Create a handle reference
    pub fn new(node_id: impl Into<String>, handle_id: Option<&str>, handle_type: HandleType) -> Self {
        Self {
            node_id: node_id.into(),
            handle_id: handle_id.map(str::to_string),
            handle_type,
        }
    }
}

/// Whether the handle under the pointer would accept the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Dropping here creates a connection
    Valid,
    /// Dropping here does nothing
    Invalid,
}

/// An in-progress connection gesture
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionGesture {
    /// Handle the gesture started from
    pub start_handle: ConnectingHandle,
    /// Pointer position in flow coordinates
    pub position: XYPosition,
    /// Handle currently under (or snapped to) the pointer
    pub end_handle: Option<ConnectingHandle>,
    /// Validity of `end_handle`
    pub status: Option<ConnectionStatus>,
}

#[derive(Debug, Default)]
pub(crate) struct ConnectionState {
    drag: Option<ConnectionGesture>,
    click: Option<ConnectionGesture>,
}

impl ConnectionState {
    fn slot(&mut self, is_click: bool) -> &mut Option<ConnectionGesture> {
        if is_click {
            &mut self.click
        } else {
            &mut self.drag
        }
    }
}

impl FlowStore {
    /// Current drag gesture
    pub fn connection_gesture(&self) -> Option<&ConnectionGesture> {
        self.connection.drag.as_ref()
    }

    /// Current click gesture
    pub fn click_gesture(&self) -> Option<&ConnectionGesture> {
        self.connection.click.as_ref()
    }

    /// Start a connection gesture from a handle
    pub fn start_connection(&mut self, handle: ConnectingHandle, position: XYPosition, is_click: bool) {
        tracing::debug!(store = %self.id, node = %handle.node_id, is_click, "Connection started");
        *self.connection.slot(is_click) = Some(ConnectionGesture {
            start_handle: handle.clone(),
            position,
            end_handle: None,
            status: None,
        });
        self.events.connect_start.trigger(&handle);
    }

    /// Move the drag gesture.
    ///
    /// Without an explicit `end_handle` the closest handle within the
    /// connection radius is picked. Without an explicit `status` the
    /// end handle is validated.
    pub fn update_connection(
        &mut self,
        position: XYPosition,
        end_handle: Option<ConnectingHandle>,
        status: Option<ConnectionStatus>,
    ) {
        let Some(start) = self.connection.drag.as_ref().map(|g| g.start_handle.clone()) else {
            return;
        };
        let end_handle = end_handle.or_else(|| self.closest_handle(position, &start));
        let status = status.or_else(|| {
            end_handle.as_ref().map(|end| {
                if self.is_valid_gesture(&start, end) {
                    ConnectionStatus::Valid
                } else {
                    ConnectionStatus::Invalid
                }
            })
        });

        if let Some(gesture) = self.connection.drag.as_mut() {
            gesture.position = position;
            gesture.end_handle = end_handle;
            gesture.status = status;
        }
    }

    /// Finish a gesture.
    ///
    /// Returns the connection when the gesture ended on a handle that
    /// accepts it. A completed connection is published on `connect` and
    /// added as an edge when `auto_connect` is on.
    pub fn end_connection(&mut self, is_click: bool) -> Option<Connection> {
        let gesture = self.connection.slot(is_click).take()?;
        let connection = gesture
            .end_handle
            .as_ref()
            .filter(|end| self.is_valid_gesture(&gesture.start_handle, end))
            .map(|end| oriented_connection(&gesture.start_handle, end));

        if let Some(connection) = &connection {
            tracing::debug!(store = %self.id, source = %connection.source, target = %connection.target, "Connected");
            self.events.connect.trigger(connection);
            if self.config.auto_connect {
                self.add_edge(connection.clone());
            }
        }
        self.events.connect_end.trigger(&gesture.start_handle);
        connection
    }

    /// Click-to-connect: the first click arms a gesture, the second ends it
    pub fn click_connect(&mut self, handle: ConnectingHandle) -> Option<Connection> {
        if let Some(gesture) = self.connection.click.as_mut() {
            gesture.end_handle = Some(handle);
            return self.end_connection(true);
        }
        let position = self.handle_position(&handle).unwrap_or(XYPosition::ZERO);
        self.start_connection(handle, position, true);
        None
    }

    /// Whether a connection may become an edge.
    ///
    /// Both nodes must exist and be connectable, the endpoints must not be
    /// the same handle and the connection validator must accept it.
    pub fn validate_connection(&self, connection: &Connection) -> bool {
        let global = self.config.nodes_connectable;
        let (Some(source), Some(target)) = (self.nodes.get(&connection.source), self.nodes.get(&connection.target))
        else {
            return false;
        };
        if !source.is_connectable(global) || !target.is_connectable(global) {
            return false;
        }
        if connection.source == connection.target && connection.source_handle == connection.target_handle {
            return false;
        }
        match self.is_valid_connection.as_deref() {
            Some(accept) => {
                let ctx = ValidConnectionContext {
                    nodes: &self.nodes,
                    edges: &self.edges,
                    source_node: Some(source),
                    target_node: Some(target),
                };
                accept(connection, &ctx)
            }
            None => true,
        }
    }

    /// Absolute center of a measured handle
    pub fn handle_position(&self, handle: &ConnectingHandle) -> Option<XYPosition> {
        let node = self.nodes.get(&handle.node_id)?;
        let element = node
            .handle_bounds
            .find(handle.handle_type, handle.handle_id.as_deref())?;
        let origin = node.computed_position.xy();
        Some(XYPosition::new(
            origin.x + element.x + element.width / 2.0,
            origin.y + element.y + element.height / 2.0,
        ))
    }

    fn is_valid_gesture(&self, start: &ConnectingHandle, end: &ConnectingHandle) -> bool {
        if self.config.connection_mode == ConnectionMode::Strict && start.handle_type == end.handle_type {
            return false;
        }
        self.validate_connection(&oriented_connection(start, end))
    }

    /// Closest handle to `position` within the connection radius.
    ///
    /// The radius is in screen pixels and shrinks with zoom. In strict mode
    /// only handles of the opposite role qualify.
    fn closest_handle(&self, position: XYPosition, start: &ConnectingHandle) -> Option<ConnectingHandle> {
        let zoom = if self.viewport.zoom > 0.0 { self.viewport.zoom } else { 1.0 };
        let radius = self.config.connection_radius / zoom;
        let roles: &[HandleType] = match self.config.connection_mode {
            ConnectionMode::Strict => match start.handle_type {
                HandleType::Source => &[HandleType::Target],
                HandleType::Target => &[HandleType::Source],
            },
            ConnectionMode::Loose => &[HandleType::Source, HandleType::Target],
        };

        let mut closest: Option<(f64, ConnectingHandle)> = None;
        for node in self.nodes.values().filter(|n| !n.hidden) {
            let origin = node.computed_position.xy();
            for &role in roles {
                for element in node.handle_bounds.of(role) {
                    let is_start = node.id == start.node_id
                        && role == start.handle_type
                        && element.id == start.handle_id;
                    if is_start {
                        continue;
                    }
                    let dx = origin.x + element.x + element.width / 2.0 - position.x;
                    let dy = origin.y + element.y + element.height / 2.0 - position.y;
                    let distance = (dx * dx + dy * dy).sqrt();
                    if distance > radius || closest.as_ref().is_some_and(|(best, _)| *best <= distance) {
                        continue;
                    }
                    let handle = ConnectingHandle {
                        node_id: node.id.clone(),
                        handle_id: element.id.clone(),
                        handle_type: role,
                    };
                    closest = Some((distance, handle));
                }
            }
        }
        closest.map(|(_, handle)| handle)
    }
}

/// Orient a gesture so the connection runs from a source handle to a target
fn oriented_connection(start: &ConnectingHandle, end: &ConnectingHandle) -> Connection {
    let (source, target) = match start.handle_type {
        HandleType::Source => (start, end),
        HandleType::Target => (end, start),
    };
    Connection {
        source: source.node_id.clone(),
        target: target.node_id.clone(),
        source_handle: source.handle_id.clone(),
        target_handle: target.handle_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::NodeInput;
    use crate::store::FlowOptions;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn store(options: FlowOptions) -> FlowStore {
        let mut store = FlowStore::with_options(options);
        store.set_nodes(vec![
            NodeInput::new("a", XYPosition::ZERO),
            NodeInput::new("b", XYPosition::new(200.0, 0.0)),
            NodeInput {
                connectable: Some(false),
                ..NodeInput::new("locked", XYPosition::new(400.0, 0.0))
            },
        ]);
        store
    }

    fn source(node: &str) -> ConnectingHandle {
        ConnectingHandle::new(node, None, HandleType::Source)
    }

    fn target(node: &str) -> ConnectingHandle {
        ConnectingHandle::new(node, None, HandleType::Target)
    }

    #[test]
    fn test_drag_gesture_connects() {
        let mut store = store(FlowOptions::default());
        let connected = Arc::new(Mutex::new(Vec::new()));
        let sink = connected.clone();
        store.events().connect.on(move |c| sink.lock().push(c.clone()));

        store.start_connection(source("a"), XYPosition::ZERO, false);
        store.update_connection(XYPosition::new(200.0, 0.0), Some(target("b")), None);
        assert_eq!(store.connection_gesture().unwrap().status, Some(ConnectionStatus::Valid));

        let connection = store.end_connection(false).unwrap();
        assert_eq!(connection, Connection::new("a", "b"));
        assert!(store.connection_gesture().is_none());
        assert_eq!(connected.lock().len(), 1);
        // no auto-connect by default
        assert!(store.edges().is_empty());
    }

    #[test]
    fn test_target_start_is_reoriented() {
        let mut store = store(FlowOptions {
            auto_connect: Some(true),
            ..Default::default()
        });
        store.start_connection(target("a"), XYPosition::ZERO, false);
        store.update_connection(XYPosition::ZERO, Some(source("b")), None);
        assert_eq!(store.end_connection(false), Some(Connection::new("b", "a")));
        assert!(store.find_edge("flow__edge-b-a").is_some());
    }

    #[test]
    fn test_invalid_targets() {
        let mut store = store(FlowOptions {
            connection_mode: Some(ConnectionMode::Strict),
            ..Default::default()
        });
        let ended = Arc::new(Mutex::new(0));
        let sink = ended.clone();
        store.events().connect_end.on(move |_| *sink.lock() += 1);

        store.start_connection(source("a"), XYPosition::ZERO, false);
        store.update_connection(XYPosition::ZERO, Some(source("b")), None);
        assert_eq!(store.connection_gesture().unwrap().status, Some(ConnectionStatus::Invalid));
        assert_eq!(store.end_connection(false), None);

        store.start_connection(source("a"), XYPosition::ZERO, false);
        store.update_connection(XYPosition::ZERO, Some(target("locked")), None);
        assert_eq!(store.end_connection(false), None);

        // no gesture, nothing ends
        assert_eq!(store.end_connection(false), None);
        assert_eq!(*ended.lock(), 2);
    }

    #[test]
    fn test_validator_consulted() {
        let mut store = store(FlowOptions::default());
        store.set_connection_validator(|connection, ctx| {
            ctx.target_node.is_some_and(|n| n.id != "b") && connection.source != "b"
        });
        assert!(!store.validate_connection(&Connection::new("a", "b")));
        assert!(!store.validate_connection(&Connection::new("a", "missing")));
        assert!(!store.validate_connection(&Connection::new("a", "a")));
        assert!(store.validate_connection(&Connection::new("a", "a").with_handles(Some("out"), Some("in"))));
    }

    #[test]
    fn test_click_connect_uses_own_slot() {
        let mut store = store(FlowOptions::default());
        assert_eq!(store.click_connect(source("a")), None);
        assert!(store.click_gesture().is_some());

        store.start_connection(source("b"), XYPosition::ZERO, false);
        assert_eq!(store.click_connect(target("b")), Some(Connection::new("a", "b")));
        assert!(store.click_gesture().is_none());
        assert!(store.connection_gesture().is_some());
    }
}
