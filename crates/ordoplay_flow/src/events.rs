// SPDX-License-Identifier: MIT OR Apache-2.0
//! Event hooks for external listeners.
//!
//! Listeners run synchronously in registration order, inside the action
//! that fired the event. A listener must not register or remove listeners
//! on the hook that is calling it.

use crate::changes::{EdgeChange, NodeChange};
use crate::edge::Connection;
use crate::error::FlowError;
use crate::store::ConnectingHandle;
use crate::viewport::Viewport;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle returned by [`EventHook::on`], used to remove the listener again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Box<dyn FnMut(&T) + Send>;

/// A list of listeners for one event type
pub struct EventHook<T: ?Sized> {
    listeners: Mutex<Vec<(ListenerId, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T: ?Sized> Default for EventHook<T> {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<T: ?Sized> fmt::Debug for EventHook<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHook")
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

impl<T: ?Sized> EventHook<T> {
    /// Create a hook without listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn on(&self, listener: impl FnMut(&T) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Box::new(listener)));
        id
    }

    /// Remove a listener, returns whether it was registered
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Call every listener with `value`
    pub fn trigger(&self, value: &T) {
        for (_, listener) in self.listeners.lock().iter_mut() {
            listener(value);
        }
    }

    /// Whether any listener is registered
    pub fn has_listeners(&self) -> bool {
        !self.listeners.lock().is_empty()
    }

    /// Remove every listener
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }
}

/// Every event a flow store emits
#[derive(Debug, Default)]
pub struct FlowEvents {
    /// Node change batches, after interception
    pub nodes_change: EventHook<[NodeChange]>,
    /// Edge change batches, after interception
    pub edges_change: EventHook<[EdgeChange]>,
    /// Problems found while building or reading the graph
    pub error: EventHook<FlowError>,
    /// A connection gesture completed on a valid handle
    pub connect: EventHook<Connection>,
    /// A connection gesture started
    pub connect_start: EventHook<ConnectingHandle>,
    /// A connection gesture ended, with the handle it started from
    pub connect_end: EventHook<ConnectingHandle>,
    /// The viewport moved
    pub viewport_change: EventHook<Viewport>,
    /// The pan/zoom engine was attached
    pub pane_ready: EventHook<Viewport>,
    /// Every node was measured at least once
    pub nodes_initialized: EventHook<()>,
}

impl FlowEvents {
    /// Remove every listener of every hook
    pub fn clear(&self) {
        self.nodes_change.clear();
        self.edges_change.clear();
        self.error.clear();
        self.connect.clear();
        self.connect_start.clear();
        self.connect_end.clear();
        self.viewport_change.clear();
        self.pane_ready.clear();
        self.nodes_initialized.clear();
    }
}
