// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node measurement.
//!
//! The host measures rendered nodes and reports them through
//! [`NodeMeasurement`]. Bounds are in screen pixels; handle geometry is
//! stored relative to the node and divided by the current zoom.

use super::FlowStore;
use crate::changes::{NodeChange, NodeDimensionChange};
use crate::geometry::{Dimensions, Rect};
use crate::node::{HandleBounds, HandleElement, HandleType, Position};
use crate::viewport::FitViewOptions;
use std::fmt;

/// A measured handle
#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredHandle {
    /// Handle id, `None` for the node's anonymous handle
    pub id: Option<String>,
    /// Side of the node
    pub position: Position,
    /// Screen-space bounds
    pub bounds: Rect,
}

/// Measurement of one rendered node
pub trait NodeMeasurement {
    /// Unscaled size of the node
    fn dimensions(&self) -> Dimensions;

    /// Screen-space bounds of the node
    fn bounds(&self) -> Rect;

    /// Handles of one role
    fn handles(&self, handle_type: HandleType) -> Vec<MeasuredHandle>;
}

/// A fixed measurement, for hosts that know their node geometry up front
#[derive(Debug, Clone, PartialEq)]
pub struct StaticMeasurement {
    dimensions: Dimensions,
    zoom: f64,
    handles: Vec<(HandleType, HandleElement)>,
}

impl StaticMeasurement {
    /// A node of the given size without handles, rendered at zoom 1
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            zoom: 1.0,
            handles: Vec::new(),
        }
    }

    /// Add a handle given in unscaled node-local coordinates
    pub fn with_handle(mut self, handle_type: HandleType, handle: HandleElement) -> Self {
        self.handles.push((handle_type, handle));
        self
    }

    /// Report screen geometry as rendered at `zoom`
    pub fn at_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }
}

impl NodeMeasurement for StaticMeasurement {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn bounds(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.dimensions.width * self.zoom,
            self.dimensions.height * self.zoom,
        )
    }

    fn handles(&self, handle_type: HandleType) -> Vec<MeasuredHandle> {
        self.handles
            .iter()
            .filter(|(role, _)| *role == handle_type)
            .map(|(_, handle)| MeasuredHandle {
                id: handle.id.clone(),
                position: handle.position,
                bounds: Rect::new(
                    handle.x * self.zoom,
                    handle.y * self.zoom,
                    handle.width * self.zoom,
                    handle.height * self.zoom,
                ),
            })
            .collect()
    }
}

/// A measurement report for one node
pub struct NodeDimensionUpdate {
    /// Node id
    pub id: String,
    /// The measurement
    pub measurement: Box<dyn NodeMeasurement + Send>,
    /// Emit a change even when the size did not change
    pub force_update: bool,
}

impl NodeDimensionUpdate {
    /// Report a measurement
    pub fn new(id: impl Into<String>, measurement: impl NodeMeasurement + Send + 'static) -> Self {
        Self {
            id: id.into(),
            measurement: Box::new(measurement),
            force_update: false,
        }
    }

    /// Emit a change even when the size did not change
    pub fn with_force(mut self) -> Self {
        self.force_update = true;
        self
    }
}

impl fmt::Debug for NodeDimensionUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDimensionUpdate")
            .field("id", &self.id)
            .field("dimensions", &self.measurement.dimensions())
            .field("force_update", &self.force_update)
            .finish()
    }
}

fn relative_handles(measurement: &dyn NodeMeasurement, handle_type: HandleType, zoom: f64) -> Vec<HandleElement> {
    let node = measurement.bounds();
    measurement
        .handles(handle_type)
        .into_iter()
        .map(|handle| HandleElement {
            id: handle.id,
            position: handle.position,
            x: (handle.bounds.x - node.x) / zoom,
            y: (handle.bounds.y - node.y) / zoom,
            width: handle.bounds.width / zoom,
            height: handle.bounds.height / zoom,
        })
        .collect()
}

impl FlowStore {
    /// Apply measurement reports.
    ///
    /// Reports for unknown nodes, zero sizes and unchanged sizes are
    /// skipped unless forced. Ignored after teardown. Once every node is
    /// measured the view is fitted, if `fit_view_on_init` asks for it.
    pub fn update_node_dimensions(&mut self, updates: Vec<NodeDimensionUpdate>) {
        if self.torn_down {
            return;
        }
        let zoom = if self.viewport.zoom > 0.0 { self.viewport.zoom } else { 1.0 };

        let changes: Vec<NodeChange> = updates
            .iter()
            .filter_map(|update| {
                let node = self.nodes.get(&update.id)?;
                let dimensions = update.measurement.dimensions();
                if !dimensions.is_measured() {
                    return None;
                }
                if node.dimensions == dimensions && !update.force_update {
                    return None;
                }
                let measurement = update.measurement.as_ref();
                Some(NodeChange::Dimensions(NodeDimensionChange {
                    id: node.id.clone(),
                    dimensions: Some(dimensions),
                    handle_bounds: Some(HandleBounds {
                        source: relative_handles(measurement, HandleType::Source, zoom),
                        target: relative_handles(measurement, HandleType::Target, zoom),
                    }),
                    resizing: None,
                }))
            })
            .collect();

        self.dispatch_node_changes(changes);
        self.fit_view_on_init();
    }

    /// Queue a measurement report for the next flush; a newer report for
    /// the same node replaces the queued one
    pub fn schedule_node_dimensions(&mut self, update: NodeDimensionUpdate) {
        if self.torn_down {
            return;
        }
        self.pending_dimensions.retain(|queued| queued.id != update.id);
        self.pending_dimensions.push(update);
    }

    /// Apply every queued measurement report as one batch
    pub fn flush_node_dimensions(&mut self) {
        let updates = std::mem::take(&mut self.pending_dimensions);
        if !updates.is_empty() {
            self.update_node_dimensions(updates);
        }
    }

    fn fit_view_on_init(&mut self) {
        if !self.config.fit_view_on_init || self.fit_view_on_init_done || !self.nodes_initialized() {
            return;
        }
        self.fit_view_on_init_done = true;
        if self.pan_zoom.is_some() {
            self.fit_view(FitViewOptions::default());
        } else {
            self.pending.fit_view = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::NodeInput;
    use crate::geometry::XYPosition;
    use crate::store::FlowOptions;
    use crate::viewport::HeadlessPanZoom;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn store() -> FlowStore {
        let mut store = FlowStore::with_options(FlowOptions::default());
        store.set_nodes(vec![NodeInput::new("a", XYPosition::ZERO), NodeInput::new("b", XYPosition::ZERO)]);
        store
    }

    fn measured(id: &str, width: f64, height: f64) -> NodeDimensionUpdate {
        NodeDimensionUpdate::new(id, StaticMeasurement::new(Dimensions::new(width, height)))
    }

    fn count_changes(store: &FlowStore) -> Arc<Mutex<usize>> {
        let count = Arc::new(Mutex::new(0));
        let sink = count.clone();
        store.events().nodes_change.on(move |changes| *sink.lock() += changes.len());
        count
    }

    #[test]
    fn test_unchanged_sizes_are_suppressed() {
        let mut store = store();
        let count = count_changes(&store);

        store.update_node_dimensions(vec![measured("a", 100.0, 40.0), measured("ghost", 10.0, 10.0)]);
        store.update_node_dimensions(vec![measured("a", 100.0, 40.0), measured("b", 0.0, 40.0)]);
        assert_eq!(*count.lock(), 1);

        store.update_node_dimensions(vec![measured("a", 100.0, 40.0).with_force()]);
        assert_eq!(*count.lock(), 2);
        assert!(store.find_node("a").unwrap().initialized);
        assert!(!store.find_node("b").unwrap().initialized);
    }

    #[test]
    fn test_handle_bounds_are_unscaled() {
        let mut store = store();
        store.attach_pan_zoom(Box::new(HeadlessPanZoom::new(Dimensions::new(800.0, 600.0))));
        store.set_viewport(crate::viewport::Viewport::new(0.0, 0.0, 2.0), None);

        let handle = HandleElement {
            id: Some("out".into()),
            position: Position::Right,
            x: 95.0,
            y: 15.0,
            width: 10.0,
            height: 10.0,
        };
        let measurement = StaticMeasurement::new(Dimensions::new(100.0, 40.0))
            .with_handle(HandleType::Source, handle.clone())
            .at_zoom(2.0);
        store.update_node_dimensions(vec![NodeDimensionUpdate::new("a", measurement)]);

        let node = store.find_node("a").unwrap();
        assert_eq!(node.dimensions, Dimensions::new(100.0, 40.0));
        assert_eq!(node.handle_bounds.source, vec![handle]);
        assert!(node.handle_bounds.target.is_empty());
    }

    #[test]
    fn test_scheduled_updates_flush_as_one_batch() {
        let mut store = store();
        let batches = Arc::new(Mutex::new(Vec::new()));
        let sink = batches.clone();
        store.events().nodes_change.on(move |changes| sink.lock().push(changes.len()));

        store.schedule_node_dimensions(measured("a", 10.0, 10.0));
        store.schedule_node_dimensions(measured("b", 10.0, 10.0));
        store.schedule_node_dimensions(measured("a", 20.0, 10.0));
        assert!(batches.lock().is_empty());

        store.flush_node_dimensions();
        assert_eq!(*batches.lock(), vec![2]);
        assert_eq!(store.find_node("a").unwrap().dimensions, Dimensions::new(20.0, 10.0));
        assert!(store.nodes_initialized());
    }

    #[test]
    fn test_ignored_after_teardown() {
        let mut store = store();
        store.schedule_node_dimensions(measured("a", 10.0, 10.0));
        store.teardown();
        store.flush_node_dimensions();
        store.update_node_dimensions(vec![measured("b", 10.0, 10.0)]);
        assert!(store.nodes().values().all(|n| !n.initialized));
    }

    #[test]
    fn test_nodes_initialized_fires_once() {
        let mut store = store();
        let fired = Arc::new(Mutex::new(0));
        let sink = fired.clone();
        store.events().nodes_initialized.on(move |_| *sink.lock() += 1);

        store.update_node_dimensions(vec![measured("a", 10.0, 10.0)]);
        assert_eq!(*fired.lock(), 0);
        store.update_node_dimensions(vec![measured("b", 10.0, 10.0)]);
        store.update_node_dimensions(vec![measured("b", 12.0, 10.0)]);
        assert_eq!(*fired.lock(), 1);
    }
}
