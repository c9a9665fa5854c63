// SPDX-License-Identifier: MIT OR Apache-2.0
//! Options, lifecycle and the viewport helper.
//!
//! Zoom bounds, the translate extent and a restored viewport need the
//! pan/zoom engine. Until one is attached they wait in the store and are
//! applied exactly once by [`FlowStore::attach_pan_zoom`].

use super::{FlowConfig, FlowOptions, FlowStore};
use crate::error::FlowError;
use crate::geometry::{
    clamp, get_rect_of_nodes, get_transform_for_bounds, point_to_renderer_point, renderer_point_to_point,
    CoordinateExtent, Dimensions, Rect, XYPosition,
};
use crate::readiness::ReadinessWaiter;
use crate::viewport::{FitViewOptions, PanZoom, Viewport};
use std::time::Duration;

/// Zoom step of `zoom_in`/`zoom_out`
const ZOOM_STEP: f64 = 1.2;

impl FlowStore {
    /// Apply options in bulk.
    ///
    /// The first call is remembered and replayed by [`FlowStore::reset`].
    /// Attached collaborators, listeners and the pane size are never
    /// touched.
    pub fn set_state(&mut self, options: FlowOptions) {
        if self.initial_options.is_none() {
            self.initial_options = Some(options.clone());
        }
        self.config.apply(&options);
        self.initialized = true;

        let FlowOptions {
            nodes,
            edges,
            min_zoom,
            max_zoom,
            default_viewport,
            translate_extent,
            ..
        } = options;

        if let Some(nodes) = nodes {
            self.set_nodes(nodes);
        }
        if let Some(edges) = edges {
            self.set_edges(edges);
        }
        if let Some(min_zoom) = min_zoom {
            self.set_min_zoom(min_zoom);
        }
        if let Some(max_zoom) = max_zoom {
            self.set_max_zoom(max_zoom);
        }
        if let Some(extent) = translate_extent {
            self.set_translate_extent(extent);
        }
        if let (Some(viewport), None) = (default_viewport, self.pan_zoom.as_ref()) {
            self.pending.viewport = Some(viewport);
        }
        self.touch();
    }

    /// Back to the initial state: empty collections, default configuration
    /// overlaid with the first options applied, default viewport
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.rebuild_lookup();
        self.connection = Default::default();
        self.pending_dimensions.clear();
        self.fit_view_on_init_done = false;
        self.node_id_counter = 0;
        self.config = FlowConfig::default();

        if let Some(options) = self.initial_options.clone() {
            self.set_state(options);
        }

        let default_viewport = self.config.default_viewport;
        let viewport = Viewport {
            zoom: clamp(default_viewport.zoom, self.config.min_zoom, self.config.max_zoom),
            ..default_viewport
        };
        match self.pan_zoom.as_mut() {
            Some(engine) => {
                engine.set_scale_extent([self.config.min_zoom, self.config.max_zoom]);
                engine.set_translate_extent(self.config.translate_extent);
                engine.set_transform(viewport, None);
                self.sync_viewport();
            }
            None => {
                self.viewport = viewport;
                self.pending.viewport = Some(viewport);
            }
        }
        self.touch();
        tracing::info!(store = %self.id, "Store reset");
    }

    /// Set the lower zoom bound
    pub fn set_min_zoom(&mut self, zoom: f64) {
        match self.pan_zoom.as_mut() {
            Some(engine) => {
                self.config.min_zoom = zoom;
                engine.set_scale_extent([zoom, self.config.max_zoom]);
            }
            None => self.pending.min_zoom = Some(zoom),
        }
    }

    /// Set the upper zoom bound
    pub fn set_max_zoom(&mut self, zoom: f64) {
        match self.pan_zoom.as_mut() {
            Some(engine) => {
                self.config.max_zoom = zoom;
                engine.set_scale_extent([self.config.min_zoom, zoom]);
            }
            None => self.pending.max_zoom = Some(zoom),
        }
    }

    /// Set the allowed pan area
    pub fn set_translate_extent(&mut self, extent: CoordinateExtent) {
        match self.pan_zoom.as_mut() {
            Some(engine) => {
                self.config.translate_extent = extent;
                engine.set_translate_extent(extent);
            }
            None => self.pending.translate_extent = Some(extent),
        }
    }

    /// Attach the pan/zoom engine.
    ///
    /// Deferred zoom bounds, translate extent, viewport and fit-view are
    /// flushed into it, then the readiness signal fires.
    pub fn attach_pan_zoom(&mut self, mut engine: Box<dyn PanZoom>) {
        let pending = std::mem::take(&mut self.pending);
        if let Some(min_zoom) = pending.min_zoom {
            self.config.min_zoom = min_zoom;
        }
        if let Some(max_zoom) = pending.max_zoom {
            self.config.max_zoom = max_zoom;
        }
        if let Some(extent) = pending.translate_extent {
            self.config.translate_extent = extent;
        }

        engine.resize(self.dimensions);
        engine.set_scale_extent([self.config.min_zoom, self.config.max_zoom]);
        engine.set_translate_extent(self.config.translate_extent);
        engine.set_transform(pending.viewport.unwrap_or(self.config.default_viewport), None);
        self.pan_zoom = Some(engine);
        self.sync_viewport();

        if pending.fit_view {
            self.fit_view(FitViewOptions::default());
        }

        tracing::info!(
            store = %self.id,
            zoom = self.viewport.zoom,
            min_zoom = self.config.min_zoom,
            max_zoom = self.config.max_zoom,
            "Pan/zoom engine attached"
        );
        self.pan_zoom_ready.mark_ready();
        self.events.pane_ready.trigger(&self.viewport);
    }

    /// Detach the pan/zoom engine, for example when the pane unmounts.
    ///
    /// The current viewport is kept for the next engine and readiness goes
    /// back to pending, so new waiters block until an engine attaches again.
    pub fn detach_pan_zoom(&mut self) -> Option<Box<dyn PanZoom>> {
        let engine = self.pan_zoom.take()?;
        self.pending.viewport = Some(self.viewport);
        if !self.torn_down {
            self.pan_zoom_ready.reset();
        }
        tracing::info!(store = %self.id, "Pan/zoom engine detached");
        Some(engine)
    }

    /// Whether a pan/zoom engine is attached
    pub fn viewport_initialized(&self) -> bool {
        self.pan_zoom.is_some()
    }

    /// Waiter that resolves once the pan/zoom engine is attached, or fails
    /// when the store is torn down first
    pub fn pan_zoom_waiter(&self) -> ReadinessWaiter {
        self.pan_zoom_ready.waiter()
    }

    /// Stop processing: measurements are ignored, gestures dropped and
    /// readiness waiters released with an error
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.pending_dimensions.clear();
        self.connection = Default::default();
        self.pan_zoom_ready.cancel();
        tracing::info!(store = %self.id, "Store torn down");
    }

    /// Set the pane size.
    ///
    /// A zero-sized pane is kept but reported as
    /// `MISSING_VIEWPORT_DIMENSIONS`.
    pub fn set_dimensions(&mut self, dimensions: Dimensions) {
        if !dimensions.is_measured() {
            self.emit_error(FlowError::MissingViewportDimensions);
        }
        if self.dimensions == dimensions {
            return;
        }
        self.dimensions = dimensions;
        if let Some(engine) = self.pan_zoom.as_mut() {
            engine.resize(dimensions);
        }
        self.touch();
    }

    /// Read the engine's transform back, publishing it when it moved
    pub fn sync_viewport(&mut self) {
        let Some(viewport) = self.pan_zoom.as_ref().map(|engine| engine.transform()) else {
            return;
        };
        if viewport != self.viewport {
            self.viewport = viewport;
            self.touch();
            self.events.viewport_change.trigger(&viewport);
        }
    }

    /// Advance running viewport transitions by `dt`
    pub fn tick(&mut self, dt: Duration) -> Viewport {
        if let Some(engine) = self.pan_zoom.as_mut() {
            engine.advance(dt);
        }
        self.sync_viewport();
        self.viewport
    }

    /// Move the viewport, animated when `duration` is given.
    ///
    /// Without an engine the viewport is kept for attachment and `false`
    /// is returned.
    pub fn set_viewport(&mut self, viewport: Viewport, duration: Option<Duration>) -> bool {
        match self.pan_zoom.as_mut() {
            Some(engine) => {
                engine.set_transform(viewport, duration);
                self.sync_viewport();
                true
            }
            None => {
                self.pending.viewport = Some(viewport);
                false
            }
        }
    }

    /// Zoom in one step around the pane center
    pub fn zoom_in(&mut self, duration: Option<Duration>) -> bool {
        self.zoom_to(self.viewport.zoom * ZOOM_STEP, duration)
    }

    /// Zoom out one step around the pane center
    pub fn zoom_out(&mut self, duration: Option<Duration>) -> bool {
        self.zoom_to(self.viewport.zoom / ZOOM_STEP, duration)
    }

    /// Zoom to `zoom` around the pane center
    pub fn zoom_to(&mut self, zoom: f64, duration: Option<Duration>) -> bool {
        if self.pan_zoom.is_none() {
            return false;
        }
        let zoom = clamp(zoom, self.config.min_zoom, self.config.max_zoom);
        let center = XYPosition::new(self.dimensions.width / 2.0, self.dimensions.height / 2.0);
        let anchor = point_to_renderer_point(center, &self.viewport, false, self.config.snap_grid);
        let viewport = Viewport::new(center.x - anchor.x * zoom, center.y - anchor.y * zoom, zoom);
        self.set_viewport(viewport, duration)
    }

    /// Fit the viewport around the nodes.
    ///
    /// Returns `false` without an engine, without a pane size or when no
    /// node qualifies.
    pub fn fit_view(&mut self, options: FitViewOptions) -> bool {
        if self.pan_zoom.is_none() {
            return false;
        }
        if !self.dimensions.is_measured() {
            self.emit_error(FlowError::MissingViewportDimensions);
            return false;
        }

        let nodes: Vec<_> = self
            .nodes
            .values()
            .filter(|node| options.include_hidden_nodes || !node.hidden)
            .filter(|node| {
                options
                    .nodes
                    .as_ref()
                    .map_or(true, |ids| ids.iter().any(|id| *id == node.id))
            })
            .collect();
        if nodes.is_empty() {
            return false;
        }

        let bounds = get_rect_of_nodes(nodes);
        let viewport = get_transform_for_bounds(
            &bounds,
            self.dimensions,
            options.min_zoom.unwrap_or(self.config.min_zoom),
            options.max_zoom.unwrap_or(self.config.max_zoom),
            options.padding,
            options.offset,
        );
        self.set_viewport(viewport, options.duration)
    }

    /// Center the viewport on a flow point; zoom defaults to the upper bound
    pub fn set_center(&mut self, x: f64, y: f64, zoom: Option<f64>, duration: Option<Duration>) -> bool {
        let zoom = zoom.unwrap_or(self.config.max_zoom);
        let viewport = Viewport::new(
            self.dimensions.width / 2.0 - x * zoom,
            self.dimensions.height / 2.0 - y * zoom,
            zoom,
        );
        self.set_viewport(viewport, duration)
    }

    /// Fit the viewport around a flow rectangle
    pub fn fit_bounds(&mut self, bounds: &Rect, padding: f64, duration: Option<Duration>) -> bool {
        let viewport = get_transform_for_bounds(
            bounds,
            self.dimensions,
            self.config.min_zoom,
            self.config.max_zoom,
            padding,
            XYPosition::ZERO,
        );
        self.set_viewport(viewport, duration)
    }

    /// Pane point to flow point, snapped when snapping is on
    pub fn screen_to_flow_coordinate(&self, point: XYPosition) -> XYPosition {
        point_to_renderer_point(point, &self.viewport, self.config.snap_to_grid, self.config.snap_grid)
    }

    /// Pane point to flow point
    #[deprecated(note = "use `screen_to_flow_coordinate`")]
    pub fn project(&self, point: XYPosition) -> XYPosition {
        self.screen_to_flow_coordinate(point)
    }

    /// Flow point to pane point
    pub fn flow_to_screen_coordinate(&self, point: XYPosition) -> XYPosition {
        renderer_point_to_point(point, &self.viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::NodeInput;
    use crate::readiness::ReadinessError;
    use crate::store::NodeDimensionUpdate;
    use crate::store::StaticMeasurement;
    use crate::viewport::HeadlessPanZoom;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn engine() -> Box<HeadlessPanZoom> {
        Box::new(HeadlessPanZoom::new(Dimensions::new(800.0, 600.0)))
    }

    fn attached(options: FlowOptions) -> FlowStore {
        let mut store = FlowStore::with_options(options);
        store.set_dimensions(Dimensions::new(800.0, 600.0));
        store.attach_pan_zoom(engine());
        store
    }

    #[test]
    fn test_zoom_bounds_wait_for_engine() {
        let mut store = FlowStore::with_options(FlowOptions {
            min_zoom: Some(0.25),
            max_zoom: Some(4.0),
            ..Default::default()
        });
        assert_eq!(store.config().min_zoom, 0.5);
        assert!(!store.set_viewport(Viewport::new(10.0, 10.0, 3.0), None));

        store.set_dimensions(Dimensions::new(800.0, 600.0));
        store.attach_pan_zoom(engine());
        assert_eq!(store.config().min_zoom, 0.25);
        assert_eq!(store.config().max_zoom, 4.0);
        // restored viewport applied with the new bounds
        assert_eq!(store.viewport(), Viewport::new(10.0, 10.0, 3.0));
    }

    #[test]
    fn test_zoom_steps_around_center() {
        let mut store = attached(FlowOptions::default());
        assert!(store.zoom_in(None));
        let viewport = store.viewport();
        assert!((viewport.zoom - 1.2).abs() < 1e-9);
        // the pane center stays put
        let center = store.screen_to_flow_coordinate(XYPosition::new(400.0, 300.0));
        assert!((center.x - 400.0).abs() < 1e-9);
        assert!((center.y - 300.0).abs() < 1e-9);

        store.zoom_to(100.0, None);
        assert_eq!(store.viewport().zoom, 2.0);
    }

    #[test]
    fn test_fit_view_and_center() {
        let mut store = attached(FlowOptions::default());
        store.set_nodes(vec![
            NodeInput {
                width: Some(100.0),
                height: Some(100.0),
                ..NodeInput::new("a", XYPosition::ZERO)
            },
            NodeInput {
                width: Some(100.0),
                height: Some(100.0),
                ..NodeInput::new("b", XYPosition::new(300.0, 100.0))
            },
        ]);
        assert!(store.fit_view(FitViewOptions {
            padding: 0.0,
            ..Default::default()
        }));
        let viewport = store.viewport();
        assert_eq!(viewport.zoom, 2.0);
        let middle = store.flow_to_screen_coordinate(XYPosition::new(200.0, 100.0));
        assert_eq!(middle, XYPosition::new(400.0, 300.0));

        assert!(store.set_center(0.0, 0.0, Some(1.0), None));
        assert_eq!(store.viewport(), Viewport::new(400.0, 300.0, 1.0));
        assert!(!store.fit_view(FitViewOptions {
            nodes: Some(vec!["ghost".into()]),
            ..Default::default()
        }));
    }

    #[test]
    fn test_fit_view_on_init_deferred_until_attach() {
        let mut store = FlowStore::with_options(FlowOptions {
            fit_view_on_init: Some(true),
            nodes: Some(vec![NodeInput::new("a", XYPosition::new(1000.0, 1000.0))]),
            ..Default::default()
        });
        store.set_dimensions(Dimensions::new(800.0, 600.0));
        store.update_node_dimensions(vec![NodeDimensionUpdate::new(
            "a",
            StaticMeasurement::new(Dimensions::new(100.0, 100.0)),
        )]);
        assert_eq!(store.viewport(), Viewport::default());

        store.attach_pan_zoom(engine());
        let center = store.flow_to_screen_coordinate(XYPosition::new(1050.0, 1050.0));
        assert!((center.x - 400.0).abs() < 1e-9);
        assert!((center.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_animated_viewport_and_events() {
        let mut store = attached(FlowOptions::default());
        let moves = Arc::new(Mutex::new(Vec::new()));
        let sink = moves.clone();
        store.events().viewport_change.on(move |v| sink.lock().push(*v));

        store.set_viewport(Viewport::new(100.0, 0.0, 1.0), Some(Duration::from_millis(100)));
        assert!(moves.lock().is_empty());
        store.tick(Duration::from_millis(50));
        store.tick(Duration::from_millis(50));
        assert_eq!(store.viewport(), Viewport::new(100.0, 0.0, 1.0));
        assert_eq!(moves.lock().len(), 2);
    }

    #[test]
    fn test_reset_replays_initial_options() {
        let mut store = attached(FlowOptions {
            snap_to_grid: Some(true),
            default_viewport: Some(Viewport::new(5.0, 5.0, 10.0)),
            nodes: Some(vec![NodeInput::new("a", XYPosition::ZERO)]),
            ..Default::default()
        });
        store.add_nodes(vec![NodeInput::new("b", XYPosition::ZERO)]);
        store.set_viewport(Viewport::new(50.0, 50.0, 1.0), None);

        store.reset();
        let ids: Vec<_> = store.nodes().keys().cloned().collect();
        assert_eq!(ids, vec!["a"]);
        assert!(store.config().snap_to_grid);
        assert_eq!(store.viewport(), Viewport::new(5.0, 5.0, 2.0));
    }

    #[test]
    fn test_missing_pane_reported() {
        let mut store = FlowStore::with_options(FlowOptions::default());
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        store.events().error.on(move |e| sink.lock().push(e.code()));

        store.set_dimensions(Dimensions::new(0.0, 600.0));
        store.attach_pan_zoom(engine());
        assert!(!store.fit_view(FitViewOptions::default()));
        assert_eq!(errors.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_readiness_follows_lifecycle() {
        let mut store = FlowStore::with_options(FlowOptions::default());
        let mut waiter = store.pan_zoom_waiter();
        store.attach_pan_zoom(engine());
        assert_eq!(waiter.wait_timeout(Duration::from_secs(1)).await, Ok(()));

        let mut waiter = store.pan_zoom_waiter();
        store.set_viewport(Viewport::new(15.0, 5.0, 1.5), None);
        assert!(store.detach_pan_zoom().is_some());
        assert!(!store.viewport_initialized());
        assert!(store.detach_pan_zoom().is_none());
        assert_eq!(
            waiter.wait_timeout(Duration::from_millis(10)).await,
            Err(ReadinessError::TimedOut(Duration::from_millis(10)))
        );
        store.attach_pan_zoom(engine());
        assert_eq!(waiter.wait_timeout(Duration::from_secs(1)).await, Ok(()));
        assert_eq!(store.viewport(), Viewport::new(15.0, 5.0, 1.5));

        let mut store = FlowStore::with_options(FlowOptions::default());
        let mut waiter = store.pan_zoom_waiter();
        store.teardown();
        assert_eq!(waiter.wait().await, Err(ReadinessError::Cancelled));
        assert!(store.is_torn_down());
    }
}
