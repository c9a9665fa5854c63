// SPDX-License-Identifier: MIT OR Apache-2.0
//! Viewport transform and the pan/zoom engine seam.
//!
//! The store never moves the viewport itself once an engine is attached: it
//! asks the [`PanZoom`] engine for a transform and reads back whatever the
//! engine settled on. [`HeadlessPanZoom`] is the in-process engine used by
//! tools and tests.

use crate::geometry::{clamp, CoordinateExtent, Dimensions, XYPosition};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Pan offset and zoom of the pane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Horizontal pan in screen pixels
    pub x: f64,
    /// Vertical pan in screen pixels
    pub y: f64,
    /// Scale factor
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Create a viewport
    pub const fn new(x: f64, y: f64, zoom: f64) -> Self {
        Self { x, y, zoom }
    }

    fn invert(&self, point: [f64; 2]) -> [f64; 2] {
        [(point[0] - self.x) / self.zoom, (point[1] - self.y) / self.zoom]
    }

    fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + self.zoom * dx,
            y: self.y + self.zoom * dy,
            zoom: self.zoom,
        }
    }
}

/// Keep the visible part of the flow inside `translate_extent`.
///
/// `extent` is the pane box in screen coordinates. When the visible area is
/// larger than the allowed area the content is centred instead.
pub fn constrain_viewport(
    viewport: Viewport,
    extent: &CoordinateExtent,
    translate_extent: &CoordinateExtent,
) -> Viewport {
    let [min, max] = extent.0;
    let [t_min, t_max] = translate_extent.0;
    let top_left = viewport.invert(min);
    let bottom_right = viewport.invert(max);

    let dx0 = top_left[0] - t_min[0];
    let dx1 = bottom_right[0] - t_max[0];
    let dy0 = top_left[1] - t_min[1];
    let dy1 = bottom_right[1] - t_max[1];

    let axis = |d0: f64, d1: f64| {
        if d1 > d0 {
            (d0 + d1) / 2.0
        } else {
            let low = d0.min(0.0);
            if low != 0.0 {
                low
            } else {
                d1.max(0.0)
            }
        }
    };
    viewport.translate(axis(dx0, dx1), axis(dy0, dy1))
}

/// Easing curve for viewport transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    /// Constant speed
    Linear,
    /// Slow start and end
    #[default]
    CubicInOut,
}

impl Easing {
    /// Map linear progress in `0..=1` to eased progress
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::CubicInOut => {
                let t = t * 2.0;
                if t <= 1.0 {
                    t * t * t / 2.0
                } else {
                    let t = t - 2.0;
                    (t * t * t + 2.0) / 2.0
                }
            }
        }
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// A timed move from one viewport to another
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportTransition {
    from: Viewport,
    to: Viewport,
    duration: Duration,
    elapsed: Duration,
    easing: Easing,
}

impl ViewportTransition {
    /// Create a transition
    pub fn new(from: Viewport, to: Viewport, duration: Duration, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
            easing,
        }
    }

    /// The viewport at the current point of the transition
    pub fn current(&self) -> Viewport {
        if self.is_finished() {
            return self.to;
        }
        let t = self.easing.apply(self.elapsed.as_secs_f64() / self.duration.as_secs_f64());
        Viewport {
            x: lerp(self.from.x, self.to.x, t),
            y: lerp(self.from.y, self.to.y, t),
            zoom: lerp(self.from.zoom, self.to.zoom, t),
        }
    }

    /// Step the transition forward
    pub fn advance(&mut self, dt: Duration) -> Viewport {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.current()
    }

    /// Whether the target was reached
    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Where the transition ends
    pub fn target(&self) -> Viewport {
        self.to
    }
}

/// External pan/zoom engine driving the viewport
pub trait PanZoom: Send + fmt::Debug {
    /// The engine's current transform
    fn transform(&self) -> Viewport;

    /// Move to a transform, animated when `duration` is set
    fn set_transform(&mut self, viewport: Viewport, duration: Option<Duration>);

    /// Allowed zoom range as `[min, max]`
    fn scale_extent(&self) -> [f64; 2];

    /// Set the allowed zoom range
    fn set_scale_extent(&mut self, extent: [f64; 2]);

    /// Allowed pan area in flow coordinates
    fn translate_extent(&self) -> CoordinateExtent;

    /// Set the allowed pan area
    fn set_translate_extent(&mut self, extent: CoordinateExtent);

    /// Inform the engine of the pane size
    fn resize(&mut self, dimensions: Dimensions);

    /// Constrain a transform to the translate extent
    fn constrain(&self, viewport: Viewport, extent: &CoordinateExtent, translate_extent: &CoordinateExtent) -> Viewport {
        constrain_viewport(viewport, extent, translate_extent)
    }

    /// Step a running transition, returning the new transform
    fn advance(&mut self, _dt: Duration) -> Viewport {
        self.transform()
    }
}

/// In-process pan/zoom engine
#[derive(Debug, Clone)]
pub struct HeadlessPanZoom {
    transform: Viewport,
    transition: Option<ViewportTransition>,
    scale_extent: [f64; 2],
    translate_extent: CoordinateExtent,
    pane: Dimensions,
    easing: Easing,
}

impl Default for HeadlessPanZoom {
    fn default() -> Self {
        Self::new(Dimensions::default())
    }
}

impl HeadlessPanZoom {
    /// Create an engine for a pane of the given size
    pub fn new(pane: Dimensions) -> Self {
        Self {
            transform: Viewport::default(),
            transition: None,
            scale_extent: [0.5, 2.0],
            translate_extent: CoordinateExtent::INFINITE,
            pane,
            easing: Easing::default(),
        }
    }

    /// Use a different easing curve for transitions
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Whether a transition is running
    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    fn pane_extent(&self) -> CoordinateExtent {
        CoordinateExtent::new([0.0, 0.0], [self.pane.width, self.pane.height])
    }

    fn settle(&self, viewport: Viewport) -> Viewport {
        let zoom = clamp(viewport.zoom, self.scale_extent[0], self.scale_extent[1]);
        let viewport = Viewport { zoom, ..viewport };
        self.constrain(viewport, &self.pane_extent(), &self.translate_extent)
    }
}

impl PanZoom for HeadlessPanZoom {
    fn transform(&self) -> Viewport {
        self.transform
    }

    fn set_transform(&mut self, viewport: Viewport, duration: Option<Duration>) {
        let target = self.settle(viewport);
        match duration.filter(|d| !d.is_zero()) {
            Some(duration) => {
                self.transition = Some(ViewportTransition::new(self.transform, target, duration, self.easing));
            }
            None => {
                self.transition = None;
                self.transform = target;
            }
        }
    }

    fn scale_extent(&self) -> [f64; 2] {
        self.scale_extent
    }

    fn set_scale_extent(&mut self, extent: [f64; 2]) {
        self.scale_extent = extent;
    }

    fn translate_extent(&self) -> CoordinateExtent {
        self.translate_extent
    }

    fn set_translate_extent(&mut self, extent: CoordinateExtent) {
        self.translate_extent = extent;
    }

    fn resize(&mut self, dimensions: Dimensions) {
        self.pane = dimensions;
    }

    fn advance(&mut self, dt: Duration) -> Viewport {
        if let Some(transition) = &mut self.transition {
            self.transform = transition.advance(dt);
            if transition.is_finished() {
                self.transition = None;
            }
        }
        self.transform
    }
}

/// Options for fitting the viewport around nodes
#[derive(Debug, Clone, PartialEq)]
pub struct FitViewOptions {
    /// Fraction of the bounds added as margin
    pub padding: f64,
    /// Include hidden nodes in the bounds
    pub include_hidden_nodes: bool,
    /// Lower zoom bound, defaults to the store's
    pub min_zoom: Option<f64>,
    /// Upper zoom bound, defaults to the store's
    pub max_zoom: Option<f64>,
    /// Screen offset added to the result
    pub offset: XYPosition,
    /// Restrict to these node ids
    pub nodes: Option<Vec<String>>,
    /// Animate over this duration
    pub duration: Option<Duration>,
}

impl Default for FitViewOptions {
    fn default() -> Self {
        Self {
            padding: 0.1,
            include_hidden_nodes: false,
            min_zoom: None,
            max_zoom: None,
            offset: XYPosition::ZERO,
            nodes: None,
            duration: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constrain_infinite_extent_is_identity() {
        let viewport = Viewport::new(-300.0, 120.0, 1.5);
        let pane = CoordinateExtent::new([0.0, 0.0], [800.0, 600.0]);
        assert_eq!(constrain_viewport(viewport, &pane, &CoordinateExtent::INFINITE), viewport);
    }

    #[test]
    fn test_constrain_pulls_back_into_extent() {
        let pane = CoordinateExtent::new([0.0, 0.0], [100.0, 100.0]);
        let allowed = CoordinateExtent::new([0.0, 0.0], [500.0, 500.0]);

        // panned right past the left border
        let constrained = constrain_viewport(Viewport::new(50.0, 0.0, 1.0), &pane, &allowed);
        assert_eq!(constrained, Viewport::new(0.0, 0.0, 1.0));

        // visible area larger than the allowed area gets centred
        let small = CoordinateExtent::new([0.0, 0.0], [50.0, 50.0]);
        let centred = constrain_viewport(Viewport::new(0.0, 0.0, 1.0), &pane, &small);
        assert_eq!(centred, Viewport::new(25.0, 25.0, 1.0));
    }

    #[test]
    fn test_easing_endpoints() {
        for easing in [Easing::Linear, Easing::CubicInOut] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
        }
        assert_eq!(Easing::CubicInOut.apply(0.5), 0.5);
        assert!(Easing::CubicInOut.apply(0.25) < 0.25);
    }

    #[test]
    fn test_headless_transition() {
        let mut engine = HeadlessPanZoom::new(Dimensions::new(800.0, 600.0)).with_easing(Easing::Linear);
        engine.set_transform(Viewport::new(100.0, 0.0, 1.0), Some(Duration::from_millis(200)));
        assert!(engine.is_transitioning());
        assert_eq!(engine.transform(), Viewport::default());

        let halfway = engine.advance(Duration::from_millis(100));
        assert_eq!(halfway, Viewport::new(50.0, 0.0, 1.0));

        let done = engine.advance(Duration::from_millis(500));
        assert_eq!(done, Viewport::new(100.0, 0.0, 1.0));
        assert!(!engine.is_transitioning());
    }

    #[test]
    fn test_headless_clamps_zoom() {
        let mut engine = HeadlessPanZoom::new(Dimensions::new(800.0, 600.0));
        engine.set_scale_extent([0.25, 4.0]);
        engine.set_transform(Viewport::new(0.0, 0.0, 10.0), None);
        assert_eq!(engine.transform().zoom, 4.0);
    }
}
