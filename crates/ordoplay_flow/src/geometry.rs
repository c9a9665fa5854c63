// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rectangle and point math shared by the store, the builders and the
//! viewport helper.
//!
//! All positions are in flow coordinates unless a function says otherwise.
//! Screen coordinates are relative to the top-left corner of the pane.

use crate::node::GraphNode;
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};

/// A 2D position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct XYPosition {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl XYPosition {
    /// The origin
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new position
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for XYPosition {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for XYPosition {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// A 2D position with a stacking order
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct XYZPosition {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
    /// Stacking order
    pub z: f64,
}

impl XYZPosition {
    /// Drop the stacking order
    pub fn xy(&self) -> XYPosition {
        XYPosition::new(self.x, self.y)
    }
}

/// Width and height of an element
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Dimensions {
    /// Create new dimensions
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether both sides are non-zero
    pub fn is_measured(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// An axis-aligned rectangle given by its origin and size
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Create a rectangle from a position and dimensions
    pub fn from_parts(position: XYPosition, dimensions: Dimensions) -> Self {
        Self::new(position.x, position.y, dimensions.width, dimensions.height)
    }

    /// Center point
    pub fn center(&self) -> XYPosition {
        XYPosition::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the point lies inside (edges inclusive)
    pub fn contains(&self, point: XYPosition) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// An axis-aligned rectangle given by two corners
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxCoords {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Right edge
    pub x2: f64,
    /// Bottom edge
    pub y2: f64,
}

/// Bounds a position may move within: `[[min_x, min_y], [max_x, max_y]]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateExtent(pub [[f64; 2]; 2]);

impl CoordinateExtent {
    /// An extent without bounds
    pub const INFINITE: Self = Self([
        [f64::NEG_INFINITY, f64::NEG_INFINITY],
        [f64::INFINITY, f64::INFINITY],
    ]);

    /// Create an extent from its corners
    pub const fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Self([min, max])
    }

    /// Top-left corner
    pub fn min(&self) -> [f64; 2] {
        self.0[0]
    }

    /// Bottom-right corner
    pub fn max(&self) -> [f64; 2] {
        self.0[1]
    }

    /// Whether the corners are ordered
    pub fn is_valid(&self) -> bool {
        let [min, max] = self.0;
        min[0] <= max[0] && min[1] <= max[1]
    }
}

impl Default for CoordinateExtent {
    fn default() -> Self {
        Self::INFINITE
    }
}

/// Clamp a value into `[min, max]`
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Clamp a position into an extent
pub fn clamp_position(position: XYPosition, extent: &CoordinateExtent) -> XYPosition {
    let [min, max] = extent.0;
    XYPosition::new(clamp(position.x, min[0], max[0]), clamp(position.y, min[1], max[1]))
}

/// Snap a position onto a grid
pub fn snap_position(position: XYPosition, snap_grid: [f64; 2]) -> XYPosition {
    let [sx, sy] = snap_grid;
    if sx <= 0.0 || sy <= 0.0 {
        return position;
    }
    XYPosition::new((position.x / sx).round() * sx, (position.y / sy).round() * sy)
}

/// Convert a rectangle into corner form
pub fn rect_to_box(rect: &Rect) -> BoxCoords {
    BoxCoords {
        x: rect.x,
        y: rect.y,
        x2: rect.x + rect.width,
        y2: rect.y + rect.height,
    }
}

/// Convert corner form into a rectangle
pub fn box_to_rect(b: &BoxCoords) -> Rect {
    Rect::new(b.x, b.y, b.x2 - b.x, b.y2 - b.y)
}

/// Smallest box containing both boxes
pub fn get_bounds_of_boxes(a: &BoxCoords, b: &BoxCoords) -> BoxCoords {
    BoxCoords {
        x: a.x.min(b.x),
        y: a.y.min(b.y),
        x2: a.x2.max(b.x2),
        y2: a.y2.max(b.y2),
    }
}

/// Area shared by two rectangles
pub fn get_overlapping_area(a: &Rect, b: &Rect) -> f64 {
    let x_overlap = 0f64.max((a.x + a.width).min(b.x + b.width) - a.x.max(b.x));
    let y_overlap = 0f64.max((a.y + a.height).min(b.y + b.height) - a.y.max(b.y));
    (x_overlap * y_overlap).ceil()
}

/// Screen point to flow point, optionally snapped
pub fn point_to_renderer_point(
    point: XYPosition,
    viewport: &Viewport,
    snap_to_grid: bool,
    snap_grid: [f64; 2],
) -> XYPosition {
    let position = XYPosition::new(
        (point.x - viewport.x) / viewport.zoom,
        (point.y - viewport.y) / viewport.zoom,
    );
    if snap_to_grid {
        snap_position(position, snap_grid)
    } else {
        position
    }
}

/// Flow point to screen point
pub fn renderer_point_to_point(point: XYPosition, viewport: &Viewport) -> XYPosition {
    XYPosition::new(
        point.x * viewport.zoom + viewport.x,
        point.y * viewport.zoom + viewport.y,
    )
}

/// Absolute rectangle of a node
pub fn node_to_rect(node: &GraphNode) -> Rect {
    Rect::from_parts(node.computed_position.xy(), node.size())
}

/// Bounding rectangle of a set of nodes; empty input yields a zero rect
pub fn get_rect_of_nodes<'a>(nodes: impl IntoIterator<Item = &'a GraphNode>) -> Rect {
    let bounds = nodes
        .into_iter()
        .map(|node| rect_to_box(&node_to_rect(node)))
        .reduce(|acc, b| get_bounds_of_boxes(&acc, &b));

    bounds.map(|b| box_to_rect(&b)).unwrap_or_default()
}

/// Nodes inside a screen-space rectangle.
///
/// With `partially` a node only has to overlap the rectangle. Unmeasured
/// nodes and nodes being dragged always count as inside.
pub fn get_nodes_inside<'a>(
    nodes: impl IntoIterator<Item = &'a GraphNode>,
    rect: &Rect,
    viewport: &Viewport,
    partially: bool,
    exclude_non_selectable: bool,
) -> Vec<&'a GraphNode> {
    let origin = point_to_renderer_point(XYPosition::new(rect.x, rect.y), viewport, false, [1.0, 1.0]);
    let pane = Rect::new(
        origin.x,
        origin.y,
        rect.width / viewport.zoom,
        rect.height / viewport.zoom,
    );

    nodes
        .into_iter()
        .filter(|node| {
            if node.hidden || (exclude_non_selectable && node.selectable == Some(false)) {
                return false;
            }
            let size = node.size();
            let overlap = get_overlapping_area(&pane, &node_to_rect(node));
            let area = size.width * size.height;
            let visible = !size.is_measured() || (partially && overlap > 0.0) || overlap >= area;
            visible || node.dragging
        })
        .collect()
}

/// Inputs for [`is_edge_visible`]
#[derive(Debug, Clone, Copy)]
pub struct EdgeVisibilityParams {
    /// Absolute position of the source node
    pub source_pos: XYPosition,
    /// Absolute position of the target node
    pub target_pos: XYPosition,
    /// Source node size
    pub source_size: Dimensions,
    /// Target node size
    pub target_size: Dimensions,
    /// Pane size
    pub pane: Dimensions,
    /// Current viewport
    pub viewport: Viewport,
}

/// Whether the box spanned by an edge's endpoint nodes overlaps the visible pane
pub fn is_edge_visible(params: &EdgeVisibilityParams) -> bool {
    let EdgeVisibilityParams {
        source_pos,
        target_pos,
        source_size,
        target_size,
        pane,
        viewport,
    } = *params;

    let mut edge_box = BoxCoords {
        x: source_pos.x.min(target_pos.x),
        y: source_pos.y.min(target_pos.y),
        x2: (source_pos.x + source_size.width).max(target_pos.x + target_size.width),
        y2: (source_pos.y + source_size.height).max(target_pos.y + target_size.height),
    };
    // degenerate boxes still need an area to overlap with
    if edge_box.x == edge_box.x2 {
        edge_box.x2 += 1.0;
    }
    if edge_box.y == edge_box.y2 {
        edge_box.y2 += 1.0;
    }

    let view_box = rect_to_box(&Rect::new(
        -viewport.x / viewport.zoom,
        -viewport.y / viewport.zoom,
        pane.width / viewport.zoom,
        pane.height / viewport.zoom,
    ));

    let x_overlap = 0f64.max(view_box.x2.min(edge_box.x2) - view_box.x.max(edge_box.x));
    let y_overlap = 0f64.max(view_box.y2.min(edge_box.y2) - view_box.y.max(edge_box.y));
    (x_overlap * y_overlap).ceil() > 0.0
}

/// Viewport that fits `bounds` into a pane of the given size
pub fn get_transform_for_bounds(
    bounds: &Rect,
    pane: Dimensions,
    min_zoom: f64,
    max_zoom: f64,
    padding: f64,
    offset: XYPosition,
) -> Viewport {
    let x_zoom = pane.width / (bounds.width * (1.0 + padding));
    let y_zoom = pane.height / (bounds.height * (1.0 + padding));
    let zoom = x_zoom.min(y_zoom);
    let zoom = if zoom.is_finite() { zoom } else { max_zoom };
    let zoom = clamp(zoom, min_zoom, max_zoom);
    let center = bounds.center();

    Viewport {
        x: pane.width / 2.0 - center.x * zoom + offset.x,
        y: pane.height / 2.0 - center.y * zoom + offset.y,
        zoom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::NodeInput;

    fn node(id: &str, x: f64, y: f64, w: f64, h: f64) -> GraphNode {
        let mut node = GraphNode::from_input(NodeInput::new(id, XYPosition::new(x, y)), id.to_string());
        node.computed_position = XYZPosition { x, y, z: 0.0 };
        node.dimensions = Dimensions::new(w, h);
        node
    }

    #[test]
    fn test_overlapping_area() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(get_overlapping_area(&a, &b), 25.0);

        let c = Rect::new(20.0, 20.0, 5.0, 5.0);
        assert_eq!(get_overlapping_area(&a, &c), 0.0);
    }

    #[test]
    fn test_clamp_position() {
        let extent = CoordinateExtent::new([0.0, 0.0], [100.0, 50.0]);
        let clamped = clamp_position(XYPosition::new(-10.0, 80.0), &extent);
        assert_eq!(clamped, XYPosition::new(0.0, 50.0));

        let free = clamp_position(XYPosition::new(-1e9, 1e9), &CoordinateExtent::INFINITE);
        assert_eq!(free, XYPosition::new(-1e9, 1e9));
    }

    #[test]
    fn test_snap_position() {
        let snapped = snap_position(XYPosition::new(22.0, 8.0), [15.0, 15.0]);
        assert_eq!(snapped, XYPosition::new(15.0, 15.0));
    }

    #[test]
    fn test_point_conversion() {
        let viewport = Viewport { x: 100.0, y: 50.0, zoom: 2.0 };
        let flow = point_to_renderer_point(XYPosition::new(300.0, 250.0), &viewport, false, [1.0, 1.0]);
        assert_eq!(flow, XYPosition::new(100.0, 100.0));
        assert_eq!(renderer_point_to_point(flow, &viewport), XYPosition::new(300.0, 250.0));
    }

    #[test]
    fn test_rect_of_nodes() {
        let nodes = [node("a", 0.0, 0.0, 10.0, 10.0), node("b", 50.0, 40.0, 20.0, 20.0)];
        assert_eq!(get_rect_of_nodes(&nodes), Rect::new(0.0, 0.0, 70.0, 60.0));
        assert_eq!(get_rect_of_nodes(std::iter::empty()), Rect::default());
    }

    #[test]
    fn test_nodes_inside() {
        let nodes = [
            node("inside", 10.0, 10.0, 20.0, 20.0),
            node("partial", 90.0, 90.0, 20.0, 20.0),
            node("outside", 500.0, 500.0, 20.0, 20.0),
            node("unmeasured", 500.0, 500.0, 0.0, 0.0),
        ];
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let viewport = Viewport::default();

        let ids = |found: Vec<&GraphNode>| found.iter().map(|n| n.id.clone()).collect::<Vec<_>>();
        assert_eq!(
            ids(get_nodes_inside(&nodes, &rect, &viewport, true, false)),
            vec!["inside", "partial", "unmeasured"]
        );
        assert_eq!(
            ids(get_nodes_inside(&nodes, &rect, &viewport, false, false)),
            vec!["inside", "unmeasured"]
        );
    }

    #[test]
    fn test_edge_visibility_uses_envelope() {
        // both endpoints are off-screen but the span between them crosses the pane
        let params = EdgeVisibilityParams {
            source_pos: XYPosition::new(-500.0, 10.0),
            target_pos: XYPosition::new(500.0, 10.0),
            source_size: Dimensions::new(10.0, 10.0),
            target_size: Dimensions::new(10.0, 10.0),
            pane: Dimensions::new(100.0, 100.0),
            viewport: Viewport::default(),
        };
        assert!(is_edge_visible(&params));

        let off = EdgeVisibilityParams {
            source_pos: XYPosition::new(-500.0, 300.0),
            target_pos: XYPosition::new(500.0, 300.0),
            ..params
        };
        assert!(!is_edge_visible(&off));
    }

    #[test]
    fn test_transform_for_bounds() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let viewport = get_transform_for_bounds(
            &bounds,
            Dimensions::new(200.0, 200.0),
            0.5,
            2.0,
            0.0,
            XYPosition::ZERO,
        );
        assert_eq!(viewport, Viewport { x: 0.0, y: 0.0, zoom: 2.0 });
    }
}
