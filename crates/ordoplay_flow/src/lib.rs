// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flow graph state engine for `OrdoPlay` Editor.
//!
//! This crate owns the state behind node/edge diagram editors:
//! - Canonical node and edge collections
//! - Typed change descriptors and their application
//! - Connection lookup (node/handle adjacency)
//! - Selection, dragging, resizing and connection gestures
//! - Viewport math and pan/zoom engine coordination
//!
//! ## Architecture
//!
//! Gestures call [`FlowStore`] actions. Actions compute [`NodeChange`] /
//! [`EdgeChange`] batches and dispatch them through the store's change
//! channels, where an optional interceptor may rewrite or veto them before
//! they are applied. Derived views (visible nodes/edges, selection, type
//! maps) are read through getters keyed on the store revision.
//!
//! Rendering, DOM measurement and the pan/zoom engine are collaborators
//! plugged in through the [`NodeMeasurement`] and [`PanZoom`] traits.

pub mod builders;
pub mod changes;
pub mod edge;
pub mod error;
pub mod events;
pub mod geometry;
pub mod instances;
pub mod lookup;
pub mod node;
pub mod readiness;
pub mod store;
pub mod type_registry;
pub mod viewport;

pub use builders::{EdgeInput, FlowElement, NodeInput};
pub use changes::{EdgeChange, NodeChange};
pub use edge::{Connection, DefaultEdgeOptions, GraphEdge};
pub use error::{ErrorCode, FlowError};
pub use events::{EventHook, FlowEvents, ListenerId};
pub use geometry::{CoordinateExtent, Dimensions, Rect, XYPosition, XYZPosition};
pub use instances::{FlowRegistry, SharedFlowStore};
pub use lookup::{ConnectionLookup, HandleConnection};
pub use node::{GraphNode, HandleBounds, HandleElement, HandleType, NodeExtent, Position};
pub use readiness::{Readiness, ReadinessError, ReadinessWaiter};
pub use store::{
    ConnectingHandle, ConnectionGesture, ConnectionMode, ConnectionStatus, FlowConfig,
    FlowExportObject, FlowOptions, FlowStore, MeasuredHandle, NodeDimensionUpdate, NodeDragItem,
    NodeMeasurement, SerializeError, StaticMeasurement, UpdateOptions, ViewportRestore,
};
pub use type_registry::{ElementRenderer, TypeEntry, TypeRegistry};
pub use viewport::{Easing, FitViewOptions, HeadlessPanZoom, PanZoom, Viewport, ViewportTransition};
