// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loading a snapshot into a store and summarizing it.

use ordoplay_flow::{
    Dimensions, ErrorCode, FitViewOptions, FlowError, FlowOptions, FlowStore, HeadlessPanZoom, Rect,
    SerializeError, Viewport,
};
use parking_lot::Mutex;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors that stop an inspection
#[derive(Debug, Error)]
pub enum InspectError {
    /// A file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// A snapshot or options file could not be parsed
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: SerializeError,
    },

    /// The snapshot extension is neither `.json` nor `.ron`
    #[error("Unsupported snapshot format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Writing the normalized snapshot failed
    #[error("Failed to export snapshot: {0}")]
    Export(#[from] SerializeError),
}

/// Snapshot encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// `serde_json`
    Json,
    /// RON
    Ron,
}

impl SnapshotFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, InspectError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("ron") => Ok(Self::Ron),
            _ => Err(InspectError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Summary of an inspected flow
#[derive(Debug, Clone, PartialEq)]
pub struct FlowReport {
    /// Node count
    pub nodes: usize,
    /// Edge count
    pub edges: usize,
    /// Nodes with children
    pub parents: usize,
    /// Nodes without any edge
    pub isolated: Vec<String>,
    /// Bounds of all nodes
    pub bounds: Rect,
    /// Viewport after fitting, when a pane size was given
    pub viewport: Viewport,
    /// Every error the store published
    pub errors: Vec<(ErrorCode, String)>,
}

impl FlowReport {
    /// The report as JSON
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "nodes": self.nodes,
            "edges": self.edges,
            "parents": self.parents,
            "isolated": self.isolated,
            "bounds": self.bounds,
            "viewport": self.viewport,
            "errors": self
                .errors
                .iter()
                .map(|(code, message)| json!({ "code": code, "message": message }))
                .collect::<Vec<_>>(),
        })
    }
}

/// A loaded store plus its report
#[derive(Debug)]
pub struct Inspection {
    /// The populated store
    pub store: FlowStore,
    /// Its summary
    pub report: FlowReport,
}

/// Read a file into a string
pub fn read(path: &Path) -> Result<String, InspectError> {
    std::fs::read_to_string(path).map_err(|source| InspectError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Load RON options from a file
pub fn load_options(path: &Path) -> Result<FlowOptions, InspectError> {
    let content = read(path)?;
    FlowOptions::from_ron(&content).map_err(|source| InspectError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Build a store from a snapshot and summarize it.
///
/// With a `pane` size a headless pan/zoom engine is attached and the view
/// is fitted around the nodes.
pub fn inspect(
    path: &Path,
    content: &str,
    format: SnapshotFormat,
    options: FlowOptions,
    pane: Option<Dimensions>,
) -> Result<Inspection, InspectError> {
    let mut store = FlowStore::with_options(options);

    let errors: Arc<Mutex<Vec<FlowError>>> = Arc::default();
    let sink = errors.clone();
    let listener = store.events().error.on(move |err| sink.lock().push(err.clone()));

    let loaded = match format {
        SnapshotFormat::Json => store.from_json(content),
        SnapshotFormat::Ron => store.from_ron(content),
    };
    loaded.map_err(|source| InspectError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(pane) = pane {
        store.set_dimensions(pane);
        store.attach_pan_zoom(Box::new(HeadlessPanZoom::new(pane)));
        store.fit_view(FitViewOptions::default());
    }
    // surface orphaned edges
    store.visible_edges();
    store.events().error.off(listener);

    let errors = std::mem::take(&mut *errors.lock());
    let report = FlowReport {
        nodes: store.nodes().len(),
        edges: store.edges().len(),
        parents: store.nodes().values().filter(|n| n.is_parent).count(),
        isolated: store
            .nodes()
            .keys()
            .filter(|id| !store.lookup().is_connected(id))
            .cloned()
            .collect(),
        bounds: store.nodes_bounds(None),
        viewport: store.viewport(),
        errors: errors.iter().map(|err| (err.code(), err.to_string())).collect(),
    };
    Ok(Inspection { store, report })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "nodes": [
            { "id": "group", "position": { "x": 0.0, "y": 0.0 }, "width": 300.0, "height": 200.0 },
            { "id": "a", "position": { "x": 10.0, "y": 10.0 }, "parentNode": "group", "width": 50.0, "height": 50.0 },
            { "id": "b", "position": { "x": 400.0, "y": 0.0 }, "width": 50.0, "height": 50.0 },
            { "id": "lonely", "position": { "x": 0.0, "y": 400.0 } }
        ],
        "edges": [
            { "id": "e1", "source": "a", "target": "b" },
            { "id": "broken", "source": "a", "target": "ghost" }
        ]
    }"#;

    #[test]
    fn test_report_counts_and_errors() {
        let inspection = inspect(
            Path::new("flow.json"),
            SNAPSHOT,
            SnapshotFormat::Json,
            FlowOptions::default(),
            None,
        )
        .unwrap();
        let report = inspection.report;
        assert_eq!(report.nodes, 4);
        assert_eq!(report.edges, 1);
        assert_eq!(report.parents, 1);
        assert_eq!(report.isolated, vec!["group", "lonely"]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, ErrorCode::EdgeTargetMissing);
        assert_eq!(report.to_json()["errors"][0]["code"], "EDGE_TARGET_MISSING");
    }

    #[test]
    fn test_fit_with_pane() {
        let inspection = inspect(
            Path::new("flow.json"),
            SNAPSHOT,
            SnapshotFormat::Json,
            FlowOptions::default(),
            Some(Dimensions::new(1280.0, 720.0)),
        )
        .unwrap();
        assert!(inspection.store.viewport_initialized());
        assert_ne!(inspection.report.viewport, Viewport::default());
    }

    #[test]
    fn test_format_and_parse_errors() {
        assert_eq!(SnapshotFormat::from_path(Path::new("x.ron")).unwrap(), SnapshotFormat::Ron);
        assert!(matches!(
            SnapshotFormat::from_path(Path::new("x.yaml")),
            Err(InspectError::UnsupportedFormat(_))
        ));
        let result = inspect(
            Path::new("bad.json"),
            "not json",
            SnapshotFormat::Json,
            FlowOptions::default(),
            None,
        );
        assert!(matches!(result, Err(InspectError::Parse { .. })));
    }
}
