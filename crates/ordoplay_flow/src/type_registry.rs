// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of node and edge renderers keyed by type string.
//!
//! Rendering itself happens outside this crate. The registry only resolves
//! a type string to the renderer descriptor the host registered for it,
//! falling back to the `default` renderer for unknown types.

use crate::error::FlowError;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// A renderer the host provides for one element type
pub trait ElementRenderer: Send + Sync + fmt::Debug {
    /// Type string this renderer draws
    fn name(&self) -> &str;
}

/// Renderer descriptor for a built-in type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinRenderer {
    name: &'static str,
}

impl ElementRenderer for BuiltinRenderer {
    fn name(&self) -> &str {
        self.name
    }
}

/// What a type string resolves to in the type map
#[derive(Debug, Clone)]
pub enum TypeEntry {
    /// A registered renderer
    Registered(Arc<dyn ElementRenderer>),
    /// A type string used by an element but not registered
    AdHoc(String),
}

impl TypeEntry {
    /// Name of the entry
    pub fn name(&self) -> &str {
        match self {
            Self::Registered(renderer) => renderer.name(),
            Self::AdHoc(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Node,
    Edge,
}

const NODE_BUILTINS: &[&str] = &["input", "default", "output"];
const EDGE_BUILTINS: &[&str] = &["default", "straight", "step", "smoothstep", "simplebezier"];

/// Renderer registry for one element kind
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    kind: ElementKind,
    builtins: IndexMap<String, Arc<dyn ElementRenderer>>,
    user: IndexMap<String, Arc<dyn ElementRenderer>>,
}

impl TypeRegistry {
    fn with_builtins(kind: ElementKind, names: &[&'static str]) -> Self {
        let builtins = names
            .iter()
            .map(|&name| {
                let renderer: Arc<dyn ElementRenderer> = Arc::new(BuiltinRenderer { name });
                (name.to_string(), renderer)
            })
            .collect();
        Self {
            kind,
            builtins,
            user: IndexMap::new(),
        }
    }

    /// Registry with the built-in node types
    pub fn nodes() -> Self {
        Self::with_builtins(ElementKind::Node, NODE_BUILTINS)
    }

    /// Registry with the built-in edge types
    pub fn edges() -> Self {
        Self::with_builtins(ElementKind::Edge, EDGE_BUILTINS)
    }

    /// Register a renderer, replacing any previous one for the same type
    pub fn register(&mut self, name: impl Into<String>, renderer: Arc<dyn ElementRenderer>) {
        self.user.insert(name.into(), renderer);
    }

    /// Remove a user renderer
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn ElementRenderer>> {
        self.user.shift_remove(name)
    }

    /// Remove every user renderer
    pub fn clear(&mut self) {
        self.user.clear();
    }

    /// Look up a renderer, user registrations first
    pub fn get(&self, name: &str) -> Option<Arc<dyn ElementRenderer>> {
        self.user.get(name).or_else(|| self.builtins.get(name)).cloned()
    }

    /// Whether a renderer exists for the type
    pub fn contains(&self, name: &str) -> bool {
        self.user.contains_key(name) || self.builtins.contains_key(name)
    }

    /// The renderer used for unknown types
    pub fn default_renderer(&self) -> Arc<dyn ElementRenderer> {
        let fallback = || -> Arc<dyn ElementRenderer> { Arc::new(BuiltinRenderer { name: "default" }) };
        self.get("default").unwrap_or_else(fallback)
    }

    /// Resolve a type to its renderer.
    ///
    /// Unknown types fail with `NODE_TYPE_MISSING`/`EDGE_TYPE_MISSING`; the
    /// caller falls back to [`TypeRegistry::default_renderer`].
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ElementRenderer>, FlowError> {
        self.get(name).ok_or_else(|| match self.kind {
            ElementKind::Node => FlowError::NodeTypeMissing(name.to_string()),
            ElementKind::Edge => FlowError::EdgeTypeMissing(name.to_string()),
        })
    }

    /// Full type map: built-ins, user registrations, then the unregistered
    /// type strings found on elements as identity entries
    pub fn types_with<'a>(&self, used: impl IntoIterator<Item = &'a str>) -> IndexMap<String, TypeEntry> {
        let mut types: IndexMap<String, TypeEntry> = self
            .builtins
            .iter()
            .chain(self.user.iter())
            .map(|(name, renderer)| (name.clone(), TypeEntry::Registered(renderer.clone())))
            .collect();
        for name in used {
            if !types.contains_key(name) {
                types.insert(name.to_string(), TypeEntry::AdHoc(name.to_string()));
            }
        }
        types
    }
}
