// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of live flow stores, keyed by store id.
//!
//! Hosts that render several flows keep one registry and look stores up by
//! id. Removing a store tears it down so pending waiters are released.

use crate::store::{FlowOptions, FlowStore};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// A store shared between the host and its views
pub type SharedFlowStore = Arc<Mutex<FlowStore>>;

/// Live flow stores by id
#[derive(Debug, Default)]
pub struct FlowRegistry {
    stores: RwLock<HashMap<String, SharedFlowStore>>,
}

impl FlowRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a store
    pub fn get(&self, id: &str) -> Option<SharedFlowStore> {
        self.stores.read().get(id).cloned()
    }

    /// Look up a store, creating it from `options` when absent.
    ///
    /// Without an id a fresh store with a random id is created. Options are
    /// only applied to newly created stores.
    pub fn get_or_create(&self, id: Option<&str>, options: FlowOptions) -> SharedFlowStore {
        if let Some(existing) = id.and_then(|id| self.get(id)) {
            return existing;
        }

        let mut stores = self.stores.write();
        // another caller may have created it between the two locks
        if let Some(existing) = id.and_then(|id| stores.get(id)) {
            return existing.clone();
        }
        let mut store = match id {
            Some(id) => FlowStore::with_id(id),
            None => FlowStore::new(),
        };
        store.set_state(options);
        tracing::debug!(store = %store.id(), "Created flow store");

        let shared = Arc::new(Mutex::new(store));
        let key = shared.lock().id().to_string();
        stores.insert(key, shared.clone());
        shared
    }

    /// Register a store under its own id, returning the one it replaced
    pub fn insert(&self, store: FlowStore) -> Option<SharedFlowStore> {
        let id = store.id().to_string();
        self.stores.write().insert(id, Arc::new(Mutex::new(store)))
    }

    /// Unregister a store and tear it down
    pub fn remove(&self, id: &str) -> Option<SharedFlowStore> {
        let removed = self.stores.write().remove(id)?;
        removed.lock().teardown();
        Some(removed)
    }

    /// Ids of every registered store
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.stores.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered stores
    pub fn len(&self) -> usize {
        self.stores.read().len()
    }

    /// Whether no store is registered
    pub fn is_empty(&self) -> bool {
        self.stores.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::NodeInput;
    use crate::geometry::XYPosition;

    #[test]
    fn test_get_or_create_reuses() {
        let registry = FlowRegistry::new();
        let first = registry.get_or_create(
            Some("main"),
            FlowOptions {
                nodes: Some(vec![NodeInput::new("a", XYPosition::ZERO)]),
                ..Default::default()
            },
        );
        let second = registry.get_or_create(Some("main"), FlowOptions::default());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.lock().nodes().len(), 1);

        let anonymous = registry.get_or_create(None, FlowOptions::default());
        assert_eq!(registry.len(), 2);
        assert!(registry.get(anonymous.lock().id()).is_some());
    }

    #[test]
    fn test_remove_tears_down() {
        let registry = FlowRegistry::new();
        registry.insert(FlowStore::with_id("b"));
        registry.insert(FlowStore::with_id("a"));
        assert_eq!(registry.ids(), vec!["a", "b"]);

        let removed = registry.remove("a").unwrap();
        assert!(removed.lock().is_torn_down());
        assert!(registry.remove("a").is_none());
        assert_eq!(registry.ids(), vec!["b"]);
        assert!(!registry.is_empty());
    }
}
