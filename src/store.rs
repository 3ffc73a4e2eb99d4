// src/store.rs
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::{debug, info};

use crate::table::NormalizedTable;

/// Session-wide mapping of display name → loaded table.
///
/// Owned by the caller. Writers are serialized by the inner lock, so a batch
/// may share one store across threads; inserting under an existing name
/// replaces the table held there.
#[derive(Debug, Default)]
pub struct TableStore {
    tables: Mutex<BTreeMap<String, Arc<NormalizedTable>>>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Arc<NormalizedTable>>> {
        // every critical section is a single map call, so poison carries no torn state
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite; returns the table previously held under `name`.
    pub fn insert(
        &self,
        name: impl Into<String>,
        table: NormalizedTable,
    ) -> Option<Arc<NormalizedTable>> {
        let name = name.into();
        let rows = table.len();
        let previous = self.lock().insert(name.clone(), Arc::new(table));
        debug!(%name, rows, replaced = previous.is_some(), "stored table");
        previous
    }

    pub fn get(&self, name: &str) -> Option<Arc<NormalizedTable>> {
        self.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<Arc<NormalizedTable>> {
        let removed = self.lock().remove(name);
        if removed.is_some() {
            debug!(%name, "removed table");
        }
        removed
    }

    /// Drop every table.
    pub fn clear(&self) {
        let mut tables = self.lock();
        info!(count = tables.len(), "resetting table store");
        tables.clear();
    }

    /// Names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Point-in-time copy of every entry, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, Arc<NormalizedTable>)> {
        self.lock()
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect()
    }
}
