//! In-memory storage, for tests and for running without a database.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use crate::traits::SetStore;

/// Process-local storage. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    sets: Mutex<HashMap<(String, String), BTreeSet<String>>>,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SetStore for MemoryStorage {
    fn load_set(&self, namespace: &str, key: &str) -> color_eyre::eyre::Result<BTreeSet<String>> {
        let sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(sets
            .get(&(namespace.to_string(), key.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn store_set(
        &self,
        namespace: &str,
        key: &str,
        values: &BTreeSet<String>,
    ) -> color_eyre::eyre::Result<()> {
        let mut sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        sets.insert((namespace.to_string(), key.to_string()), values.clone());
        Ok(())
    }

    fn clear_set(&self, namespace: &str, key: &str) -> color_eyre::eyre::Result<()> {
        let mut sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        sets.remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }
}
