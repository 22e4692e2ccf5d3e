//! Thread-safe blocklist of packages and websites.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use blocker_storage::SetStore;

use crate::error::BlockerError;
use crate::normalize::normalize_website;

/// Namespace both blocklists live under in durable storage.
pub const NAMESPACE: &str = "blocker_prefs";
/// Key of the blocked package set.
pub const PACKAGES_KEY: &str = "blocked_packages";
/// Key of the blocked website set.
pub const WEBSITES_KEY: &str = "blocked_websites";

/// Blocked packages and websites, backed by durable storage.
///
/// Every operation reads the current set from storage, so edits made through another
/// handle on the same storage are seen on the next call. Mutations hold one lock for the
/// whole read-modify-write and rewrite the set in one step; a storage failure is logged
/// and reported as `false` (or an empty set) with storage left as it was.
///
/// Website entries are always normalized on insert. Package ids are stored trimmed and
/// otherwise verbatim.
pub struct BlocklistStore {
    storage: Arc<dyn SetStore>,
    lock: Mutex<()>,
}

impl BlocklistStore {
    pub fn new(storage: Arc<dyn SetStore>) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    /// Block a package. Returns whether it was newly added.
    pub fn add_package(&self, id: &str) -> bool {
        let id = id.trim();
        if id.is_empty() {
            tracing::warn!("refusing to add empty package id");
            return false;
        }

        let result = self.insert(PACKAGES_KEY, id);
        log_mutation("add", "package", id, result)
    }

    /// Unblock a package by exact id. Returns whether it was present.
    pub fn remove_package(&self, id: &str) -> bool {
        let result = self.remove(PACKAGES_KEY, id);
        log_mutation("remove", "package", id, result)
    }

    /// Snapshot of the blocked packages.
    pub fn list_packages(&self) -> BTreeSet<String> {
        self.snapshot(PACKAGES_KEY)
    }

    pub fn clear_packages(&self) -> bool {
        self.clear(PACKAGES_KEY)
    }

    /// Block a website, stored in normalized form. Returns whether it was newly added.
    ///
    /// Input that normalizes to nothing (e.g. `"https://"`) is rejected without touching
    /// storage.
    pub fn add_website(&self, raw: &str) -> bool {
        let normalized = normalize_website(raw.trim());
        if normalized.is_empty() {
            tracing::warn!(raw = %raw, "website normalizes to an empty entry");
            return false;
        }

        let result = self.insert(WEBSITES_KEY, &normalized);
        log_mutation("add", "website", &normalized, result)
    }

    /// Unblock a website.
    ///
    /// `entry` is matched exactly and is not normalized: pass the stored value as returned
    /// by [`list_websites`](Self::list_websites).
    pub fn remove_website(&self, entry: &str) -> bool {
        let result = self.remove(WEBSITES_KEY, entry);
        log_mutation("remove", "website", entry, result)
    }

    /// Snapshot of the blocked websites, all normalized.
    pub fn list_websites(&self) -> BTreeSet<String> {
        self.snapshot(WEBSITES_KEY)
    }

    pub fn clear_websites(&self) -> bool {
        self.clear(WEBSITES_KEY)
    }

    fn insert(&self, key: &str, value: &str) -> Result<bool, BlockerError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut set = self.load(key)?;
        if !set.insert(value.to_string()) {
            return Ok(false);
        }

        self.storage
            .store_set(NAMESPACE, key, &set)
            .map_err(BlockerError::Storage)?;
        Ok(true)
    }

    fn remove(&self, key: &str, value: &str) -> Result<bool, BlockerError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut set = self.load(key)?;
        if !set.remove(value) {
            return Ok(false);
        }

        self.storage
            .store_set(NAMESPACE, key, &set)
            .map_err(BlockerError::Storage)?;
        Ok(true)
    }

    fn snapshot(&self, key: &str) -> BTreeSet<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        self.load(key).unwrap_or_else(|e| {
            tracing::error!(key, error = %e, "failed to read blocklist");
            BTreeSet::new()
        })
    }

    fn clear(&self, key: &str) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        match self.storage.clear_set(NAMESPACE, key) {
            Ok(()) => {
                tracing::info!(key, "cleared blocklist");
                true
            }
            Err(e) => {
                tracing::error!(key, error = %e, "failed to clear blocklist");
                false
            }
        }
    }

    fn load(&self, key: &str) -> Result<BTreeSet<String>, BlockerError> {
        self.storage
            .load_set(NAMESPACE, key)
            .map_err(BlockerError::Storage)
    }
}

fn log_mutation(op: &str, kind: &str, value: &str, result: Result<bool, BlockerError>) -> bool {
    match result {
        Ok(changed) => {
            tracing::debug!(op, kind, value, changed, "blocklist mutation");
            changed
        }
        Err(e) => {
            tracing::error!(op, kind, value, error = %e, "blocklist mutation failed");
            false
        }
    }
}
