//! Storage traits.

use std::collections::BTreeSet;

/// Durable storage of named string sets, grouped under a namespace.
///
/// Implementations must make `store_set` and `clear_set` all-or-nothing: when they
/// return an error, the previously stored set is still intact.
pub trait SetStore: Send + Sync {
    /// Load the set stored under `namespace`/`key`. A missing set is empty.
    fn load_set(&self, namespace: &str, key: &str) -> color_eyre::eyre::Result<BTreeSet<String>>;

    /// Replace the whole set stored under `namespace`/`key`.
    fn store_set(
        &self,
        namespace: &str,
        key: &str,
        values: &BTreeSet<String>,
    ) -> color_eyre::eyre::Result<()>;

    /// Remove every member of the set stored under `namespace`/`key`.
    fn clear_set(&self, namespace: &str, key: &str) -> color_eyre::eyre::Result<()>;
}
