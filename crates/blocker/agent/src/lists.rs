//! Blocklist edits as the CLI performs them.

use blocker_engine::BlocklistStore;
use blocker_engine::normalize::normalize_website;

/// Which blocklist an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum List {
    Apps,
    Sites,
}

/// Result of adding one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Stored under this (normalized) value.
    Added(String),
    AlreadyBlocked(String),
    /// Nothing is left once the input is trimmed and normalized.
    Empty,
    /// Storage refused the write.
    Failed,
}

/// The value `entry` is stored as in `list`.
pub fn stored_form(list: List, entry: &str) -> String {
    match list {
        List::Apps => entry.trim().to_string(),
        List::Sites => normalize_website(entry.trim()),
    }
}

pub fn add_entry(store: &BlocklistStore, list: List, entry: &str) -> AddOutcome {
    let stored = stored_form(list, entry);
    if stored.is_empty() {
        return AddOutcome::Empty;
    }

    let added = match list {
        List::Apps => store.add_package(entry),
        List::Sites => store.add_website(entry),
    };
    if added {
        return AddOutcome::Added(stored);
    }

    // `false` covers both a duplicate and a failed write.
    if entries(store, list).contains(&stored) {
        AddOutcome::AlreadyBlocked(stored)
    } else {
        AddOutcome::Failed
    }
}

pub fn entries(store: &BlocklistStore, list: List) -> std::collections::BTreeSet<String> {
    match list {
        List::Apps => store.list_packages(),
        List::Sites => store.list_websites(),
    }
}
