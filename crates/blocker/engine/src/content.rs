//! On-screen content sampler.
//!
//! Reads the address shown by a recognized browser out of the accessibility tree and
//! checks it against the website blocklist.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::browsers;
use crate::error::BlockerError;
use crate::normalize::{find_blocked_entry, looks_like_url};
use crate::store::BlocklistStore;

/// Kind of UI notification delivered by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEventKind {
    WindowStateChanged,
    WindowContentChanged,
    Other,
}

/// A UI state change reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiEvent {
    pub package: Option<String>,
    pub kind: UiEventKind,
}

impl UiEvent {
    pub fn new(package: impl Into<String>, kind: UiEventKind) -> Self {
        Self {
            package: Some(package.into()),
            kind,
        }
    }
}

/// A node of the on-screen UI tree.
///
/// Handles are OS-owned resources: implementations must release the underlying handle
/// when the value is dropped. The sampler never keeps a handle past the call that
/// obtained it, on success and on error alike.
pub trait UiNode {
    fn text(&self) -> color_eyre::eyre::Result<Option<String>>;

    fn child_count(&self) -> color_eyre::eyre::Result<usize>;

    /// Child at `index`, or `None` if it vanished since `child_count` was read.
    fn child(&self, index: usize) -> color_eyre::eyre::Result<Option<NodeHandle>>;

    /// Descendants carrying the given element id.
    fn find_by_view_id(&self, view_id: &str) -> color_eyre::eyre::Result<Vec<NodeHandle>>;
}

pub type NodeHandle = Box<dyn UiNode>;

/// Access to the UI tree of the active window.
pub trait UiTreeSource: Send + Sync {
    fn active_window_root(&self) -> color_eyre::eyre::Result<Option<NodeHandle>>;
}

/// Result of handling one UI notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentOutcome {
    /// Monitoring is stopped.
    Inactive,
    /// Another notification was still being processed; this one was dropped.
    Busy,
    /// Not a recognized browser or not a sampled notification kind.
    Ignored,
    NoWindow,
    NoAddress,
    /// An address was found and it is not blocked.
    Allowed,
    /// The address matched this blocklist entry.
    Blocked(String),
    /// Reading the tree failed; the cycle was abandoned.
    Failed,
}

/// Clears the processing flag when dropped, on every exit path.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl<'a> ProcessingGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ContentSampler {
    tree: Arc<dyn UiTreeSource>,
    store: Arc<BlocklistStore>,
    max_depth: usize,
    processing: AtomicBool,
}

impl ContentSampler {
    pub fn new(tree: Arc<dyn UiTreeSource>, store: Arc<BlocklistStore>, max_depth: usize) -> Self {
        Self {
            tree,
            store,
            max_depth,
            processing: AtomicBool::new(false),
        }
    }

    /// Handle one UI notification.
    ///
    /// Never waits: if a previous notification is still in progress this one is dropped.
    pub fn handle_event(&self, event: &UiEvent) -> ContentOutcome {
        let Some(_guard) = ProcessingGuard::try_acquire(&self.processing) else {
            tracing::trace!("content sampler busy, dropping notification");
            return ContentOutcome::Busy;
        };

        let package = match (event.package.as_deref(), event.kind) {
            (Some(package), UiEventKind::WindowStateChanged | UiEventKind::WindowContentChanged)
                if browsers::is_browser(package) =>
            {
                package
            }
            _ => return ContentOutcome::Ignored,
        };

        match self.inspect(package) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(package, error = %e, "content sample failed");
                ContentOutcome::Failed
            }
        }
    }

    fn inspect(&self, package: &str) -> Result<ContentOutcome, BlockerError> {
        let root = self
            .tree
            .active_window_root()
            .map_err(BlockerError::QuerySourceUnavailable)?;

        let Some(root) = root else {
            return Ok(ContentOutcome::NoWindow);
        };

        let address =
            extract_address(root.as_ref(), package, self.max_depth).map_err(BlockerError::Traversal)?;
        drop(root);

        let Some(address) = address else {
            tracing::debug!(package, "no address found");
            return Ok(ContentOutcome::NoAddress);
        };

        let blocked = self.store.list_websites();
        match find_blocked_entry(&address, &blocked) {
            Some(entry) => {
                tracing::info!(package, address = %address, entry, "blocked website on screen");
                Ok(ContentOutcome::Blocked(entry.to_string()))
            }
            None => Ok(ContentOutcome::Allowed),
        }
    }
}

/// Recover the displayed address: known address-bar ids first, then a bounded search.
fn extract_address(
    root: &dyn UiNode,
    package: &str,
    max_depth: usize,
) -> color_eyre::eyre::Result<Option<String>> {
    for view_id in browsers::address_bar_ids(package) {
        match first_text_by_id(root, &view_id) {
            Ok(Some(text)) => return Ok(Some(text)),
            Ok(None) => {}
            Err(e) => tracing::debug!(view_id, error = %e, "address bar lookup failed"),
        }
    }

    find_url_in_tree(root, 0, max_depth)
}

fn first_text_by_id(root: &dyn UiNode, view_id: &str) -> color_eyre::eyre::Result<Option<String>> {
    let nodes = root.find_by_view_id(view_id)?;
    let text = match nodes.first() {
        Some(node) => node.text()?,
        None => None,
    };
    Ok(text.filter(|t| !t.is_empty()))
}

/// Pre-order, left-to-right search for text that looks like an address.
fn find_url_in_tree(
    node: &dyn UiNode,
    depth: usize,
    max_depth: usize,
) -> color_eyre::eyre::Result<Option<String>> {
    if depth > max_depth {
        return Ok(None);
    }

    if let Some(text) = node.text()? {
        if looks_like_url(&text) {
            return Ok(Some(text));
        }
    }

    for index in 0..node.child_count()? {
        let Some(child) = node.child(index)? else {
            continue;
        };
        if let Some(found) = find_url_in_tree(child.as_ref(), depth + 1, max_depth)? {
            return Ok(Some(found));
        }
    }

    Ok(None)
}
