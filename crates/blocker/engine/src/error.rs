//! Failure taxonomy.
//!
//! None of these escape as a crash: storage, query and traversal failures are logged and
//! turned into a no-op, and only a configuration failure is reported to the caller of
//! [`Engine::start_monitoring`](crate::Engine::start_monitoring).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlockerError {
    /// Durable read or write failed. In-memory state is unchanged.
    #[error("storage failure: {0:#}")]
    Storage(color_eyre::eyre::Report),

    /// An OS introspection API is absent or denied access for this cycle.
    #[error("query source unavailable: {0:#}")]
    QuerySourceUnavailable(color_eyre::eyre::Report),

    /// The UI tree was malformed or could not be read.
    #[error("ui tree traversal failed: {0:#}")]
    Traversal(color_eyre::eyre::Report),

    /// A service required at startup is missing.
    #[error("configuration error: {0}")]
    Configuration(String),
}
