//! Samples flowing from the samplers to the enforcer.

use serde::{Deserialize, Serialize};

/// Which sampler produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Foreground-process polling.
    Process,
    /// On-screen content inspection.
    Content,
}

/// What kind of target an enforcement notice is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    App,
    Website,
}

impl From<SourceKind> for BlockKind {
    fn from(source: SourceKind) -> Self {
        match source {
            SourceKind::Process => Self::App,
            SourceKind::Content => Self::Website,
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::App => f.write_str("app"),
            Self::Website => f.write_str("website"),
        }
    }
}

/// A blocked target seen by one of the samplers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleEvent {
    pub source: SourceKind,
    /// Package id for process samples, matched blocklist entry for content samples.
    pub target: String,
    pub timestamp_ms: i64,
}

impl SampleEvent {
    pub fn new(source: SourceKind, target: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            source,
            target: target.into(),
            timestamp_ms,
        }
    }
}

/// Wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
