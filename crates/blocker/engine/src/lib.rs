//! Blocker Engine
//!
//! Detects blocked apps and websites in front of the user and fires one enforcement
//! notice per qualifying event.

pub mod browsers;
pub mod content;
pub mod debounce;
pub mod enforcer;
pub mod engine;
pub mod error;
pub mod foreground;
pub mod normalize;
pub mod sample;
pub mod settings;
pub mod store;

pub use engine::Engine;
pub use enforcer::EnforcementSink;
pub use error::BlockerError;
pub use sample::{BlockKind, SampleEvent, SourceKind};
pub use settings::EngineSettings;
pub use store::BlocklistStore;
