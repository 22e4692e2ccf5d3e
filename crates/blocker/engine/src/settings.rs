//! Engine tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BlockerError;

/// Timing and traversal limits for the samplers.
///
/// Every field has a default, so a partial `[monitoring]` table deserializes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Delay between foreground-process polls.
    pub poll_interval_ms: u64,
    /// Trailing window of focus events considered on each poll.
    pub query_window_ms: u64,
    /// Cooldown for repeated app blocks of the same target.
    pub process_cooldown_ms: u64,
    /// Cooldown for repeated website blocks of the same target.
    pub content_cooldown_ms: u64,
    /// Deepest UI tree level searched for an address.
    pub max_node_depth: usize,
    /// The monitoring app's own identifier; never blocked.
    pub own_package: String,
}

impl EngineSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn query_window(&self) -> Duration {
        Duration::from_millis(self.query_window_ms)
    }

    pub fn process_cooldown(&self) -> Duration {
        Duration::from_millis(self.process_cooldown_ms)
    }

    pub fn content_cooldown(&self) -> Duration {
        Duration::from_millis(self.content_cooldown_ms)
    }

    /// Reject settings the samplers cannot run with. Every interval, window and
    /// cooldown must be nonzero.
    pub fn validate(&self) -> Result<(), BlockerError> {
        let durations = [
            ("poll_interval_ms", self.poll_interval_ms),
            ("query_window_ms", self.query_window_ms),
            ("process_cooldown_ms", self.process_cooldown_ms),
            ("content_cooldown_ms", self.content_cooldown_ms),
        ];

        match durations.iter().find(|(_, ms)| *ms == 0) {
            Some((name, _)) => Err(BlockerError::Configuration(format!(
                "{name} must be greater than zero"
            ))),
            None => Ok(()),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            query_window_ms: 5000,
            process_cooldown_ms: 2000,
            content_cooldown_ms: 3000,
            max_node_depth: 15,
            own_package: "blocker-daemon".to_string(),
        }
    }
}
