//! macOS focus history via lsappinfo.
//!
//! macOS has no queryable focus history, so [`LsAppInfoSource`] builds one: every query
//! samples the frontmost app and records a foreground event when it changed.

use std::collections::VecDeque;
use std::process::Command;
use std::sync::{Mutex, PoisonError};

use blocker_engine::foreground::{FocusEvent, FocusEventKind, FocusEventSource};
use color_eyre::eyre::WrapErr as _;

/// How long recorded focus changes are kept.
const RETENTION_MS: i64 = 60_000;

/// Get the bundle id of the frontmost application.
pub fn frontmost_bundle_id() -> color_eyre::eyre::Result<Option<String>> {
    let output = Command::new("lsappinfo")
        .args(["info", "-only", "bundleid", "-app", "front"])
        .output()
        .wrap_err("failed to run lsappinfo")?;

    if !output.status.success() {
        return Ok(None);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_bundle_id(&stdout))
}

/// Get all PIDs for a bundle ID.
pub fn pids_for_bundle(bundle_id: &str) -> color_eyre::eyre::Result<Vec<i32>> {
    let output = Command::new("lsappinfo")
        .args(["info", "-only", "pid", "-app", bundle_id])
        .output()
        .wrap_err("failed to run lsappinfo")?;

    if !output.status.success() {
        return Ok(Vec::new());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_pids(&stdout))
}

fn parse_bundle_id(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let line = line.trim();
        line.strip_prefix("\"bundleid\"=")
            .or_else(|| line.strip_prefix("\"CFBundleIdentifier\"="))
            .map(|value| value.trim().trim_matches('"').to_string())
            .filter(|value| !value.is_empty() && value != "[ NULL ]")
    })
}

fn parse_pids(output: &str) -> Vec<i32> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("\"pid\"="))
        .filter_map(|pid| pid.trim().parse().ok())
        .collect()
}

/// Focus changes observed so far.
#[derive(Debug, Default)]
struct History {
    events: VecDeque<FocusEvent>,
    front: Option<String>,
}

impl History {
    fn observe(&mut self, front: Option<String>, now_ms: i64) {
        if front != self.front {
            if let Some(bundle_id) = &front {
                tracing::debug!(bundle_id = %bundle_id, "frontmost app changed");
                self.events.push_back(FocusEvent::new(
                    bundle_id.clone(),
                    FocusEventKind::MoveToForeground,
                    now_ms,
                ));
            }
            self.front = front;
        }

        while self
            .events
            .front()
            .is_some_and(|e| e.timestamp_ms < now_ms - RETENTION_MS)
        {
            self.events.pop_front();
        }
    }

    fn window(&self, begin_ms: i64, end_ms: i64) -> Vec<FocusEvent> {
        self.events
            .iter()
            .filter(|e| (begin_ms..=end_ms).contains(&e.timestamp_ms))
            .cloned()
            .collect()
    }
}

/// Focus history source backed by `lsappinfo`.
#[derive(Debug, Default)]
pub struct LsAppInfoSource {
    history: Mutex<History>,
}

impl LsAppInfoSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FocusEventSource for LsAppInfoSource {
    fn is_available(&self) -> bool {
        Command::new("lsappinfo")
            .arg("front")
            .output()
            .is_ok_and(|output| output.status.success())
    }

    fn query_events(&self, begin_ms: i64, end_ms: i64) -> color_eyre::eyre::Result<Vec<FocusEvent>> {
        let front = frontmost_bundle_id()?;

        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.observe(front, end_ms);
        Ok(history.window(begin_ms, end_ms))
    }
}
