//! Enforcement cooldown.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Last trigger remembered by a [`Debouncer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownState {
    pub last_trigger_ms: i64,
    pub last_target: String,
}

/// Observable state of a [`Debouncer`] at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    /// Nothing fired yet, or the cooldown has lapsed.
    Idle,
    /// A trigger fired within the cooldown window.
    Cooling,
}

/// Suppresses repeat triggers for the same target within a cooldown window.
///
/// A different target always fires. The decision and the state update happen under one
/// lock, so two concurrent calls for the same instant cannot both fire.
#[derive(Debug)]
pub struct Debouncer {
    cooldown_ms: i64,
    state: Mutex<Option<CooldownState>>,
}

impl Debouncer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown_ms: i64::try_from(cooldown.as_millis()).unwrap_or(i64::MAX),
            state: Mutex::new(None),
        }
    }

    /// Decide whether a match for `target` at `now_ms` should fire, recording it if so.
    pub fn should_fire(&self, target: &str, now_ms: i64) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let fire = match state.as_ref() {
            None => true,
            Some(last) => {
                now_ms.saturating_sub(last.last_trigger_ms) > self.cooldown_ms
                    || last.last_target != target
            }
        };

        if fire {
            *state = Some(CooldownState {
                last_trigger_ms: now_ms,
                last_target: target.to_string(),
            });
        }

        fire
    }

    pub fn state_at(&self, now_ms: i64) -> DebounceState {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.as_ref() {
            Some(last) if now_ms.saturating_sub(last.last_trigger_ms) <= self.cooldown_ms => {
                DebounceState::Cooling
            }
            _ => DebounceState::Idle,
        }
    }

    pub fn last_trigger(&self) -> Option<CooldownState> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const COOLDOWN_MS: i64 = 2000;

    fn debouncer() -> Debouncer {
        Debouncer::new(Duration::from_millis(COOLDOWN_MS as u64))
    }

    #[test]
    fn test_first_match_fires() {
        let d = debouncer();
        assert_eq!(d.state_at(0), DebounceState::Idle);
        assert!(d.should_fire("com.example.game", 1_000));
        assert_eq!(d.state_at(1_000), DebounceState::Cooling);
    }

    #[test]
    fn test_same_target_suppressed_within_cooldown() {
        let d = debouncer();
        let t = 10_000;

        assert!(d.should_fire("T", t));
        assert!(!d.should_fire("T", t + COOLDOWN_MS / 2));
        assert!(!d.should_fire("T", t + COOLDOWN_MS));
        assert!(d.should_fire("T", t + COOLDOWN_MS + 1));
    }

    #[test]
    fn test_suppressed_match_does_not_extend_cooldown() {
        let d = debouncer();

        assert!(d.should_fire("T", 0));
        assert!(!d.should_fire("T", 1_500));
        assert!(d.should_fire("T", COOLDOWN_MS + 1));
    }

    #[test]
    fn test_different_target_fires_immediately() {
        let d = debouncer();
        let t = 10_000;

        assert!(d.should_fire("T", t));
        assert!(d.should_fire("T2", t + 1));
        assert_eq!(d.last_trigger().unwrap().last_target, "T2");
        // Switching back is a target change too.
        assert!(d.should_fire("T", t + 2));
    }

    #[test]
    fn test_state_lapses_to_idle() {
        let d = debouncer();
        assert!(d.should_fire("T", 0));
        assert_eq!(d.state_at(COOLDOWN_MS), DebounceState::Cooling);
        assert_eq!(d.state_at(COOLDOWN_MS + 1), DebounceState::Idle);
    }

    #[test]
    fn test_concurrent_same_instant_fires_once() {
        let d = Arc::new(debouncer());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let d = Arc::clone(&d);
                std::thread::spawn(move || d.should_fire("T", 5_000))
            })
            .collect();

        let fired = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|fired| *fired)
            .count();

        assert_eq!(fired, 1);
    }
}
