//! Foreground-process sampler.
//!
//! Polls the OS focus history on a fixed interval and reports the most recently focused
//! process when it is on the package blocklist.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::BlockerError;
use crate::sample::{SampleEvent, SourceKind, now_ms};
use crate::store::BlocklistStore;

/// Kind of a focus-history event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEventKind {
    MoveToForeground,
    ActivityResumed,
    MoveToBackground,
    ActivityPaused,
    Other(i32),
}

impl FocusEventKind {
    pub fn is_foreground_transition(self) -> bool {
        matches!(self, Self::MoveToForeground | Self::ActivityResumed)
    }
}

/// One entry of the OS focus history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusEvent {
    pub package: Option<String>,
    pub kind: FocusEventKind,
    pub timestamp_ms: i64,
}

impl FocusEvent {
    pub fn new(package: impl Into<String>, kind: FocusEventKind, timestamp_ms: i64) -> Self {
        Self {
            package: Some(package.into()),
            kind,
            timestamp_ms,
        }
    }
}

/// OS focus history.
pub trait FocusEventSource: Send + Sync {
    /// Whether the service backing this source exists at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Events with timestamps in `begin_ms..=end_ms`, in chronological order.
    fn query_events(&self, begin_ms: i64, end_ms: i64) -> color_eyre::eyre::Result<Vec<FocusEvent>>;
}

/// The package of the latest foreground transition.
///
/// Events are scanned in order; on equal timestamps the later event wins.
pub fn most_recent_foreground(events: &[FocusEvent]) -> Option<&str> {
    let mut winner: Option<(&str, i64)> = None;

    for event in events {
        let Some(package) = event.package.as_deref() else {
            continue;
        };
        if !event.kind.is_foreground_transition() {
            continue;
        }
        if winner.is_none_or(|(_, ts)| event.timestamp_ms >= ts) {
            winner = Some((package, event.timestamp_ms));
        }
    }

    winner.map(|(package, _)| package)
}

pub struct ForegroundSampler {
    source: Arc<dyn FocusEventSource>,
    store: Arc<BlocklistStore>,
    own_package: String,
    query_window_ms: i64,
}

impl ForegroundSampler {
    pub fn new(
        source: Arc<dyn FocusEventSource>,
        store: Arc<BlocklistStore>,
        own_package: impl Into<String>,
        query_window: Duration,
    ) -> Self {
        Self {
            source,
            store,
            own_package: own_package.into(),
            query_window_ms: i64::try_from(query_window.as_millis()).unwrap_or(i64::MAX),
        }
    }

    pub fn is_available(&self) -> bool {
        self.source.is_available()
    }

    /// Run one poll cycle ending at `now_ms`.
    ///
    /// Returns a sample when the most recently focused process is blocked. Query
    /// failures are logged and yield nothing.
    pub fn sample_once(&self, now_ms: i64) -> Option<SampleEvent> {
        let begin_ms = now_ms.saturating_sub(self.query_window_ms);

        let events = match self.source.query_events(begin_ms, now_ms) {
            Ok(events) => events,
            Err(e) => {
                let e = BlockerError::QuerySourceUnavailable(e);
                tracing::warn!(error = %e, "failed to query focus events");
                return None;
            }
        };

        let package = most_recent_foreground(&events)?;
        if package == self.own_package {
            return None;
        }

        if !self.store.list_packages().contains(package) {
            return None;
        }

        tracing::info!(package, "blocked app in foreground");
        Some(SampleEvent::new(SourceKind::Process, package, now_ms))
    }

    /// Poll until `cancel` fires, publishing blocked samples to `tx`.
    ///
    /// Each cycle runs on the blocking pool; a failed or panicking cycle is logged and the
    /// next one is still scheduled.
    pub async fn run(
        self: Arc<Self>,
        interval: Duration,
        tx: mpsc::UnboundedSender<SampleEvent>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(interval_ms = interval.as_millis() as u64, "foreground sampler started");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let sampler = Arc::clone(&self);
            let cycle = tokio::task::spawn_blocking(move || sampler.sample_once(now_ms()));

            match cycle.await {
                Ok(Some(sample)) => {
                    if cancel.is_cancelled() || tx.send(sample).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::error!(error = %e, "foreground poll cycle panicked"),
            }
        }

        tracing::debug!("foreground sampler stopped");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use blocker_storage::MemoryStorage;
    use std::sync::Mutex;

    const GAME: &str = "com.example.game";

    /// Focus source that replays a fixed history.
    #[derive(Default)]
    pub(crate) struct FakeFocus {
        pub(crate) events: Mutex<Vec<FocusEvent>>,
        pub(crate) fail: std::sync::atomic::AtomicBool,
    }

    impl FocusEventSource for FakeFocus {
        fn query_events(
            &self,
            begin_ms: i64,
            end_ms: i64,
        ) -> color_eyre::eyre::Result<Vec<FocusEvent>> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                color_eyre::eyre::bail!("usage stats denied");
            }
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| (begin_ms..=end_ms).contains(&e.timestamp_ms))
                .cloned()
                .collect())
        }
    }

    fn fg(package: &str, ts: i64) -> FocusEvent {
        FocusEvent::new(package, FocusEventKind::MoveToForeground, ts)
    }

    fn sampler(events: Vec<FocusEvent>, blocked: &[&str]) -> (ForegroundSampler, Arc<FakeFocus>) {
        let store = BlocklistStore::new(Arc::new(MemoryStorage::new()));
        for package in blocked {
            store.add_package(package);
        }
        let source = Arc::new(FakeFocus {
            events: Mutex::new(events),
            ..Default::default()
        });
        let sampler = ForegroundSampler::new(
            source.clone(),
            Arc::new(store),
            "com.blocker.self",
            Duration::from_millis(5000),
        );
        (sampler, source)
    }

    #[test]
    fn test_winner_is_latest_timestamp() {
        let events = vec![fg("A", 10), fg("B", 30), fg("A", 20)];
        assert_eq!(most_recent_foreground(&events), Some("B"));
    }

    #[test]
    fn test_winner_tie_goes_to_later_event() {
        let events = vec![fg("A", 30), fg("B", 30)];
        assert_eq!(most_recent_foreground(&events), Some("B"));
    }

    #[test]
    fn test_winner_ignores_non_foreground_events() {
        let events = vec![
            fg("A", 10),
            FocusEvent::new("B", FocusEventKind::MoveToBackground, 40),
            FocusEvent::new("C", FocusEventKind::Other(23), 50),
            FocusEvent {
                package: None,
                kind: FocusEventKind::ActivityResumed,
                timestamp_ms: 60,
            },
            FocusEvent::new("D", FocusEventKind::ActivityResumed, 20),
        ];
        assert_eq!(most_recent_foreground(&events), Some("D"));
        assert_eq!(most_recent_foreground(&[]), None);
    }

    #[test]
    fn test_blocked_foreground_produces_sample() {
        let (sampler, _) = sampler(vec![fg("com.other", 9_000), fg(GAME, 9_500)], &[GAME]);

        assert_eq!(
            sampler.sample_once(10_000),
            Some(SampleEvent::new(SourceKind::Process, GAME, 10_000))
        );
    }

    #[test]
    fn test_only_the_winner_counts() {
        let (sampler, _) = sampler(vec![fg(GAME, 9_000), fg("com.other", 9_500)], &[GAME]);
        assert_eq!(sampler.sample_once(10_000), None);
    }

    #[test]
    fn test_events_outside_window_ignored() {
        let (sampler, _) = sampler(vec![fg(GAME, 4_000)], &[GAME]);
        assert_eq!(sampler.sample_once(10_000), None);
    }

    #[test]
    fn test_own_package_never_blocked() {
        let (sampler, _) = sampler(vec![fg("com.blocker.self", 9_000)], &["com.blocker.self"]);
        assert_eq!(sampler.sample_once(10_000), None);
    }

    #[test]
    fn test_query_failure_is_a_no_op() {
        let (sampler, source) = sampler(vec![fg(GAME, 9_000)], &[GAME]);

        source.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(sampler.sample_once(10_000), None);

        source.fail.store(false, std::sync::atomic::Ordering::SeqCst);
        assert!(sampler.sample_once(10_000).is_some());
    }

    #[test]
    fn test_blocklist_read_fresh_each_cycle() {
        let (sampler, _) = sampler(vec![fg(GAME, 9_000)], &[]);
        assert_eq!(sampler.sample_once(10_000), None);

        sampler.store.add_package(GAME);
        assert!(sampler.sample_once(10_000).is_some());

        sampler.store.remove_package(GAME);
        assert_eq!(sampler.sample_once(10_000), None);
    }
}
