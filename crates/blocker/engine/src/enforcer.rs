//! Enforcement dispatch.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::debounce::Debouncer;
use crate::sample::{BlockKind, SampleEvent, SourceKind};

/// The surface that tells the user something was blocked.
///
/// Called on the blocking pool, one trigger at a time, so implementations may run
/// processes or other blocking calls. They report their own failures; a panic is caught
/// and logged by the enforcer.
pub trait EnforcementSink: Send + Sync {
    fn on_enforcement_triggered(&self, kind: BlockKind, identifier: &str);
}

/// Consumes samples from both samplers and fires the sink at most once per qualifying
/// event. Each source kind has its own cooldown, so an app block never suppresses a
/// website block or the other way around.
pub struct Enforcer {
    process: Debouncer,
    content: Debouncer,
    sink: Arc<dyn EnforcementSink>,
}

impl Enforcer {
    pub fn new(
        sink: Arc<dyn EnforcementSink>,
        process_cooldown: Duration,
        content_cooldown: Duration,
    ) -> Self {
        Self {
            process: Debouncer::new(process_cooldown),
            content: Debouncer::new(content_cooldown),
            sink,
        }
    }

    fn debouncer(&self, source: SourceKind) -> &Debouncer {
        match source {
            SourceKind::Process => &self.process,
            SourceKind::Content => &self.content,
        }
    }

    /// Handle one sample. Returns whether the sink was fired.
    pub fn handle(&self, sample: &SampleEvent) -> bool {
        if !self
            .debouncer(sample.source)
            .should_fire(&sample.target, sample.timestamp_ms)
        {
            tracing::debug!(source = ?sample.source, target = %sample.target, "enforcement suppressed");
            return false;
        }

        let kind = BlockKind::from(sample.source);
        tracing::info!(%kind, identifier = %sample.target, "enforcement triggered");

        let sink = &self.sink;
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            sink.on_enforcement_triggered(kind, &sample.target);
        }));
        if result.is_err() {
            tracing::error!(%kind, identifier = %sample.target, "enforcement sink panicked");
        }

        true
    }

    /// Drain samples until `cancel` fires or every sender is gone.
    pub async fn run(
        self: Arc<Self>,
        mut rx: mpsc::UnboundedReceiver<SampleEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                sample = rx.recv() => match sample {
                    Some(sample) => {
                        let enforcer = Arc::clone(&self);
                        let dispatch =
                            tokio::task::spawn_blocking(move || enforcer.handle(&sample));
                        if let Err(e) = dispatch.await {
                            tracing::error!(error = %e, "enforcement dispatch failed");
                        }
                    }
                    None => break,
                },
            }
        }

        tracing::debug!("enforcer stopped");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink that records every trigger.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) triggers: Mutex<Vec<(BlockKind, String)>>,
    }

    impl RecordingSink {
        pub(crate) fn triggers(&self) -> Vec<(BlockKind, String)> {
            self.triggers.lock().unwrap().clone()
        }
    }

    impl EnforcementSink for RecordingSink {
        fn on_enforcement_triggered(&self, kind: BlockKind, identifier: &str) {
            self.triggers
                .lock()
                .unwrap()
                .push((kind, identifier.to_string()));
        }
    }

    struct PanickingSink;

    impl EnforcementSink for PanickingSink {
        fn on_enforcement_triggered(&self, _kind: BlockKind, _identifier: &str) {
            panic!("notice surface crashed");
        }
    }

    /// Sink that blocks its caller until released, or gives up after a timeout.
    struct GatedSink {
        release: Mutex<std::sync::mpsc::Receiver<()>>,
        outcomes: Mutex<Vec<bool>>,
    }

    impl EnforcementSink for GatedSink {
        fn on_enforcement_triggered(&self, _kind: BlockKind, _identifier: &str) {
            let released = self
                .release
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(2))
                .is_ok();
            self.outcomes.lock().unwrap().push(released);
        }
    }

    fn enforcer(sink: Arc<dyn EnforcementSink>) -> Enforcer {
        Enforcer::new(sink, Duration::from_millis(2000), Duration::from_millis(3000))
    }

    #[test]
    fn test_sources_do_not_share_cooldown() {
        let sink = Arc::new(RecordingSink::default());
        let enforcer = enforcer(sink.clone());

        assert!(enforcer.handle(&SampleEvent::new(SourceKind::Process, "com.example.game", 1_000)));
        assert!(enforcer.handle(&SampleEvent::new(SourceKind::Content, "example.com", 1_001)));
        assert!(!enforcer.handle(&SampleEvent::new(SourceKind::Process, "com.example.game", 1_500)));
        assert!(!enforcer.handle(&SampleEvent::new(SourceKind::Content, "example.com", 3_000)));
        assert!(enforcer.handle(&SampleEvent::new(SourceKind::Content, "example.com", 4_002)));

        assert_eq!(
            sink.triggers(),
            vec![
                (BlockKind::App, "com.example.game".to_string()),
                (BlockKind::Website, "example.com".to_string()),
                (BlockKind::Website, "example.com".to_string()),
            ]
        );
    }

    #[test]
    fn test_sink_panic_is_contained() {
        let enforcer = enforcer(Arc::new(PanickingSink));

        assert!(enforcer.handle(&SampleEvent::new(SourceKind::Process, "com.example.game", 0)));
        assert!(!enforcer.handle(&SampleEvent::new(SourceKind::Process, "com.example.game", 10)));
    }

    #[tokio::test]
    async fn test_run_drains_until_senders_gone() {
        let sink = Arc::new(RecordingSink::default());
        let enforcer = Arc::new(enforcer(sink.clone()));
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(SampleEvent::new(SourceKind::Content, "a.com", 0)).unwrap();
        tx.send(SampleEvent::new(SourceKind::Content, "a.com", 1)).unwrap();
        tx.send(SampleEvent::new(SourceKind::Content, "b.com", 2)).unwrap();
        drop(tx);

        enforcer.run(rx, CancellationToken::new()).await;

        assert_eq!(
            sink.triggers(),
            vec![
                (BlockKind::Website, "a.com".to_string()),
                (BlockKind::Website, "b.com".to_string()),
            ]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_blocking_sink_does_not_stall_runtime() {
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let sink = Arc::new(GatedSink {
            release: Mutex::new(release_rx),
            outcomes: Mutex::new(Vec::new()),
        });
        let enforcer = Arc::new(enforcer(sink.clone()));
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(enforcer.run(rx, CancellationToken::new()));
        tx.send(SampleEvent::new(SourceKind::Process, "com.example.game", 0))
            .unwrap();

        // The only runtime thread must stay free while the sink blocks.
        tokio::time::sleep(Duration::from_millis(50)).await;
        release_tx.send(()).unwrap();

        drop(tx);
        task.await.unwrap();
        assert_eq!(*sink.outcomes.lock().unwrap(), vec![true]);
    }
}
