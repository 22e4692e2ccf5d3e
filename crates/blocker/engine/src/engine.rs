//! Monitoring lifecycle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::content::{ContentOutcome, ContentSampler, UiEvent, UiTreeSource};
use crate::enforcer::{EnforcementSink, Enforcer};
use crate::error::BlockerError;
use crate::foreground::{FocusEventSource, ForegroundSampler};
use crate::sample::{SampleEvent, SourceKind, now_ms};
use crate::settings::EngineSettings;
use crate::store::BlocklistStore;

struct Running {
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<SampleEvent>,
    tasks: Vec<JoinHandle<()>>,
}

/// Wires the samplers, the enforcer and the blocklist together.
///
/// Both samplers publish into one enforcer task. Cooldowns live in the enforcer and
/// survive stop/start; only a new `Engine` resets them.
pub struct Engine {
    settings: EngineSettings,
    store: Arc<BlocklistStore>,
    foreground: Arc<ForegroundSampler>,
    content: Option<ContentSampler>,
    enforcer: Arc<Enforcer>,
    running: Mutex<Option<Running>>,
}

impl Engine {
    pub fn new(
        settings: EngineSettings,
        store: Arc<BlocklistStore>,
        focus: Arc<dyn FocusEventSource>,
        sink: Arc<dyn EnforcementSink>,
    ) -> Self {
        let foreground = ForegroundSampler::new(
            focus,
            Arc::clone(&store),
            settings.own_package.clone(),
            settings.query_window(),
        );
        let enforcer = Enforcer::new(
            sink,
            settings.process_cooldown(),
            settings.content_cooldown(),
        );

        Self {
            settings,
            store,
            foreground: Arc::new(foreground),
            content: None,
            enforcer: Arc::new(enforcer),
            running: Mutex::new(None),
        }
    }

    /// Enable website blocking through the given UI tree.
    pub fn with_ui_tree(mut self, tree: Arc<dyn UiTreeSource>) -> Self {
        self.content = Some(ContentSampler::new(
            tree,
            Arc::clone(&self.store),
            self.settings.max_node_depth,
        ));
        self
    }

    pub fn store(&self) -> &Arc<BlocklistStore> {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_monitoring_active(&self) -> bool {
        self.running().is_some()
    }

    /// Start polling and accepting UI notifications.
    ///
    /// Must be called from within a tokio runtime. Starting an engine that is already
    /// running is a no-op. Fails with [`BlockerError::Configuration`] when the focus
    /// history service is missing or a tunable is zero, in which case nothing is started.
    pub fn start_monitoring(&self) -> Result<(), BlockerError> {
        let mut running = self.running();
        if running.is_some() {
            tracing::debug!("monitoring already active");
            return Ok(());
        }

        self.settings.validate()?;

        if !self.foreground.is_available() {
            return Err(BlockerError::Configuration(
                "focus history service is unavailable".to_string(),
            ));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| BlockerError::Configuration(format!("no async runtime: {e}")))?;

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let tasks = vec![
            runtime.spawn(Arc::clone(&self.enforcer).run(rx, cancel.clone())),
            runtime.spawn(Arc::clone(&self.foreground).run(
                self.settings.poll_interval(),
                tx.clone(),
                cancel.clone(),
            )),
        ];

        *running = Some(Running { cancel, tx, tasks });

        tracing::info!(
            poll_interval_ms = self.settings.poll_interval_ms,
            websites = self.content.is_some(),
            "monitoring started"
        );
        Ok(())
    }

    /// Stop monitoring. Safe to call repeatedly and from any thread.
    pub fn stop_monitoring(&self) {
        if self.take_running().is_some() {
            tracing::info!("monitoring stopped");
        }
    }

    /// Stop monitoring and wait for the background tasks to finish.
    pub async fn shutdown(&self) {
        let Some(running) = self.take_running() else {
            return;
        };

        for task in running.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "monitoring task ended abnormally");
            }
        }
        tracing::info!("monitoring shut down");
    }

    fn take_running(&self) -> Option<Running> {
        let running = self.running().take()?;
        running.cancel.cancel();
        Some(running)
    }

    /// Entry point for OS UI notifications. Callable from any thread.
    pub fn on_ui_event(&self, event: &UiEvent) -> ContentOutcome {
        let Some(content) = &self.content else {
            return ContentOutcome::Ignored;
        };

        let tx = match self.running().as_ref() {
            Some(running) => running.tx.clone(),
            None => return ContentOutcome::Inactive,
        };

        let outcome = content.handle_event(event);
        if let ContentOutcome::Blocked(entry) = &outcome {
            if tx
                .send(SampleEvent::new(SourceKind::Content, entry.clone(), now_ms()))
                .is_err()
            {
                tracing::debug!(entry = %entry, "enforcer gone, dropping website sample");
            }
        }
        outcome
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}
