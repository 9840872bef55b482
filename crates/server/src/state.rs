use std::sync::Arc;

use tokio::sync::Mutex;

use lensdesk_core::{
    Config, EventOutcome, ReconcileError, Reconciler, RetryScan, RetryStoreError,
    SanitizedConfig, SweepReport, TriggerEvent,
};

/// Shared application state
pub struct AppState {
    config: Config,
    reconciler: Arc<Reconciler>,
    /// Held for the duration of a sweep; one sweep at a time per process.
    sweep_lock: Mutex<()>,
}

impl AppState {
    pub fn new(config: Config, reconciler: Arc<Reconciler>) -> Self {
        Self {
            config,
            reconciler,
            sweep_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Dispatch a trigger event. Scheduled events wait for a running sweep.
    pub async fn dispatch(&self, event: &TriggerEvent) -> Result<EventOutcome, ReconcileError> {
        match event {
            TriggerEvent::Scheduled => {
                let _guard = self.sweep_lock.lock().await;
                self.reconciler.handle_event(event).await
            }
            TriggerEvent::ObjectCreated { .. } => self.reconciler.handle_event(event).await,
        }
    }

    pub async fn sweep(&self) -> Result<SweepReport, ReconcileError> {
        let _guard = self.sweep_lock.lock().await;
        self.reconciler.sweep().await
    }

    pub fn pending(&self) -> Result<RetryScan, RetryStoreError> {
        self.reconciler.pending()
    }
}
