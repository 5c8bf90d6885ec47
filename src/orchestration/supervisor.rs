//! Workflow supervisor: worker lifecycle plus the engine's public surface.
//!
//! The supervisor owns the status store and work queue handles, spawns one
//! supervision task per worker slot (restarting crashed workers after a
//! delay), and exposes the three operations the HTTP layer consumes:
//! enqueue, single-document status, and all-document status.

use crate::config::EngineConfig;
use crate::error::{Result, WorkflowError};
use crate::extraction::{
    ExtractionAdapter, LlmClient, OcrClient, PayloadStore, ReferralExtractionAdapter,
};
use crate::messaging::{DocumentMessage, InMemoryWorkQueue, WorkQueue};
use crate::models::{DocumentTask, StatusRecord};
use crate::orchestration::worker::{AgentWorker, WorkerSignal};
use crate::routing::{NotificationClient, OutcomeRouter, RecordsSyncClient};
use crate::store::{InMemoryStatusStore, StatusStore};
use crate::validation::ValidationPolicy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// External collaborators the engine consumes through narrow interfaces.
pub struct EngineClients {
    pub payloads: Arc<dyn PayloadStore>,
    pub ocr: Arc<dyn OcrClient>,
    pub llm: Arc<dyn LlmClient>,
    pub records: Arc<dyn RecordsSyncClient>,
    pub notifications: Arc<dyn NotificationClient>,
}

/// Owns the worker pool and the engine's externally visible operations.
///
/// No ambient singleton: construct one, share it via `Arc`, and call
/// [`WorkflowSupervisor::shutdown`] to stop it.
pub struct WorkflowSupervisor {
    config: EngineConfig,
    store: Arc<dyn StatusStore>,
    queue: Arc<dyn WorkQueue>,
    shutdown_tx: watch::Sender<bool>,
    supervision_handles: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    intake_paused: Arc<AtomicBool>,
}

impl WorkflowSupervisor {
    /// Start the engine with in-memory store and queue backends.
    pub fn start(config: EngineConfig, clients: EngineClients) -> Result<Arc<Self>> {
        let queue_timeout = Duration::from_millis(config.queue.visibility_timeout_ms);
        Self::start_with(
            config,
            clients,
            Arc::new(InMemoryStatusStore::new()),
            Arc::new(InMemoryWorkQueue::new(queue_timeout)),
        )
    }

    /// Start the engine against caller-provided store and queue backends.
    pub fn start_with(
        config: EngineConfig,
        clients: EngineClients,
        store: Arc<dyn StatusStore>,
        queue: Arc<dyn WorkQueue>,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        let adapter: Arc<dyn ExtractionAdapter> = Arc::new(ReferralExtractionAdapter::new(
            clients.payloads,
            clients.ocr,
            clients.llm.clone(),
            &config.extraction,
        ));
        let router = Arc::new(OutcomeRouter::new(
            clients.records,
            clients.notifications,
            clients.llm,
        ));
        let policy = ValidationPolicy::from_config(&config.validation);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let intake_paused = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(config.workers.count + 1);
        handles.push(tokio::spawn(Self::monitor_signals(
            signal_rx,
            intake_paused.clone(),
        )));

        for worker_id in 0..config.workers.count {
            let worker = AgentWorker::new(
                worker_id,
                store.clone(),
                queue.clone(),
                adapter.clone(),
                policy.clone(),
                router.clone(),
                config.retry.clone(),
                Duration::from_millis(config.queue.dequeue_wait_ms),
                shutdown_rx.clone(),
                signal_tx.clone(),
            );
            handles.push(tokio::spawn(Self::supervise_worker(
                worker,
                Duration::from_millis(config.workers.restart_delay_ms),
                shutdown_rx.clone(),
            )));
        }
        drop(signal_tx);

        info!(
            workers = config.workers.count,
            max_attempts = config.retry.max_attempts,
            "🚀 Workflow supervisor started"
        );

        Ok(Arc::new(Self {
            config,
            store,
            queue,
            shutdown_tx,
            supervision_handles: parking_lot::Mutex::new(handles),
            intake_paused,
        }))
    }

    /// Accept a document into the workflow: write the initial `Queued`
    /// record, then enqueue the task for the worker pool.
    pub async fn enqueue(&self, document_id: Uuid, payload_ref: impl Into<String>) -> Result<()> {
        if *self.shutdown_tx.borrow() {
            return Err(WorkflowError::ShuttingDown);
        }
        if self.intake_paused.load(Ordering::SeqCst) {
            return Err(WorkflowError::IntakePaused(
                "infrastructure failure reported by workers".to_string(),
            ));
        }

        self.store.put(StatusRecord::queued(document_id)).await?;

        let task = DocumentTask::new(document_id, payload_ref);
        let message = DocumentMessage::new(task, self.config.retry.max_attempts);
        self.queue.enqueue(message).await?;

        info!(document_id = %document_id, "Document enqueued for processing");
        Ok(())
    }

    /// Enqueue with a freshly assigned document ID.
    pub async fn enqueue_new(&self, payload_ref: impl Into<String>) -> Result<Uuid> {
        let document_id = Uuid::new_v4();
        self.enqueue(document_id, payload_ref).await?;
        Ok(document_id)
    }

    /// Current status of one document.
    pub async fn status(&self, document_id: Uuid) -> Result<StatusRecord> {
        self.store
            .get(document_id)
            .await?
            .ok_or(WorkflowError::DocumentNotFound(document_id))
    }

    /// Status of every document the engine has seen.
    pub async fn all_statuses(&self) -> Result<Vec<StatusRecord>> {
        self.store.list().await
    }

    /// Number of tasks waiting in the queue (excluding in-flight).
    pub async fn queue_depth(&self) -> Result<usize> {
        self.queue.depth().await
    }

    /// Whether intake was paused after a worker escalated an infra failure.
    pub fn is_intake_paused(&self) -> bool {
        self.intake_paused.load(Ordering::SeqCst)
    }

    /// Signal shutdown and wait for workers to finish their current
    /// documents. Tasks still queued or abandoned mid-flight are redelivered
    /// on the next start via the queue's at-least-once contract.
    pub async fn shutdown(&self, timeout: Duration) {
        info!("Shutting down workflow supervisor");
        let _ = self.shutdown_tx.send(true);

        let mut handles: Vec<JoinHandle<()>> =
            self.supervision_handles.lock().drain(..).collect();
        let all_stopped = futures::future::join_all(handles.iter_mut());
        if tokio::time::timeout(timeout, all_stopped).await.is_err() {
            warn!("Shutdown timed out, aborting remaining worker tasks");
            for handle in &handles {
                handle.abort();
            }
        }
        info!("Workflow supervisor stopped");
    }

    /// Run one worker slot, respawning the worker after a crash until
    /// shutdown. Mirrors the restart-on-crash contract of the worker manager
    /// in the original service.
    async fn supervise_worker(
        worker: AgentWorker,
        restart_delay: Duration,
        shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let running = tokio::spawn({
                let worker = worker.clone();
                async move { worker.run().await }
            });

            let result = running.await;
            if *shutdown.borrow() {
                break;
            }
            match result {
                Ok(()) => warn!(worker_id = worker.id(), "Worker exited unexpectedly, restarting"),
                Err(join_error) => error!(
                    worker_id = worker.id(),
                    panicked = join_error.is_panic(),
                    "Worker crashed, restarting"
                ),
            }
            tokio::time::sleep(restart_delay).await;
        }
        debug!(worker_id = worker.id(), "Worker supervision ended");
    }

    /// Consume worker escalations. An infra failure pauses intake so the
    /// backlog stops growing while the store or queue is unhealthy; resuming
    /// is an operator decision (restart the engine).
    async fn monitor_signals(
        mut signals: mpsc::UnboundedReceiver<WorkerSignal>,
        intake_paused: Arc<AtomicBool>,
    ) {
        while let Some(signal) = signals.recv().await {
            match signal {
                WorkerSignal::InfraFailure { worker_id, error } => {
                    error!(
                        worker_id,
                        error = %error,
                        "Infrastructure failure reported, pausing intake"
                    );
                    intake_paused.store(true, Ordering::SeqCst);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{EmailDraft, EmailDraftRequest};
    use crate::models::StructuredFields;
    use crate::routing::MissingInfoNotice;
    use async_trait::async_trait;

    struct NullPayloads;
    #[async_trait]
    impl PayloadStore for NullPayloads {
        async fn fetch(&self, _payload_ref: &str) -> anyhow::Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    struct NullOcr;
    #[async_trait]
    impl OcrClient for NullOcr {
        async fn extract_text(&self, _payload: &[u8]) -> anyhow::Result<String> {
            Ok(String::new())
        }
    }

    struct NullLlm;
    #[async_trait]
    impl LlmClient for NullLlm {
        async fn extract_fields(
            &self,
            _text: &str,
            _schema: &serde_json::Value,
        ) -> anyhow::Result<StructuredFields> {
            Ok(StructuredFields::new())
        }
        async fn draft_email(&self, _request: &EmailDraftRequest) -> anyhow::Result<EmailDraft> {
            Ok(EmailDraft {
                subject: String::new(),
                body: String::new(),
                recipient: String::new(),
            })
        }
    }

    struct NullSync;
    #[async_trait]
    impl RecordsSyncClient for NullSync {
        async fn sync(&self, _fields: &StructuredFields) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct NullNotify;
    #[async_trait]
    impl NotificationClient for NullNotify {
        async fn notify(&self, _notice: &MissingInfoNotice) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn clients() -> EngineClients {
        EngineClients {
            payloads: Arc::new(NullPayloads),
            ocr: Arc::new(NullOcr),
            llm: Arc::new(NullLlm),
            records: Arc::new(NullSync),
            notifications: Arc::new(NullNotify),
        }
    }

    #[tokio::test]
    async fn test_status_for_unknown_document_is_not_found() {
        let supervisor = WorkflowSupervisor::start(EngineConfig::default(), clients()).unwrap();
        let unknown = Uuid::new_v4();

        let err = supervisor.status(unknown).await.unwrap_err();
        assert_eq!(err, WorkflowError::DocumentNotFound(unknown));

        supervisor.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn test_enqueue_rejected_after_shutdown() {
        let supervisor = WorkflowSupervisor::start(EngineConfig::default(), clients()).unwrap();
        supervisor.shutdown(Duration::from_secs(5)).await;

        let err = supervisor
            .enqueue(Uuid::new_v4(), "uploads/late.png")
            .await
            .unwrap_err();
        assert_eq!(err, WorkflowError::ShuttingDown);
    }

    #[tokio::test]
    async fn test_enqueue_writes_queued_record_immediately() {
        let supervisor = WorkflowSupervisor::start(EngineConfig::default(), clients()).unwrap();
        let id = supervisor.enqueue_new("uploads/referral.png").await.unwrap();

        // The record exists as soon as enqueue returns, whatever state the
        // workers have already moved it to.
        let record = supervisor.status(id).await.unwrap();
        assert_eq!(record.document_id, id);

        supervisor.shutdown(Duration::from_secs(5)).await;
    }
}
