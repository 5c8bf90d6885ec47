//! Agent worker: one independent execution unit of the pool.
//!
//! Each worker runs a strictly sequential loop: dequeue, process one
//! document end-to-end, update status, repeat. Every document-level error is
//! caught at the loop boundary, recorded into the status store, and either
//! requeued with backoff or finalized as failed. Only store/queue
//! infrastructure errors escalate to the supervisor.

use crate::config::RetryConfig;
use crate::error::{Result, WorkflowError};
use crate::extraction::ExtractionAdapter;
use crate::messaging::{DocumentDelivery, WorkQueue};
use crate::routing::{OutcomeRouter, RoutedOutcome};
use crate::state_machine::{DocumentEvent, DocumentStateMachine};
use crate::store::StatusStore;
use crate::validation::{ValidationOutcome, ValidationPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};

/// Signals a worker raises to the supervisor.
#[derive(Debug)]
pub enum WorkerSignal {
    /// The store or queue is unhealthy enough that status can no longer be
    /// written; the supervisor may pause intake.
    InfraFailure {
        worker_id: usize,
        error: WorkflowError,
    },
}

/// An independent worker processing one task at a time end-to-end.
#[derive(Clone)]
pub struct AgentWorker {
    id: usize,
    store: Arc<dyn StatusStore>,
    queue: Arc<dyn WorkQueue>,
    adapter: Arc<dyn ExtractionAdapter>,
    policy: ValidationPolicy,
    router: Arc<OutcomeRouter>,
    retry: RetryConfig,
    dequeue_wait: Duration,
    shutdown: watch::Receiver<bool>,
    signals: mpsc::UnboundedSender<WorkerSignal>,
}

impl AgentWorker {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: usize,
        store: Arc<dyn StatusStore>,
        queue: Arc<dyn WorkQueue>,
        adapter: Arc<dyn ExtractionAdapter>,
        policy: ValidationPolicy,
        router: Arc<OutcomeRouter>,
        retry: RetryConfig,
        dequeue_wait: Duration,
        shutdown: watch::Receiver<bool>,
        signals: mpsc::UnboundedSender<WorkerSignal>,
    ) -> Self {
        Self {
            id,
            store,
            queue,
            adapter,
            policy,
            router,
            retry,
            dequeue_wait,
            shutdown,
            signals,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Main loop. Returns when the shutdown signal fires; the current
    /// document (if any) is finished first.
    pub async fn run(&self) {
        let mut shutdown = self.shutdown.clone();
        info!(worker_id = self.id, "Agent worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                dequeued = self.queue.dequeue(self.dequeue_wait) => {
                    match dequeued {
                        Ok(Some(delivery)) => self.process_delivery(delivery).await,
                        Ok(None) => {}
                        Err(e) => {
                            warn!(worker_id = self.id, error = %e, "Dequeue failed");
                            let _ = self.signals.send(WorkerSignal::InfraFailure {
                                worker_id: self.id,
                                error: e,
                            });
                            tokio::time::sleep(Duration::from_millis(
                                self.retry.store_write_backoff_ms,
                            ))
                            .await;
                        }
                    }
                }
            }
        }

        info!(worker_id = self.id, "Agent worker stopped");
    }

    /// Process one delivery, catching every error at this boundary so the
    /// worker task itself never dies on a document-level failure.
    #[instrument(skip(self, delivery), fields(worker_id = self.id, document_id = %delivery.message.document_id()))]
    async fn process_delivery(&self, delivery: DocumentDelivery) {
        match self.process(&delivery).await {
            Ok(()) => {}
            Err(e) if e.is_infrastructure() => {
                error!(error = %e, "Infrastructure failure while processing document");
                let _ = self.signals.send(WorkerSignal::InfraFailure {
                    worker_id: self.id,
                    error: e,
                });
                // The document stays in its last good state; put the message
                // back without burning attempt budget on an infra fault.
                let delay = self.retry.delay_for_attempt(delivery.message.task.attempt);
                if let Err(requeue_err) = self
                    .queue
                    .requeue(delivery.receipt, delivery.message.clone(), delay)
                    .await
                {
                    // The visibility timeout will still redeliver it.
                    warn!(error = %requeue_err, "Requeue after infra failure also failed");
                }
            }
            Err(e) => {
                error!(error = %e, "Unrecoverable document error");
                self.finalize_failed(&delivery, &e).await;
            }
        }
    }

    async fn process(&self, delivery: &DocumentDelivery) -> Result<()> {
        let message = &delivery.message;
        let document_id = message.document_id();

        let mut machine =
            DocumentStateMachine::load(document_id, self.store.clone(), &self.retry).await?;

        if machine.record().is_terminal() {
            // Duplicate delivery of an already-finished document.
            debug!(state = %machine.current_state(), "Skipping delivery for terminal document");
            return self.queue.ack(delivery.receipt).await;
        }

        machine.start_attempt(message.task.attempt).await?;

        let fields = match self.adapter.extract(&message.task.payload_ref).await {
            Ok(fields) => fields,
            Err(failure) => {
                return self
                    .handle_attempt_failure(&mut machine, delivery, failure.into())
                    .await
            }
        };

        machine
            .transition(DocumentEvent::FieldsExtracted(fields.clone()))
            .await?;

        let outcome = self.policy.validate(&fields);
        match &outcome {
            ValidationOutcome::Complete => {
                machine.transition(DocumentEvent::ValidatedComplete).await?;
            }
            ValidationOutcome::Incomplete { missing_fields } => {
                machine
                    .transition(DocumentEvent::ValidatedIncomplete(missing_fields.clone()))
                    .await?;
            }
        }

        match self.router.route(document_id, &fields, &outcome).await {
            Ok(RoutedOutcome::Synced) => {
                machine.transition(DocumentEvent::SyncSucceeded).await?;
            }
            Ok(RoutedOutcome::AwaitingInfo) => {
                machine.transition(DocumentEvent::NotifySucceeded).await?;
            }
            Err(e) => {
                return self.handle_attempt_failure(&mut machine, delivery, e).await;
            }
        }

        info!(state = %machine.current_state(), attempt = message.task.attempt, "Document reached terminal state");
        self.queue.ack(delivery.receipt).await
    }

    /// Record the failed attempt, then requeue with backoff or finalize as
    /// failed once the budget is spent.
    async fn handle_attempt_failure(
        &self,
        machine: &mut DocumentStateMachine,
        delivery: &DocumentDelivery,
        error: WorkflowError,
    ) -> Result<()> {
        let attempt = delivery.message.task.attempt;
        warn!(
            error = %error,
            attempt,
            max_attempts = delivery.message.metadata.max_attempts,
            "Document processing attempt failed"
        );

        machine.record_attempt_error(error.to_string()).await?;

        if error.retryable() && !delivery.message.is_attempts_exhausted() {
            let mut next = delivery.message.clone();
            next.increment_attempt();
            let delay = self.retry.delay_for_attempt(attempt);
            self.queue.requeue(delivery.receipt, next, delay).await?;
            debug!(delay_ms = delay.as_millis() as u64, "Document requeued for retry");
        } else {
            machine
                .transition(DocumentEvent::fail_with_error(error.to_string()))
                .await?;
            self.queue.ack(delivery.receipt).await?;
        }
        Ok(())
    }

    /// Best-effort terminal failure for errors the retry path cannot handle,
    /// so the document never strands in a non-terminal state.
    async fn finalize_failed(&self, delivery: &DocumentDelivery, error: &WorkflowError) {
        let document_id = delivery.message.document_id();
        if let Ok(mut machine) =
            DocumentStateMachine::load(document_id, self.store.clone(), &self.retry).await
        {
            if !machine.record().is_terminal() {
                let _ = machine
                    .transition(DocumentEvent::fail_with_error(error.to_string()))
                    .await;
            }
        }
        let _ = self.queue.ack(delivery.receipt).await;
    }
}
