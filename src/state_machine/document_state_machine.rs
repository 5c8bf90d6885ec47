use super::{events::DocumentEvent, states::DocumentState};
use crate::config::RetryConfig;
use crate::error::{Result, WorkflowError};
use crate::models::StatusRecord;
use crate::store::StatusStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Store-backed state machine for one document's lifecycle.
///
/// Every transition replaces the full status record in the store before the
/// owning worker proceeds to the next phase, so a crash mid-pipeline leaves an
/// accurate last known state. Store writes get a bounded retry before the
/// failure surfaces to the worker loop.
pub struct DocumentStateMachine {
    record: StatusRecord,
    store: Arc<dyn StatusStore>,
    store_write_attempts: u32,
    store_write_backoff: Duration,
}

impl DocumentStateMachine {
    /// Load the machine for a document, seeding from the stored record or a
    /// fresh `Queued` record when none exists yet.
    pub async fn load(
        document_id: Uuid,
        store: Arc<dyn StatusStore>,
        retry: &RetryConfig,
    ) -> Result<Self> {
        let record = store
            .get(document_id)
            .await?
            .unwrap_or_else(|| StatusRecord::queued(document_id));
        Ok(Self {
            record,
            store,
            store_write_attempts: retry.store_write_attempts.max(1),
            store_write_backoff: Duration::from_millis(retry.store_write_backoff_ms),
        })
    }

    pub fn current_state(&self) -> DocumentState {
        self.record.state
    }

    pub fn record(&self) -> &StatusRecord {
        &self.record
    }

    /// Determine the target state for an event, or reject the transition.
    ///
    /// `StartExtraction` is accepted from any non-terminal state: at-least-once
    /// delivery means a redelivered task restarts the pipeline from extraction.
    pub fn determine_target_state(
        current_state: DocumentState,
        event: &DocumentEvent,
    ) -> Result<DocumentState> {
        let target = match (current_state, event) {
            // Pipeline re-entry on (re)delivery
            (state, DocumentEvent::StartExtraction) if !state.is_terminal() => {
                DocumentState::Extracting
            }

            // Forward progression
            (DocumentState::Extracting, DocumentEvent::FieldsExtracted(_)) => {
                DocumentState::Validating
            }
            (DocumentState::Validating, DocumentEvent::ValidatedComplete) => DocumentState::Syncing,
            (DocumentState::Validating, DocumentEvent::ValidatedIncomplete(_)) => {
                DocumentState::NotifyingMissingInfo
            }
            (DocumentState::Syncing, DocumentEvent::SyncSucceeded) => DocumentState::Synced,
            (DocumentState::NotifyingMissingInfo, DocumentEvent::NotifySucceeded) => {
                DocumentState::AwaitingInfo
            }

            // Retry exhaustion from any non-terminal state
            (state, DocumentEvent::Fail(_)) if !state.is_terminal() => DocumentState::Failed,

            (from_state, event) => {
                return Err(WorkflowError::StateTransition(format!(
                    "invalid transition from {from_state} on {}",
                    event.event_type()
                )))
            }
        };

        Ok(target)
    }

    /// Transition on the given event, persisting the replacement record.
    pub async fn transition(&mut self, event: DocumentEvent) -> Result<DocumentState> {
        let target = Self::determine_target_state(self.record.state, &event)?;

        let mut updated = self.record.clone();
        updated.state = target;
        Self::apply_event(&mut updated, event);
        updated.updated_at = Utc::now();

        self.persist(updated).await?;
        Ok(target)
    }

    /// Begin a processing attempt: transition into `Extracting` and stamp the
    /// 1-based attempt number in the same write.
    pub async fn start_attempt(&mut self, attempt: u32) -> Result<DocumentState> {
        let target =
            Self::determine_target_state(self.record.state, &DocumentEvent::StartExtraction)?;

        let mut updated = self.record.clone();
        updated.state = target;
        updated.attempt = attempt;
        updated.updated_at = Utc::now();

        self.persist(updated).await?;
        Ok(target)
    }

    /// Record a failed attempt without advancing the state machine; the
    /// document stays in its last good state while it waits for redelivery.
    pub async fn record_attempt_error(&mut self, message: impl Into<String>) -> Result<()> {
        let mut updated = self.record.clone();
        updated.last_error = Some(message.into());
        updated.updated_at = Utc::now();
        self.persist(updated).await
    }

    fn apply_event(record: &mut StatusRecord, event: DocumentEvent) {
        match event {
            DocumentEvent::FieldsExtracted(fields) => record.fields = Some(fields),
            DocumentEvent::ValidatedIncomplete(missing) => record.missing_fields = missing,
            DocumentEvent::Fail(message) => record.last_error = Some(message),
            DocumentEvent::SyncSucceeded | DocumentEvent::NotifySucceeded => {
                record.last_error = None
            }
            DocumentEvent::StartExtraction | DocumentEvent::ValidatedComplete => {}
        }
    }

    async fn persist(&mut self, updated: StatusRecord) -> Result<()> {
        let mut last_error = None;
        for attempt in 1..=self.store_write_attempts {
            match self.store.put(updated.clone()).await {
                Ok(()) => {
                    self.record = updated;
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        document_id = %updated.document_id,
                        attempt,
                        error = %e,
                        "Status store write failed"
                    );
                    last_error = Some(e);
                    if attempt < self.store_write_attempts {
                        tokio::time::sleep(self.store_write_backoff).await;
                    }
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| WorkflowError::StoreUnavailable("store write failed".to_string())))
    }
}
