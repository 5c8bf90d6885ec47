//! Core data model: the queued unit of work and the durable status record.

use crate::state_machine::DocumentState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Structured fields extracted from a referral document. The extraction
/// schema is a nested JSON object, so values may themselves be objects
/// (`referring_provider.contact.phone`).
pub type StructuredFields = serde_json::Map<String, serde_json::Value>;

/// One queued unit of work for a single document.
///
/// Carries a handle to the stored payload, never the bytes, so queue entries
/// stay small. Ephemeral: exists only while queued or in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTask {
    /// Stable identity, assigned at enqueue time.
    pub document_id: Uuid,
    /// Pointer to the stored payload bytes.
    pub payload_ref: String,
    pub enqueued_at: DateTime<Utc>,
    /// 1-based number of the processing attempt this delivery represents.
    pub attempt: u32,
}

impl DocumentTask {
    pub fn new(document_id: Uuid, payload_ref: impl Into<String>) -> Self {
        Self {
            document_id,
            payload_ref: payload_ref.into(),
            enqueued_at: Utc::now(),
            attempt: 1,
        }
    }
}

/// Durable, queryable state snapshot for one document.
///
/// Exactly one record exists per document ID; every write is a full-record
/// replacement performed by the worker that currently owns the task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub document_id: Uuid,
    pub state: DocumentState,
    /// Populated once extraction succeeds.
    pub fields: Option<StructuredFields>,
    /// Populated only on the incomplete-validation branch.
    pub missing_fields: Vec<String>,
    /// Present only after a failed attempt.
    pub last_error: Option<String>,
    /// 1-based number of the most recently started processing attempt.
    pub attempt: u32,
    pub updated_at: DateTime<Utc>,
}

impl StatusRecord {
    /// The record written at enqueue time, before any worker touches the
    /// document.
    pub fn queued(document_id: Uuid) -> Self {
        Self {
            document_id,
            state: DocumentState::Queued,
            fields: None,
            missing_fields: Vec::new(),
            last_error: None,
            attempt: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
