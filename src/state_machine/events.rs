use crate::models::StructuredFields;
use serde::{Deserialize, Serialize};

/// Events that can trigger document state transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DocumentEvent {
    /// A worker claimed the task and is starting (or restarting) extraction
    StartExtraction,
    /// Extraction produced a structured field mapping
    FieldsExtracted(StructuredFields),
    /// All required fields present
    ValidatedComplete,
    /// Required fields missing; carries the missing-field names
    ValidatedIncomplete(Vec<String>),
    /// Records-system sync confirmed
    SyncSucceeded,
    /// Missing-information notification delivered
    NotifySucceeded,
    /// Retry budget exhausted; carries the final error message
    Fail(String),
}

impl DocumentEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StartExtraction => "start_extraction",
            Self::FieldsExtracted(_) => "fields_extracted",
            Self::ValidatedComplete => "validated_complete",
            Self::ValidatedIncomplete(_) => "validated_incomplete",
            Self::SyncSucceeded => "sync_succeeded",
            Self::NotifySucceeded => "notify_succeeded",
            Self::Fail(_) => "fail",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }

    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }
}
