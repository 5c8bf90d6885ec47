//! Error types for the referral workflow engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Failure sub-kind for the two-phase extraction pipeline.
///
/// Lets the worker distinguish an OCR fault from an LLM fault when deciding
/// retry vs terminal failure, and keeps the kind queryable from the recorded
/// error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionErrorKind {
    OcrFailed,
    LlmFailed,
    LlmTimeout,
}

impl std::fmt::Display for ExtractionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OcrFailed => write!(f, "ocr_failed"),
            Self::LlmFailed => write!(f, "llm_failed"),
            Self::LlmTimeout => write!(f, "llm_timeout"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    #[error("Status store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Queue error: {0}")]
    QueueError(String),
    #[error("Extraction error ({kind}): {message}")]
    Extraction {
        kind: ExtractionErrorKind,
        message: String,
    },
    #[error("Outcome delivery error: {0}")]
    OutcomeDelivery(String),
    #[error("State transition error: {0}")]
    StateTransition(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),
    #[error("Engine is shutting down")]
    ShuttingDown,
    #[error("Intake is paused: {0}")]
    IntakePaused(String),
}

impl WorkflowError {
    /// Whether the worker should retry this error against the document's
    /// attempt budget. Infra errors (store/queue) are handled separately with
    /// their own bounded retries plus supervisor escalation.
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Extraction { .. } | Self::OutcomeDelivery(_))
    }

    /// Whether this error means the store or queue itself is unhealthy.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::QueueError(_))
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(error: serde_json::Error) -> Self {
        WorkflowError::QueueError(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let extraction = WorkflowError::Extraction {
            kind: ExtractionErrorKind::OcrFailed,
            message: "tesseract exited".to_string(),
        };
        assert!(extraction.retryable());
        assert!(WorkflowError::OutcomeDelivery("smtp refused".to_string()).retryable());

        assert!(!WorkflowError::StoreUnavailable("down".to_string()).retryable());
        assert!(!WorkflowError::Configuration("bad".to_string()).retryable());
        assert!(!WorkflowError::ShuttingDown.retryable());
    }

    #[test]
    fn test_infrastructure_classification() {
        assert!(WorkflowError::StoreUnavailable("down".to_string()).is_infrastructure());
        assert!(WorkflowError::QueueError("down".to_string()).is_infrastructure());
        assert!(!WorkflowError::OutcomeDelivery("x".to_string()).is_infrastructure());
    }

    #[test]
    fn test_extraction_kind_display() {
        assert_eq!(ExtractionErrorKind::OcrFailed.to_string(), "ocr_failed");
        assert_eq!(ExtractionErrorKind::LlmTimeout.to_string(), "llm_timeout");

        let err = WorkflowError::Extraction {
            kind: ExtractionErrorKind::LlmFailed,
            message: "response was not valid JSON".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Extraction error (llm_failed): response was not valid JSON"
        );
    }
}
