//! # Extraction Module
//!
//! Wraps the two-phase extraction pipeline (OCR text extraction, then
//! LLM-assisted field extraction) behind one interface: payload handle in,
//! structured field mapping out, or a typed failure the worker can classify
//! for retry. The OCR engine, LLM, and payload storage are external
//! collaborators consumed through the narrow traits below.

pub mod adapter;

pub use adapter::{ExtractionAdapter, ReferralExtractionAdapter};

use crate::error::{ExtractionErrorKind, WorkflowError};
use crate::models::StructuredFields;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Typed failure from either extraction phase.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionFailure {
    pub kind: ExtractionErrorKind,
    pub message: String,
}

impl ExtractionFailure {
    pub fn ocr_failed(message: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::OcrFailed,
            message: message.into(),
        }
    }

    pub fn llm_failed(message: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::LlmFailed,
            message: message.into(),
        }
    }

    pub fn llm_timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::LlmTimeout,
            message: message.into(),
        }
    }
}

impl From<ExtractionFailure> for WorkflowError {
    fn from(failure: ExtractionFailure) -> Self {
        WorkflowError::Extraction {
            kind: failure.kind,
            message: failure.message,
        }
    }
}

/// Resolves a payload handle to the stored document bytes.
#[async_trait]
pub trait PayloadStore: Send + Sync {
    async fn fetch(&self, payload_ref: &str) -> anyhow::Result<Vec<u8>>;
}

/// OCR engine client.
#[async_trait]
pub trait OcrClient: Send + Sync {
    async fn extract_text(&self, payload: &[u8]) -> anyhow::Result<String>;
}

/// A professional email requesting missing referral information, drafted by
/// the LLM for the notification path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
    pub recipient: String,
}

/// Context handed to the LLM when drafting a missing-information email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailDraftRequest {
    pub referral_id: String,
    pub referring_provider: String,
    pub receiving_provider: String,
    pub missing_fields: Vec<String>,
}

/// Language-model client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Extract structured fields from raw OCR text according to `schema`.
    async fn extract_fields(
        &self,
        text: &str,
        schema: &serde_json::Value,
    ) -> anyhow::Result<StructuredFields>;

    /// Draft a request email for missing referral information.
    async fn draft_email(&self, request: &EmailDraftRequest) -> anyhow::Result<EmailDraft>;
}
