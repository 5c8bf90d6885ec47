use super::{ExtractionFailure, LlmClient, OcrClient, PayloadStore};
use crate::config::ExtractionConfig;
use crate::models::StructuredFields;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One interface over the two extraction phases.
///
/// Stateless between calls; a failure in either phase surfaces as one typed
/// [`ExtractionFailure`] so the worker can decide retry vs terminal failure.
#[async_trait]
pub trait ExtractionAdapter: Send + Sync {
    async fn extract(
        &self,
        payload_ref: &str,
    ) -> std::result::Result<StructuredFields, ExtractionFailure>;
}

/// Production adapter: payload fetch → OCR → LLM field extraction, each
/// network phase bounded by its configured timeout.
pub struct ReferralExtractionAdapter {
    payloads: Arc<dyn PayloadStore>,
    ocr: Arc<dyn OcrClient>,
    llm: Arc<dyn LlmClient>,
    ocr_timeout: Duration,
    llm_timeout: Duration,
    schema: serde_json::Value,
}

impl ReferralExtractionAdapter {
    pub fn new(
        payloads: Arc<dyn PayloadStore>,
        ocr: Arc<dyn OcrClient>,
        llm: Arc<dyn LlmClient>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            payloads,
            ocr,
            llm,
            ocr_timeout: Duration::from_millis(config.ocr_timeout_ms),
            llm_timeout: Duration::from_millis(config.llm_timeout_ms),
            schema: config.schema.clone(),
        }
    }
}

#[async_trait]
impl ExtractionAdapter for ReferralExtractionAdapter {
    async fn extract(
        &self,
        payload_ref: &str,
    ) -> std::result::Result<StructuredFields, ExtractionFailure> {
        debug!(payload_ref, "Starting extraction");

        let payload = self
            .payloads
            .fetch(payload_ref)
            .await
            .map_err(|e| ExtractionFailure::ocr_failed(format!("payload fetch failed: {e}")))?;

        let text = tokio::time::timeout(self.ocr_timeout, self.ocr.extract_text(&payload))
            .await
            .map_err(|_| {
                ExtractionFailure::ocr_failed(format!(
                    "OCR timed out after {}ms",
                    self.ocr_timeout.as_millis()
                ))
            })?
            .map_err(|e| ExtractionFailure::ocr_failed(e.to_string()))?;

        debug!(payload_ref, text_length = text.len(), "OCR phase complete");

        let fields = tokio::time::timeout(
            self.llm_timeout,
            self.llm.extract_fields(&text, &self.schema),
        )
        .await
        .map_err(|_| {
            ExtractionFailure::llm_timeout(format!(
                "LLM extraction timed out after {}ms",
                self.llm_timeout.as_millis()
            ))
        })?
        .map_err(|e| ExtractionFailure::llm_failed(e.to_string()))?;

        info!(payload_ref, field_count = fields.len(), "Extraction complete");
        Ok(fields)
    }
}
