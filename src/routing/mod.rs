//! # Outcome Routing
//!
//! Decides, from the validation result, which terminal action a document
//! gets (records-system sync for complete documents, a missing-information
//! notification for incomplete ones) and calls the corresponding external
//! client. The notification path drafts a request email via the LLM and
//! prefers the referring provider's contact details, falling back to the
//! receiving provider.

use crate::error::{Result, WorkflowError};
use crate::extraction::{EmailDraft, EmailDraftRequest, LlmClient};
use crate::models::StructuredFields;
use crate::validation::ValidationOutcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Marker recipient when neither provider carries usable contact details.
pub const NO_CONTACT_AVAILABLE: &str = "No contact information available";

/// External medical-records system client.
#[async_trait]
pub trait RecordsSyncClient: Send + Sync {
    async fn sync(&self, fields: &StructuredFields) -> anyhow::Result<()>;
}

/// Outbound notification (email) client.
#[async_trait]
pub trait NotificationClient: Send + Sync {
    async fn notify(&self, notice: &MissingInfoNotice) -> anyhow::Result<()>;
}

/// Everything the notification transport needs to request missing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingInfoNotice {
    pub document_id: Uuid,
    pub missing_fields: Vec<String>,
    pub draft: Option<EmailDraft>,
    pub recipient: String,
}

/// Terminal action taken for a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutedOutcome {
    Synced,
    AwaitingInfo,
}

/// Routes a validated document to its terminal action.
pub struct OutcomeRouter {
    records: Arc<dyn RecordsSyncClient>,
    notifications: Arc<dyn NotificationClient>,
    llm: Arc<dyn LlmClient>,
}

impl OutcomeRouter {
    pub fn new(
        records: Arc<dyn RecordsSyncClient>,
        notifications: Arc<dyn NotificationClient>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            records,
            notifications,
            llm,
        }
    }

    /// Apply the decision rule: complete → sync, incomplete → notify.
    /// Either external call failing surfaces as a retryable
    /// [`WorkflowError::OutcomeDelivery`].
    pub async fn route(
        &self,
        document_id: Uuid,
        fields: &StructuredFields,
        outcome: &ValidationOutcome,
    ) -> Result<RoutedOutcome> {
        match outcome {
            ValidationOutcome::Complete => {
                self.records.sync(fields).await.map_err(|e| {
                    WorkflowError::OutcomeDelivery(format!("records sync failed: {e}"))
                })?;
                info!(document_id = %document_id, "Records sync complete");
                Ok(RoutedOutcome::Synced)
            }
            ValidationOutcome::Incomplete { missing_fields } => {
                let notice = self
                    .compose_notice(document_id, fields, missing_fields.clone())
                    .await?;
                self.notifications.notify(&notice).await.map_err(|e| {
                    WorkflowError::OutcomeDelivery(format!("notification failed: {e}"))
                })?;
                info!(
                    document_id = %document_id,
                    recipient = %notice.recipient,
                    missing = notice.missing_fields.len(),
                    "Missing-information notification sent"
                );
                Ok(RoutedOutcome::AwaitingInfo)
            }
        }
    }

    async fn compose_notice(
        &self,
        document_id: Uuid,
        fields: &StructuredFields,
        missing_fields: Vec<String>,
    ) -> Result<MissingInfoNotice> {
        let request = EmailDraftRequest {
            referral_id: referral_id(fields).unwrap_or_else(|| document_id.to_string()),
            referring_provider: provider_name(fields, "referring_provider"),
            receiving_provider: provider_name(fields, "receiving_provider"),
            missing_fields: missing_fields.clone(),
        };

        let draft = self.llm.draft_email(&request).await.map_err(|e| {
            WorkflowError::OutcomeDelivery(format!("email draft failed: {e}"))
        })?;

        let recipient = best_contact(fields);
        if recipient == NO_CONTACT_AVAILABLE {
            warn!(document_id = %document_id, "No provider contact details for notification");
        }

        Ok(MissingInfoNotice {
            document_id,
            missing_fields,
            draft: Some(draft),
            recipient,
        })
    }
}

fn referral_id(fields: &StructuredFields) -> Option<String> {
    fields
        .get("referral_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn provider_name(fields: &StructuredFields, provider: &str) -> String {
    fields
        .get(provider)
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

/// Best available contact method, preferring the referring provider.
fn best_contact(fields: &StructuredFields) -> String {
    for provider in ["referring_provider", "receiving_provider"] {
        let contact = fields.get(provider).and_then(|p| p.get("contact"));
        let Some(contact) = contact.and_then(Value::as_object) else {
            continue;
        };
        for method in ["email", "phone", "address"] {
            if let Some(value) = contact.get(method).and_then(Value::as_str) {
                if !value.is_empty() {
                    return value.to_string();
                }
            }
        }
    }
    NO_CONTACT_AVAILABLE.to_string()
}
