//! Shared fixtures for workflow integration tests: scripted collaborator
//! clients with call counters, referral payload fixtures, and a polling
//! helper for terminal states.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use referral_core::extraction::{
    EmailDraft, EmailDraftRequest, LlmClient, OcrClient, PayloadStore,
};
use referral_core::routing::{MissingInfoNotice, NotificationClient, RecordsSyncClient};
use referral_core::{
    DocumentState, EngineClients, StatusRecord, StructuredFields, WorkflowSupervisor,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Payload store whose "bytes" are the referral JSON keyed by payload ref.
pub struct FixturePayloads {
    docs: Mutex<HashMap<String, String>>,
}

impl FixturePayloads {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, payload_ref: impl Into<String>, referral_json: serde_json::Value) {
        self.docs
            .lock()
            .insert(payload_ref.into(), referral_json.to_string());
    }
}

#[async_trait]
impl PayloadStore for FixturePayloads {
    async fn fetch(&self, payload_ref: &str) -> anyhow::Result<Vec<u8>> {
        self.docs
            .lock()
            .get(payload_ref)
            .map(|doc| doc.as_bytes().to_vec())
            .ok_or_else(|| anyhow::anyhow!("unknown payload ref: {payload_ref}"))
    }
}

/// OCR stub that returns the payload bytes as text.
#[derive(Default)]
pub struct EchoOcr {
    pub calls: AtomicUsize,
}

#[async_trait]
impl OcrClient for EchoOcr {
    async fn extract_text(&self, payload: &[u8]) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(String::from_utf8(payload.to_vec())?)
    }
}

/// OCR stub that fails on every call.
#[derive(Default)]
pub struct FailingOcr {
    pub calls: AtomicUsize,
}

#[async_trait]
impl OcrClient for FailingOcr {
    async fn extract_text(&self, _payload: &[u8]) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("scanner produced unreadable output")
    }
}

/// LLM stub: field extraction parses the OCR text as JSON, email drafting
/// returns a canned professional draft.
#[derive(Default)]
pub struct JsonLlm {
    pub extract_calls: AtomicUsize,
}

#[async_trait]
impl LlmClient for JsonLlm {
    async fn extract_fields(
        &self,
        text: &str,
        _schema: &serde_json::Value,
    ) -> anyhow::Result<StructuredFields> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        let value: serde_json::Value = serde_json::from_str(text)?;
        value
            .as_object()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("response was not a JSON object"))
    }

    async fn draft_email(&self, request: &EmailDraftRequest) -> anyhow::Result<EmailDraft> {
        Ok(EmailDraft {
            subject: format!("Missing information for referral {}", request.referral_id),
            body: format!(
                "We received a referral but the following details are missing: {}",
                request.missing_fields.join(", ")
            ),
            recipient: String::new(),
        })
    }
}

/// Records-system client that can fail a scripted number of times first.
#[derive(Default)]
pub struct CountingSync {
    pub calls: AtomicUsize,
    pub fail_first: AtomicU32,
}

impl CountingSync {
    pub fn failing_first(times: u32) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first: AtomicU32::new(times),
        }
    }
}

#[async_trait]
impl RecordsSyncClient for CountingSync {
    async fn sync(&self, _fields: &StructuredFields) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            anyhow::bail!("records system temporarily unavailable");
        }
        Ok(())
    }
}

/// Notification client that captures every notice it sends.
#[derive(Default)]
pub struct CountingNotify {
    pub calls: AtomicUsize,
    pub notices: Mutex<Vec<MissingInfoNotice>>,
}

#[async_trait]
impl NotificationClient for CountingNotify {
    async fn notify(&self, notice: &MissingInfoNotice) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.notices.lock().push(notice.clone());
        Ok(())
    }
}

/// Bundle of fixture clients with handles kept for assertions.
pub struct TestClients {
    pub payloads: Arc<FixturePayloads>,
    pub ocr: Arc<EchoOcr>,
    pub llm: Arc<JsonLlm>,
    pub sync: Arc<CountingSync>,
    pub notify: Arc<CountingNotify>,
}

impl TestClients {
    pub fn new() -> Self {
        Self {
            payloads: Arc::new(FixturePayloads::new()),
            ocr: Arc::new(EchoOcr::default()),
            llm: Arc::new(JsonLlm::default()),
            sync: Arc::new(CountingSync::default()),
            notify: Arc::new(CountingNotify::default()),
        }
    }

    pub fn with_sync(sync: CountingSync) -> Self {
        Self {
            sync: Arc::new(sync),
            ..Self::new()
        }
    }

    pub fn engine_clients(&self) -> EngineClients {
        EngineClients {
            payloads: self.payloads.clone(),
            ocr: self.ocr.clone(),
            llm: self.llm.clone(),
            records: self.sync.clone(),
            notifications: self.notify.clone(),
        }
    }
}

/// A referral satisfying all eight default required fields.
pub fn complete_referral() -> serde_json::Value {
    serde_json::json!({
        "referral_id": "REF-1042",
        "date_of_referral": "2025-04-02",
        "referring_provider": {
            "name": "Dr. Imani Osei",
            "specialty": "Family Medicine",
            "contact": { "phone": "555-0100", "email": "i.osei@clinic.example", "address": "" }
        },
        "receiving_provider": {
            "name": "Dr. Marta Keller",
            "specialty": "Cardiology",
            "contact": { "phone": "555-0188", "email": "", "address": "" }
        },
        "patient": {
            "name": "Ada Bell",
            "date_of_birth": "1961-09-14",
            "contact": { "phone": "555-0123", "email": "", "address": "" }
        },
        "reason_for_referral": "Persistent arrhythmia with exertional syncope",
        "requested_action": "Cardiology consultation and Holter monitoring"
    })
}

/// Poll until the document reaches a terminal state or the deadline passes.
pub async fn wait_for_terminal(
    supervisor: &WorkflowSupervisor,
    document_id: Uuid,
    timeout: Duration,
) -> StatusRecord {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Ok(record) = supervisor.status(document_id).await {
            if record.is_terminal() {
                return record;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("document {document_id} did not reach a terminal state within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Convenience assertion for terminal states.
pub fn assert_state(record: &StatusRecord, expected: DocumentState) {
    assert_eq!(
        record.state, expected,
        "document {} ended in {:?} (last_error: {:?})",
        record.document_id, record.state, record.last_error
    );
}
