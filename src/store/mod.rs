//! # Status Store
//!
//! Durable mapping from document ID to workflow status: the single source of
//! truth for "where is this document now". The trait is the seam a networked
//! key-value store implements in production; [`InMemoryStatusStore`] is the
//! engine's reference implementation and test backend.

pub mod memory;

pub use memory::InMemoryStatusStore;

use crate::error::Result;
use crate::models::StatusRecord;
use async_trait::async_trait;
use uuid::Uuid;

/// Contract for document status persistence.
///
/// `put` is an unconditional full-record overwrite; no partial updates are
/// exposed. Callers read-modify-write whole records, and because each
/// document has exactly one owning worker at a time there are no cross-worker
/// write races to guard against.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Replace the record for `record.document_id`, creating it if absent.
    async fn put(&self, record: StatusRecord) -> Result<()>;

    /// Fetch the current record, or `None` when the document is unknown.
    async fn get(&self, document_id: Uuid) -> Result<Option<StatusRecord>>;

    /// All records currently tracked, for the all-documents status query.
    async fn list(&self) -> Result<Vec<StatusRecord>>;
}
