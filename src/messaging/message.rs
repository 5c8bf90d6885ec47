//! # Message Structures for the Work Queue
//!
//! Defines the queue entry a worker claims when processing a document. The
//! payload itself stays in external storage; the message carries the task
//! handle plus delivery bookkeeping.

use crate::models::DocumentTask;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message for document processing via the work queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMessage {
    /// The unit of work being delivered
    pub task: DocumentTask,
    /// Message metadata
    pub metadata: DeliveryMetadata,
}

/// Metadata for document messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryMetadata {
    /// Maximum processing attempts before the document is finalized as failed
    pub max_attempts: u32,
    /// Correlation ID for tracing a document across workers
    pub correlation_id: String,
}

impl DocumentMessage {
    /// Create a new message for a task with the given attempt budget
    pub fn new(task: DocumentTask, max_attempts: u32) -> Self {
        Self {
            task,
            metadata: DeliveryMetadata {
                max_attempts,
                correlation_id: Uuid::new_v4().to_string(),
            },
        }
    }

    pub fn document_id(&self) -> Uuid {
        self.task.document_id
    }

    /// Bump the attempt number for re-delivery after a failed attempt
    pub fn increment_attempt(&mut self) {
        self.task.attempt += 1;
    }

    /// Check if the attempt budget is spent
    pub fn is_attempts_exhausted(&self) -> bool {
        self.task.attempt >= self.metadata.max_attempts
    }

    /// Convert to JSON for queue storage
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Create from JSON from the queue
    pub fn from_json(json: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(json)
    }
}
