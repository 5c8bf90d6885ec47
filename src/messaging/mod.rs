//! # Messaging Module
//!
//! Queue-based delivery of document-processing tasks to the worker pool.
//! Competing-consumer, at-least-once semantics: each message goes to exactly
//! one worker, and an unacked delivery becomes visible again after the
//! visibility timeout.

pub mod message;
pub mod queue;

pub use message::{DeliveryMetadata, DocumentMessage};
pub use queue::{DocumentDelivery, InMemoryWorkQueue, WorkQueue};
