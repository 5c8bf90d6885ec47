#![allow(clippy::doc_markdown)] // Allow technical terms like OCR, LLM in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Referral Core
//!
//! Workflow engine for medical referral document processing.
//!
//! ## Overview
//!
//! Referral documents arrive as scanned uploads. This crate is the engine
//! that moves each one through OCR text extraction, LLM-assisted field
//! extraction, required-field validation, and a terminal outcome: automated
//! sync into the medical-records system when the referral is complete, or a
//! missing-information notification to the referring provider when it is not.
//!
//! The engine guarantees at-least-once processing with idempotent re-entry,
//! and keeps a queryable status record per document at every step. The HTTP
//! front door, OCR engine, LLM, records system, and email transport are
//! external collaborators consumed through narrow trait interfaces.
//!
//! ## Module Organization
//!
//! - [`models`] - Document task and status record data model
//! - [`store`] - Status store: the source of truth for per-document state
//! - [`messaging`] - Work queue with competing-consumer, at-least-once delivery
//! - [`state_machine`] - Document lifecycle states and transitions
//! - [`extraction`] - OCR + LLM extraction behind one adapter interface
//! - [`validation`] - Pure required-field policy over extracted data
//! - [`routing`] - Outcome routing: records sync vs missing-info notification
//! - [`orchestration`] - Agent worker pool and the workflow supervisor
//! - [`config`] - Engine configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use referral_core::config::EngineConfig;
//! use referral_core::validation::ValidationPolicy;
//!
//! // Defaults mirror the production referral pipeline
//! let config = EngineConfig::default();
//! let policy = ValidationPolicy::from_config(&config.validation);
//! assert_eq!(policy.required_fields().len(), 8);
//! ```
//!
//! Wiring the engine itself means implementing the collaborator traits
//! ([`extraction::OcrClient`], [`extraction::LlmClient`],
//! [`routing::RecordsSyncClient`], [`routing::NotificationClient`],
//! [`extraction::PayloadStore`]) and handing them to
//! [`orchestration::WorkflowSupervisor::start`], which owns the worker pool
//! and exposes `enqueue`, `status`, and `all_statuses`.

pub mod config;
pub mod error;
pub mod extraction;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod routing;
pub mod state_machine;
pub mod store;
pub mod validation;

pub use config::{
    EngineConfig, ExtractionConfig, QueueConfig, RetryConfig, ValidationConfig, WorkerConfig,
};
pub use error::{ExtractionErrorKind, Result, WorkflowError};
pub use models::{DocumentTask, StatusRecord, StructuredFields};
pub use orchestration::{EngineClients, WorkflowSupervisor};
pub use state_machine::{DocumentEvent, DocumentState};
pub use validation::{ValidationOutcome, ValidationPolicy};
