//! # Orchestration Engine
//!
//! The worker pool and its supervisor: the part of the engine that moves a
//! document from the queue through extraction, validation, and outcome
//! routing while keeping the status store accurate at every step.
//!
//! ## Core Components
//!
//! - **AgentWorker**: Independent execution unit running a strictly
//!   sequential dequeue → process → update-status loop
//! - **WorkflowSupervisor**: Owns worker lifecycle (start, stop,
//!   restart-on-crash) and exposes the enqueue/status-query surface consumed
//!   by the HTTP layer
//!
//! Workers never share a task: the queue's single-delivery contract is the
//! only cross-worker coordination primitive. A shutdown signal lets each
//! worker finish its current document; anything unfinished is restored to the
//! queue by the visibility timeout.

pub mod supervisor;
pub mod worker;

pub use supervisor::{EngineClients, WorkflowSupervisor};
pub use worker::{AgentWorker, WorkerSignal};
