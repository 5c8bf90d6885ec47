// State machine module for the document workflow
//
// Provides the per-document lifecycle: the state enum, the events workers
// emit while driving a document through the pipeline, and the store-backed
// machine that persists every transition before the worker proceeds.

pub mod document_state_machine;
pub mod events;
pub mod states;

// Re-export main types for convenient access
pub use document_state_machine::DocumentStateMachine;
pub use events::DocumentEvent;
pub use states::DocumentState;
