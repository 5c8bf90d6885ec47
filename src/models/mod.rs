pub mod document;

// Re-export core models for easy access
pub use document::{DocumentTask, StatusRecord, StructuredFields};
