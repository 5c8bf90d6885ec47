//! Required-field validation for extracted referral data
//!
//! A pure policy over the structured field mapping: no I/O, deterministic,
//! configurable required-field set. Field names are dot-paths into the nested
//! extraction JSON (`referring_provider.contact`); a path ending in `.contact`
//! is satisfied by any one of phone, email, or address.

use crate::config::ValidationConfig;
use crate::models::StructuredFields;
use serde_json::Value;

/// Result of checking extracted fields against the required set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Complete,
    Incomplete { missing_fields: Vec<String> },
}

impl ValidationOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Pure function from structured fields to a completeness verdict.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    required_fields: Vec<String>,
}

impl ValidationPolicy {
    pub fn new(required_fields: Vec<String>) -> Self {
        Self { required_fields }
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(config.required_fields.clone())
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required_fields
    }

    /// Check every required dot-path. Absent values, nulls, empty strings,
    /// and empty containers all count as missing.
    pub fn validate(&self, fields: &StructuredFields) -> ValidationOutcome {
        let mut missing_fields = Vec::new();

        for field in &self.required_fields {
            match lookup(fields, field) {
                None => missing_fields.push(field.clone()),
                Some(value) if is_empty_value(value) => missing_fields.push(field.clone()),
                Some(value) => {
                    if field.ends_with(".contact") && !has_any_contact_method(value) {
                        missing_fields.push(format!("{field} (phone, email, or address)"));
                    }
                }
            }
        }

        if missing_fields.is_empty() {
            ValidationOutcome::Complete
        } else {
            ValidationOutcome::Incomplete { missing_fields }
        }
    }
}

/// Resolve a dot-path against the nested field mapping.
fn lookup<'a>(fields: &'a StructuredFields, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = fields.get(first)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// A contact block needs at least one usable way to reach the party.
fn has_any_contact_method(contact: &Value) -> bool {
    let Some(contact) = contact.as_object() else {
        return false;
    };
    ["phone", "email", "address"].iter().any(|method| {
        contact
            .get(*method)
            .is_some_and(|v| !is_empty_value(v))
    })
}
