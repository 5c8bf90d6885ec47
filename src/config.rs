//! # Configuration Manager
//!
//! Typed configuration for the workflow engine: worker pool sizing, queue
//! delivery tuning, retry/backoff policy, extraction timeouts, and the
//! required-field set used by validation. Defaults mirror the production
//! referral pipeline; a YAML file and environment variables can override any
//! section.
//!
//! ```yaml
//! # referral-config.yaml
//! workers:
//!   count: 4
//! retry:
//!   max_attempts: 3
//!   backoff_base_ms: 500
//!   backoff_multiplier: 2.0
//! validation:
//!   required_fields:
//!     - patient.name
//!     - patient.date_of_birth
//! ```

use crate::error::{Result, WorkflowError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub workers: WorkerConfig,
    pub queue: QueueConfig,
    pub retry: RetryConfig,
    pub extraction: ExtractionConfig,
    pub validation: ValidationConfig,
}

/// Worker pool sizing and lifecycle tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent agent workers.
    pub count: usize,
    /// Delay before respawning a crashed worker.
    pub restart_delay_ms: u64,
    /// How long shutdown waits for in-flight documents before giving up.
    pub shutdown_timeout_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 2,
            restart_delay_ms: 2000,
            shutdown_timeout_ms: 30_000,
        }
    }
}

/// Queue delivery tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// A dequeued message not acked within this window becomes visible again.
    pub visibility_timeout_ms: u64,
    /// Upper bound on a single blocking dequeue before the worker re-checks
    /// its shutdown signal.
    pub dequeue_wait_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_ms: 30_000,
            dequeue_wait_ms: 1000,
        }
    }
}

/// Retry budget and backoff policy for document-level errors, plus the
/// bounded retry applied to status-store writes before escalating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total processing attempts per document before it is finalized as failed.
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub backoff_multiplier: f64,
    /// Attempts for a single status-store write before supervisor escalation.
    pub store_write_attempts: u32,
    pub store_write_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 30_000,
            backoff_multiplier: 2.0,
            store_write_attempts: 3,
            store_write_backoff_ms: 250,
        }
    }
}

impl RetryConfig {
    /// Exponential backoff delay before re-delivering a document whose
    /// `attempt`th processing attempt (1-based) just failed.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay_ms =
            self.backoff_base_ms as f64 * self.backoff_multiplier.powi(exponent as i32);
        Duration::from_millis((delay_ms as u64).min(self.backoff_max_ms))
    }
}

/// Per-phase bounds for the extraction adapter, and the field schema the LLM
/// is asked to populate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub ocr_timeout_ms: u64,
    pub llm_timeout_ms: u64,
    /// JSON shape handed to the LLM extraction call.
    pub schema: serde_json::Value,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ocr_timeout_ms: 30_000,
            llm_timeout_ms: 60_000,
            schema: default_extraction_schema(),
        }
    }
}

/// Required-field set applied after extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Dot-paths into the extracted JSON that must be present and non-empty.
    pub required_fields: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            required_fields: default_required_fields(),
        }
    }
}

/// The referral fields a document must carry to sync without human follow-up.
pub fn default_required_fields() -> Vec<String> {
    [
        "referring_provider.name",
        "referring_provider.contact",
        "receiving_provider.name",
        "receiving_provider.contact",
        "patient.name",
        "patient.date_of_birth",
        "reason_for_referral",
        "requested_action",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// The structured shape the LLM extraction call is asked to fill in.
pub fn default_extraction_schema() -> serde_json::Value {
    serde_json::json!({
        "referral_id": "string",
        "date_of_referral": "YYYY-MM-DD",
        "referring_provider": {
            "name": "string",
            "provider_id": "string",
            "specialty": "string",
            "contact": { "phone": "string", "email": "string", "address": "string" }
        },
        "receiving_provider": {
            "name": "string",
            "provider_id": "string",
            "specialty": "string",
            "contact": { "phone": "string", "email": "string", "address": "string" }
        },
        "patient": {
            "name": "string",
            "date_of_birth": "YYYY-MM-DD",
            "gender": "string",
            "patient_id": "string",
            "contact": { "phone": "string", "email": "string", "address": "string" },
            "insurance": { "provider": "string", "policy_number": "string" }
        },
        "reason_for_referral": "string",
        "diagnosis": "string",
        "medications": [ { "name": "string", "dosage": "string", "frequency": "string" } ],
        "allergies": [ "string" ],
        "recent_investigations": [ { "test_name": "string", "date": "YYYY-MM-DD", "result": "string" } ],
        "requested_action": "string",
        "notes": "string",
        "summary": "string"
    })
}

impl EngineConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            WorkflowError::Configuration(format!(
                "Failed to read config file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let mut config: EngineConfig = serde_yaml::from_str(&contents)
            .map_err(|e| WorkflowError::Configuration(format!("Invalid config YAML: {e}")))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(count) = std::env::var("REFERRAL_WORKER_COUNT") {
            self.workers.count = count.parse().map_err(|e| {
                WorkflowError::Configuration(format!("Invalid REFERRAL_WORKER_COUNT: {e}"))
            })?;
        }
        if let Ok(attempts) = std::env::var("REFERRAL_MAX_ATTEMPTS") {
            self.retry.max_attempts = attempts.parse().map_err(|e| {
                WorkflowError::Configuration(format!("Invalid REFERRAL_MAX_ATTEMPTS: {e}"))
            })?;
        }
        if let Ok(timeout) = std::env::var("REFERRAL_VISIBILITY_TIMEOUT_MS") {
            self.queue.visibility_timeout_ms = timeout.parse().map_err(|e| {
                WorkflowError::Configuration(format!("Invalid REFERRAL_VISIBILITY_TIMEOUT_MS: {e}"))
            })?;
        }
        if let Ok(fields) = std::env::var("REFERRAL_REQUIRED_FIELDS") {
            self.validation.required_fields = fields
                .split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
        }
        Ok(())
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers.count == 0 {
            return Err(WorkflowError::Configuration(
                "workers.count must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(WorkflowError::Configuration(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(WorkflowError::Configuration(
                "retry.backoff_multiplier must be >= 1.0".to_string(),
            ));
        }
        if self.validation.required_fields.iter().any(|f| f.is_empty()) {
            return Err(WorkflowError::Configuration(
                "validation.required_fields must not contain empty names".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_production_pipeline() {
        let config = EngineConfig::default();
        assert_eq!(config.workers.count, 2);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.queue.visibility_timeout_ms, 30_000);
        assert_eq!(config.validation.required_fields.len(), 8);
        assert!(config
            .validation
            .required_fields
            .contains(&"patient.date_of_birth".to_string()));
        assert!(config.extraction.schema.get("referring_provider").is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backoff_progression_is_capped() {
        let retry = RetryConfig {
            backoff_base_ms: 500,
            backoff_max_ms: 3000,
            backoff_multiplier: 2.0,
            ..RetryConfig::default()
        };
        assert_eq!(retry.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(retry.delay_for_attempt(2), Duration::from_millis(1000));
        assert_eq!(retry.delay_for_attempt(3), Duration::from_millis(2000));
        assert_eq!(retry.delay_for_attempt(4), Duration::from_millis(3000));
        assert_eq!(retry.delay_for_attempt(10), Duration::from_millis(3000));
    }

    #[test]
    fn test_yaml_loading_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "workers:\n  count: 7\nvalidation:\n  required_fields:\n    - patient.name"
        )
        .unwrap();

        let config = EngineConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.workers.count, 7);
        assert_eq!(config.validation.required_fields, vec!["patient.name"]);
        // Untouched sections keep defaults
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_invalid_configurations_rejected() {
        let mut config = EngineConfig {
            workers: WorkerConfig {
                count: 0,
                ..WorkerConfig::default()
            },
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        config.workers.count = 1;
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        config.retry.max_attempts = 1;
        config.validation.required_fields = vec![String::new()];
        assert!(config.validate().is_err());
    }
}
