use serde::{Deserialize, Serialize};
use std::fmt;

/// Document workflow state definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    /// Initial state, set at enqueue time
    Queued,
    /// A worker is running OCR + LLM extraction
    Extracting,
    /// Extracted fields are being checked against the required set
    Validating,
    /// All required fields present; records-system sync in flight
    Syncing,
    /// Synced into the records system
    Synced,
    /// Required fields missing; notification in flight
    NotifyingMissingInfo,
    /// Notification sent; waiting on a human to supply the missing fields
    AwaitingInfo,
    /// Retry budget exhausted
    Failed,
}

impl DocumentState {
    /// Check if this is a terminal state (no further automatic transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Synced | Self::AwaitingInfo | Self::Failed)
    }

    /// Check if a worker currently owns the document
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Extracting | Self::Validating | Self::Syncing | Self::NotifyingMissingInfo
        )
    }

    /// Check if this is a successful terminal state
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Synced | Self::AwaitingInfo)
    }
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Extracting => write!(f, "extracting"),
            Self::Validating => write!(f, "validating"),
            Self::Syncing => write!(f, "syncing"),
            Self::Synced => write!(f, "synced"),
            Self::NotifyingMissingInfo => write!(f, "notifying_missing_info"),
            Self::AwaitingInfo => write!(f, "awaiting_info"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for DocumentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "extracting" => Ok(Self::Extracting),
            "validating" => Ok(Self::Validating),
            "syncing" => Ok(Self::Syncing),
            "synced" => Ok(Self::Synced),
            "notifying_missing_info" => Ok(Self::NotifyingMissingInfo),
            "awaiting_info" => Ok(Self::AwaitingInfo),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid document state: {s}")),
        }
    }
}

/// Default state for newly enqueued documents
impl Default for DocumentState {
    fn default() -> Self {
        Self::Queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_check() {
        assert!(DocumentState::Synced.is_terminal());
        assert!(DocumentState::AwaitingInfo.is_terminal());
        assert!(DocumentState::Failed.is_terminal());
        assert!(!DocumentState::Queued.is_terminal());
        assert!(!DocumentState::Extracting.is_terminal());
        assert!(!DocumentState::Syncing.is_terminal());
    }

    #[test]
    fn test_active_check() {
        assert!(DocumentState::Extracting.is_active());
        assert!(DocumentState::NotifyingMissingInfo.is_active());
        assert!(!DocumentState::Queued.is_active());
        assert!(!DocumentState::Synced.is_active());
    }

    #[test]
    fn test_success_check() {
        assert!(DocumentState::Synced.is_success());
        assert!(DocumentState::AwaitingInfo.is_success());
        assert!(!DocumentState::Failed.is_success());
    }

    #[test]
    fn test_state_string_conversion() {
        assert_eq!(
            DocumentState::NotifyingMissingInfo.to_string(),
            "notifying_missing_info"
        );
        assert_eq!(
            "awaiting_info".parse::<DocumentState>().unwrap(),
            DocumentState::AwaitingInfo
        );
        assert!("unknown_state".parse::<DocumentState>().is_err());
    }

    #[test]
    fn test_state_serde() {
        let state = DocumentState::Extracting;
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, "\"extracting\"");

        let parsed: DocumentState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
