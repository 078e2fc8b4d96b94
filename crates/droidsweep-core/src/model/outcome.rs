// ── Action outcomes ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, FailureKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "UPPERCASE")]
pub enum OutcomeStatus {
    Passed,
    Failed,
}

/// The result of one action on one device. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    action: String,
    serial: String,
    status: OutcomeStatus,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure: Option<FailureKind>,
    timestamp: DateTime<Utc>,
}

impl ActionOutcome {
    pub fn passed(action: impl Into<String>, serial: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            serial: serial.into(),
            status: OutcomeStatus::Passed,
            message: message.into(),
            failure: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(action: impl Into<String>, serial: impl Into<String>, error: &CoreError) -> Self {
        Self {
            action: action.into(),
            serial: serial.into(),
            status: OutcomeStatus::Failed,
            message: error.to_string(),
            failure: Some(error.failure_kind()),
            timestamp: Utc::now(),
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn status(&self) -> OutcomeStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Category of the failure; `None` for passed outcomes.
    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_passed(&self) -> bool {
        self.status == OutcomeStatus::Passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_carries_kind_and_message() {
        let err = CoreError::DeviceUnauthorized {
            serial: "abc".into(),
        };
        let outcome = ActionOutcome::failed("getProperties", "abc", &err);
        assert!(!outcome.is_passed());
        assert_eq!(outcome.failure(), Some(FailureKind::DeviceUnauthorized));
        assert_eq!(outcome.message(), "Device abc is not authorized for debugging");
        assert_eq!(outcome.status().to_string(), "FAILED");
    }

    #[test]
    fn passed_outcome_has_no_failure() {
        let outcome = ActionOutcome::passed("swipe", "abc", "Swiped");
        assert!(outcome.is_passed());
        assert_eq!(outcome.failure(), None);
        assert_eq!(outcome.action(), "swipe");
    }
}
