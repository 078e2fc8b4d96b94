// ── Core error types ──
//
// Errors surfaced by droidsweep-core. Consumers never see wire-level
// protocol details directly: the `From<droidsweep_api::Error>` impl folds
// transport errors into the categories a run report cares about.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Fatal, before any device is touched ──────────────────────────
    #[error("Cannot reach the ADB server at {addr}: {reason}")]
    Connection { addr: String, reason: String },

    #[error("Unknown action: {name}")]
    UnknownAction { name: String },

    #[error("Invalid parameters for {action}: {message}")]
    InvalidParams { action: String, message: String },

    #[error("Device not found: {serial}")]
    DeviceNotFound { serial: String },

    // ── Per-device, recorded as failed outcomes ──────────────────────
    #[error("Device {serial} is not authorized for debugging")]
    DeviceUnauthorized { serial: String },

    #[error("Device {serial} is not usable (state: {state})")]
    DeviceOffline { serial: String, state: String },

    #[error("{message}")]
    Action { message: String },

    #[error("Capture stream failed: {message}")]
    Stream { message: String },

    #[error("No network address reported on interface {interface}")]
    AddressUnavailable { interface: String },

    #[error("Handshake failed at step {step} ({state}): {source}")]
    Handshake {
        step: u8,
        state: String,
        source: Box<CoreError>,
    },

    #[error("Timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Local I/O ────────────────────────────────────────────────────
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Category of a failed outcome, stable across releases so reports can
/// be filtered by it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    Connection,
    DeviceUnauthorized,
    DeviceOffline,
    Action,
    Stream,
    AddressUnavailable,
    Timeout,
    Io,
}

impl CoreError {
    /// The category recorded on a failed outcome. A handshake failure
    /// reports the category of the step that failed.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Connection { .. } => FailureKind::Connection,
            Self::DeviceUnauthorized { .. } => FailureKind::DeviceUnauthorized,
            Self::DeviceOffline { .. } | Self::DeviceNotFound { .. } => FailureKind::DeviceOffline,
            Self::Stream { .. } => FailureKind::Stream,
            Self::AddressUnavailable { .. } => FailureKind::AddressUnavailable,
            Self::Handshake { source, .. } => source.failure_kind(),
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Io(_) => FailureKind::Io,
            Self::Action { .. } | Self::UnknownAction { .. } | Self::InvalidParams { .. } => {
                FailureKind::Action
            }
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<droidsweep_api::Error> for CoreError {
    fn from(err: droidsweep_api::Error) -> Self {
        match err {
            droidsweep_api::Error::Connect { addr, source } => CoreError::Connection {
                addr,
                reason: source.to_string(),
            },
            droidsweep_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            droidsweep_api::Error::Io(e) => CoreError::Action {
                message: format!("bridge I/O failed: {e}"),
            },
            droidsweep_api::Error::Sync { message } => CoreError::Action {
                message: format!("file transfer failed: {message}"),
            },
            droidsweep_api::Error::Install { message } => CoreError::Action {
                message: format!("install failed: {message}"),
            },
            droidsweep_api::Error::NetworkConnect { target, message } => CoreError::Action {
                message: format!("could not connect to {target}: {message}"),
            },
            droidsweep_api::Error::TransportSwitch { message } => CoreError::Action {
                message: format!("device refused TCP mode: {message}"),
            },
            droidsweep_api::Error::Fail { message } | droidsweep_api::Error::Protocol { message } => {
                CoreError::Action { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_errors_become_connection() {
        let err: CoreError = droidsweep_api::Error::Connect {
            addr: "127.0.0.1:5037".into(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        }
        .into();
        assert!(matches!(err, CoreError::Connection { ref addr, .. } if addr == "127.0.0.1:5037"));
        assert_eq!(err.failure_kind(), FailureKind::Connection);
    }

    #[test]
    fn handshake_reports_inner_kind() {
        let err = CoreError::Handshake {
            step: 4,
            state: "discovering_address".into(),
            source: Box::new(CoreError::AddressUnavailable {
                interface: "wlan0".into(),
            }),
        };
        assert_eq!(err.failure_kind(), FailureKind::AddressUnavailable);
        assert_eq!(
            err.to_string(),
            "Handshake failed at step 4 (discovering_address): No network address reported on interface wlan0"
        );
    }

    #[test]
    fn failure_kind_display_is_snake_case() {
        assert_eq!(FailureKind::DeviceUnauthorized.to_string(), "device_unauthorized");
    }
}
