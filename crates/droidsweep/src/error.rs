//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use droidsweep_config::ConfigError;
use droidsweep_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    /// Second Ctrl-C while a run was draining.
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the ADB server at {addr}")]
    #[diagnostic(
        code(droidsweep::connection_failed),
        help(
            "Check that the ADB server is running (`adb start-server`).\n\
             Reason: {reason}\n\
             Use --bridge HOST:PORT to point at a different server."
        )
    )]
    ConnectionFailed { addr: String, reason: String },

    #[error("Bridge request timed out after {seconds}s")]
    #[diagnostic(
        code(droidsweep::timeout),
        help("Increase the timeout with --timeout or check the ADB server.")
    )]
    Timeout { seconds: u64 },

    // ── Usage ────────────────────────────────────────────────────────
    #[error("Unknown action '{name}'")]
    #[diagnostic(
        code(droidsweep::unknown_action),
        help("Run: droidsweep actions to see the catalog")
    )]
    UnknownAction { name: String },

    #[error("Invalid parameters for {action}: {message}")]
    #[diagnostic(
        code(droidsweep::invalid_params),
        help("Pass parameters as -P KEY=VALUE. Run: droidsweep actions")
    )]
    InvalidParams { action: String, message: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(droidsweep::validation))]
    Validation { field: String, reason: String },

    // ── Devices ──────────────────────────────────────────────────────
    #[error("Device '{serial}' not found")]
    #[diagnostic(
        code(droidsweep::device_not_found),
        help("Run: droidsweep devices to see attached devices")
    )]
    DeviceNotFound { serial: String },

    // ── Run results ──────────────────────────────────────────────────
    #[error("{failed} of {total} outcomes failed")]
    #[diagnostic(code(droidsweep::run_failed))]
    RunFailed { failed: usize, total: usize },

    #[error("Run cancelled after {recorded} outcomes")]
    #[diagnostic(code(droidsweep::cancelled))]
    Cancelled { recorded: usize },

    #[error("{message}")]
    #[diagnostic(code(droidsweep::action))]
    Action { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(droidsweep::config),
        help("Check the config file. Run: droidsweep config path")
    )]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to render output: {0}")]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => exit_code::CONNECTION,
            Self::UnknownAction { .. } | Self::InvalidParams { .. } | Self::Validation { .. } => {
                exit_code::USAGE
            }
            Self::DeviceNotFound { .. } => exit_code::NOT_FOUND,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Connection { addr, reason } => Self::ConnectionFailed { addr, reason },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::UnknownAction { name } => Self::UnknownAction { name },
            CoreError::InvalidParams { action, message } => Self::InvalidParams { action, message },
            CoreError::DeviceNotFound { serial } => Self::DeviceNotFound { serial },
            CoreError::Io(e) => Self::Io(e),
            other => Self::Action {
                message: other.to_string(),
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_category() {
        let connection = CliError::from(CoreError::Connection {
            addr: "127.0.0.1:1".into(),
            reason: "refused".into(),
        });
        assert_eq!(connection.exit_code(), exit_code::CONNECTION);

        let unknown = CliError::from(CoreError::UnknownAction {
            name: "fly".into(),
        });
        assert_eq!(unknown.exit_code(), exit_code::USAGE);

        let missing = CliError::from(CoreError::DeviceNotFound {
            serial: "zz".into(),
        });
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);

        let failed = CliError::RunFailed { failed: 1, total: 3 };
        assert_eq!(failed.exit_code(), exit_code::GENERAL);
        assert_eq!(failed.to_string(), "1 of 3 outcomes failed");
    }
}
