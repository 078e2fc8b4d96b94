use thiserror::Error;

/// Top-level error type for the `droidsweep-api` crate.
///
/// Covers every failure mode of the bridge conversation: reaching the
/// daemon, the host-protocol framing, device services, and the sync
/// sub-protocol. `droidsweep-core` maps these into run-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// The ADB server could not be reached (refused, unroutable, etc.)
    #[error("Cannot reach ADB server at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A connect or command exceeded its deadline.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Socket I/O failed after the connection was established.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── Protocol ────────────────────────────────────────────────────
    /// The server answered `FAIL` with a reason.
    #[error("ADB server refused request: {message}")]
    Fail { message: String },

    /// The server sent something that does not follow the host protocol.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// The sync sub-protocol reported a failure.
    #[error("Sync failed: {message}")]
    Sync { message: String },

    // ── Device services ─────────────────────────────────────────────
    /// `pm install` did not report success.
    #[error("Install failed: {message}")]
    Install { message: String },

    /// A network (re)connect through `host:connect` was rejected.
    #[error("Connect to {target} failed: {message}")]
    NetworkConnect { target: String, message: String },

    /// `tcpip:` did not acknowledge the transport switch.
    #[error("Transport switch failed: {message}")]
    TransportSwitch { message: String },
}

impl Error {
    /// Returns `true` if the daemon itself is unreachable, as opposed to a
    /// single device or command failing.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connect { .. } | Self::Timeout { .. } => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    /// Returns `true` if the server reported the addressed device as absent.
    pub fn is_device_not_found(&self) -> bool {
        match self {
            Self::Fail { message } => message.contains("not found"),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_errors_are_unreachable_and_transient() {
        let err = Error::Connect {
            addr: "127.0.0.1:5037".into(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        assert!(err.is_unreachable());
        assert!(err.is_transient());
    }

    #[test]
    fn fail_with_not_found_is_detected() {
        let err = Error::Fail {
            message: "device 'emulator-5554' not found".into(),
        };
        assert!(err.is_device_not_found());
        assert!(!err.is_unreachable());
        assert!(!err.is_transient());
    }
}
