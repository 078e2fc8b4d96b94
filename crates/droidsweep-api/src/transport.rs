// Shared transport configuration for reaching the ADB server.
//
// Every host-protocol service consumes its own TCP connection, so the
// client only carries this configuration and opens sockets on demand.

use std::future::Future;
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::trace;

use crate::error::Error;

/// Default host of the ADB server.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default port of the ADB server.
pub const DEFAULT_PORT: u16 = 5037;

/// Shared transport configuration for opening bridge connections.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    /// Deadline for establishing a connection and reading short replies.
    pub connect_timeout: Duration,
    /// Deadline for long-running device commands (shell, install, push).
    pub command_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(300),
        }
    }
}

impl TransportConfig {
    /// Build a config for a specific server address with default timeouts.
    pub fn for_address(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// `host:port` of the ADB server.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open a fresh TCP connection to the ADB server.
    pub async fn connect(&self) -> Result<TcpStream, Error> {
        let addr = self.addr();
        trace!(%addr, "opening bridge connection");
        let stream = within(self.connect_timeout, TcpStream::connect(&addr))
            .await?
            .map_err(|source| Error::Connect {
                addr: addr.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// Run `fut` with a deadline, mapping expiry to [`Error::Timeout`].
pub(crate) async fn within<F: Future>(limit: Duration, fut: F) -> Result<F::Output, Error> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout {
            timeout_secs: limit.as_secs(),
        })
}
