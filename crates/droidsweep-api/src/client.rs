// ADB host-protocol client
//
// Opens one TCP connection per service, as the ADB server expects, and
// layers the well-known convenience operations (properties, packages,
// install, pull, forward, tcpip, connect) over the raw `host:` and device
// services.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::error::Error;
use crate::models::{self, DeviceEntry};
use crate::protocol;
use crate::stream::{self, EventStream};
use crate::sync;
use crate::transport::{TransportConfig, within};

/// Directory pushed packages are staged in before `pm install`.
const STAGING_DIR: &str = "/data/local/tmp";

/// Raw client for the ADB server's host protocol.
///
/// Holds only configuration, so it is cheap to clone and safe to share
/// across concurrent tasks: every call opens its own connection.
#[derive(Debug, Clone, Default)]
pub struct AdbClient {
    transport: TransportConfig,
}

impl AdbClient {
    /// Create a client for the server described by `transport`.
    pub fn new(transport: TransportConfig) -> Self {
        Self { transport }
    }

    /// The transport configuration in use.
    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    // ── Connection helpers ──────────────────────────────────────────

    /// Open a connection and issue a host request, consuming the status.
    async fn host_request(&self, payload: &str) -> Result<TcpStream, Error> {
        let mut conn = self.transport.connect().await?;
        debug!(request = payload, "host request");
        within(self.transport.connect_timeout, async {
            protocol::send_request(&mut conn, payload).await?;
            protocol::read_status(&mut conn).await
        })
        .await??;
        Ok(conn)
    }

    /// Issue a host request whose reply is a single hex-prefixed string.
    async fn host_query(&self, payload: &str) -> Result<String, Error> {
        let mut conn = self.host_request(payload).await?;
        within(
            self.transport.connect_timeout,
            protocol::read_hex_prefixed(&mut conn),
        )
        .await?
    }

    /// Switch a fresh connection to `serial` and open `service` on it.
    async fn device_request(&self, serial: &str, service: &str) -> Result<TcpStream, Error> {
        let mut conn = self.host_request(&format!("host:transport:{serial}")).await?;
        debug!(serial, service, "device request");
        within(self.transport.connect_timeout, async {
            protocol::send_request(&mut conn, service).await?;
            protocol::read_status(&mut conn).await
        })
        .await??;
        Ok(conn)
    }

    // ── Host services ───────────────────────────────────────────────

    /// Internal protocol version of the running server.
    pub async fn version(&self) -> Result<u32, Error> {
        let body = self.host_query("host:version").await?;
        u32::from_str_radix(body.trim(), 16).map_err(|_| Error::Protocol {
            message: format!("invalid version reply {body:?}"),
        })
    }

    /// Every device the server currently tracks, in any state.
    pub async fn list_devices(&self) -> Result<Vec<DeviceEntry>, Error> {
        let body = self.host_query("host:devices-l").await?;
        Ok(models::parse_devices(&body))
    }

    /// Connect the server to a device listening on the network.
    ///
    /// Returns the server's confirmation text.
    pub async fn connect(&self, host: &str, port: u16) -> Result<String, Error> {
        let target = format!("{host}:{port}");
        let reply = self.host_query(&format!("host:connect:{target}")).await?;
        let reply = reply.trim().to_owned();
        if reply.starts_with("connected to") || reply.starts_with("already connected to") {
            debug!(%target, "network transport connected");
            Ok(reply)
        } else {
            Err(Error::NetworkConnect {
                target,
                message: reply,
            })
        }
    }

    /// Forward `local` on the host to `remote` on the device, e.g.
    /// `tcp:9222` to `localabstract:chrome_devtools_remote`.
    pub async fn forward(&self, serial: &str, local: &str, remote: &str) -> Result<(), Error> {
        let mut conn = self
            .host_request(&format!("host-serial:{serial}:forward:{local};{remote}"))
            .await?;
        // The server acknowledges the request, then the forward itself.
        within(
            self.transport.connect_timeout,
            protocol::read_status(&mut conn),
        )
        .await??;
        debug!(serial, local, remote, "forward established");
        Ok(())
    }

    // ── Device services ─────────────────────────────────────────────

    /// Run `command` through `shell:` and collect all output.
    pub async fn shell(&self, serial: &str, command: &str) -> Result<Vec<u8>, Error> {
        let mut conn = self.device_request(serial, &format!("shell:{command}")).await?;
        within(
            self.transport.command_timeout,
            protocol::read_to_close(&mut conn),
        )
        .await?
    }

    /// [`shell`](Self::shell), decoded lossily as UTF-8.
    pub async fn shell_text(&self, serial: &str, command: &str) -> Result<String, Error> {
        let out = self.shell(serial, command).await?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Run `command` through `exec-out:` and hand back the raw output as a
    /// stream of chunk events. No line-ending translation is applied, so
    /// binary output (PNG screenshots) arrives intact. The channel ends with
    /// an error event if it stays open past the command timeout.
    pub async fn exec_out_stream(&self, serial: &str, command: &str) -> Result<EventStream, Error> {
        let conn = self
            .device_request(serial, &format!("exec-out:{command}"))
            .await?;
        Ok(stream::events_from_reader(
            conn,
            self.transport.command_timeout,
        ))
    }

    /// All system properties of the device.
    pub async fn get_properties(&self, serial: &str) -> Result<BTreeMap<String, String>, Error> {
        let out = self.shell_text(serial, "getprop").await?;
        Ok(models::parse_properties(&out))
    }

    /// Names of every installed package.
    pub async fn get_packages(&self, serial: &str) -> Result<Vec<String>, Error> {
        let out = self.shell_text(serial, "pm list packages 2>/dev/null").await?;
        Ok(models::parse_packages(&out))
    }

    /// Push bytes to a path on the device through the sync service.
    pub async fn push(&self, serial: &str, data: &[u8], remote: &str, mode: u32) -> Result<(), Error> {
        let mut conn = self.device_request(serial, "sync:").await?;
        let mtime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX));
        within(
            self.transport.command_timeout,
            sync::push(&mut conn, data, remote, mode, mtime),
        )
        .await?
    }

    /// Fetch a file from the device through the sync service.
    pub async fn pull(&self, serial: &str, remote: &str) -> Result<Bytes, Error> {
        let mut conn = self.device_request(serial, "sync:").await?;
        within(
            self.transport.command_timeout,
            sync::pull(&mut conn, remote),
        )
        .await?
    }

    /// Install a local package file: stage it, `pm install -r`, clean up.
    pub async fn install(&self, serial: &str, package: &Path) -> Result<(), Error> {
        let data = tokio::fs::read(package).await?;
        let file_name = package
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("package.apk");
        let remote = format!("{STAGING_DIR}/{file_name}");

        self.push(serial, &data, &remote, sync::DEFAULT_MODE).await?;

        let out = self
            .shell_text(serial, &format!("pm install -r {}", shell_quote(&remote)))
            .await;

        if let Err(e) = self
            .shell(serial, &format!("rm -f {}", shell_quote(&remote)))
            .await
        {
            warn!(serial, remote, error = %e, "failed to remove staged package");
        }

        let out = out?;
        if out.contains("Success") {
            debug!(serial, package = %package.display(), "package installed");
            Ok(())
        } else {
            Err(Error::Install {
                message: install_failure_reason(&out),
            })
        }
    }

    /// Restart the device's daemon listening on TCP `port`.
    pub async fn tcpip(&self, serial: &str, port: u16) -> Result<(), Error> {
        let mut conn = self.device_request(serial, &format!("tcpip:{port}")).await?;
        let out = within(
            self.transport.connect_timeout,
            protocol::read_to_close(&mut conn),
        )
        .await??;
        let text = String::from_utf8_lossy(&out);
        if text.contains("restarting in TCP mode") {
            Ok(())
        } else {
            Err(Error::TransportSwitch {
                message: text.trim().to_owned(),
            })
        }
    }
}

/// Quote `value` for a POSIX shell using single quotes.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Pull the `Failure [REASON]` part out of `pm install` output.
fn install_failure_reason(output: &str) -> String {
    output
        .lines()
        .find_map(|line| {
            let start = line.find("Failure [")?;
            Some(line[start..].trim().to_owned())
        })
        .unwrap_or_else(|| {
            let trimmed = output.trim();
            if trimmed.is_empty() {
                "no output from package manager".into()
            } else {
                trimmed.to_owned()
            }
        })
}
