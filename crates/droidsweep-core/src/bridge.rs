// ── Bridge seam ──
//
// Everything core needs from the control connection, as an object-safe
// trait. `AdbClient` is the production implementation; tests substitute an
// in-process fake.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use droidsweep_api::{AdbClient, DeviceEntry, EventStream};

use crate::error::CoreError;

/// Operations the orchestrator issues against the bridge daemon.
///
/// Implementations must be safe to call concurrently from many device
/// tasks.
#[async_trait]
pub trait DeviceBridge: Send + Sync {
    /// Human-readable address of the daemon, for error messages.
    fn endpoint(&self) -> String;

    async fn list_devices(&self) -> Result<Vec<DeviceEntry>, CoreError>;

    /// Run a shell command and return its combined output.
    async fn shell(&self, serial: &str, command: &str) -> Result<String, CoreError>;

    /// Run a command and expose its raw output as a chunk stream.
    async fn exec_out_stream(&self, serial: &str, command: &str) -> Result<EventStream, CoreError>;

    async fn get_properties(&self, serial: &str) -> Result<BTreeMap<String, String>, CoreError>;

    async fn get_packages(&self, serial: &str) -> Result<Vec<String>, CoreError>;

    async fn install(&self, serial: &str, package: &Path) -> Result<(), CoreError>;

    /// Fetch a file from the device.
    async fn pull(&self, serial: &str, remote: &str) -> Result<Bytes, CoreError>;

    async fn forward(&self, serial: &str, local: &str, remote: &str) -> Result<(), CoreError>;

    /// Switch the device's daemon to listen on TCP `port`.
    async fn tcpip(&self, serial: &str, port: u16) -> Result<(), CoreError>;

    /// Attach a network device to the daemon.
    async fn connect(&self, host: &str, port: u16) -> Result<String, CoreError>;
}

#[async_trait]
impl DeviceBridge for AdbClient {
    fn endpoint(&self) -> String {
        self.transport().addr()
    }

    async fn list_devices(&self) -> Result<Vec<DeviceEntry>, CoreError> {
        Ok(AdbClient::list_devices(self).await?)
    }

    async fn shell(&self, serial: &str, command: &str) -> Result<String, CoreError> {
        Ok(self.shell_text(serial, command).await?)
    }

    async fn exec_out_stream(&self, serial: &str, command: &str) -> Result<EventStream, CoreError> {
        Ok(AdbClient::exec_out_stream(self, serial, command).await?)
    }

    async fn get_properties(&self, serial: &str) -> Result<BTreeMap<String, String>, CoreError> {
        Ok(AdbClient::get_properties(self, serial).await?)
    }

    async fn get_packages(&self, serial: &str) -> Result<Vec<String>, CoreError> {
        Ok(AdbClient::get_packages(self, serial).await?)
    }

    async fn install(&self, serial: &str, package: &Path) -> Result<(), CoreError> {
        Ok(AdbClient::install(self, serial, package).await?)
    }

    async fn pull(&self, serial: &str, remote: &str) -> Result<Bytes, CoreError> {
        Ok(AdbClient::pull(self, serial, remote).await?)
    }

    async fn forward(&self, serial: &str, local: &str, remote: &str) -> Result<(), CoreError> {
        Ok(AdbClient::forward(self, serial, local, remote).await?)
    }

    async fn tcpip(&self, serial: &str, port: u16) -> Result<(), CoreError> {
        Ok(AdbClient::tcpip(self, serial, port).await?)
    }

    async fn connect(&self, host: &str, port: u16) -> Result<String, CoreError> {
        Ok(AdbClient::connect(self, host, port).await?)
    }
}
