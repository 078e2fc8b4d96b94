// ── Wireless debugging handshake ──
//
// Moves one device from USB-tethered control to network control:
//
//   Tethered ──associate──▶ AwaitingAssociation ──settle──▶ SwitchingTransport
//       ──tcpip, device back──▶ DiscoveringAddress ──ip addr──▶ Reconnecting
//       ──connect──▶ Connected
//
// Any failing step ends in `Failed` carrying that step. No step is retried;
// waiting for adbd to come back after the switch is part of step 3.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use droidsweep_api::client::shell_quote;
use droidsweep_api::models::parse_inet_address;

use crate::bridge::DeviceBridge;
use crate::error::CoreError;

/// Handshake tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// How long to wait for Wi-Fi association. Association cannot be
    /// observed over the control channel, so this is a fixed delay.
    pub settle: Duration,
    /// TCP port the device daemon listens on after the switch.
    pub port: u16,
    /// Interface queried for the device address.
    pub interface: String,
    /// How long adbd may take to reappear after the transport switch.
    pub ready_timeout: Duration,
    /// Pause between device listings while waiting for adbd.
    pub poll_interval: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(10),
            port: 5555,
            interface: "wlan0".into(),
            ready_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HandshakeState {
    Tethered,
    AwaitingAssociation,
    SwitchingTransport,
    DiscoveringAddress,
    Reconnecting,
    Connected,
    Failed,
}

impl HandshakeState {
    /// 1-based position in the sequence. `Failed` has no step of its own.
    pub fn step(self) -> u8 {
        match self {
            Self::Tethered => 1,
            Self::AwaitingAssociation => 2,
            Self::SwitchingTransport => 3,
            Self::DiscoveringAddress => 4,
            Self::Reconnecting => 5,
            Self::Connected => 6,
            Self::Failed => 0,
        }
    }
}

/// Network credentials for the association step.
#[derive(Debug, Clone)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: SecretString,
}

/// Terminal failure: the state that was executing and why it failed.
#[derive(Debug)]
pub struct HandshakeFailure {
    pub state: HandshakeState,
    pub error: CoreError,
}

impl From<HandshakeFailure> for CoreError {
    fn from(failure: HandshakeFailure) -> Self {
        CoreError::Handshake {
            step: failure.state.step(),
            state: failure.state.to_string(),
            source: Box::new(failure.error),
        }
    }
}

/// Where a handshake is, with whatever the next step needs.
enum Stage {
    Tethered,
    AwaitingAssociation,
    SwitchingTransport,
    DiscoveringAddress,
    Reconnecting(IpAddr),
    Connected(SocketAddr),
    Failed { at: HandshakeState, error: CoreError },
}

impl Stage {
    fn state(&self) -> HandshakeState {
        match self {
            Self::Tethered => HandshakeState::Tethered,
            Self::AwaitingAssociation => HandshakeState::AwaitingAssociation,
            Self::SwitchingTransport => HandshakeState::SwitchingTransport,
            Self::DiscoveringAddress => HandshakeState::DiscoveringAddress,
            Self::Reconnecting(_) => HandshakeState::Reconnecting,
            Self::Connected(_) => HandshakeState::Connected,
            Self::Failed { .. } => HandshakeState::Failed,
        }
    }
}

pub struct WirelessHandshake<'a> {
    bridge: &'a dyn DeviceBridge,
    config: &'a HandshakeConfig,
}

impl<'a> WirelessHandshake<'a> {
    pub fn new(bridge: &'a dyn DeviceBridge, config: &'a HandshakeConfig) -> Self {
        Self { bridge, config }
    }

    /// Drive `serial` through every state. Returns the address the device
    /// is now reachable at.
    pub async fn run(
        &self,
        serial: &str,
        credentials: &WifiCredentials,
    ) -> Result<SocketAddr, HandshakeFailure> {
        let mut stage = Stage::Tethered;

        loop {
            let at = stage.state();
            debug!(serial, step = at.step(), state = %at, "handshake state");
            let next = match stage {
                Stage::Tethered => self
                    .associate(serial, credentials)
                    .await
                    .map(|()| Stage::AwaitingAssociation),
                Stage::AwaitingAssociation => {
                    tokio::time::sleep(self.config.settle).await;
                    Ok(Stage::SwitchingTransport)
                }
                Stage::SwitchingTransport => self
                    .switch_transport(serial)
                    .await
                    .map(|()| Stage::DiscoveringAddress),
                Stage::DiscoveringAddress => self.discover_address(serial).await.map(Stage::Reconnecting),
                Stage::Reconnecting(ip) => self
                    .bridge
                    .connect(&ip.to_string(), self.config.port)
                    .await
                    .map(|_| Stage::Connected(SocketAddr::new(ip, self.config.port))),
                Stage::Connected(addr) => {
                    info!(serial, %addr, "wireless debugging enabled");
                    return Ok(addr);
                }
                Stage::Failed { at, error } => {
                    warn!(serial, step = at.step(), state = %at, %error, "handshake failed");
                    return Err(HandshakeFailure { state: at, error });
                }
            };
            stage = next.unwrap_or_else(|error| Stage::Failed { at, error });
        }
    }

    async fn associate(&self, serial: &str, credentials: &WifiCredentials) -> Result<(), CoreError> {
        let command = format!(
            "cmd wifi connect-network {} wpa2 {}",
            shell_quote(&credentials.ssid),
            shell_quote(credentials.password.expose_secret())
        );
        let out = self.bridge.shell(serial, &command).await?;
        let lowered = out.to_ascii_lowercase();
        if lowered.contains("exception") || lowered.contains("error") || lowered.contains("fail") {
            return Err(CoreError::Action {
                message: format!("Wi-Fi association rejected: {}", out.trim()),
            });
        }
        Ok(())
    }

    /// `tcpip:` restarts adbd, so the device drops off the bridge for a
    /// moment. Poll until it is listed as usable again.
    async fn switch_transport(&self, serial: &str) -> Result<(), CoreError> {
        self.bridge.tcpip(serial, self.config.port).await?;

        let deadline = Instant::now() + self.config.ready_timeout;
        let mut last_state = String::from("missing");
        loop {
            tokio::time::sleep(self.config.poll_interval).await;
            let devices = self.bridge.list_devices().await?;
            match devices.iter().find(|d| d.serial == serial) {
                Some(d) if d.state == "device" => {
                    debug!(serial, "device back after transport switch");
                    return Ok(());
                }
                Some(d) => last_state.clone_from(&d.state),
                None => last_state = "missing".into(),
            }
            if Instant::now() >= deadline {
                return Err(CoreError::DeviceOffline {
                    serial: serial.to_owned(),
                    state: format!(
                        "{last_state} {}s after switching to TCP mode",
                        self.config.ready_timeout.as_secs()
                    ),
                });
            }
        }
    }

    async fn discover_address(&self, serial: &str) -> Result<IpAddr, CoreError> {
        let command = format!("ip -f inet addr show {}", self.config.interface);
        let out = self.bridge.shell(serial, &command).await?;
        parse_inet_address(&out)
            .map(IpAddr::V4)
            .ok_or_else(|| CoreError::AddressUnavailable {
                interface: self.config.interface.clone(),
            })
    }
}
