// ── Device domain types ──

use std::net::SocketAddr;

use droidsweep_api::DeviceEntry;
use serde::{Deserialize, Serialize};

/// Whether a device accepts debugging commands.
///
/// The bridge reports many raw states (`device`, `unauthorized`,
/// `offline`, `recovery`, `no permissions`, ...). Only `device` is usable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthorizationState {
    Authorized,
    Unauthorized,
    Offline,
}

impl AuthorizationState {
    /// Classify a raw bridge state string.
    pub fn from_bridge_state(state: &str) -> Self {
        match state {
            "device" => Self::Authorized,
            "unauthorized" | "authorizing" => Self::Unauthorized,
            _ => Self::Offline,
        }
    }

    pub fn is_authorized(self) -> bool {
        matches!(self, Self::Authorized)
    }
}

/// A device known to the bridge at listing time.
///
/// Snapshot semantics: the state is captured once per invocation and not
/// re-checked before each action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub serial: String,
    pub state: AuthorizationState,
    /// State string exactly as the bridge reported it.
    pub raw_state: String,
    pub model: Option<String>,
    pub product: Option<String>,
    /// Set when the device is attached over the network (`host:port` serial).
    pub address: Option<SocketAddr>,
}

impl Device {
    /// Model name if known, otherwise the serial.
    pub fn display_name(&self) -> &str {
        self.model.as_deref().unwrap_or(&self.serial)
    }

    pub fn is_wireless(&self) -> bool {
        self.address.is_some()
    }
}

impl From<DeviceEntry> for Device {
    fn from(entry: DeviceEntry) -> Self {
        Self {
            state: AuthorizationState::from_bridge_state(&entry.state),
            address: entry.serial.parse().ok(),
            serial: entry.serial,
            raw_state: entry.state,
            model: entry.model,
            product: entry.product,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn entry(serial: &str, state: &str) -> DeviceEntry {
        DeviceEntry {
            serial: serial.into(),
            state: state.into(),
            product: None,
            model: None,
            device: None,
            transport_id: None,
        }
    }

    #[test]
    fn classifies_bridge_states() {
        assert_eq!(
            AuthorizationState::from_bridge_state("device"),
            AuthorizationState::Authorized
        );
        assert_eq!(
            AuthorizationState::from_bridge_state("unauthorized"),
            AuthorizationState::Unauthorized
        );
        for raw in ["offline", "recovery", "sideload", "no permissions"] {
            assert_eq!(
                AuthorizationState::from_bridge_state(raw),
                AuthorizationState::Offline,
                "{raw}"
            );
        }
    }

    #[test]
    fn network_serials_carry_an_address() {
        let wireless = Device::from(entry("192.168.1.20:5555", "device"));
        assert_eq!(
            wireless.address,
            Some("192.168.1.20:5555".parse().unwrap())
        );
        assert!(wireless.is_wireless());

        let usb = Device::from(entry("R58N12ABCDE", "device"));
        assert!(!usb.is_wireless());
        assert_eq!(usb.display_name(), "R58N12ABCDE");
    }
}
