// ── Device registry ──
//
// Queries the bridge for attached devices on every call (no caching across
// runs) and splits them into dispatch targets and explicitly requested
// devices that cannot be used.

use std::sync::Arc;

use tracing::debug;

use crate::bridge::DeviceBridge;
use crate::error::CoreError;
use crate::model::{AuthorizationState, Device};

/// Which devices an invocation targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    serials: Vec<String>,
}

impl DeviceFilter {
    /// Every authorized device.
    pub fn all() -> Self {
        Self::default()
    }

    /// Only the named devices, in the given order. Duplicates are dropped.
    pub fn only<I, S>(serials: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for serial in serials {
            let serial = serial.into();
            if !out.contains(&serial) {
                out.push(serial);
            }
        }
        Self { serials: out }
    }

    pub fn is_all(&self) -> bool {
        self.serials.is_empty()
    }

    pub fn serials(&self) -> &[String] {
        &self.serials
    }
}

/// Result of applying a [`DeviceFilter`] to a fresh listing.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Authorized devices to dispatch to.
    pub targets: Vec<Device>,
    /// Explicitly requested devices that are unauthorized or offline. Each
    /// one still receives a failed outcome per action.
    pub rejected: Vec<Device>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.rejected.is_empty()
    }
}

pub struct DeviceRegistry {
    bridge: Arc<dyn DeviceBridge>,
}

impl DeviceRegistry {
    pub fn new(bridge: Arc<dyn DeviceBridge>) -> Self {
        Self { bridge }
    }

    /// Every device the bridge reports, in any state.
    pub async fn list_devices(&self) -> Result<Vec<Device>, CoreError> {
        let entries = self.bridge.list_devices().await?;
        debug!(count = entries.len(), "listed devices");
        Ok(entries.into_iter().map(Device::from).collect())
    }

    /// Resolve `filter` against a fresh listing.
    ///
    /// With no explicit serials, unusable devices are silently excluded. An
    /// explicitly named serial that is not attached at all is
    /// [`CoreError::DeviceNotFound`].
    pub async fn select(&self, filter: &DeviceFilter) -> Result<Selection, CoreError> {
        let devices = self.list_devices().await?;

        if filter.is_all() {
            let (targets, skipped): (Vec<Device>, Vec<Device>) =
                devices.into_iter().partition(|d| d.state.is_authorized());
            for device in &skipped {
                debug!(serial = %device.serial, state = %device.raw_state, "excluding device");
            }
            return Ok(Selection {
                targets,
                rejected: Vec::new(),
            });
        }

        let mut selection = Selection::default();
        for serial in filter.serials() {
            let device = devices
                .iter()
                .find(|d| &d.serial == serial)
                .cloned()
                .ok_or_else(|| CoreError::DeviceNotFound {
                    serial: serial.clone(),
                })?;
            if device.state.is_authorized() {
                selection.targets.push(device);
            } else {
                selection.rejected.push(device);
            }
        }
        Ok(selection)
    }
}

/// The error recorded for a requested device that cannot run actions.
pub(crate) fn rejection_error(device: &Device) -> CoreError {
    match device.state {
        AuthorizationState::Unauthorized => CoreError::DeviceUnauthorized {
            serial: device.serial.clone(),
        },
        AuthorizationState::Offline | AuthorizationState::Authorized => CoreError::DeviceOffline {
            serial: device.serial.clone(),
            state: device.raw_state.clone(),
        },
    }
}
