// ── Action catalog ──
//
// Static mapping from action key to `ActionSpec`, built once on first use
// and read-only afterwards, so concurrent dispatches share it freely.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::CoreError;
use crate::model::{ActionKind, ActionSpec, CompletionMode, ParamSpec};

/// Order of the full sweep when the caller does not supply one.
pub const DEFAULT_SWEEP: &[&str] = &[
    "listDevices",
    "getProperties",
    "installPackage",
    "getPackages",
    "captureScreen",
    "sendText",
    "swipe",
];

// ── Parameter schemas ────────────────────────────────────────────────

const INSTALL_PARAMS: &[ParamSpec] = &[ParamSpec::required("path", "Local path of the APK to install")];
const TEXT_PARAMS: &[ParamSpec] = &[ParamSpec::required("text", "Text to type")];
const SWIPE_PARAMS: &[ParamSpec] = &[
    ParamSpec::with_default("x1", "Start X", "500"),
    ParamSpec::with_default("y1", "Start Y", "1000"),
    ParamSpec::with_default("x2", "End X", "500"),
    ParamSpec::with_default("y2", "End Y", "200"),
    ParamSpec::with_default("duration_ms", "Gesture duration in milliseconds", "500"),
];
const TAP_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("x", "X coordinate"),
    ParamSpec::required("y", "Y coordinate"),
];
const KEY_PARAMS: &[ParamSpec] = &[ParamSpec::required("code", "Android key code")];
const CAPTURE_PARAMS: &[ParamSpec] = &[ParamSpec::with_default(
    "name",
    "Artifact base name; the device serial is appended",
    "screenshot",
)];
const RECORD_PARAMS: &[ParamSpec] = &[
    ParamSpec::with_default(
        "name",
        "Artifact base name; the device serial is appended",
        "recording",
    ),
    ParamSpec::with_default("seconds", "Recording length, 1 to 180", "10"),
];
const FORWARD_PARAMS: &[ParamSpec] = &[
    ParamSpec::with_default("local", "Host endpoint", "tcp:9222"),
    ParamSpec::with_default(
        "remote",
        "Device endpoint",
        "localabstract:chrome_devtools_remote",
    ),
];
const WIFI_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("ssid", "Wi-Fi network to join"),
    ParamSpec::required("password", "Wi-Fi passphrase"),
];

// ── Specs ────────────────────────────────────────────────────────────

const fn immediate(
    name: &'static str,
    summary: &'static str,
    kind: ActionKind,
    params: &'static [ParamSpec],
) -> ActionSpec {
    ActionSpec {
        name,
        summary,
        kind,
        mode: CompletionMode::Immediate,
        params,
    }
}

const fn preset(name: &'static str, summary: &'static str, code: u32) -> ActionSpec {
    immediate(name, summary, ActionKind::KeyPreset(code), &[])
}

static SPECS: &[ActionSpec] = &[
    immediate(
        "listDevices",
        "Confirm each device is attached and authorized",
        ActionKind::ListDevices,
        &[],
    ),
    immediate(
        "getProperties",
        "Read model, brand and Android version",
        ActionKind::GetProperties,
        &[],
    ),
    immediate(
        "installPackage",
        "Push and install an APK",
        ActionKind::InstallPackage,
        INSTALL_PARAMS,
    ),
    immediate(
        "getPackages",
        "List installed packages",
        ActionKind::GetPackages,
        &[],
    ),
    immediate(
        "sendText",
        "Type text into the focused field",
        ActionKind::SendText,
        TEXT_PARAMS,
    ),
    immediate(
        "swipe",
        "Swipe between two points (defaults scroll down)",
        ActionKind::Swipe,
        SWIPE_PARAMS,
    ),
    immediate(
        "tap",
        "Tap a screen coordinate",
        ActionKind::Tap,
        TAP_PARAMS,
    ),
    immediate(
        "keyEvent",
        "Send a raw key code",
        ActionKind::KeyEvent,
        KEY_PARAMS,
    ),
    preset("home", "Press the home key", 3),
    preset("back", "Press the back key", 4),
    preset("search", "Press the search key", 84),
    preset("settings", "Open settings", 176),
    preset("contacts", "Open contacts", 207),
    ActionSpec {
        name: "captureScreen",
        summary: "Capture a PNG screenshot",
        kind: ActionKind::CaptureScreen,
        mode: CompletionMode::Streamed,
        params: CAPTURE_PARAMS,
    },
    ActionSpec {
        name: "screenRecord",
        summary: "Record the screen and pull the MP4",
        kind: ActionKind::ScreenRecord,
        mode: CompletionMode::MultiStep,
        params: RECORD_PARAMS,
    },
    immediate(
        "forwardDevTools",
        "Forward a host port to the device (Chrome DevTools by default)",
        ActionKind::ForwardPort,
        FORWARD_PARAMS,
    ),
    ActionSpec {
        name: "enableWirelessDebug",
        summary: "Move the device from USB to network debugging",
        kind: ActionKind::EnableWirelessDebug,
        mode: CompletionMode::MultiStep,
        params: WIFI_PARAMS,
    },
];

static CATALOG: LazyLock<ActionCatalog> = LazyLock::new(|| ActionCatalog::from_specs(SPECS));

/// Read-only lookup over the known actions.
#[derive(Debug)]
pub struct ActionCatalog {
    specs: &'static [ActionSpec],
    by_key: HashMap<String, &'static ActionSpec>,
}

impl ActionCatalog {
    /// The process-wide catalog.
    pub fn global() -> &'static Self {
        &CATALOG
    }

    fn from_specs(specs: &'static [ActionSpec]) -> Self {
        let by_key = specs
            .iter()
            .map(|spec| (spec.name.to_ascii_lowercase(), spec))
            .collect();
        Self { specs, by_key }
    }

    /// Look up an action by key, ignoring ASCII case.
    pub fn resolve(&self, name: &str) -> Result<&'static ActionSpec, CoreError> {
        self.by_key
            .get(&name.trim().to_ascii_lowercase())
            .copied()
            .ok_or_else(|| CoreError::UnknownAction {
                name: name.to_owned(),
            })
    }

    /// Every spec, in catalog order.
    pub fn specs(&self) -> &'static [ActionSpec] {
        self.specs
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn resolves_case_insensitively() {
        let catalog = ActionCatalog::global();
        assert_eq!(catalog.resolve("captureScreen").unwrap().name, "captureScreen");
        assert_eq!(catalog.resolve("CAPTURESCREEN").unwrap().name, "captureScreen");
        assert_eq!(
            catalog.resolve("captureScreen").unwrap().mode,
            CompletionMode::Streamed
        );
    }

    #[test]
    fn unknown_action_is_an_error() {
        let err = ActionCatalog::global().resolve("reboot").unwrap_err();
        assert!(matches!(err, CoreError::UnknownAction { ref name } if name == "reboot"));
    }

    #[test]
    fn keys_are_unique() {
        let catalog = ActionCatalog::global();
        assert_eq!(catalog.by_key.len(), catalog.specs().len());
    }

    #[test]
    fn default_sweep_only_names_known_actions() {
        for name in DEFAULT_SWEEP {
            assert!(ActionCatalog::global().resolve(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn recording_and_forward_are_listed() {
        let catalog = ActionCatalog::global();
        assert_eq!(
            catalog.resolve("screenrecord").unwrap().mode,
            CompletionMode::MultiStep
        );
        let forward = catalog.resolve("forwardDevTools").unwrap();
        assert_eq!(forward.kind, ActionKind::ForwardPort);
        assert_eq!(forward.params[0].default, Some("tcp:9222"));
    }

    #[test]
    fn presets_map_to_fixed_codes() {
        let home = ActionCatalog::global().resolve("home").unwrap();
        assert_eq!(home.kind, ActionKind::KeyPreset(3));
        let contacts = ActionCatalog::global().resolve("contacts").unwrap();
        assert_eq!(contacts.kind, ActionKind::KeyPreset(207));
    }
}
