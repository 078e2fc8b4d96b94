// ── Action specs and bound actions ──
//
// An `ActionSpec` is the static, catalog-level description of an action:
// its key, the parameters it accepts and how its completion is signalled.
// Binding a spec against caller parameters yields an `Action`, the tagged
// variant the dispatcher executes on every device.

use std::collections::BTreeMap;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::Serialize;

use crate::capture::MAX_RECORDING_SECS;
use crate::error::CoreError;

/// Caller-supplied `key=value` parameters for one invocation.
pub type ActionParams = BTreeMap<String, String>;

/// How an action signals that it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CompletionMode {
    /// One request, one response.
    Immediate,
    /// Output arrives as a chunked data channel that must run to completion.
    Streamed,
    /// An ordered sequence of dependent steps with a terminal state.
    MultiStep,
}

/// One parameter an action accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Used when neither the caller nor the configuration supplies a value.
    pub default: Option<&'static str>,
}

impl ParamSpec {
    pub const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            default: None,
        }
    }

    pub const fn with_default(
        name: &'static str,
        description: &'static str,
        default: &'static str,
    ) -> Self {
        Self {
            name,
            description,
            default: Some(default),
        }
    }
}

/// Which code path an action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActionKind {
    ListDevices,
    GetProperties,
    InstallPackage,
    GetPackages,
    SendText,
    Swipe,
    Tap,
    KeyEvent,
    /// A `keyevent` with a fixed code (home, back, ...).
    KeyPreset(u32),
    CaptureScreen,
    ScreenRecord,
    ForwardPort,
    EnableWirelessDebug,
}

/// Static description of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionSpec {
    /// Unique catalog key, camelCase.
    pub name: &'static str,
    pub summary: &'static str,
    pub kind: ActionKind,
    pub mode: CompletionMode,
    pub params: &'static [ParamSpec],
}

/// Values the configuration supplies when the caller does not.
#[derive(Debug, Clone)]
pub struct ActionDefaults {
    pub package_path: Option<PathBuf>,
    pub text: String,
    pub wifi_ssid: Option<String>,
    pub wifi_password: Option<SecretString>,
}

impl Default for ActionDefaults {
    fn default() -> Self {
        Self {
            package_path: None,
            text: "Hello, World!".into(),
            wifi_ssid: None,
            wifi_password: None,
        }
    }
}

/// An action with every parameter resolved.
#[derive(Debug, Clone)]
pub enum Action {
    ListDevices,
    GetProperties,
    InstallPackage {
        path: PathBuf,
    },
    GetPackages,
    SendText {
        text: String,
    },
    Swipe {
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        duration_ms: u32,
    },
    Tap {
        x: u32,
        y: u32,
    },
    KeyEvent {
        code: u32,
    },
    CaptureScreen {
        name: String,
    },
    ScreenRecord {
        name: String,
        seconds: u32,
    },
    ForwardPort {
        local: String,
        remote: String,
    },
    EnableWirelessDebug {
        ssid: String,
        password: SecretString,
    },
}

impl Action {
    /// The `input` shell command for input-injection actions.
    pub fn input_command(&self) -> Option<String> {
        match self {
            Self::SendText { text } => Some(format!(
                "input text {}",
                droidsweep_api::client::shell_quote(&encode_input_text(text))
            )),
            Self::Swipe {
                x1,
                y1,
                x2,
                y2,
                duration_ms,
            } => Some(format!("input swipe {x1} {y1} {x2} {y2} {duration_ms}")),
            Self::Tap { x, y } => Some(format!("input tap {x} {y}")),
            Self::KeyEvent { code } => Some(format!("input keyevent {code}")),
            _ => None,
        }
    }
}

/// `input text` treats a space as an argument separator; `%s` is its
/// escape for a literal space.
pub fn encode_input_text(text: &str) -> String {
    text.replace(' ', "%s")
}

// ── Binding ──────────────────────────────────────────────────────────

impl ActionSpec {
    /// Resolve parameters into an executable [`Action`].
    ///
    /// Lookup order per parameter: caller value, configured default, spec
    /// default. Unknown keys and missing or malformed values are
    /// [`CoreError::InvalidParams`].
    pub fn bind(&self, params: &ActionParams, defaults: &ActionDefaults) -> Result<Action, CoreError> {
        if let Some(unknown) = params
            .keys()
            .find(|key| !self.params.iter().any(|p| p.name == key.as_str()))
        {
            return Err(self.invalid(format!("unknown parameter `{unknown}`")));
        }

        let action = match self.kind {
            ActionKind::ListDevices => Action::ListDevices,
            ActionKind::GetProperties => Action::GetProperties,
            ActionKind::GetPackages => Action::GetPackages,
            ActionKind::InstallPackage => {
                let configured = defaults
                    .package_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned());
                Action::InstallPackage {
                    path: PathBuf::from(self.value(params, "path", configured.as_deref())?),
                }
            }
            ActionKind::SendText => {
                let text = self.value(params, "text", Some(&defaults.text))?;
                if text.is_empty() {
                    return Err(self.invalid("`text` must not be empty"));
                }
                Action::SendText { text }
            }
            ActionKind::Swipe => Action::Swipe {
                x1: self.number(params, "x1")?,
                y1: self.number(params, "y1")?,
                x2: self.number(params, "x2")?,
                y2: self.number(params, "y2")?,
                duration_ms: self.number(params, "duration_ms")?,
            },
            ActionKind::Tap => Action::Tap {
                x: self.number(params, "x")?,
                y: self.number(params, "y")?,
            },
            ActionKind::KeyEvent => Action::KeyEvent {
                code: self.number(params, "code")?,
            },
            ActionKind::KeyPreset(code) => Action::KeyEvent { code },
            ActionKind::CaptureScreen => {
                let name = self.value(params, "name", None)?;
                if name.trim().is_empty() {
                    return Err(self.invalid("`name` must not be empty"));
                }
                Action::CaptureScreen { name }
            }
            ActionKind::ScreenRecord => {
                let name = self.value(params, "name", None)?;
                if name.trim().is_empty() {
                    return Err(self.invalid("`name` must not be empty"));
                }
                let seconds = self.number(params, "seconds")?;
                if !(1..=MAX_RECORDING_SECS).contains(&seconds) {
                    return Err(self.invalid(format!(
                        "`seconds` must be between 1 and {MAX_RECORDING_SECS}, got {seconds}"
                    )));
                }
                Action::ScreenRecord { name, seconds }
            }
            ActionKind::ForwardPort => Action::ForwardPort {
                local: self.socket_spec(params, "local")?,
                remote: self.socket_spec(params, "remote")?,
            },
            ActionKind::EnableWirelessDebug => {
                let ssid = self.value(params, "ssid", defaults.wifi_ssid.as_deref())?;
                let password = match params.get("password") {
                    Some(raw) => SecretString::from(raw.clone()),
                    None => defaults
                        .wifi_password
                        .clone()
                        .ok_or_else(|| self.invalid("missing `password` (set [wifi] password_env or pass -P password=...)"))?,
                };
                Action::EnableWirelessDebug { ssid, password }
            }
        };
        Ok(action)
    }

    fn value(
        &self,
        params: &ActionParams,
        name: &str,
        configured: Option<&str>,
    ) -> Result<String, CoreError> {
        params
            .get(name)
            .map(String::as_str)
            .or(configured)
            .or_else(|| {
                self.params
                    .iter()
                    .find(|p| p.name == name)
                    .and_then(|p| p.default)
            })
            .map(str::to_owned)
            .ok_or_else(|| self.invalid(format!("missing `{name}`")))
    }

    fn number(&self, params: &ActionParams, name: &str) -> Result<u32, CoreError> {
        let raw = self.value(params, name, None)?;
        raw.trim().parse().map_err(|_| {
            self.invalid(format!("`{name}` must be a non-negative integer, got {raw:?}"))
        })
    }

    /// A forward endpoint such as `tcp:9222` or `localabstract:name`.
    fn socket_spec(&self, params: &ActionParams, name: &str) -> Result<String, CoreError> {
        let raw = self.value(params, name, None)?;
        match raw.split_once(':') {
            Some((kind, target)) if !kind.is_empty() && !target.is_empty() && !raw.contains(';') => Ok(raw),
            _ => Err(self.invalid(format!("`{name}` must look like tcp:<port>, got {raw:?}"))),
        }
    }

    fn invalid(&self, message: impl Into<String>) -> CoreError {
        CoreError::InvalidParams {
            action: self.name.to_owned(),
            message: message.into(),
        }
    }
}
