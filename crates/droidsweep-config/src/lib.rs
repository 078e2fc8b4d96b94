//! Shared configuration for droidsweep.
//!
//! A TOML file in the platform config directory, merged with `DROIDSWEEP_`
//! environment variables, and translated into
//! `droidsweep_core::OrchestratorConfig`. The CLI layers its flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use droidsweep_api::TransportConfig;
use droidsweep_core::{ActionDefaults, DEFAULT_SWEEP, HandshakeConfig, OrchestratorConfig};

/// Environment variable consulted for the Wi-Fi passphrase when the
/// config names no variable of its own.
pub const WIFI_PASSWORD_ENV: &str = "DROIDSWEEP_WIFI_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub bridge: BridgeSection,
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub inputs: InputsSection,
    #[serde(default)]
    pub wifi: WifiSection,
    #[serde(default)]
    pub output: OutputSection,
}

/// Where the ADB server listens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BridgeSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connect timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Timeout for long device commands (install, shell) in seconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout: u64,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout: default_timeout(),
            command_timeout: default_command_timeout(),
        }
    }
}

fn default_host() -> String {
    droidsweep_api::transport::DEFAULT_HOST.into()
}
fn default_port() -> u16 {
    droidsweep_api::transport::DEFAULT_PORT
}
fn default_timeout() -> u64 {
    10
}
fn default_command_timeout() -> u64 {
    300
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunSection {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Wi-Fi association settle delay for the wireless handshake.
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
    #[serde(default = "default_wireless_port")]
    pub wireless_port: u16,
    #[serde(default = "default_wireless_interface")]
    pub wireless_interface: String,
    /// How long the device may stay off the bridge after switching to TCP.
    #[serde(default = "default_reconnect_timeout_secs")]
    pub reconnect_timeout_secs: u64,
    /// Action order for `sweep`.
    #[serde(default = "default_actions")]
    pub actions: Vec<String>,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            settle_secs: default_settle_secs(),
            wireless_port: default_wireless_port(),
            wireless_interface: default_wireless_interface(),
            reconnect_timeout_secs: default_reconnect_timeout_secs(),
            actions: default_actions(),
        }
    }
}

fn default_max_concurrency() -> usize {
    8
}
fn default_settle_secs() -> u64 {
    10
}
fn default_wireless_port() -> u16 {
    5555
}
fn default_wireless_interface() -> String {
    "wlan0".into()
}
fn default_reconnect_timeout_secs() -> u64 {
    30
}
fn default_actions() -> Vec<String> {
    DEFAULT_SWEEP.iter().map(|s| (*s).to_owned()).collect()
}

/// Inputs actions fall back to when the caller passes none.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InputsSection {
    /// APK installed by `installPackage`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_path: Option<PathBuf>,
    /// Text typed by `sendText`.
    #[serde(default = "default_text")]
    pub text: String,
}

impl Default for InputsSection {
    fn default() -> Self {
        Self {
            package_path: None,
            text: default_text(),
        }
    }
}

fn default_text() -> String {
    "Hello, World!".into()
}

/// Network joined by `enableWirelessDebug`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WifiSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    /// Passphrase (plaintext; prefer `password_env`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Environment variable holding the passphrase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputSection {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_color")]
    pub color: String,
    /// Durable outcome log. An empty path disables it.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Where screenshots are written.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            format: default_format(),
            color: default_color(),
            log_file: default_log_file(),
            artifact_dir: default_artifact_dir(),
        }
    }
}

fn default_format() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_log_file() -> PathBuf {
    PathBuf::from("droidsweep.log")
}
fn default_artifact_dir() -> PathBuf {
    PathBuf::from(".")
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "droidsweep", "droidsweep").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("droidsweep");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file + environment. A missing file is not an
/// error; defaults apply.
///
/// Environment keys use `__` between section and field, e.g.
/// `DROIDSWEEP_RUN__MAX_CONCURRENCY=4`. Unsectioned `DROIDSWEEP_*`
/// variables belong to the CLI and are ignored here.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed("DROIDSWEEP_")
                .filter(|key| key.as_str().contains("__"))
                .split("__"),
        );

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Secret resolution ───────────────────────────────────────────────

/// Resolve the Wi-Fi passphrase: the configured env var, then
/// `DROIDSWEEP_WIFI_PASSWORD`, then plaintext.
pub fn resolve_wifi_password(wifi: &WifiSection) -> Option<SecretString> {
    if let Some(val) = wifi
        .password_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Some(SecretString::from(val));
    }
    if let Ok(val) = std::env::var(WIFI_PASSWORD_ENV) {
        return Some(SecretString::from(val));
    }
    wifi.password.clone().map(SecretString::from)
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Validate and build the runtime configuration.
    pub fn to_orchestrator_config(&self) -> Result<OrchestratorConfig, ConfigError> {
        if self.run.max_concurrency == 0 {
            return Err(ConfigError::Validation {
                field: "run.max_concurrency".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.run.actions.is_empty() {
            return Err(ConfigError::Validation {
                field: "run.actions".into(),
                reason: "sweep needs at least one action".into(),
            });
        }
        if self.bridge.host.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "bridge.host".into(),
                reason: "must not be empty".into(),
            });
        }

        let bridge = TransportConfig {
            host: self.bridge.host.clone(),
            port: self.bridge.port,
            connect_timeout: Duration::from_secs(self.bridge.timeout.max(1)),
            command_timeout: Duration::from_secs(self.bridge.command_timeout.max(1)),
        };

        let log_file = if self.output.log_file.as_os_str().is_empty() {
            None
        } else {
            Some(self.output.log_file.clone())
        };

        Ok(OrchestratorConfig {
            bridge,
            max_concurrency: self.run.max_concurrency,
            handshake: HandshakeConfig {
                settle: Duration::from_secs(self.run.settle_secs),
                port: self.run.wireless_port,
                interface: self.run.wireless_interface.clone(),
                ready_timeout: Duration::from_secs(self.run.reconnect_timeout_secs.max(1)),
                ..HandshakeConfig::default()
            },
            defaults: ActionDefaults {
                package_path: self.inputs.package_path.clone(),
                text: self.inputs.text.clone(),
                wifi_ssid: self.wifi.ssid.clone(),
                wifi_password: resolve_wifi_password(&self.wifi),
            },
            sweep: self.run.actions.clone(),
            log_file,
            artifact_dir: self.output.artifact_dir.clone(),
        })
    }
}
