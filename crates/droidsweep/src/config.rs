//! Flag overrides on top of the shared config crate.
//!
//! File and environment values come from `droidsweep_config`; this module
//! layers the global CLI flags over them and produces the
//! `OrchestratorConfig` core runs with.

use std::path::PathBuf;
use std::time::Duration;

use droidsweep_config::Config;
use droidsweep_core::OrchestratorConfig;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use droidsweep_config::{config_path, save_config, save_config_to};

/// Config file in effect: `--config` or the platform default.
pub fn effective_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load file + environment for the effective path.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let cfg = match global.config {
        Some(ref path) => droidsweep_config::load_config_from(path)?,
        None => droidsweep_config::load_config()?,
    };
    Ok(cfg)
}

/// Translate the loaded config plus global flags into core's config.
pub fn orchestrator_config(cfg: &Config, global: &GlobalOpts) -> Result<OrchestratorConfig, CliError> {
    let mut orch = cfg.to_orchestrator_config()?;

    if let Some(ref bridge) = global.bridge {
        let (host, port) = parse_bridge(bridge)?;
        orch.bridge.host = host;
        orch.bridge.port = port;
    }
    if let Some(secs) = global.timeout {
        orch.bridge.connect_timeout = Duration::from_secs(secs.max(1));
    }
    if let Some(n) = global.concurrency {
        if n == 0 {
            return Err(CliError::Validation {
                field: "concurrency".into(),
                reason: "must be at least 1".into(),
            });
        }
        orch.max_concurrency = n;
    }
    if global.no_log {
        orch.log_file = None;
    } else if let Some(ref path) = global.log_file {
        orch.log_file = Some(path.clone());
    }
    if let Some(ref dir) = global.artifact_dir {
        orch.artifact_dir.clone_from(dir);
    }

    Ok(orch)
}

/// `--output` wins, then `[output] format`, then table.
pub fn output_format(cfg: &Config, global: &GlobalOpts) -> OutputFormat {
    global.output.unwrap_or_else(|| match cfg.output.format.as_str() {
        "json" => OutputFormat::Json,
        "json-compact" => OutputFormat::JsonCompact,
        "yaml" => OutputFormat::Yaml,
        "plain" => OutputFormat::Plain,
        _ => OutputFormat::Table,
    })
}

pub fn color_mode(cfg: &Config, global: &GlobalOpts) -> ColorMode {
    global.color.unwrap_or_else(|| match cfg.output.color.as_str() {
        "always" => ColorMode::Always,
        "never" => ColorMode::Never,
        _ => ColorMode::Auto,
    })
}

/// Parse `HOST:PORT`, or a bare `HOST` on the default port.
fn parse_bridge(raw: &str) -> Result<(String, u16), CliError> {
    let invalid = |reason: &str| CliError::Validation {
        field: "bridge".into(),
        reason: format!("{reason}: {raw}"),
    };
    match raw.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
            let host = host.trim_start_matches('[').trim_end_matches(']');
            if host.is_empty() {
                return Err(invalid("missing host"));
            }
            Ok((host.to_owned(), port))
        }
        None if raw.is_empty() => Err(invalid("missing host")),
        None => Ok((raw.to_owned(), Config::default().bridge.port)),
    }
}
