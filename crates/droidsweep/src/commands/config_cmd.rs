//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::{Confirm, Input};

use droidsweep_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::Ctx;

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of `cfg` with the plaintext Wi-Fi password masked.
fn redacted(cfg: &Config) -> Config {
    let mut out = cfg.clone();
    if out.wifi.password.is_some() {
        out.wifi.password = Some("****".into());
    }
    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_text(prompt: &str, default: String) -> Result<String, CliError> {
    Input::new()
        .with_prompt(prompt)
        .default(default)
        .interact_text()
        .map_err(prompt_err)
}

/// Empty input leaves the value unset.
fn prompt_optional(prompt: &str) -> Result<Option<String>, CliError> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    let value = value.trim().to_owned();
    Ok((!value.is_empty()).then_some(value))
}

fn interactive_config() -> Result<Config, CliError> {
    let mut cfg = Config::default();

    cfg.bridge.host = prompt_text("ADB server host", cfg.bridge.host)?;
    let port = prompt_text("ADB server port", cfg.bridge.port.to_string())?;
    cfg.bridge.port = port.parse().map_err(|_| CliError::Validation {
        field: "bridge.port".into(),
        reason: format!("not a port number: {port}"),
    })?;

    cfg.inputs.package_path = prompt_optional("APK to install during sweeps (blank to skip)")?.map(PathBuf::from);
    cfg.wifi.ssid = prompt_optional("Wi-Fi network for wireless debugging (blank to skip)")?;
    if cfg.wifi.ssid.is_some() {
        cfg.wifi.password_env = prompt_optional("Environment variable holding the Wi-Fi passphrase")?;
    }
    Ok(cfg)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", config::effective_path(global).display());
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let ctx = Ctx::new(&cfg, global);
            let shown = redacted(&cfg);
            let out = match ctx.format {
                OutputFormat::Table | OutputFormat::Plain => {
                    toml::to_string_pretty(&shown).map_err(|e| CliError::Render(e.to_string()))?
                }
                format => output::render_single(format, &shown, |_| String::new(), |_| String::new())?,
            };
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        ConfigCommand::Init { force, defaults } => {
            let path = config::effective_path(global);
            if path.exists() && !force {
                let overwrite = !defaults
                    && Confirm::new()
                        .with_prompt(format!("{} exists. Overwrite?", path.display()))
                        .default(false)
                        .interact()
                        .map_err(prompt_err)?;
                if !overwrite {
                    return Err(CliError::Validation {
                        field: "config".into(),
                        reason: format!("{} already exists (use --force)", path.display()),
                    });
                }
            }

            let cfg = if defaults {
                Config::default()
            } else {
                interactive_config()?
            };
            match global.config {
                Some(_) => config::save_config_to(&cfg, &path)?,
                None => {
                    config::save_config(&cfg)?;
                }
            }
            if !global.quiet {
                eprintln!("Wrote {}", path.display());
            }
            Ok(())
        }
    }
}
