//! Clap derive structures for the `droidsweep` CLI.
//!
//! Defines the command tree, global flags, and shared argument groups.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// droidsweep -- run checks across every attached Android device
#[derive(Debug, Parser)]
#[command(
    name = "droidsweep",
    version,
    about = "Run actions across attached Android devices over ADB",
    long_about = "Discovers devices through a running ADB server, fans actions out\n\
        across all of them concurrently, and reports a PASS/FAIL outcome per\n\
        device and action. Exits 0 only when every outcome passed.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "DROIDSWEEP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// ADB server address as HOST:PORT (overrides config)
    #[arg(long, short = 'b', env = "DROIDSWEEP_BRIDGE", global = true)]
    pub bridge: Option<String>,

    /// Connect timeout in seconds
    #[arg(long, env = "DROIDSWEEP_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Maximum number of devices worked on at once
    #[arg(long, short = 'j', global = true)]
    pub concurrency: Option<usize>,

    /// Outcome log file
    #[arg(long, global = true, conflicts_with = "no_log")]
    pub log_file: Option<PathBuf>,

    /// Do not write the outcome log
    #[arg(long, global = true)]
    pub no_log: bool,

    /// Directory screenshots are written to
    #[arg(long, global = true)]
    pub artifact_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', env = "DROIDSWEEP_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List devices known to the ADB server
    #[command(alias = "dev", alias = "d")]
    Devices,

    /// List the action catalog
    #[command(alias = "ls")]
    Actions,

    /// Run one action across the selected devices
    Run(RunArgs),

    /// Run the configured action sequence across the selected devices
    Sweep(SweepArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// Device selection and action parameters shared by `run` and `sweep`.
#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Only target this serial (repeatable; default: every authorized device)
    #[arg(long = "device", short = 'd', value_name = "SERIAL")]
    pub devices: Vec<String>,

    /// Action parameter as KEY=VALUE (repeatable)
    #[arg(long = "param", short = 'P', value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Action name (see `droidsweep actions`)
    pub action: String,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Debug, Args)]
pub struct SweepArgs {
    /// Actions to run in order (comma-separated; default from config)
    #[arg(long, short = 'a', value_delimiter = ',')]
    pub actions: Vec<String>,

    #[command(flatten)]
    pub target: TargetArgs,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,

    /// Write a config file interactively
    Init {
        /// Overwrite an existing file without asking
        #[arg(long)]
        force: bool,

        /// Accept every default without prompting
        #[arg(long)]
        defaults: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

/// Parse `KEY=VALUE`. The value may itself contain `=`.
fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    Ok((key.to_owned(), value.to_owned()))
}
