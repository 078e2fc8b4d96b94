//! Command dispatch: bridges CLI args -> orchestrator calls -> output formatting.

pub mod actions;
pub mod config_cmd;
pub mod devices;
pub mod run;
pub mod util;

use droidsweep_config::Config;
use droidsweep_core::Orchestrator;

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

/// Presentation settings resolved once per invocation.
#[derive(Debug, Clone)]
pub struct Ctx {
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

impl Ctx {
    pub fn new(cfg: &Config, global: &GlobalOpts) -> Self {
        Self {
            format: config::output_format(cfg, global),
            color: output::should_color(config::color_mode(cfg, global)),
            quiet: global.quiet,
        }
    }
}

/// Dispatch a bridge-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, orchestrator: &Orchestrator, ctx: &Ctx) -> Result<(), CliError> {
    match cmd {
        Command::Devices => devices::handle(orchestrator, ctx).await,
        Command::Run(args) => run::handle_run(orchestrator, args, ctx).await,
        Command::Sweep(args) => run::handle_sweep(orchestrator, args, ctx).await,
        Command::Actions => actions::handle(ctx),
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "handled before dispatch".into(),
        }),
    }
}
