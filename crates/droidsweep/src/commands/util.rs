//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;

use droidsweep_core::{ActionParams, DeviceFilter, Orchestrator, RunReport};

use crate::cli::TargetArgs;
use crate::error::{CliError, exit_code};

/// `-d` flags to a filter; none means every authorized device.
pub fn device_filter(target: &TargetArgs) -> DeviceFilter {
    if target.devices.is_empty() {
        DeviceFilter::all()
    } else {
        DeviceFilter::only(target.devices.iter().map(String::as_str))
    }
}

/// `-P` flags to params. A repeated key keeps the last value.
pub fn action_params(target: &TargetArgs) -> ActionParams {
    target.params.iter().cloned().collect()
}

/// Spinner on stderr while a run is in flight. `None` when stderr is not
/// a terminal or output is quiet.
pub fn spinner(message: String, quiet: bool) -> Option<ProgressBar> {
    if quiet || !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Cancel the orchestrator's runs on the first Ctrl-C; a second Ctrl-C
/// exits without waiting for in-flight actions. Abort the returned task
/// once the run completes.
pub fn cancel_on_ctrl_c(orchestrator: Orchestrator) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("interrupt received, finishing in-flight actions (Ctrl-C again to abort)");
        orchestrator.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("second interrupt, aborting");
            std::process::exit(exit_code::INTERRUPTED);
        }
    })
}

/// Exit contract: success only if every outcome passed.
pub fn check_report(report: &RunReport) -> Result<(), CliError> {
    if report.cancelled {
        return Err(CliError::Cancelled {
            recorded: report.total(),
        });
    }
    if report.all_passed() {
        Ok(())
    } else {
        Err(CliError::RunFailed {
            failed: report.failed(),
            total: report.total(),
        })
    }
}
