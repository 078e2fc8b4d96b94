//! `run` and `sweep`: dispatch actions and report per-device outcomes.

use tabled::Tabled;

use droidsweep_core::{ActionOutcome, Orchestrator, RunReport};

use crate::cli::{RunArgs, SweepArgs};
use crate::error::CliError;
use crate::output;

use super::{Ctx, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Device")]
    serial: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Result")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl OutcomeRow {
    fn new(o: &ActionOutcome, color: bool) -> Self {
        Self {
            serial: o.serial().into(),
            action: o.action().into(),
            status: output::status_label(o.status(), color),
            message: o.message().into(),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle_run(orchestrator: &Orchestrator, args: RunArgs, ctx: &Ctx) -> Result<(), CliError> {
    let filter = util::device_filter(&args.target);
    let params = util::action_params(&args.target);

    let spinner = util::spinner(format!("running {}", args.action), ctx.quiet);
    let interrupt = util::cancel_on_ctrl_c(orchestrator.clone());
    let result = orchestrator.run_action(&args.action, &filter, &params).await;
    interrupt.abort();
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    finish(&result?, ctx)
}

pub async fn handle_sweep(orchestrator: &Orchestrator, args: SweepArgs, ctx: &Ctx) -> Result<(), CliError> {
    let filter = util::device_filter(&args.target);
    let params = util::action_params(&args.target);

    let label = if args.actions.is_empty() {
        orchestrator.config().sweep.join(", ")
    } else {
        args.actions.join(", ")
    };
    let spinner = util::spinner(format!("sweeping {label}"), ctx.quiet);
    let interrupt = util::cancel_on_ctrl_c(orchestrator.clone());
    let result = if args.actions.is_empty() {
        orchestrator.run_all(&filter, &params).await
    } else {
        orchestrator
            .run_sequence(args.actions.as_slice(), &filter, &params)
            .await
    };
    interrupt.abort();
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    finish(&result?, ctx)
}

/// Render the report and apply the exit contract.
fn finish(report: &RunReport, ctx: &Ctx) -> Result<(), CliError> {
    let out = render_report(report, ctx)?;
    output::print_output(&out, ctx.quiet);
    util::check_report(report)
}

fn render_report(report: &RunReport, ctx: &Ctx) -> Result<String, CliError> {
    output::render_single(
        ctx.format,
        report,
        |r| {
            if r.is_empty() {
                return output::dim("No eligible devices.", ctx.color);
            }
            let rows: Vec<OutcomeRow> = r
                .outcomes()
                .iter()
                .map(|o| OutcomeRow::new(o, ctx.color))
                .collect();
            format!("{}\n{}", output::render_table(&rows), summary_line(r, ctx.color))
        },
        |r| {
            r.outcomes()
                .iter()
                .map(|o| {
                    format!("{}\t{}\t{}\t{}", o.status(), o.serial(), o.action(), o.message())
                })
                .collect::<Vec<_>>()
                .join("\n")
        },
    )
}

fn summary_line(report: &RunReport, color: bool) -> String {
    let elapsed = (report.finished_at - report.started_at)
        .to_std()
        .unwrap_or_default();
    let mut line = format!(
        "PASSED -> {}, FAILED -> {} in {:.1}s",
        report.passed(),
        report.failed(),
        elapsed.as_secs_f64()
    );
    if report.cancelled {
        line.push_str(" (cancelled)");
    }
    output::dim(&line, color)
}
