//! Device listing.

use tabled::Tabled;

use droidsweep_core::{Device, Orchestrator};

use crate::error::CliError;
use crate::output;

use super::Ctx;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Transport")]
    transport: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            serial: d.serial.clone(),
            state: if d.raw_state == d.state.to_string() {
                d.raw_state.clone()
            } else {
                format!("{} ({})", d.state, d.raw_state)
            },
            model: d.model.clone().unwrap_or_else(|| "-".into()),
            product: d.product.clone().unwrap_or_else(|| "-".into()),
            transport: d.address.map_or_else(|| "usb".into(), |a| format!("tcp {a}")),
        }
    }
}

pub async fn handle(orchestrator: &Orchestrator, ctx: &Ctx) -> Result<(), CliError> {
    let devices = orchestrator.list_devices().await?;
    if devices.is_empty() && ctx.format == crate::cli::OutputFormat::Table {
        if !ctx.quiet {
            eprintln!("No devices attached.");
        }
        return Ok(());
    }
    let out = output::render_list(ctx.format, &devices, |d| DeviceRow::from(d), |d| {
        format!("{}\t{}", d.serial, d.state)
    })?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
