//! Catalog listing. Needs no bridge.

use tabled::Tabled;

use droidsweep_core::{ActionCatalog, ActionSpec};

use crate::error::CliError;
use crate::output;

use super::Ctx;

#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "Action")]
    name: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Parameters")]
    params: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

impl From<&ActionSpec> for ActionRow {
    fn from(spec: &ActionSpec) -> Self {
        Self {
            name: spec.name.into(),
            mode: spec.mode.to_string(),
            params: param_list(spec),
            summary: spec.summary.into(),
        }
    }
}

/// `x1=500, y1=1000, path` style summary of accepted parameters.
fn param_list(spec: &ActionSpec) -> String {
    if spec.params.is_empty() {
        return "-".into();
    }
    spec.params
        .iter()
        .map(|p| match p.default {
            Some(d) => format!("{}={d}", p.name),
            None => p.name.to_owned(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn handle(ctx: &Ctx) -> Result<(), CliError> {
    let specs = ActionCatalog::global().specs();
    let out = output::render_list(ctx.format, specs, |s| ActionRow::from(s), |s| s.name.to_owned())?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
