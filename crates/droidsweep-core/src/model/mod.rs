// ── Domain model ──
//
// Value types shared by the registry, catalog, dispatcher and sinks, and
// handed to consumers (the CLI) through `RunReport`.

pub mod action;
pub mod device;
pub mod outcome;
pub mod report;

// ── Re-exports ──────────────────────────────────────────────────────

pub use action::{
    Action, ActionDefaults, ActionKind, ActionParams, ActionSpec, CompletionMode, ParamSpec,
};
pub use device::{AuthorizationState, Device};
pub use outcome::{ActionOutcome, OutcomeStatus};
pub use report::RunReport;
