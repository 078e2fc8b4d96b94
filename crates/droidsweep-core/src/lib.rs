// droidsweep-core: Device discovery, action dispatch and result collection
// over the ADB bridge.
//
// Consumers build an `OrchestratorConfig`, create an `Orchestrator`, and
// get back a `RunReport` per invocation. Per-device failures are outcomes,
// not errors.

pub mod bridge;
pub mod capture;
pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handshake;
pub mod model;
pub mod orchestrator;
pub mod registry;
pub mod sink;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::DeviceBridge;
pub use capture::{Artifact, StreamCapture};
pub use catalog::{ActionCatalog, DEFAULT_SWEEP};
pub use config::OrchestratorConfig;
pub use dispatcher::Dispatcher;
pub use error::{CoreError, FailureKind};
pub use handshake::{HandshakeConfig, HandshakeState, WirelessHandshake};
pub use orchestrator::Orchestrator;
pub use registry::{DeviceFilter, DeviceRegistry};
pub use sink::{ArtifactStore, DirArtifactStore, FileOutcomeLog, OutcomeLog, ResultSink};

pub use model::{
    Action, ActionDefaults, ActionOutcome, ActionParams, ActionSpec, AuthorizationState,
    CompletionMode, Device, OutcomeStatus, ParamSpec, RunReport,
};
