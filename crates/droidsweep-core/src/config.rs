// ── Runtime orchestrator configuration ──
//
// Describes how to reach the bridge and how to run actions. Never touches
// disk: the CLI builds an `OrchestratorConfig` from the config crate and
// hands it in.

use std::path::PathBuf;

use droidsweep_api::TransportConfig;

use crate::catalog::DEFAULT_SWEEP;
use crate::handshake::HandshakeConfig;
use crate::model::ActionDefaults;

/// Hard ceiling on concurrent device tasks.
pub const MAX_CONCURRENCY_CEILING: usize = 64;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Where the ADB server listens and how long to wait for it.
    pub bridge: TransportConfig,
    /// Upper bound on devices processed at once. Clamped to
    /// `1..=MAX_CONCURRENCY_CEILING`.
    pub max_concurrency: usize,
    pub handshake: HandshakeConfig,
    pub defaults: ActionDefaults,
    /// Action order for a full sweep.
    pub sweep: Vec<String>,
    /// Durable outcome log; `None` disables it.
    pub log_file: Option<PathBuf>,
    /// Directory captured artifacts are written to.
    pub artifact_dir: PathBuf,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bridge: TransportConfig::default(),
            max_concurrency: 8,
            handshake: HandshakeConfig::default(),
            defaults: ActionDefaults::default(),
            sweep: DEFAULT_SWEEP.iter().map(|s| (*s).to_owned()).collect(),
            log_file: Some(PathBuf::from("droidsweep.log")),
            artifact_dir: PathBuf::from("."),
        }
    }
}

impl OrchestratorConfig {
    /// Concurrency bound for a run over `devices` targets.
    pub fn concurrency_for(&self, devices: usize) -> usize {
        let cap = self.max_concurrency.clamp(1, MAX_CONCURRENCY_CEILING);
        devices.clamp(1, cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_is_bounded_by_devices_and_cap() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.concurrency_for(0), 1);
        assert_eq!(config.concurrency_for(3), 3);
        assert_eq!(config.concurrency_for(20), 8);

        let zero = OrchestratorConfig {
            max_concurrency: 0,
            ..OrchestratorConfig::default()
        };
        assert_eq!(zero.concurrency_for(5), 1);
    }
}
