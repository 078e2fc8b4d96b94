// ── Orchestrator ──
//
// Entry point for consumers. Wires the bridge client, registry, dispatcher
// and sinks from an `OrchestratorConfig` and exposes the inbound
// operations: list devices, run one action, run a sweep.

use std::sync::Arc;

use droidsweep_api::AdbClient;
use tokio_util::sync::CancellationToken;

use crate::bridge::DeviceBridge;
use crate::config::OrchestratorConfig;
use crate::dispatcher::Dispatcher;
use crate::error::CoreError;
use crate::model::{ActionParams, Device, RunReport};
use crate::registry::DeviceFilter;
use crate::sink::{ArtifactStore, DirArtifactStore, FileOutcomeLog, NullOutcomeLog, OutcomeLog};

/// Cheaply cloneable handle over one configured dispatcher.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    config: OrchestratorConfig,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Build an orchestrator talking to the ADB server in `config.bridge`.
    /// Does not connect: the first operation does.
    pub fn new(config: OrchestratorConfig) -> Self {
        let bridge = Arc::new(AdbClient::new(config.bridge.clone()));
        let log: Arc<dyn OutcomeLog> = match &config.log_file {
            Some(path) => Arc::new(FileOutcomeLog::new(path.clone())),
            None => Arc::new(NullOutcomeLog),
        };
        let artifacts = Arc::new(DirArtifactStore::new(config.artifact_dir.clone()));
        Self::with_parts(config, bridge, artifacts, log)
    }

    /// Build an orchestrator over caller-supplied collaborators.
    pub fn with_parts(
        config: OrchestratorConfig,
        bridge: Arc<dyn DeviceBridge>,
        artifacts: Arc<dyn ArtifactStore>,
        log: Arc<dyn OutcomeLog>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let dispatcher = Dispatcher::new(bridge, artifacts, log, config.clone(), cancel.clone());
        Self {
            inner: Arc::new(OrchestratorInner {
                config,
                dispatcher,
                cancel,
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Token that cancels in-flight runs at their next checkpoint.
    pub fn cancel_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    // ── Inbound operations ───────────────────────────────────────────

    /// Every device the bridge reports, in any state.
    pub async fn list_devices(&self) -> Result<Vec<Device>, CoreError> {
        self.inner.dispatcher.registry().list_devices().await
    }

    /// Run one action across the filtered devices.
    pub async fn run_action(
        &self,
        name: &str,
        filter: &DeviceFilter,
        params: &ActionParams,
    ) -> Result<RunReport, CoreError> {
        self.inner.dispatcher.run(name, filter, params).await
    }

    /// Run the configured sweep across the filtered devices.
    pub async fn run_all(&self, filter: &DeviceFilter, params: &ActionParams) -> Result<RunReport, CoreError> {
        self.run_sequence(self.inner.config.sweep.as_slice(), filter, params).await
    }

    /// Run `names` in order across the filtered devices.
    pub async fn run_sequence<S: AsRef<str>>(
        &self,
        names: &[S],
        filter: &DeviceFilter,
        params: &ActionParams,
    ) -> Result<RunReport, CoreError> {
        self.inner.dispatcher.run_all(names, filter, params).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::testing::FakeBridge;

    fn orchestrator(bridge: FakeBridge, dir: &std::path::Path) -> Orchestrator {
        let config = OrchestratorConfig {
            log_file: Some(dir.join("droidsweep.log")),
            artifact_dir: dir.join("artifacts"),
            ..OrchestratorConfig::default()
        };
        let log = Arc::new(FileOutcomeLog::new(dir.join("droidsweep.log")));
        let artifacts = Arc::new(DirArtifactStore::new(dir.join("artifacts")));
        Orchestrator::with_parts(config, Arc::new(bridge), artifacts, log)
    }

    #[tokio::test]
    async fn sweep_without_package_path_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(FakeBridge::with_devices(&[("a", "device")]), dir.path());
        let err = orch
            .run_all(&DeviceFilter::all(), &ActionParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidParams { ref action, .. } if action == "installPackage"));
    }

    #[tokio::test]
    async fn sweep_writes_log_and_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(FakeBridge::with_devices(&[("a", "device")]), dir.path());
        let params: ActionParams = [("path".to_owned(), "/tmp/app.apk".to_owned())]
            .into_iter()
            .collect();

        let report = orch.run_all(&DeviceFilter::all(), &params).await.unwrap();
        assert_eq!(report.total(), crate::catalog::DEFAULT_SWEEP.len());
        assert!(report.all_passed(), "{:?}", report.outcomes());

        let shot = std::fs::read(dir.path().join("artifacts").join("screenshot_a.png")).unwrap();
        assert_eq!(shot, b"\x89PNG");

        let log = std::fs::read_to_string(dir.path().join("droidsweep.log")).unwrap();
        assert_eq!(log.lines().count(), report.total() + 1);
        assert!(log.lines().last().unwrap().ends_with("SUMMARY: PASSED -> 7, FAILED -> 0"));
    }

    #[tokio::test]
    async fn cancel_token_is_shared() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(FakeBridge::with_devices(&[("a", "device")]), dir.path());
        let token = orch.cancel_token();
        orch.cancel();
        assert!(token.is_cancelled());
        let report = orch
            .run_action("home", &DeviceFilter::all(), &ActionParams::new())
            .await
            .unwrap();
        assert!(report.cancelled);
    }
}
