// ── Dispatcher ──
//
// Runs one action, or an ordered batch, across a device selection. Every
// (device, action) pair yields exactly one outcome: per-device errors are
// caught here and recorded, never propagated. Only catalog resolution,
// parameter binding and device selection can fail an invocation.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bridge::DeviceBridge;
use crate::capture::{SCREENCAP_COMMAND, StreamCapture};
use crate::catalog::ActionCatalog;
use crate::config::OrchestratorConfig;
use crate::error::CoreError;
use crate::handshake::{WifiCredentials, WirelessHandshake};
use crate::model::{Action, ActionOutcome, ActionParams, ActionSpec, Device, RunReport};
use crate::registry::{DeviceFilter, DeviceRegistry, rejection_error};
use crate::sink::{ArtifactStore, LogRecord, OutcomeLog, ResultSink, sanitize_file_name};

/// An action resolved and bound for one invocation.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub spec: &'static ActionSpec,
    pub action: Action,
}

pub struct Dispatcher {
    bridge: Arc<dyn DeviceBridge>,
    registry: DeviceRegistry,
    capture: StreamCapture,
    artifacts: Arc<dyn ArtifactStore>,
    log: Arc<dyn OutcomeLog>,
    config: OrchestratorConfig,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        bridge: Arc<dyn DeviceBridge>,
        artifacts: Arc<dyn ArtifactStore>,
        log: Arc<dyn OutcomeLog>,
        config: OrchestratorConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry: DeviceRegistry::new(Arc::clone(&bridge)),
            capture: StreamCapture::new(Arc::clone(&bridge), config.bridge.command_timeout),
            bridge,
            artifacts,
            log,
            config,
            cancel,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Resolve and bind every name before any device is touched.
    pub fn plan<S: AsRef<str>>(
        &self,
        names: &[S],
        params: &ActionParams,
    ) -> Result<Vec<PlannedAction>, CoreError> {
        let catalog = ActionCatalog::global();
        let plan = names
            .iter()
            .map(|name| -> Result<PlannedAction, CoreError> {
                let spec = catalog.resolve(name.as_ref())?;
                let scoped = scoped_params(spec, params, names.len());
                let action = spec.bind(&scoped, &self.config.defaults)?;
                Ok(PlannedAction { spec, action })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(unused) = params.keys().find(|key| {
            !plan
                .iter()
                .any(|p| p.spec.params.iter().any(|ps| ps.name == key.as_str()))
        }) {
            return Err(CoreError::InvalidParams {
                action: plan
                    .iter()
                    .map(|p| p.spec.name)
                    .collect::<Vec<_>>()
                    .join(","),
                message: format!("no action in this run accepts `{unused}`"),
            });
        }
        Ok(plan)
    }

    /// Run a single action across the selected devices.
    pub async fn run(
        &self,
        name: &str,
        filter: &DeviceFilter,
        params: &ActionParams,
    ) -> Result<RunReport, CoreError> {
        self.run_all(&[name], filter, params).await
    }

    /// Run `names` in order. Every device's attempt at action *i* finishes
    /// before action *i + 1* starts; a failure never skips later actions.
    pub async fn run_all<S: AsRef<str>>(
        &self,
        names: &[S],
        filter: &DeviceFilter,
        params: &ActionParams,
    ) -> Result<RunReport, CoreError> {
        let plan = self.plan(names, params)?;
        let selection = self.registry.select(filter).await?;

        let sink = ResultSink::new(Arc::clone(&self.log));
        if selection.is_empty() {
            info!("no eligible devices");
            write_info(&*self.log, "no eligible devices").await;
            return Ok(sink.finish(false).await);
        }

        let limit = self.config.concurrency_for(selection.targets.len());
        info!(
            actions = plan.len(),
            devices = selection.targets.len(),
            rejected = selection.rejected.len(),
            limit,
            "starting run"
        );

        for planned in &plan {
            if self.cancel.is_cancelled() {
                break;
            }
            for device in &selection.rejected {
                sink.record(ActionOutcome::failed(
                    planned.spec.name,
                    &device.serial,
                    &rejection_error(device),
                ))
                .await;
            }
            self.run_across(planned, &selection.targets, limit, &sink).await;
        }

        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            warn!(recorded = sink.len(), "run cancelled");
        }
        Ok(sink.finish(cancelled).await)
    }

    /// One action over every target, at most `limit` devices at a time.
    async fn run_across(&self, planned: &PlannedAction, targets: &[Device], limit: usize, sink: &ResultSink) {
        stream::iter(targets)
            .for_each_concurrent(limit, |device| async move {
                // Checkpoint: nothing new starts once the run is cancelled.
                if self.cancel.is_cancelled() {
                    return;
                }
                let outcome = self.execute(planned, device).await;
                sink.record(outcome).await;
            })
            .await;
    }

    async fn execute(&self, planned: &PlannedAction, device: &Device) -> ActionOutcome {
        let name = planned.spec.name;
        debug!(serial = %device.serial, action = name, "executing");
        match self.perform(&planned.action, device).await {
            Ok(message) => ActionOutcome::passed(name, &device.serial, message),
            Err(e) => {
                warn!(serial = %device.serial, action = name, error = %e, "action failed");
                ActionOutcome::failed(name, &device.serial, &e)
            }
        }
    }

    /// The code path for each action variant. Returns the outcome message.
    async fn perform(&self, action: &Action, device: &Device) -> Result<String, CoreError> {
        let serial = device.serial.as_str();
        match action {
            Action::ListDevices => Ok(format!(
                "{} attached ({})",
                device.display_name(),
                device.raw_state
            )),
            Action::GetProperties => {
                let props = self.bridge.get_properties(serial).await?;
                let get = |key: &str| props.get(key).map_or("unknown", String::as_str);
                Ok(format!(
                    "{} {} (Android {}, SDK {})",
                    get("ro.product.brand"),
                    get("ro.product.model"),
                    get("ro.build.version.release"),
                    get("ro.build.version.sdk"),
                ))
            }
            Action::InstallPackage { path } => {
                self.bridge.install(serial, path).await?;
                Ok(format!("Installed {}", path.display()))
            }
            Action::GetPackages => {
                let packages = self.bridge.get_packages(serial).await?;
                Ok(format!("{} packages installed", packages.len()))
            }
            Action::SendText { .. }
            | Action::Swipe { .. }
            | Action::Tap { .. }
            | Action::KeyEvent { .. } => {
                let command = action.input_command().ok_or_else(|| CoreError::Action {
                    message: "not an input action".into(),
                })?;
                let out = self.bridge.shell(serial, &command).await?;
                check_input_output(&out)?;
                Ok(format!("`{command}` sent"))
            }
            Action::CaptureScreen { name } => {
                let file_name = artifact_name(name, serial, "png");
                let artifact = self
                    .capture
                    .capture(serial, SCREENCAP_COMMAND, &file_name)
                    .await?;
                let path = self.artifacts.persist(&artifact.name, &artifact.bytes).await?;
                Ok(format!(
                    "Screenshot saved to {} ({} bytes)",
                    path.display(),
                    artifact.len()
                ))
            }
            Action::ScreenRecord { name, seconds } => {
                let file_name = artifact_name(name, serial, "mp4");
                let artifact = self.capture.record_screen(serial, *seconds, &file_name).await?;
                let path = self.artifacts.persist(&artifact.name, &artifact.bytes).await?;
                Ok(format!(
                    "Recording saved to {} ({} bytes)",
                    path.display(),
                    artifact.len()
                ))
            }
            Action::ForwardPort { local, remote } => {
                self.bridge.forward(serial, local, remote).await?;
                Ok(format!("Forwarding {local} to {remote}"))
            }
            Action::EnableWirelessDebug { ssid, password } => {
                let credentials = WifiCredentials {
                    ssid: ssid.clone(),
                    password: password.clone(),
                };
                let addr = WirelessHandshake::new(&*self.bridge, &self.config.handshake)
                    .run(serial, &credentials)
                    .await?;
                Ok(format!("Wireless debugging enabled at {addr}"))
            }
        }
    }
}

/// `input` prints nothing on success; anything mentioning an exception or
/// error means the command was rejected.
fn check_input_output(out: &str) -> Result<(), CoreError> {
    if out.contains("Exception") || out.contains("Error") {
        return Err(CoreError::Action {
            message: out.trim().to_owned(),
        });
    }
    Ok(())
}

/// `<name>_<serial>.<ext>`, unique per device.
fn artifact_name(name: &str, serial: &str, ext: &str) -> String {
    let base = name
        .strip_suffix(ext)
        .and_then(|rest| rest.strip_suffix('.'))
        .unwrap_or(name);
    sanitize_file_name(&format!("{base}_{serial}.{ext}"))
}

/// In a batch, each action only sees the parameters it declares; a single
/// action sees all of them so unknown keys are reported.
fn scoped_params(spec: &ActionSpec, params: &ActionParams, batch_len: usize) -> ActionParams {
    if batch_len <= 1 {
        return params.clone();
    }
    params
        .iter()
        .filter(|(key, _)| spec.params.iter().any(|p| p.name == key.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

async fn write_info(log: &dyn OutcomeLog, message: &str) {
    if let Err(e) = log.append(&LogRecord::info(message)).await {
        warn!(error = %e, "failed to append to outcome log");
    }
}
