// In-process bridge used by unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use droidsweep_api::{DeviceEntry, EventStream, StreamEvent};

use crate::bridge::DeviceBridge;
use crate::error::CoreError;

type ShellFn = Box<dyn Fn(&str, &str) -> Result<String, CoreError> + Send + Sync>;
type CaptureFn = Box<dyn Fn(&str) -> Vec<StreamEvent> + Send + Sync>;
type PullFn = Box<dyn Fn(&str, &str) -> Result<Bytes, CoreError> + Send + Sync>;
type TcpipFn = Box<dyn Fn(&str) -> Result<(), CoreError> + Send + Sync>;
type ConnectFn = Box<dyn Fn(&str, u16) -> Result<String, CoreError> + Send + Sync>;

pub(crate) struct FakeBridge {
    devices: Option<Vec<DeviceEntry>>,
    shell: ShellFn,
    capture: CaptureFn,
    pull: PullFn,
    tcpip: TcpipFn,
    connect: ConnectFn,
    delay: Duration,
    capture_delay: Duration,
    /// Listings that report the device offline after a transport switch.
    offline_after_switch: usize,
    offline_polls: AtomicUsize,
    listings: AtomicUsize,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeBridge {
    pub(crate) fn with_devices(devices: &[(&str, &str)]) -> Self {
        Self {
            devices: Some(
                devices
                    .iter()
                    .map(|(serial, state)| DeviceEntry {
                        serial: (*serial).to_owned(),
                        state: (*state).to_owned(),
                        product: None,
                        model: Some(format!("Model-{serial}")),
                        device: None,
                        transport_id: None,
                    })
                    .collect(),
            ),
            shell: Box::new(default_shell),
            capture: Box::new(|_| {
                vec![
                    StreamEvent::Data(Bytes::from_static(b"\x89PNG")),
                    StreamEvent::End,
                ]
            }),
            pull: Box::new(|_, _| Ok(Bytes::from_static(b"\0\0\0\x18ftypmp42"))),
            tcpip: Box::new(|_| Ok(())),
            connect: Box::new(|host, port| Ok(format!("connected to {host}:{port}"))),
            delay: Duration::ZERO,
            capture_delay: Duration::ZERO,
            offline_after_switch: 0,
            offline_polls: AtomicUsize::new(0),
            listings: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub(crate) fn unreachable() -> Self {
        Self {
            devices: None,
            ..Self::with_devices(&[])
        }
    }

    pub(crate) fn on_shell(
        mut self,
        f: impl Fn(&str, &str) -> Result<String, CoreError> + Send + Sync + 'static,
    ) -> Self {
        self.shell = Box::new(f);
        self
    }

    pub(crate) fn on_capture(
        mut self,
        f: impl Fn(&str) -> Vec<StreamEvent> + Send + Sync + 'static,
    ) -> Self {
        self.capture = Box::new(f);
        self
    }

    pub(crate) fn on_pull(
        mut self,
        f: impl Fn(&str, &str) -> Result<Bytes, CoreError> + Send + Sync + 'static,
    ) -> Self {
        self.pull = Box::new(f);
        self
    }

    pub(crate) fn on_tcpip(mut self, f: impl Fn(&str) -> Result<(), CoreError> + Send + Sync + 'static) -> Self {
        self.tcpip = Box::new(f);
        self
    }

    pub(crate) fn on_connect(
        mut self,
        f: impl Fn(&str, u16) -> Result<String, CoreError> + Send + Sync + 'static,
    ) -> Self {
        self.connect = Box::new(f);
        self
    }

    /// Hold every capture channel open for `delay` before its events.
    pub(crate) fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }

    /// After `tcpip`, report the device offline for the next `polls`
    /// listings, as adbd does while it restarts.
    pub(crate) fn offline_after_switch(mut self, polls: usize) -> Self {
        self.offline_after_switch = polls;
        self
    }

    /// Number of device listings served so far.
    pub(crate) fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    /// Make every shell call take `delay` (virtual time under a paused clock).
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of shell calls that were in flight at once.
    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn default_shell(serial: &str, command: &str) -> Result<String, CoreError> {
    if command.starts_with("ip -f inet addr show") {
        let octet = serial.len() % 200 + 10;
        return Ok(format!(
            "30: wlan0: <UP>\n    inet 192.168.1.{octet}/24 brd 192.168.1.255 scope global wlan0\n"
        ));
    }
    Ok(String::new())
}

#[async_trait]
impl DeviceBridge for FakeBridge {
    fn endpoint(&self) -> String {
        "fake:5037".into()
    }

    async fn list_devices(&self) -> Result<Vec<DeviceEntry>, CoreError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        let mut devices = self.devices.clone().ok_or_else(|| CoreError::Connection {
            addr: self.endpoint(),
            reason: "connection refused".into(),
        })?;
        let restarting = self
            .offline_polls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if restarting {
            for device in &mut devices {
                device.state = "offline".into();
            }
        }
        Ok(devices)
    }

    async fn shell(&self, serial: &str, command: &str) -> Result<String, CoreError> {
        self.record(format!("shell {serial} {command}"));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.shell)(serial, command)
    }

    async fn exec_out_stream(&self, serial: &str, command: &str) -> Result<EventStream, CoreError> {
        self.record(format!("exec-out {serial} {command}"));
        let events = (self.capture)(serial);
        let delay = self.capture_delay;
        Ok(Box::pin(async_stream::stream! {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            for event in events {
                yield event;
            }
        }))
    }

    async fn get_properties(&self, serial: &str) -> Result<BTreeMap<String, String>, CoreError> {
        self.record(format!("getprop {serial}"));
        Ok([
            ("ro.product.model", format!("Model-{serial}")),
            ("ro.product.brand", "google".to_owned()),
            ("ro.build.version.release", "14".to_owned()),
            ("ro.build.version.sdk", "34".to_owned()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect())
    }

    async fn get_packages(&self, serial: &str) -> Result<Vec<String>, CoreError> {
        self.record(format!("packages {serial}"));
        Ok(vec!["com.android.settings".into(), "com.example.app".into()])
    }

    async fn install(&self, serial: &str, package: &Path) -> Result<(), CoreError> {
        self.record(format!("install {serial} {}", package.display()));
        Ok(())
    }

    async fn pull(&self, serial: &str, remote: &str) -> Result<Bytes, CoreError> {
        self.record(format!("pull {serial} {remote}"));
        (self.pull)(serial, remote)
    }

    async fn forward(&self, serial: &str, local: &str, remote: &str) -> Result<(), CoreError> {
        self.record(format!("forward {serial} {local} {remote}"));
        Ok(())
    }

    async fn tcpip(&self, serial: &str, port: u16) -> Result<(), CoreError> {
        self.record(format!("tcpip {serial} {port}"));
        (self.tcpip)(serial)?;
        self.offline_polls
            .store(self.offline_after_switch, Ordering::SeqCst);
        Ok(())
    }

    async fn connect(&self, host: &str, port: u16) -> Result<String, CoreError> {
        self.record(format!("connect {host}:{port}"));
        (self.connect)(host, port)
    }
}
