// ── Stream capture ──
//
// Turns a chunked data channel into one complete artifact. Chunks are held
// privately until the channel signals completion; an error discards them.
// Screen recordings take the other route: record to device storage, then
// pull the finished file.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use droidsweep_api::StreamEvent;
use futures_core::Stream;
use futures_util::StreamExt;
use droidsweep_api::client::shell_quote;
use tracing::{debug, trace, warn};

use crate::bridge::DeviceBridge;
use crate::error::CoreError;

/// Command whose raw stdout is a PNG of the current screen.
pub const SCREENCAP_COMMAND: &str = "screencap -p";

/// Device directory recordings are written to before the pull.
pub const RECORDING_DIR: &str = "/sdcard";

/// `screenrecord` refuses time limits above three minutes.
pub const MAX_RECORDING_SECS: u32 = 180;

/// A fully assembled capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub bytes: Bytes,
}

impl Artifact {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Chunks received so far for one capture.
#[derive(Default)]
struct CaptureBuffer {
    chunks: Vec<Bytes>,
    len: usize,
}

impl CaptureBuffer {
    fn push(&mut self, chunk: Bytes) {
        self.len += chunk.len();
        self.chunks.push(chunk);
    }

    fn concat(self) -> Bytes {
        if let [single] = self.chunks.as_slice() {
            return single.clone();
        }
        let mut out = BytesMut::with_capacity(self.len);
        for chunk in self.chunks {
            out.extend_from_slice(&chunk);
        }
        out.freeze()
    }
}

/// Consume `events` up to the first terminal event.
///
/// Returns the concatenation of every `Data` chunk seen before `End`. The
/// stream is not polled past the first terminal event, so any trailing
/// `End` or `Error` has no effect. A stream that stops without a terminal
/// event counts as an error.
pub async fn assemble<S>(name: impl Into<String>, events: S) -> Result<Artifact, CoreError>
where
    S: Stream<Item = StreamEvent>,
{
    let name = name.into();
    let mut events = std::pin::pin!(events);
    let mut buffer = CaptureBuffer::default();

    while let Some(event) = events.next().await {
        match event {
            StreamEvent::Data(chunk) => {
                trace!(artifact = %name, bytes = chunk.len(), "capture chunk");
                buffer.push(chunk);
            }
            StreamEvent::End => {
                let bytes = buffer.concat();
                debug!(artifact = %name, bytes = bytes.len(), "capture complete");
                return Ok(Artifact { name, bytes });
            }
            StreamEvent::Error(message) => {
                debug!(artifact = %name, discarded = buffer.len, "capture failed");
                return Err(CoreError::Stream { message });
            }
        }
    }

    Err(CoreError::Stream {
        message: "channel closed without a completion signal".into(),
    })
}

/// Runs capture commands against devices and assembles their output.
pub struct StreamCapture {
    bridge: Arc<dyn DeviceBridge>,
    limit: Duration,
}

impl StreamCapture {
    /// Every capture must terminate within `limit`.
    pub fn new(bridge: Arc<dyn DeviceBridge>, limit: Duration) -> Self {
        Self { bridge, limit }
    }

    /// Run `command` on `serial` and wait for its channel to terminate.
    ///
    /// An empty result is treated as a failed capture: `screencap` writes
    /// nothing to stdout when it cannot grab the display. A channel still
    /// open after the limit is dropped and reported as a stream failure.
    pub async fn capture(&self, serial: &str, command: &str, name: &str) -> Result<Artifact, CoreError> {
        let events = self.bridge.exec_out_stream(serial, command).await?;
        let artifact = tokio::time::timeout(self.limit, assemble(name, events))
            .await
            .map_err(|_| CoreError::Stream {
                message: format!(
                    "`{command}` did not finish within {}s",
                    self.limit.as_secs()
                ),
            })??;
        if artifact.is_empty() {
            return Err(CoreError::Stream {
                message: format!("`{command}` produced no output"),
            });
        }
        Ok(artifact)
    }

    /// Record `seconds` of screen to device storage, pull the file and
    /// remove it from the device.
    pub async fn record_screen(&self, serial: &str, seconds: u32, name: &str) -> Result<Artifact, CoreError> {
        let remote = format!("{RECORDING_DIR}/{name}");
        let command = format!("screenrecord --time-limit {seconds} {}", shell_quote(&remote));
        let out = self.bridge.shell(serial, &command).await?;
        if out.contains("ERROR") || out.contains("Exception") {
            return Err(CoreError::Action {
                message: format!("screenrecord failed: {}", out.trim()),
            });
        }

        let pulled = self.bridge.pull(serial, &remote).await;
        if let Err(e) = self
            .bridge
            .shell(serial, &format!("rm -f {}", shell_quote(&remote)))
            .await
        {
            warn!(serial, remote, error = %e, "failed to remove recording from device");
        }

        let bytes = pulled?;
        if bytes.is_empty() {
            return Err(CoreError::Stream {
                message: format!("{remote} is empty"),
            });
        }
        debug!(serial, artifact = name, bytes = bytes.len(), "recording pulled");
        Ok(Artifact {
            name: name.to_owned(),
            bytes,
        })
    }
}
