// Chunked data channel for device services whose output is consumed
// incrementally (screen capture via `exec-out:`).

use std::pin::Pin;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;

/// Read granularity for channel chunks.
const CHUNK_SIZE: usize = 16 * 1024;

/// One event delivered by an open data channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A chunk of output bytes.
    Data(Bytes),
    /// The device closed the channel normally.
    End,
    /// The channel failed; no further data follows.
    Error(String),
}

impl StreamEvent {
    /// `End` and `Error` terminate a channel.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End | Self::Error(_))
    }
}

/// A boxed stream of channel events.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Turn a reader into an event stream: `Data` per read, then exactly one
/// terminal event.
///
/// The whole channel must close within `limit`. A device that stalls
/// mid-transfer yields `Error` once the deadline passes, and the reader is
/// dropped with the stream.
pub fn events_from_reader<R>(reader: R, limit: Duration) -> EventStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut reader = reader;
        let mut buf = BytesMut::with_capacity(CHUNK_SIZE);
        let deadline = Instant::now() + limit;
        loop {
            buf.reserve(CHUNK_SIZE);
            match tokio::time::timeout_at(deadline, reader.read_buf(&mut buf)).await {
                Ok(Ok(0)) => {
                    yield StreamEvent::End;
                    break;
                }
                Ok(Ok(_)) => yield StreamEvent::Data(buf.split().freeze()),
                Ok(Err(e)) => {
                    yield StreamEvent::Error(e.to_string());
                    break;
                }
                Err(_) => {
                    yield StreamEvent::Error(format!(
                        "timed out after {}s waiting for the channel to close",
                        limit.as_secs()
                    ));
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    use super::*;

    #[tokio::test]
    async fn reader_yields_data_then_end() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tokio::spawn(async move {
            tx.write_all(b"\x89PNG").await.unwrap();
            tx.write_all(b"rest").await.unwrap();
        });

        let events: Vec<StreamEvent> = events_from_reader(rx, Duration::from_secs(5))
            .collect()
            .await;
        let (last, data) = events.split_last().unwrap();
        assert_eq!(*last, StreamEvent::End);

        let joined: Vec<u8> = data
            .iter()
            .flat_map(|e| match e {
                StreamEvent::Data(b) => b.to_vec(),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(joined, b"\x89PNGrest");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_reader_times_out() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b"\x89PNG").await.unwrap();

        let events: Vec<StreamEvent> = events_from_reader(rx, Duration::from_secs(3))
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StreamEvent::Data(Bytes::from_static(b"\x89PNG")));
        assert!(
            matches!(&events[1], StreamEvent::Error(msg) if msg.contains("timed out after 3s")),
            "{events:?}"
        );
        drop(tx);
    }

    #[test]
    fn terminal_events() {
        assert!(StreamEvent::End.is_terminal());
        assert!(StreamEvent::Error("x".into()).is_terminal());
        assert!(!StreamEvent::Data(Bytes::from_static(b"a")).is_terminal());
    }
}
