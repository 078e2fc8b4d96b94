//! Sync sub-protocol (entered with the `sync:` device service).
//!
//! Each message is a 4-byte ASCII id followed by a little-endian `u32`.
//! Push:
//! ```text
//! SEND <len> "<remote>,<mode>"
//! DATA <len> <bytes>          (repeated, at most 64 KiB each)
//! DONE <mtime>
//!                             <- OKAY 0 | FAIL <len> <reason>
//! QUIT 0
//! ```
//! Pull:
//! ```text
//! RECV <len> "<remote>"
//!                             <- DATA <len> <bytes> (repeated)
//!                             <- DONE 0 | FAIL <len> <reason>
//! QUIT 0
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::Error;

/// Largest `DATA` payload the daemon accepts.
pub const MAX_CHUNK: usize = 64 * 1024;

/// Default file mode for pushed files (`0644`).
pub const DEFAULT_MODE: u32 = 0o644;

fn put_message(buf: &mut BytesMut, id: &[u8; 4], len: usize) -> Result<(), Error> {
    let len = u32::try_from(len).map_err(|_| Error::Sync {
        message: format!("message length {len} exceeds u32"),
    })?;
    buf.put_slice(id);
    buf.put_u32_le(len);
    Ok(())
}

/// Stream `data` to `remote` on the device, then wait for the verdict.
pub async fn push<S>(
    stream: &mut S,
    data: &[u8],
    remote: &str,
    mode: u32,
    mtime: u32,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let target = format!("{remote},{}", mode | 0o100_000);
    let mut buf = BytesMut::with_capacity(8 + target.len());
    put_message(&mut buf, b"SEND", target.len())?;
    buf.put_slice(target.as_bytes());
    stream.write_all(&buf).await?;

    for chunk in data.chunks(MAX_CHUNK) {
        let mut header = BytesMut::with_capacity(8);
        put_message(&mut header, b"DATA", chunk.len())?;
        stream.write_all(&header).await?;
        stream.write_all(chunk).await?;
    }

    let mut done = BytesMut::with_capacity(8);
    done.put_slice(b"DONE");
    done.put_u32_le(mtime);
    stream.write_all(&done).await?;
    stream.flush().await?;

    let mut id = [0u8; 4];
    stream.read_exact(&mut id).await?;
    let len = stream.read_u32_le().await?;
    match &id {
        b"OKAY" => {
            debug!(remote, bytes = data.len(), "sync push complete");
        }
        b"FAIL" => return Err(read_fail(stream, len).await?),
        other => return Err(unexpected(other)),
    }

    quit(stream).await
}

/// Read a `FAIL` reason of `len` bytes.
async fn read_fail<S>(stream: &mut S, len: u32) -> Result<Error, Error>
where
    S: AsyncRead + Unpin,
{
    let mut reason = vec![0u8; usize::try_from(len).unwrap_or(0)];
    stream.read_exact(&mut reason).await?;
    Ok(Error::Sync {
        message: String::from_utf8_lossy(&reason).into_owned(),
    })
}

fn unexpected(id: &[u8; 4]) -> Error {
    Error::Protocol {
        message: format!(
            "unexpected sync reply {:?}",
            String::from_utf8_lossy(id.as_slice())
        ),
    }
}

async fn quit<S>(stream: &mut S) -> Result<(), Error>
where
    S: AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(8);
    put_message(&mut buf, b"QUIT", 0)?;
    stream.write_all(&buf).await?;
    stream.flush().await?;
    Ok(())
}

/// Fetch the whole of `remote` from the device.
pub async fn pull<S>(stream: &mut S, remote: &str) -> Result<Bytes, Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(8 + remote.len());
    put_message(&mut buf, b"RECV", remote.len())?;
    buf.put_slice(remote.as_bytes());
    stream.write_all(&buf).await?;
    stream.flush().await?;

    let mut out = BytesMut::new();
    loop {
        let mut id = [0u8; 4];
        stream.read_exact(&mut id).await?;
        let len = stream.read_u32_le().await?;
        match &id {
            b"DATA" => {
                let len = usize::try_from(len).unwrap_or(usize::MAX);
                if len > MAX_CHUNK {
                    return Err(Error::Protocol {
                        message: format!("sync chunk of {len} bytes exceeds {MAX_CHUNK}"),
                    });
                }
                let start = out.len();
                out.resize(start + len, 0);
                stream.read_exact(&mut out[start..]).await?;
            }
            b"DONE" => break,
            b"FAIL" => return Err(read_fail(stream, len).await?),
            other => return Err(unexpected(other)),
        }
    }

    quit(stream).await?;
    debug!(remote, bytes = out.len(), "sync pull complete");
    Ok(out.freeze())
}
