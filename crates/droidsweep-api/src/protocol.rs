//! ADB host-protocol framing.
//!
//! Requests are ASCII payloads prefixed by their length as four hex digits:
//! ```text
//! [ 4 bytes: length (hex ASCII) ][ N bytes: payload ]
//! ```
//! Replies start with a 4-byte status, `OKAY` or `FAIL`. A `FAIL` is
//! followed by a hex-length-prefixed reason string.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Error;

/// Largest payload expressible in a four hex digit prefix.
pub const MAX_PAYLOAD: usize = 0xFFFF;

const OKAY: &[u8; 4] = b"OKAY";
const FAIL: &[u8; 4] = b"FAIL";

/// Encode a request payload into a length-prefixed frame.
pub fn encode_request(payload: &str) -> Result<Bytes, Error> {
    if payload.len() > MAX_PAYLOAD {
        return Err(Error::Protocol {
            message: format!("request too long: {} bytes", payload.len()),
        });
    }
    let mut buf = BytesMut::with_capacity(4 + payload.len());
    buf.put_slice(format!("{:04x}", payload.len()).as_bytes());
    buf.put_slice(payload.as_bytes());
    Ok(buf.freeze())
}

/// Parse a four hex digit length prefix.
pub fn decode_length(prefix: [u8; 4]) -> Result<usize, Error> {
    std::str::from_utf8(&prefix)
        .ok()
        .and_then(|s| usize::from_str_radix(s, 16).ok())
        .ok_or_else(|| Error::Protocol {
            message: format!("invalid length prefix {prefix:?}"),
        })
}

/// Write one framed request.
pub async fn send_request<S>(stream: &mut S, payload: &str) -> Result<(), Error>
where
    S: AsyncWrite + Unpin,
{
    let frame = encode_request(payload)?;
    stream.write_all(&frame).await?;
    stream.flush().await?;
    Ok(())
}

/// Read the reply status, turning `FAIL` into [`Error::Fail`].
pub async fn read_status<S>(stream: &mut S) -> Result<(), Error>
where
    S: AsyncRead + Unpin,
{
    let mut status = [0u8; 4];
    stream.read_exact(&mut status).await?;
    match &status {
        OKAY => Ok(()),
        FAIL => {
            let message = read_hex_prefixed(stream).await?;
            Err(Error::Fail { message })
        }
        other => Err(Error::Protocol {
            message: format!(
                "unexpected status {:?}",
                String::from_utf8_lossy(other.as_slice())
            ),
        }),
    }
}

/// Read a hex-length-prefixed string.
pub async fn read_hex_prefixed<S>(stream: &mut S) -> Result<String, Error>
where
    S: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix).await?;
    let len = decode_length(prefix)?;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Read everything the server sends until it closes the connection.
pub async fn read_to_close<S>(stream: &mut S) -> Result<Vec<u8>, Error>
where
    S: AsyncRead + Unpin,
{
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn encodes_length_as_lowercase_hex() {
        let frame = encode_request("host:version").unwrap();
        assert_eq!(&frame[..], b"000chost:version");
    }

    #[test]
    fn rejects_oversized_payload() {
        let payload = "x".repeat(MAX_PAYLOAD + 1);
        assert!(matches!(
            encode_request(&payload),
            Err(Error::Protocol { .. })
        ));
    }

    #[test]
    fn decodes_length_prefix() {
        assert_eq!(decode_length(*b"001f").unwrap(), 31);
        assert!(decode_length(*b"zz00").is_err());
    }

    #[tokio::test]
    async fn okay_status_passes() {
        let mut reader: &[u8] = b"OKAY";
        read_status(&mut reader).await.unwrap();
    }

    #[tokio::test]
    async fn fail_status_carries_reason() {
        let mut reader: &[u8] = b"FAIL000fdevice offline!";
        let err = read_status(&mut reader).await.unwrap_err();
        match err {
            Error::Fail { message } => assert_eq!(message, "device offline!"),
            other => panic!("expected Fail, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_status_is_protocol_error() {
        let mut reader: &[u8] = b"WHAT";
        assert!(matches!(
            read_status(&mut reader).await,
            Err(Error::Protocol { .. })
        ));
    }

    #[tokio::test]
    async fn request_then_status_over_mock_stream() {
        let mut stream = tokio_test::io::Builder::new()
            .write(b"000chost:version")
            .read(b"OKAY")
            .read(b"00040029")
            .build();
        send_request(&mut stream, "host:version").await.unwrap();
        read_status(&mut stream).await.unwrap();
        assert_eq!(read_hex_prefixed(&mut stream).await.unwrap(), "0029");
    }
}
