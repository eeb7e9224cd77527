//! RFC 6242-style chunked framing for JSON messages on the front-end socket.
//!
//! Wire shape: `\n#<len>\n<len bytes of payload>...\n##\n`. Structurally this
//! mirrors the chunked mode of `netconf_async::framer::async_framer::AsyncFramer`,
//! but it frames JSON rather than XML and has no 1.0 `]]>]]>` fallback mode —
//! the front-end socket is never negotiated down to NETCONF 1.0.

use crate::error::FramingError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const MAX_LENGTH_DIGITS: u32 = 11;

/// Encodes `payload` as a single chunk followed by the end-of-message marker.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 16);
    out.extend_from_slice(format!("\n#{}\n", payload.len()).as_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(b"\n##\n");
    out
}

/// Reads one complete message from `reader`: one or more chunks terminated
/// by `\n##\n`. Single-shot; does not buffer across separate calls.
pub async fn read_frame<R: AsyncRead + Unpin + Send>(
    reader: &mut R,
) -> Result<Vec<u8>, FramingError> {
    let mut message = Vec::new();
    loop {
        let chunk_len = read_chunk_header(reader).await?;
        if chunk_len == 0 {
            break;
        }
        let mut chunk = vec![0u8; chunk_len as usize];
        reader
            .read_exact(&mut chunk)
            .await
            .map_err(|_| FramingError::ShortRead)?;
        message.extend_from_slice(&chunk);
    }
    Ok(message)
}

/// Writes `payload` as a framed message.
pub async fn write_frame<W: AsyncWrite + Unpin + Send>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), FramingError> {
    writer
        .write_all(&encode(payload))
        .await
        .map_err(|_| FramingError::ShortRead)?;
    Ok(())
}

/// Reads `\n#<digits>\n` and returns the parsed length, or 0 if this was the
/// `\n##\n` end-of-message marker instead of a chunk header.
async fn read_chunk_header<R: AsyncRead + Unpin + Send>(
    reader: &mut R,
) -> Result<u32, FramingError> {
    let mut prefix = [0u8; 2];
    reader
        .read_exact(&mut prefix)
        .await
        .map_err(|_| FramingError::ShortRead)?;
    if prefix[0] != b'\n' {
        return Err(FramingError::BadPrefix {
            actual: Some(prefix[0]),
        });
    }
    if prefix[1] != b'#' {
        return Err(FramingError::BadMarker {
            actual: Some(prefix[1]),
        });
    }

    let mut length: u32 = 0;
    let mut digits = 0u32;
    loop {
        let mut byte = [0u8; 1];
        reader
            .read_exact(&mut byte)
            .await
            .map_err(|_| FramingError::ShortRead)?;
        match byte[0] {
            b'#' if digits == 0 => continue,
            b'\n' => {
                if digits == 0 {
                    return Ok(0);
                }
                if length == 0 {
                    return Err(FramingError::NonPositiveLength);
                }
                return Ok(length);
            }
            d if d.is_ascii_digit() => {
                digits += 1;
                if digits > MAX_LENGTH_DIGITS {
                    return Err(FramingError::LengthTooLong);
                }
                length = length * 10 + u32::from(d - b'0');
            }
            other => return Err(FramingError::BadLength { actual: other }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[tokio::test]
    async fn round_trip_single_chunk() {
        let payload = br#"{"type":1,"host":"h"}"#;
        let framed = encode(payload);
        let mut reader = Cursor::new(framed);
        let decoded = read_frame(&mut reader).await.unwrap();
        assert_eq!(decoded, payload);
    }

    #[tokio::test]
    async fn round_trip_empty_payload_errors() {
        // A zero-length chunk is nonsensical for this protocol: the
        // terminator itself signals end-of-message, so a real message
        // never emits chunk-size 0 before content.
        let mut reader = Cursor::new(b"\n#0\n\n##\n".to_vec());
        let result = read_frame(&mut reader).await;
        assert_eq!(result, Err(FramingError::NonPositiveLength));
    }

    #[tokio::test]
    async fn bad_prefix_is_rejected() {
        let mut reader = Cursor::new(b"x#4\ntest\n##\n".to_vec());
        let result = read_frame(&mut reader).await;
        assert!(matches!(result, Err(FramingError::BadPrefix { .. })));
    }

    #[tokio::test]
    async fn bad_marker_is_rejected() {
        let mut reader = Cursor::new(b"\nx4\ntest\n##\n".to_vec());
        let result = read_frame(&mut reader).await;
        assert!(matches!(result, Err(FramingError::BadMarker { .. })));
    }

    #[tokio::test]
    async fn non_digit_length_is_rejected() {
        let mut reader = Cursor::new(b"\n#4x\ntest\n##\n".to_vec());
        let result = read_frame(&mut reader).await;
        assert!(matches!(result, Err(FramingError::BadLength { .. })));
    }

    #[tokio::test]
    async fn truncated_stream_is_rejected() {
        let mut reader = Cursor::new(b"\n#40\nshort".to_vec());
        let result = read_frame(&mut reader).await;
        assert_eq!(result, Err(FramingError::ShortRead));
    }

    #[tokio::test]
    async fn multi_chunk_message_concatenates() {
        let mut wire = Vec::new();
        wire.extend_from_slice(b"\n#4\ntest\n#3\ning\n##\n");
        let mut reader = Cursor::new(wire);
        let decoded = read_frame(&mut reader).await.unwrap();
        assert_eq!(decoded, b"testing");
    }

    #[tokio::test]
    async fn write_then_read_round_trip() {
        let payload = b"{\"type\":0}";
        let mut buf = Vec::new();
        write_frame(&mut buf, payload).await.unwrap();
        let mut reader = Cursor::new(buf);
        let decoded = read_frame(&mut reader).await.unwrap();
        assert_eq!(decoded, payload);
    }

    #[tokio::test]
    async fn fuzz_truncations_never_panic() {
        let payload = br#"{"type":4,"session":"abc","source":"running"}"#;
        let framed = encode(payload);
        for cut in 0..framed.len() {
            let mut reader = Cursor::new(framed[..cut].to_vec());
            let _ = read_frame(&mut reader).await;
        }
    }
}
