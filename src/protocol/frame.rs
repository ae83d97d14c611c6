//! Wire envelope: length, magic, code, payload length, checksum, payload.
//!
//! ```text
//! [Length(4)] [Magic(4)] [Code(1)] [PayloadLen(4)] [Checksum(4)?] [Payload(N)]
//! ```
//!
//! The length field counts every byte after itself; the checksum field is
//! present only when the payload is non-empty and holds the first four bytes
//! of the BLAKE2b-256 digest of the payload, read as a big-endian i32.
//!
//! Encoding reserves a zeroed header region, encodes the payload in place,
//! then backfills the length and checksum once the payload boundaries are
//! known. An empty payload drops the checksum slot, shrinking the header by
//! four bytes.

use crate::config::PROTOCOL_MAGIC;
use crate::core::cursor::{ReadCursor, WriteCursor};
use crate::error::{ProtocolError, Result};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use bytes::Bytes;
use tracing::warn;

type Blake2b256 = Blake2b<U32>;

/// Reserved header bytes: length + magic + code + payload length + checksum.
const HEADER_RESERVE: usize = 17;

/// Size of the leading length field, which its own value does not count.
pub const LENGTH_FIELD_SIZE: usize = 4;

/// First four bytes of the BLAKE2b-256 digest, as a big-endian i32.
pub fn checksum(payload: &[u8]) -> i32 {
    let digest = Blake2b256::digest(payload);
    i32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// One decoded wire frame; payload interpretation is the message layer's job.
#[derive(Debug, Clone)]
pub struct Frame {
    pub code: u8,
    pub payload: Bytes,
    pub checksum: Option<i32>,
}

impl Frame {
    /// Apply the checksum policy: a mismatch is an error when `enforce` is
    /// set and a warning otherwise. Frames without a checksum always pass.
    pub fn verify_checksum(&self, enforce: bool) -> Result<()> {
        let Some(expected) = self.checksum else {
            return Ok(());
        };
        let computed = checksum(&self.payload);
        if computed == expected {
            return Ok(());
        }
        if enforce {
            return Err(ProtocolError::ChecksumMismatch { expected, computed });
        }
        warn!(expected, computed, code = self.code, "Payload checksum mismatch");
        Ok(())
    }
}

/// Encode one frame, producing the full wire bytes.
///
/// The payload is produced by the given closure so record encoders can write
/// straight into the frame buffer.
pub fn encode_frame<F>(code: u8, encode_payload: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut WriteCursor) -> Result<()>,
{
    let mut buf = WriteCursor::new();
    buf.write_zeros(HEADER_RESERVE);
    let before = buf.position();
    encode_payload(&mut buf)?;
    let after = buf.position();
    let payload_len = after - before;

    // Empty payloads have no checksum slot; the frame starts 4 bytes in.
    let offset = if payload_len == 0 { 4 } else { 0 };
    buf.go_to((offset + LENGTH_FIELD_SIZE) as i64)?;
    buf.write_i32(PROTOCOL_MAGIC)
        .write_u8(code)
        .write_i32(payload_len as i32);
    if payload_len > 0 {
        let sum = checksum(buf.range(before, after));
        buf.write_i32(sum);
    }
    let total = buf.len();
    buf.go_to(offset as i64)?;
    buf.write_i32((total - offset - LENGTH_FIELD_SIZE) as i32);

    Ok(buf.to_vec_from(offset))
}

/// Decode one frame from a cursor holding exactly the frame's bytes.
pub fn decode_frame(buf: &mut ReadCursor) -> Result<Frame> {
    let _length = buf.read_i32()?;
    let magic = buf.read_i32()?;
    if magic != PROTOCOL_MAGIC {
        // The frame is already delimited by its length field; an odd magic
        // does not break framing.
        warn!(magic, "Unexpected frame magic");
    }
    let code = buf.read_u8()?;
    let payload_len = buf.read_i32()?;
    if payload_len < 0 {
        return Err(ProtocolError::MalformedHeader(format!(
            "Negative payload length: {payload_len}"
        )));
    }
    let checksum = if payload_len > 0 {
        Some(buf.read_i32()?)
    } else {
        None
    };
    let payload = buf.read_bytes(payload_len as usize)?;

    Ok(Frame {
        code,
        payload,
        checksum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_layout() {
        let bytes = encode_frame(1, |_| Ok(())).unwrap();
        // length(4) + magic(4) + code(1) + payloadLen(4), no checksum slot
        assert_eq!(bytes.len(), 13);
        assert_eq!(&bytes[..4], &9i32.to_be_bytes());
        assert_eq!(&bytes[4..8], &PROTOCOL_MAGIC.to_be_bytes());
        assert_eq!(bytes[8], 1);
        assert_eq!(&bytes[9..13], &0i32.to_be_bytes());
    }

    #[test]
    fn test_payload_layout_and_length_field() {
        let bytes = encode_frame(22, |b| {
            b.write_bytes(&[0xAA; 5]);
            Ok(())
        })
        .unwrap();
        assert_eq!(bytes.len(), 17 + 5);
        // Length counts magic + code + payloadLen + checksum + payload.
        assert_eq!(&bytes[..4], &(13i32 + 5).to_be_bytes());
        assert_eq!(bytes[8], 22);
        assert_eq!(&bytes[9..13], &5i32.to_be_bytes());
        assert_eq!(&bytes[13..17], &checksum(&[0xAA; 5]).to_be_bytes());
        assert_eq!(&bytes[17..], &[0xAA; 5]);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let bytes = encode_frame(23, |b| {
            b.write_string("block bytes");
            Ok(())
        })
        .unwrap();
        let mut r = ReadCursor::from(bytes);
        let frame = decode_frame(&mut r).unwrap();
        assert_eq!(frame.code, 23);
        assert_eq!(frame.payload.as_ref(), b"block bytes");
        assert_eq!(frame.checksum, Some(checksum(b"block bytes")));
        assert_eq!(r.remaining(), 0);
        frame.verify_checksum(true).unwrap();
    }

    #[test]
    fn test_checksum_policy() {
        let frame = Frame {
            code: 23,
            payload: Bytes::from_static(b"tampered"),
            checksum: Some(0),
        };
        // Advisory by default, hard failure when enforced.
        frame.verify_checksum(false).unwrap();
        assert!(matches!(
            frame.verify_checksum(true),
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_checksumless_frame_always_passes() {
        let frame = Frame {
            code: 1,
            payload: Bytes::new(),
            checksum: None,
        };
        frame.verify_checksum(true).unwrap();
    }

    #[test]
    fn test_negative_payload_length_rejected() {
        let mut w = WriteCursor::new();
        w.write_i32(9)
            .write_i32(PROTOCOL_MAGIC)
            .write_u8(1)
            .write_i32(-1);
        let mut r = ReadCursor::from(w.into_vec());
        assert!(matches!(
            decode_frame(&mut r),
            Err(ProtocolError::MalformedHeader(_))
        ));
    }
}
