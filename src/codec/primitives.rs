//! Primitive codecs: scalars, length-prefixed and fixed-length strings and
//! byte arrays, base58/base64 byte strings, and count-prefixed arrays.

use crate::codec::Codec;
use crate::core::cursor::{ReadCursor, WriteCursor};
use crate::error::{ProtocolError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Unsigned byte.
pub struct Byte;

impl Codec for Byte {
    type Value = u8;

    fn encode(&self, buf: &mut WriteCursor, value: &u8) -> Result<()> {
        buf.write_u8(*value);
        Ok(())
    }

    fn decode(&self, buf: &mut ReadCursor) -> Result<u8> {
        buf.read_u8()
    }
}

/// Signed 16-bit integer.
pub struct Short;

impl Codec for Short {
    type Value = i16;

    fn encode(&self, buf: &mut WriteCursor, value: &i16) -> Result<()> {
        buf.write_i16(*value);
        Ok(())
    }

    fn decode(&self, buf: &mut ReadCursor) -> Result<i16> {
        buf.read_i16()
    }
}

/// Signed 32-bit integer.
pub struct Int;

impl Codec for Int {
    type Value = i32;

    fn encode(&self, buf: &mut WriteCursor, value: &i32) -> Result<()> {
        buf.write_i32(*value);
        Ok(())
    }

    fn decode(&self, buf: &mut ReadCursor) -> Result<i32> {
        buf.read_i32()
    }
}

/// Signed 64-bit integer, written as two 32-bit big-endian halves.
pub struct Long;

impl Codec for Long {
    type Value = i64;

    fn encode(&self, buf: &mut WriteCursor, value: &i64) -> Result<()> {
        buf.write_i64(*value);
        Ok(())
    }

    fn decode(&self, buf: &mut ReadCursor) -> Result<i64> {
        buf.read_i64()
    }
}

/// Unsigned 64-bit integer.
pub struct ULong;

impl Codec for ULong {
    type Value = u64;

    fn encode(&self, buf: &mut WriteCursor, value: &u64) -> Result<()> {
        buf.write_u64(*value);
        Ok(())
    }

    fn decode(&self, buf: &mut ReadCursor) -> Result<u64> {
        buf.read_u64()
    }
}

/// String with a 1-byte length prefix.
pub struct PrefixedString;

impl Codec for PrefixedString {
    type Value = String;

    fn encode(&self, buf: &mut WriteCursor, value: &String) -> Result<()> {
        let len = value.len();
        if len > u8::MAX as usize {
            return Err(ProtocolError::SerializeError(format!(
                "String of {len} bytes exceeds 1-byte length prefix"
            )));
        }
        buf.write_u8(len as u8).write_string(value);
        Ok(())
    }

    fn decode(&self, buf: &mut ReadCursor) -> Result<String> {
        let len = buf.read_u8()? as usize;
        buf.read_string(len)
    }
}

/// String with a 2-byte length prefix.
pub struct ShortPrefixedString;

impl Codec for ShortPrefixedString {
    type Value = String;

    fn encode(&self, buf: &mut WriteCursor, value: &String) -> Result<()> {
        let len = value.len();
        if len > u16::MAX as usize {
            return Err(ProtocolError::SerializeError(format!(
                "String of {len} bytes exceeds 2-byte length prefix"
            )));
        }
        buf.write_u16(len as u16).write_string(value);
        Ok(())
    }

    fn decode(&self, buf: &mut ReadCursor) -> Result<String> {
        let len = buf.read_u16()? as usize;
        buf.read_string(len)
    }
}

/// String of a fixed byte length with no prefix.
pub struct FixedString(pub usize);

impl Codec for FixedString {
    type Value = String;

    fn encode(&self, buf: &mut WriteCursor, value: &String) -> Result<()> {
        if value.len() != self.0 {
            return Err(ProtocolError::SerializeError(format!(
                "Fixed string of {} bytes, got {}",
                self.0,
                value.len()
            )));
        }
        buf.write_string(value);
        Ok(())
    }

    fn decode(&self, buf: &mut ReadCursor) -> Result<String> {
        buf.read_string(self.0)
    }
}

/// Fixed-length raw bytes carried as a base58 string.
///
/// Signatures, public keys, and asset ids all travel as fixed byte runs but
/// are referred to by their base58 form everywhere else, so the decoded
/// representation is the string.
pub struct FixedBase58(pub usize);

impl Codec for FixedBase58 {
    type Value = String;

    fn encode(&self, buf: &mut WriteCursor, value: &String) -> Result<()> {
        let bytes = bs58::decode(value)
            .into_vec()
            .map_err(|e| ProtocolError::SerializeError(format!("Invalid base58: {e}")))?;
        if bytes.len() != self.0 {
            return Err(ProtocolError::SerializeError(format!(
                "Base58 value decodes to {} bytes, expected {}",
                bytes.len(),
                self.0
            )));
        }
        buf.write_bytes(&bytes);
        Ok(())
    }

    fn decode(&self, buf: &mut ReadCursor) -> Result<String> {
        let bytes = buf.read_bytes(self.0)?;
        Ok(bs58::encode(bytes).into_string())
    }
}

/// Fixed-length raw bytes carried as a base64 string.
pub struct FixedBase64(pub usize);

impl Codec for FixedBase64 {
    type Value = String;

    fn encode(&self, buf: &mut WriteCursor, value: &String) -> Result<()> {
        let bytes = BASE64
            .decode(value)
            .map_err(|e| ProtocolError::SerializeError(format!("Invalid base64: {e}")))?;
        if bytes.len() != self.0 {
            return Err(ProtocolError::SerializeError(format!(
                "Base64 value decodes to {} bytes, expected {}",
                bytes.len(),
                self.0
            )));
        }
        buf.write_bytes(&bytes);
        Ok(())
    }

    fn decode(&self, buf: &mut ReadCursor) -> Result<String> {
        let bytes = buf.read_bytes(self.0)?;
        Ok(BASE64.encode(bytes))
    }
}

/// Byte array with a 4-byte length prefix.
pub struct PrefixedBytes;

impl Codec for PrefixedBytes {
    type Value = Vec<u8>;

    fn encode(&self, buf: &mut WriteCursor, value: &Vec<u8>) -> Result<()> {
        buf.write_i32(value.len() as i32).write_bytes(value);
        Ok(())
    }

    fn decode(&self, buf: &mut ReadCursor) -> Result<Vec<u8>> {
        let len = checked_count(buf, 1)?;
        Ok(buf.read_bytes(len)?.to_vec())
    }
}

/// Array of 16-bit values with a 4-byte count prefix.
pub struct PrefixedShorts;

impl Codec for PrefixedShorts {
    type Value = Vec<u16>;

    fn encode(&self, buf: &mut WriteCursor, value: &Vec<u16>) -> Result<()> {
        buf.write_i32(value.len() as i32);
        for v in value {
            buf.write_u16(*v);
        }
        Ok(())
    }

    fn decode(&self, buf: &mut ReadCursor) -> Result<Vec<u16>> {
        let count = checked_count(buf, 2)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(buf.read_u16()?);
        }
        Ok(values)
    }
}

/// Fixed-length byte array with no prefix.
pub struct FixedBytes(pub usize);

impl Codec for FixedBytes {
    type Value = Vec<u8>;

    fn encode(&self, buf: &mut WriteCursor, value: &Vec<u8>) -> Result<()> {
        if value.len() != self.0 {
            return Err(ProtocolError::SerializeError(format!(
                "Fixed byte array of {} bytes, got {}",
                self.0,
                value.len()
            )));
        }
        buf.write_bytes(value);
        Ok(())
    }

    fn decode(&self, buf: &mut ReadCursor) -> Result<Vec<u8>> {
        Ok(buf.read_bytes(self.0)?.to_vec())
    }
}

/// Array of an element codec with a 4-byte count prefix.
pub struct CountedArray<C>(pub C);

impl<C: Codec> Codec for CountedArray<C> {
    type Value = Vec<C::Value>;

    fn encode(&self, buf: &mut WriteCursor, value: &Vec<C::Value>) -> Result<()> {
        buf.write_i32(value.len() as i32);
        for item in value {
            self.0.encode(buf, item)?;
        }
        Ok(())
    }

    fn decode(&self, buf: &mut ReadCursor) -> Result<Vec<C::Value>> {
        let count = checked_count(buf, 1)?;
        let mut items = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            items.push(self.0.decode(buf)?);
        }
        Ok(items)
    }
}

/// Read a count/length prefix, rejecting values that are negative or cannot
/// possibly fit in the remaining bytes at `min_width` bytes per element.
fn checked_count(buf: &mut ReadCursor, min_width: usize) -> Result<usize> {
    let count = buf.read_i32()?;
    if count < 0 {
        return Err(ProtocolError::DeserializeError(format!(
            "Negative count prefix: {count}"
        )));
    }
    let count = count as usize;
    if count.saturating_mul(min_width) > buf.remaining() {
        return Err(ProtocolError::DeserializeError(format!(
            "Count prefix {count} exceeds {} remaining bytes",
            buf.remaining()
        )));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<C: Codec>(codec: &C, value: C::Value) -> C::Value {
        let mut w = WriteCursor::new();
        codec.encode(&mut w, &value).unwrap();
        let mut r = ReadCursor::from(w.into_vec());
        let decoded = codec.decode(&mut r).unwrap();
        assert_eq!(r.remaining(), 0, "codec must consume what it wrote");
        decoded
    }

    #[test]
    fn test_scalar_roundtrips() {
        assert_eq!(roundtrip(&Byte, 0), 0);
        assert_eq!(roundtrip(&Byte, 255), 255);
        assert_eq!(roundtrip(&Short, i16::MIN), i16::MIN);
        assert_eq!(roundtrip(&Int, i32::MAX), i32::MAX);
        assert_eq!(roundtrip(&Long, i64::MIN), i64::MIN);
        assert_eq!(roundtrip(&Long, 0), 0);
        assert_eq!(roundtrip(&ULong, u64::MAX), u64::MAX);
    }

    #[test]
    fn test_string_roundtrips() {
        assert_eq!(roundtrip(&PrefixedString, String::new()), "");
        assert_eq!(roundtrip(&PrefixedString, "node1".into()), "node1");
        assert_eq!(
            roundtrip(&ShortPrefixedString, "x".repeat(300)),
            "x".repeat(300)
        );
        assert_eq!(roundtrip(&FixedString(4), "abcd".into()), "abcd");
    }

    #[test]
    fn test_oversized_prefixed_string_rejected() {
        let mut w = WriteCursor::new();
        let result = PrefixedString.encode(&mut w, &"y".repeat(256));
        assert!(matches!(result, Err(ProtocolError::SerializeError(_))));
    }

    #[test]
    fn test_base58_roundtrip() {
        let sig = bs58::encode(vec![7u8; 64]).into_string();
        assert_eq!(roundtrip(&FixedBase58(64), sig.clone()), sig);
    }

    #[test]
    fn test_base58_wrong_length_rejected() {
        let short = bs58::encode(vec![7u8; 10]).into_string();
        let mut w = WriteCursor::new();
        assert!(FixedBase58(64).encode(&mut w, &short).is_err());
        assert!(FixedBase58(64).encode(&mut w, &"0OIl".to_string()).is_err());
    }

    #[test]
    fn test_base64_roundtrip() {
        let key = BASE64.encode([1u8; 32]);
        assert_eq!(roundtrip(&FixedBase64(32), key.clone()), key);
    }

    #[test]
    fn test_byte_array_roundtrips() {
        assert_eq!(roundtrip(&PrefixedBytes, vec![]), Vec::<u8>::new());
        assert_eq!(roundtrip(&PrefixedBytes, vec![1, 2, 3]), vec![1, 2, 3]);
        assert_eq!(roundtrip(&FixedBytes(3), vec![9, 9, 9]), vec![9, 9, 9]);
        assert_eq!(
            roundtrip(&PrefixedShorts, vec![0, 1, u16::MAX]),
            vec![0, 1, u16::MAX]
        );
    }

    #[test]
    fn test_counted_array_roundtrip() {
        let values = vec![1i32, -1, i32::MAX];
        assert_eq!(roundtrip(&CountedArray(Int), values.clone()), values);
        assert_eq!(roundtrip(&CountedArray(Int), vec![]), Vec::<i32>::new());
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut w = WriteCursor::new();
        w.write_i32(-5);
        let mut r = ReadCursor::from(w.into_vec());
        assert!(matches!(
            CountedArray(Int).decode(&mut r),
            Err(ProtocolError::DeserializeError(_))
        ));
    }

    #[test]
    fn test_implausible_count_rejected() {
        let mut w = WriteCursor::new();
        w.write_i32(1_000_000).write_u8(0);
        let mut r = ReadCursor::from(w.into_vec());
        assert!(PrefixedBytes.decode(&mut r).is_err());
    }
}
