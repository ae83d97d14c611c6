//! # Codec Framework
//!
//! Composable field-by-field encoders/decoders over cursors.
//!
//! A [`Codec`] pairs an encoder and a decoder for one value shape. Record
//! shapes are built by decoding fields strictly in declared order, so a
//! field's codec may be chosen from already-decoded siblings (a presence
//! byte gating an asset id, a version gating a count width) — the partially
//! built value is threaded forward explicitly, never captured in hidden
//! mutable state.
//!
//! Three composition forms cover the wire format:
//! - **record**: sequential field codecs (plain `decode`/`encode` impls on
//!   the record types)
//! - **region**: repeated elements constrained to an exact byte budget
//!   ([`decode_region`]), tolerating zero, one, or many elements
//! - **discriminator**: a concrete shape chosen from an already-decoded tag
//!   with a mandatory raw-blob catch-all, so unknown tags still advance the
//!   cursor correctly (see the transaction union in `protocol::block`)
//!
//! Contract: `decode(encode(x)) == x` for every codec here.

pub mod primitives;

use crate::core::cursor::{ReadCursor, WriteCursor};
use crate::error::Result;

/// A paired encoder/decoder for one value shape.
pub trait Codec {
    type Value;

    fn encode(&self, buf: &mut WriteCursor, value: &Self::Value) -> Result<()>;
    fn decode(&self, buf: &mut ReadCursor) -> Result<Self::Value>;
}

/// Decode repeated elements from exactly `budget` bytes.
///
/// The budget region is split off the cursor up front, so the parent cursor
/// advances by exactly `budget` regardless of how many elements decode; an
/// element that reads past the region fails with `OutOfBounds` instead of
/// bleeding into subsequent fields.
pub fn decode_region<T>(
    buf: &mut ReadCursor,
    budget: usize,
    mut decode_one: impl FnMut(&mut ReadCursor) -> Result<T>,
) -> Result<Vec<T>> {
    let mut region = ReadCursor::new(buf.read_bytes(budget)?);
    let mut items = Vec::new();
    while region.remaining() > 0 {
        items.push(decode_one(&mut region)?);
    }
    Ok(items)
}

/// Encode repeated elements back to back; the caller owns any surrounding
/// size field.
pub fn encode_region<T>(
    buf: &mut WriteCursor,
    items: &[T],
    mut encode_one: impl FnMut(&mut WriteCursor, &T) -> Result<()>,
) -> Result<()> {
    for item in items {
        encode_one(buf, item)?;
    }
    Ok(())
}
