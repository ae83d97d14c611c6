//! Position-tracked cursors over byte buffers.
//!
//! All integer encodings are big-endian. [`ReadCursor`] is a decode-local
//! view over immutable bytes; [`WriteCursor`] auto-grows its backing storage
//! and tracks a logical end separately from the write position so headers
//! can be backfilled after their payload is known.
//!
//! Slicing never aliases mutable storage: a slice of a read cursor is an
//! independent read-only view, and a slice of a write cursor copies.

use crate::error::{ProtocolError, Result};
use bytes::Bytes;

/// Growth increment for write buffers.
const CHUNK: usize = 8192;

/// Read-only cursor over a byte region.
#[derive(Debug, Clone)]
pub struct ReadCursor {
    data: Bytes,
    position: usize,
}

impl ReadCursor {
    pub fn new(data: Bytes) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Move to an absolute position; a negative target is relative to the
    /// end of the buffer. Positions at or past the end are out of bounds.
    pub fn go_to(&mut self, position: i64) -> Result<()> {
        let resolved = if position < 0 {
            self.data.len() as i64 + position
        } else {
            position
        };
        if resolved < 0 || resolved as usize >= self.data.len() {
            return Err(ProtocolError::OutOfBounds {
                position: resolved,
                len: self.data.len(),
            });
        }
        self.position = resolved as usize;
        Ok(())
    }

    pub fn go_to_end(&mut self) {
        self.position = self.data.len();
    }

    fn take(&mut self, count: usize) -> Result<&[u8]> {
        if self.position + count > self.data.len() {
            return Err(ProtocolError::OutOfBounds {
                position: (self.position + count) as i64,
                len: self.data.len(),
            });
        }
        let slice = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// 64-bit read composed of two 32-bit big-endian halves.
    pub fn read_i64(&mut self) -> Result<i64> {
        let high = self.read_i32()?;
        let low = self.read_i32()?;
        Ok(((high as i64) << 32) | (low as u32 as i64))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(self.read_i64()? as u64)
    }

    /// Fixed-length byte read as an independent view.
    pub fn read_bytes(&mut self, count: usize) -> Result<Bytes> {
        if self.position + count > self.data.len() {
            return Err(ProtocolError::OutOfBounds {
                position: (self.position + count) as i64,
                len: self.data.len(),
            });
        }
        let slice = self.data.slice(self.position..self.position + count);
        self.position += count;
        Ok(slice)
    }

    /// Fixed-length UTF-8 read; invalid sequences are replaced rather than
    /// failing, since peer-supplied names are arbitrary bytes.
    pub fn read_string(&mut self, count: usize) -> Result<String> {
        let bytes = self.take(count)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Independent cursor over `[from, to)` of the underlying region.
    pub fn slice(&self, from: usize, to: usize) -> Result<ReadCursor> {
        if from > to || to > self.data.len() {
            return Err(ProtocolError::OutOfBounds {
                position: to as i64,
                len: self.data.len(),
            });
        }
        Ok(ReadCursor::new(self.data.slice(from..to)))
    }
}

impl From<Vec<u8>> for ReadCursor {
    fn from(data: Vec<u8>) -> Self {
        Self::new(Bytes::from(data))
    }
}

/// Auto-growing write cursor.
///
/// The logical end tracks the furthest byte ever written; rewinding with
/// [`WriteCursor::go_to`] does not shrink it, which is what header
/// backfilling relies on.
#[derive(Debug)]
pub struct WriteCursor {
    buf: Vec<u8>,
    position: usize,
    end: usize,
}

impl WriteCursor {
    pub fn new() -> Self {
        Self {
            buf: vec![0; CHUNK],
            position: 0,
            end: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Logical end, i.e. the number of meaningful bytes.
    pub fn len(&self) -> usize {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end == 0
    }

    /// Move to an absolute position; a negative target is relative to the
    /// logical end. Positions at or past the allocated capacity are out of
    /// bounds.
    pub fn go_to(&mut self, position: i64) -> Result<&mut Self> {
        let resolved = if position < 0 {
            self.end as i64 + position
        } else {
            position
        };
        if resolved < 0 || resolved as usize >= self.buf.len() {
            return Err(ProtocolError::OutOfBounds {
                position: resolved,
                len: self.buf.len(),
            });
        }
        self.position = resolved as usize;
        Ok(self)
    }

    pub fn go_to_end(&mut self) -> &mut Self {
        self.position = self.end;
        self
    }

    /// Rewind for reuse without deallocating.
    pub fn clear(&mut self) -> &mut Self {
        self.position = 0;
        self.end = 0;
        self
    }

    fn reserve(&mut self, count: usize) {
        let needed = self.position + count;
        if needed > self.buf.len() {
            let chunks = needed.div_ceil(CHUNK);
            self.buf.resize(chunks * CHUNK, 0);
        }
    }

    fn put(&mut self, bytes: &[u8]) -> &mut Self {
        self.reserve(bytes.len());
        self.buf[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        if self.end < self.position {
            self.end = self.position;
        }
        self
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.put(&[v])
    }

    pub fn write_i8(&mut self, v: i8) -> &mut Self {
        self.put(&[v as u8])
    }

    pub fn write_i16(&mut self, v: i16) -> &mut Self {
        self.put(&v.to_be_bytes())
    }

    pub fn write_u16(&mut self, v: u16) -> &mut Self {
        self.put(&v.to_be_bytes())
    }

    pub fn write_i32(&mut self, v: i32) -> &mut Self {
        self.put(&v.to_be_bytes())
    }

    /// 64-bit write as two 32-bit big-endian halves.
    pub fn write_i64(&mut self, v: i64) -> &mut Self {
        self.write_i32((v >> 32) as i32);
        self.write_i32(v as i32)
    }

    pub fn write_u64(&mut self, v: u64) -> &mut Self {
        self.write_i64(v as i64)
    }

    pub fn write_bytes(&mut self, v: &[u8]) -> &mut Self {
        self.put(v)
    }

    pub fn write_string(&mut self, v: &str) -> &mut Self {
        self.put(v.as_bytes())
    }

    pub fn write_zeros(&mut self, count: usize) -> &mut Self {
        self.reserve(count);
        self.buf[self.position..self.position + count].fill(0);
        self.position += count;
        if self.end < self.position {
            self.end = self.position;
        }
        self
    }

    /// Borrow the written bytes in `[from, to)`.
    pub fn range(&self, from: usize, to: usize) -> &[u8] {
        &self.buf[from..to]
    }

    /// Borrow all meaningful bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.end]
    }

    /// Copy out the written bytes starting at `from`.
    pub fn to_vec_from(&self, from: usize) -> Vec<u8> {
        self.buf[from..self.end].to_vec()
    }

    pub fn into_vec(mut self) -> Vec<u8> {
        self.buf.truncate(self.end);
        self.buf
    }
}

impl Default for WriteCursor {
    fn default() -> Self {
        Self::new()
    }
}
