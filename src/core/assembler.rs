//! Reassembly buffer for arbitrarily-chunked stream input.
//!
//! TCP delivers bytes in whatever chunks it likes; decoders need exact
//! records. [`StreamAssembler`] accumulates chunks, lets header fields be
//! peeked at random offsets before a full record is buffered, and hands out
//! exact-length prefixes as independent [`ReadCursor`]s.
//!
//! Peeks that reach past the first chunk coalesce the chunk list into one
//! contiguous buffer; later peeks and consumes then reuse it, so the cost is
//! amortized.

use crate::core::cursor::ReadCursor;
use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct StreamAssembler {
    chunks: VecDeque<Bytes>,
    len: usize,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one received chunk.
    pub fn push(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.len += chunk.len();
        self.chunks.push_back(chunk);
    }

    /// Total buffered byte count.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// If at least `count` bytes are buffered, remove exactly that prefix
    /// and return it as a cursor; otherwise leave the buffer untouched.
    pub fn try_consume(&mut self, count: usize) -> Option<ReadCursor> {
        if self.len < count || self.chunks.is_empty() {
            return None;
        }
        self.coalesce();
        let mut front = self.chunks.pop_front().unwrap_or_default();
        let rest = front.split_off(count);
        if !rest.is_empty() {
            self.chunks.push_front(rest);
        }
        self.len -= count;
        Some(ReadCursor::new(front))
    }

    /// Peek a big-endian i32 at `offset` without consuming.
    pub fn peek_i32(&mut self, offset: usize) -> Option<i32> {
        let b = self.peek(offset, 4)?;
        Some(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Peek a single byte at `offset` without consuming.
    pub fn peek_u8(&mut self, offset: usize) -> Option<u8> {
        Some(self.peek(offset, 1)?[0])
    }

    fn peek(&mut self, offset: usize, size: usize) -> Option<&[u8]> {
        if offset + size > self.len || self.chunks.is_empty() {
            return None;
        }
        if self.chunks[0].len() < offset + size {
            self.coalesce();
        }
        Some(&self.chunks[0][offset..offset + size])
    }

    /// Collapse the chunk list into one contiguous buffer.
    fn coalesce(&mut self) {
        if self.chunks.len() <= 1 {
            return;
        }
        let mut joined = BytesMut::with_capacity(self.len);
        for chunk in self.chunks.drain(..) {
            joined.extend_from_slice(&chunk);
        }
        self.chunks.push_back(joined.freeze());
    }
}
