//! # Core Byte-Level Components
//!
//! Low-level buffer handling beneath the codec layer.
//!
//! ## Components
//! - **Cursor**: position-tracked big-endian reads/writes over byte regions
//! - **Assembler**: reassembly of arbitrarily-chunked stream input with
//!   header peeking ahead of full-record decode
//!
//! ## Safety Properties
//! - Every read and seek is bounds-checked; a failed read leaves the cursor
//!   position untouched
//! - Slices are independent views, never mutable aliases
//! - The assembler removes bytes only in exact-length prefixes, so a decode
//!   failure cannot skew the framing of later records

pub mod assembler;
pub mod cursor;

pub use assembler::StreamAssembler;
pub use cursor::{ReadCursor, WriteCursor};
