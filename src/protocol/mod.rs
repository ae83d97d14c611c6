//! # Wire Protocol
//!
//! The message-level protocol: frame envelope, the non-framed handshake,
//! and the concrete record shapes (peers, signatures, blocks, transactions).
//!
//! ## Components
//! - **Frame**: length-delimited, checksummed message envelope
//! - **Handshake**: the one-time variable-length initial exchange
//! - **Messages**: payload codecs keyed by frame code
//! - **Block**: block headers, the byte-budgeted transaction region, and
//!   the discriminated transaction union

pub mod block;
pub mod frame;
pub mod handshake;
pub mod messages;

pub use block::{Block, Transaction};
pub use frame::Frame;
pub use handshake::{Handshake, Version};
pub use messages::{Message, MessageCode, PeerAddress};
