//! # forkscan
//!
//! Lightweight client for a peer-to-peer blockchain network protocol.
//!
//! The crate connects to remote nodes, performs the protocol handshake,
//! requests peer lists, block-signature chains, and individual blocks, and
//! passively observes block announcements — enough to crawl network
//! topology and block history. It is deliberately not a full node: it
//! validates no transactions, keeps no consensus state, and relays nothing.
//!
//! ## Layers
//! - [`core`]: byte cursors and the stream reassembly buffer
//! - [`codec`]: composable field codecs over cursors
//! - [`protocol`]: frame envelope, handshake, and record shapes
//! - [`transport`]: the per-peer connection driver and request correlation
//!
//! ## Example
//! ```no_run
//! use forkscan::{ClientConfig, PeerConnection};
//!
//! #[tokio::main]
//! async fn main() -> forkscan::Result<()> {
//!     let addr = "35.156.19.4:6868".parse().unwrap();
//!     let connection = PeerConnection::new(addr, ClientConfig::default());
//!     connection.set_block_handler(|block| {
//!         println!("announced block {}", block.signature);
//!     });
//!
//!     let remote = connection.connect_and_handshake().await?;
//!     println!("connected to {} ({})", remote.node_name, remote.version);
//!
//!     for peer in connection.get_peers().await? {
//!         println!("peer {peer}");
//!     }
//!     connection.close();
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use config::{ClientConfig, NodeIdentity};
pub use error::{ProtocolError, Result};
pub use protocol::{Block, Handshake, Message, MessageCode, PeerAddress, Transaction, Version};
pub use transport::{ConnectionState, PeerConnection};
