//! Per-peer connection: socket ownership, handshake, frame extraction, and
//! request/reply correlation.
//!
//! Each connection runs one driver task that exclusively owns the socket,
//! the stream assembler, and the pending-request table, so no locking is
//! needed. Callers talk to the driver over a command channel and receive
//! outcomes over oneshot channels.
//!
//! State machine:
//!
//! ```text
//! Disconnected -> Connecting -> AwaitingHandshake -> Ready -> Closed
//! ```
//!
//! `Closed` is reachable from every state on socket error, remote close, or
//! an unrecoverable decode failure, and settles every outstanding request
//! with `ConnectionClosed`. Incoming bytes are buffered in any state, but no
//! frame is dispatched before the remote handshake decodes.

use crate::config::ClientConfig;
use crate::core::assembler::StreamAssembler;
use crate::core::cursor::WriteCursor;
use crate::error::{ProtocolError, RequestFailure, Result};
use crate::protocol::block::Block;
use crate::protocol::frame::{decode_frame, LENGTH_FIELD_SIZE};
use crate::protocol::handshake::Handshake;
use crate::protocol::messages::{Message, PeerAddress, SIGNATURE_SIZE};
use crate::transport::pending::{PendingTable, Reply, ReplySender, RequestKey};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Wakeup interval when nothing is outstanding.
const IDLE_WAKEUP: Duration = Duration::from_secs(60);

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    AwaitingHandshake = 2,
    Ready = 3,
    Closed = 4,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Disconnected,
            1 => Self::Connecting,
            2 => Self::AwaitingHandshake,
            3 => Self::Ready,
            _ => Self::Closed,
        }
    }
}

type BlockHandler = Box<dyn Fn(Block) + Send + 'static>;
type HandshakeSender = oneshot::Sender<std::result::Result<Handshake, RequestFailure>>;

enum Command {
    Connect { reply: HandshakeSender },
    Request { key: RequestKey, reply: ReplySender },
    SetBlockHandler { handler: BlockHandler },
    Close,
}

/// Handle to one peer connection.
///
/// Cheap to use from many tasks at once: identical concurrent requests are
/// coalesced onto a single wire request by the driver.
pub struct PeerConnection {
    addr: SocketAddr,
    cmd_tx: mpsc::UnboundedSender<Command>,
    state: Arc<AtomicU8>,
}

impl PeerConnection {
    /// Create the connection handle and spawn its driver task. No socket
    /// activity happens until [`PeerConnection::connect_and_handshake`].
    pub fn new(addr: SocketAddr, config: ClientConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let state = Arc::new(AtomicU8::new(ConnectionState::Disconnected as u8));
        let pending = PendingTable::new(config.pending_capacity);
        let driver = Driver {
            addr,
            config,
            cmd_rx,
            state: state.clone(),
            assembler: StreamAssembler::new(),
            pending,
            handshake_waiters: Vec::new(),
            remote_handshake: None,
            block_handler: None,
        };
        tokio::spawn(driver.run());
        Self {
            addr,
            cmd_tx,
            state,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether the connection has completed its handshake and not closed.
    pub fn is_alive(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Open the socket, exchange handshakes, and return the remote identity.
    ///
    /// Concurrent and repeated calls share one attempt; once the handshake
    /// is done the remote identity is returned immediately.
    pub async fn connect_and_handshake(&self) -> Result<Handshake> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Connect { reply: tx })
            .map_err(|_| ProtocolError::ConnectionClosed)?;
        match rx.await {
            Ok(Ok(handshake)) => Ok(handshake),
            Ok(Err(failure)) => Err(failure.into()),
            Err(_) => Err(ProtocolError::ConnectionClosed),
        }
    }

    /// Request the peer's known addresses.
    pub async fn get_peers(&self) -> Result<Vec<PeerAddress>> {
        match self.request(RequestKey::Peers).await? {
            Reply::Peers(peers) => Ok(peers),
            _ => Err(ProtocolError::UnexpectedMessage),
        }
    }

    /// Request the signature chain extending from `last_signature`.
    pub async fn get_signatures(&self, last_signature: &str) -> Result<Vec<String>> {
        let key = RequestKey::Signatures {
            last_signature: canonical_signature(last_signature)?,
        };
        match self.request(key).await? {
            Reply::Signatures(signatures) => Ok(signatures),
            _ => Err(ProtocolError::UnexpectedMessage),
        }
    }

    /// Request one block by signature.
    pub async fn get_block(&self, signature: &str) -> Result<Block> {
        let key = RequestKey::Block {
            signature: canonical_signature(signature)?,
        };
        match self.request(key).await? {
            Reply::Block(block) => Ok(block),
            _ => Err(ProtocolError::UnexpectedMessage),
        }
    }

    /// Register the handler for block announcements that match no pending
    /// request. One handler per connection; a second call replaces it.
    pub fn set_block_handler(&self, handler: impl Fn(Block) + Send + 'static) {
        let _ = self.cmd_tx.send(Command::SetBlockHandler {
            handler: Box::new(handler),
        });
    }

    /// Close the connection, settling all outstanding requests with
    /// `ConnectionClosed`.
    pub fn close(&self) {
        let _ = self.cmd_tx.send(Command::Close);
    }

    async fn request(&self, key: RequestKey) -> Result<Reply> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Request { key, reply: tx })
            .map_err(|_| ProtocolError::ConnectionClosed)?;
        match rx.await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(failure)) => Err(failure.into()),
            Err(_) => Err(ProtocolError::ConnectionClosed),
        }
    }
}

/// Canonicalize a base58 signature argument so coalescing keys compare
/// equal and replies (re-encoded from raw bytes) match.
fn canonical_signature(signature: &str) -> Result<String> {
    let bytes = bs58::decode(signature)
        .into_vec()
        .map_err(|e| ProtocolError::SerializeError(format!("Invalid base58 signature: {e}")))?;
    if bytes.len() != SIGNATURE_SIZE {
        return Err(ProtocolError::SerializeError(format!(
            "Signature decodes to {} bytes, expected {SIGNATURE_SIZE}",
            bytes.len()
        )));
    }
    Ok(bs58::encode(bytes).into_string())
}

struct Driver {
    addr: SocketAddr,
    config: ClientConfig,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    state: Arc<AtomicU8>,
    assembler: StreamAssembler,
    pending: PendingTable,
    handshake_waiters: Vec<HandshakeSender>,
    remote_handshake: Option<Handshake>,
    block_handler: Option<BlockHandler>,
}

impl Driver {
    async fn run(mut self) {
        // Idle until something asks for the socket.
        loop {
            match self.cmd_rx.recv().await {
                None | Some(Command::Close) => {
                    self.set_state(ConnectionState::Closed);
                    return;
                }
                Some(Command::SetBlockHandler { handler }) => {
                    self.block_handler = Some(handler);
                }
                Some(Command::Request { reply, .. }) => {
                    let _ = reply.send(Err(RequestFailure::NotConnected));
                }
                Some(Command::Connect { reply }) => {
                    self.handshake_waiters.push(reply);
                    break;
                }
            }
        }

        self.set_state(ConnectionState::Connecting);
        let connect = TcpStream::connect(self.addr);
        let mut stream = match tokio::time::timeout(self.config.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                warn!(peer = %self.addr, error = %e, "TCP connect failed");
                self.shutdown(RequestFailure::ConnectionClosed);
                return;
            }
            Err(_) => {
                warn!(peer = %self.addr, "TCP connect timed out");
                self.shutdown(RequestFailure::Timeout);
                return;
            }
        };

        let local = Handshake::from_identity(&self.config.identity);
        let mut buf = WriteCursor::new();
        if let Err(e) = local.encode(&mut buf) {
            warn!(peer = %self.addr, error = %e, "Local handshake rejected");
            self.shutdown(RequestFailure::ConnectionClosed);
            return;
        }
        if let Err(e) = stream.write_all(buf.as_slice()).await {
            warn!(peer = %self.addr, error = %e, "Failed to send handshake");
            self.shutdown(RequestFailure::ConnectionClosed);
            return;
        }
        debug!(peer = %self.addr, nonce = local.nonce, "Sent local handshake");
        self.set_state(ConnectionState::AwaitingHandshake);

        let handshake_deadline = Instant::now() + self.config.connect_timeout;
        self.event_loop(&mut stream, handshake_deadline).await;
        self.shutdown(RequestFailure::ConnectionClosed);
    }

    async fn event_loop(&mut self, stream: &mut TcpStream, handshake_deadline: Instant) {
        let mut read_buf = BytesMut::with_capacity(64 * 1024);

        loop {
            let deadline = if self.remote_handshake.is_none() {
                handshake_deadline
            } else {
                self.pending
                    .next_deadline()
                    .unwrap_or_else(|| Instant::now() + IDLE_WAKEUP)
            };

            tokio::select! {
                read = stream.read_buf(&mut read_buf) => {
                    match read {
                        Ok(0) => {
                            info!(peer = %self.addr, "Peer closed the connection");
                            return;
                        }
                        Ok(_) => {
                            self.assembler.push(read_buf.split().freeze());
                            if let Err(e) = self.process_incoming() {
                                warn!(peer = %self.addr, error = %e, "Protocol failure, closing");
                                return;
                            }
                        }
                        Err(e) => {
                            warn!(peer = %self.addr, error = %e, "Socket read failed");
                            return;
                        }
                    }
                }
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        None | Some(Command::Close) => return,
                        Some(cmd) => {
                            if self.handle_command(cmd, stream).await.is_err() {
                                return;
                            }
                        }
                    }
                }
                _ = sleep_until(deadline) => {
                    let now = Instant::now();
                    if self.remote_handshake.is_none() && now >= handshake_deadline {
                        warn!(peer = %self.addr, "Handshake timed out");
                        for waiter in self.handshake_waiters.drain(..) {
                            let _ = waiter.send(Err(RequestFailure::Timeout));
                        }
                        return;
                    }
                    self.pending.expire(now);
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: Command, stream: &mut TcpStream) -> Result<()> {
        match cmd {
            Command::Connect { reply } => {
                match &self.remote_handshake {
                    Some(handshake) => {
                        let _ = reply.send(Ok(handshake.clone()));
                    }
                    None => self.handshake_waiters.push(reply),
                }
                Ok(())
            }
            Command::Request { key, reply } => {
                if self.remote_handshake.is_none() {
                    let _ = reply.send(Err(RequestFailure::NotConnected));
                    return Ok(());
                }
                let deadline = Instant::now() + self.config.request_timeout;
                if !self.pending.join(key.clone(), reply, deadline) {
                    return Ok(());
                }
                let bytes = match key.to_request().to_bytes() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(peer = %self.addr, error = %e, "Failed to encode request");
                        self.pending.settle_failure(&key, RequestFailure::Cancelled);
                        return Ok(());
                    }
                };
                debug!(peer = %self.addr, ?key, bytes = bytes.len(), "Writing request");
                stream.write_all(&bytes).await.map_err(|e| {
                    warn!(peer = %self.addr, error = %e, "Socket write failed");
                    ProtocolError::Io(e)
                })
            }
            Command::SetBlockHandler { handler } => {
                self.block_handler = Some(handler);
                Ok(())
            }
            Command::Close => Ok(()),
        }
    }

    /// Drain the assembler: first the handshake, then as many complete
    /// frames as are buffered. A hard decode failure propagates and closes
    /// the connection; short data just stops the loop until more arrives.
    fn process_incoming(&mut self) -> Result<()> {
        if self.remote_handshake.is_none() {
            match Handshake::try_decode(&mut self.assembler)? {
                None => return Ok(()),
                Some(handshake) => {
                    info!(
                        peer = %self.addr,
                        app = %handshake.app_name,
                        version = %handshake.version,
                        node = %handshake.node_name,
                        "Handshake complete"
                    );
                    self.remote_handshake = Some(handshake.clone());
                    self.set_state(ConnectionState::Ready);
                    for waiter in self.handshake_waiters.drain(..) {
                        let _ = waiter.send(Ok(handshake.clone()));
                    }
                }
            }
        }

        while let Some(frame_len) = self.assembler.peek_i32(0) {
            if frame_len < 0 || frame_len as usize > self.config.max_frame_size {
                return Err(ProtocolError::MalformedHeader(format!(
                    "Frame length {frame_len} outside [0, {}]",
                    self.config.max_frame_size
                )));
            }
            let Some(mut record) = self
                .assembler
                .try_consume(frame_len as usize + LENGTH_FIELD_SIZE)
            else {
                break;
            };
            let frame = decode_frame(&mut record)?;
            frame.verify_checksum(self.config.enforce_checksums)?;
            let message = Message::decode(&frame)?;
            self.dispatch(message);
        }
        Ok(())
    }

    fn dispatch(&mut self, message: Message) {
        match message {
            Message::Peers(peers) => {
                if !self.pending.settle(&RequestKey::Peers, Reply::Peers(peers)) {
                    debug!(peer = %self.addr, "Unsolicited peers reply ignored");
                }
            }
            Message::Signatures(signatures) => {
                // The first signature echoes the requested last-signature.
                let key = signatures.first().map(|s| RequestKey::Signatures {
                    last_signature: s.clone(),
                });
                let settled = key
                    .map(|key| self.pending.settle(&key, Reply::Signatures(signatures)))
                    .unwrap_or(false);
                if !settled {
                    debug!(peer = %self.addr, "Unmatched signatures reply ignored");
                }
            }
            Message::Block(block) => {
                let key = RequestKey::Block {
                    signature: block.signature.clone(),
                };
                if self.pending.contains(&key) {
                    self.pending.settle(&key, Reply::Block(block));
                } else if let Some(handler) = &self.block_handler {
                    debug!(peer = %self.addr, signature = %block.signature, "Unsolicited block");
                    handler(block);
                } else {
                    debug!(peer = %self.addr, "Unsolicited block dropped, no handler");
                }
            }
            other => {
                debug!(peer = %self.addr, code = other.code(), "Ignoring unsupported message");
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn shutdown(&mut self, handshake_failure: RequestFailure) {
        self.set_state(ConnectionState::Closed);
        for waiter in self.handshake_waiters.drain(..) {
            let _ = waiter.send(Err(handshake_failure));
        }
        self.pending.fail_all(RequestFailure::ConnectionClosed);
        debug!(peer = %self.addr, "Connection closed");
    }
}
