//! Bounded single-flight tracking of outstanding requests.
//!
//! Every outbound request is keyed by its message code and canonicalized
//! arguments. A second caller with the same key joins the existing entry
//! instead of writing duplicate bytes, and every waiter sees the same
//! outcome. The table is LRU-bounded: inserting past capacity evicts the
//! least-recently-used entry and settles it as cancelled, so an unreachable
//! peer cannot accumulate waiters without bound.
//!
//! Settlement removes the entry, so it happens at most once; a reply racing
//! a timeout finds the entry gone and is a silent no-op.

use crate::error::RequestFailure;
use crate::protocol::block::Block;
use crate::protocol::messages::{Message, PeerAddress};
use std::collections::{HashMap, VecDeque};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Correlation key: message code plus canonicalized arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestKey {
    Peers,
    Signatures { last_signature: String },
    Block { signature: String },
}

impl RequestKey {
    /// The request message this key puts on the wire.
    pub fn to_request(&self) -> Message {
        match self {
            Self::Peers => Message::GetPeers,
            Self::Signatures { last_signature } => {
                Message::GetSignatures(vec![last_signature.clone()])
            }
            Self::Block { signature } => Message::GetBlock(signature.clone()),
        }
    }
}

/// A successful reply, cloned out to every coalesced waiter.
#[derive(Debug, Clone)]
pub enum Reply {
    Peers(Vec<PeerAddress>),
    Signatures(Vec<String>),
    Block(Block),
}

pub type ReplySender = oneshot::Sender<Result<Reply, RequestFailure>>;

struct PendingRequest {
    waiters: Vec<ReplySender>,
    deadline: Instant,
}

impl PendingRequest {
    fn settle(self, outcome: &Result<Reply, RequestFailure>) {
        for waiter in self.waiters {
            // A dropped receiver just means the caller went away.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// LRU-bounded map of outstanding requests.
pub struct PendingTable {
    entries: HashMap<RequestKey, PendingRequest>,
    /// Recency order; front is least recently used.
    order: VecDeque<RequestKey>,
    capacity: usize,
}

impl PendingTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &RequestKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Join an existing in-flight request or register a new one.
    ///
    /// Returns true when the key is new, in which case the caller must put
    /// the request frame on the wire. Registering past capacity evicts the
    /// least-recently-used entry with [`RequestFailure::Cancelled`].
    pub fn join(&mut self, key: RequestKey, waiter: ReplySender, deadline: Instant) -> bool {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.waiters.push(waiter);
            self.touch(&key);
            debug!(?key, "Coalesced onto in-flight request");
            return false;
        }

        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                if let Some(entry) = self.entries.remove(&oldest) {
                    warn!(key = ?oldest, "Pending table full, evicting oldest request");
                    entry.settle(&Err(RequestFailure::Cancelled));
                }
            }
        }

        self.entries.insert(
            key.clone(),
            PendingRequest {
                waiters: vec![waiter],
                deadline,
            },
        );
        self.order.push_back(key);
        true
    }

    /// Settle the entry for `key` with a reply. Returns false (and drops
    /// nothing) when no such request is outstanding.
    pub fn settle(&mut self, key: &RequestKey, reply: Reply) -> bool {
        match self.remove(key) {
            Some(entry) => {
                entry.settle(&Ok(reply));
                true
            }
            None => false,
        }
    }

    /// Settle the entry for `key` with a failure.
    pub fn settle_failure(&mut self, key: &RequestKey, failure: RequestFailure) -> bool {
        match self.remove(key) {
            Some(entry) => {
                entry.settle(&Err(failure));
                true
            }
            None => false,
        }
    }

    /// The earliest deadline among outstanding requests.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|e| e.deadline).min()
    }

    /// Settle every entry whose deadline has passed with a timeout.
    pub fn expire(&mut self, now: Instant) -> usize {
        let expired: Vec<RequestKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            debug!(?key, "Request deadline passed");
            self.settle_failure(key, RequestFailure::Timeout);
        }
        expired.len()
    }

    /// Settle everything, e.g. on connection loss.
    pub fn fail_all(&mut self, failure: RequestFailure) {
        self.order.clear();
        for (_, entry) in self.entries.drain() {
            entry.settle(&Err(failure));
        }
    }

    fn remove(&mut self, key: &RequestKey) -> Option<PendingRequest> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(entry)
    }

    fn touch(&mut self, key: &RequestKey) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.clone());
    }
}
