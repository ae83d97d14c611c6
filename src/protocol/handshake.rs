//! The one-time, non-framed initial exchange establishing protocol identity.
//!
//! Unlike every later message the handshake is not wrapped in the frame
//! envelope, and its total length is only discoverable by peeking three
//! nested length prefixes: the app-name length at offset 0, the node-name
//! length at an offset that depends on it, and the declared-address length
//! after both. [`Handshake::try_decode`] runs that peek dance against the
//! assembler and defers (returns `Ok(None)`) until the whole record is
//! buffered.
//!
//! Layout:
//!
//! ```text
//! [appNameLen(1)] [appName] [major(4)] [minor(4)] [patch(4)]
//! [nodeNameLen(1)] [nodeName] [nonce(8)]
//! [declaredAddrLen(4)] [declaredAddr] [timestamp(8)]
//! ```
//!
//! Fixed fields total 34 bytes. A zero app-name length or an implausible
//! declared-address length is a hard failure rather than "wait for more" —
//! otherwise a malicious peer could park the connection forever.

use crate::codec::primitives::{Int, PrefixedBytes, PrefixedString, ULong};
use crate::codec::Codec;
use crate::config::{NodeIdentity, MAX_DECLARED_ADDRESS_SIZE, MAX_HANDSHAKE_SIZE};
use crate::core::assembler::StreamAssembler;
use crate::core::cursor::{ReadCursor, WriteCursor};
use crate::error::{constants, ProtocolError, Result};
use crate::utils::time::timestamp_millis;
use serde::{Deserialize, Serialize};

/// Fixed-field byte count: two length bytes, three version ints, nonce,
/// declared-address length, timestamp.
pub const MIN_HANDSHAKE_SIZE: usize = 34;

/// Three-part protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
}

impl Version {
    fn encode(&self, buf: &mut WriteCursor) -> Result<()> {
        Int.encode(buf, &self.major)?;
        Int.encode(buf, &self.minor)?;
        Int.encode(buf, &self.patch)
    }

    fn decode(buf: &mut ReadCursor) -> Result<Self> {
        Ok(Self {
            major: Int.decode(buf)?,
            minor: Int.decode(buf)?,
            patch: Int.decode(buf)?,
        })
    }
}

impl From<(i32, i32, i32)> for Version {
    fn from((major, minor, patch): (i32, i32, i32)) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// One side's half of the initial exchange. Created once per connection
/// attempt and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handshake {
    pub app_name: String,
    pub version: Version,
    pub node_name: String,
    pub nonce: u64,
    pub declared_address: Vec<u8>,
    pub timestamp: u64,
}

impl Handshake {
    /// The local half, stamped with the current time and a fresh nonce.
    pub fn from_identity(identity: &NodeIdentity) -> Self {
        Self {
            app_name: identity.app_name.clone(),
            version: identity.version.into(),
            node_name: identity.node_name.clone(),
            nonce: rand::random::<u64>(),
            declared_address: identity.declared_address.clone(),
            timestamp: timestamp_millis(),
        }
    }

    pub fn encode(&self, buf: &mut WriteCursor) -> Result<()> {
        PrefixedString.encode(buf, &self.app_name)?;
        self.version.encode(buf)?;
        PrefixedString.encode(buf, &self.node_name)?;
        ULong.encode(buf, &self.nonce)?;
        PrefixedBytes.encode(buf, &self.declared_address)?;
        ULong.encode(buf, &self.timestamp)
    }

    pub fn decode(buf: &mut ReadCursor) -> Result<Self> {
        Ok(Self {
            app_name: PrefixedString.decode(buf)?,
            version: Version::decode(buf)?,
            node_name: PrefixedString.decode(buf)?,
            nonce: ULong.decode(buf)?,
            declared_address: PrefixedBytes.decode(buf)?,
            timestamp: ULong.decode(buf)?,
        })
    }

    /// Attempt a decode against buffered stream bytes.
    ///
    /// Returns `Ok(None)` while the record is still arriving; consumes the
    /// record and returns it once fully buffered; fails hard when a peeked
    /// length cannot belong to a valid handshake.
    pub fn try_decode(buf: &mut StreamAssembler) -> Result<Option<Self>> {
        if buf.len() < MIN_HANDSHAKE_SIZE {
            return Ok(None);
        }

        let app_name_len = buf.peek_u8(0).unwrap_or(0) as usize;
        if app_name_len == 0 {
            return Err(ProtocolError::MalformedHeader(
                constants::ERR_EMPTY_APP_NAME.into(),
            ));
        }
        let Some(node_name_len) = buf.peek_u8(13 + app_name_len) else {
            return Ok(None);
        };
        let node_name_len = node_name_len as usize;
        let Some(declared_len) = buf.peek_i32(22 + app_name_len + node_name_len) else {
            return Ok(None);
        };
        if declared_len < 0 || declared_len as usize > MAX_DECLARED_ADDRESS_SIZE {
            return Err(ProtocolError::MalformedHeader(format!(
                "Declared address length {declared_len} ({})",
                constants::ERR_MALFORMED_LENGTH
            )));
        }

        let total = MIN_HANDSHAKE_SIZE + app_name_len + node_name_len + declared_len as usize;
        if total > MAX_HANDSHAKE_SIZE {
            return Err(ProtocolError::MalformedHeader(format!(
                "Handshake of {total} bytes ({})",
                constants::ERR_MALFORMED_LENGTH
            )));
        }

        let Some(mut record) = buf.try_consume(total) else {
            return Ok(None);
        };
        Self::decode(&mut record).map(Some)
    }
}
