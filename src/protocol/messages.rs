//! Concrete message shapes and their payload codecs.
//!
//! Each frame code maps to one payload shape; [`Message::decode`] dispatches
//! on the code of a decoded [`Frame`] and [`Message::to_bytes`] produces the
//! full wire frame for an outbound message. Codes outside the supported set
//! round-trip as [`Message::Unknown`] with their raw payload.

use crate::codec::primitives::{CountedArray, FixedBase58, FixedBytes, Int};
use crate::codec::Codec;
use crate::core::cursor::{ReadCursor, WriteCursor};
use crate::error::Result;
use crate::protocol::block::{Block, Transaction};
use crate::protocol::frame::{decode_frame, encode_frame, Frame};
use serde::{Deserialize, Serialize};

/// Byte length of a block signature on the wire.
pub const SIGNATURE_SIZE: usize = 64;

/// Wire codes for the supported message set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageCode {
    GetPeers = 1,
    Peers = 2,
    GetSignatures = 20,
    Signatures = 21,
    GetBlock = 22,
    Block = 23,
    Transaction = 25,
}

impl MessageCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::GetPeers),
            2 => Some(Self::Peers),
            20 => Some(Self::GetSignatures),
            21 => Some(Self::Signatures),
            22 => Some(Self::GetBlock),
            23 => Some(Self::Block),
            25 => Some(Self::Transaction),
            _ => None,
        }
    }
}

/// One advertised peer endpoint: four raw address bytes and a port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerAddress {
    pub address: [u8; 4],
    pub port: i32,
}

impl std::fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d] = self.address;
        write!(f, "{a}.{b}.{c}.{d}:{}", self.port)
    }
}

/// Codec for one peer entry inside the peers payload.
struct PeerAddressCodec;

impl Codec for PeerAddressCodec {
    type Value = PeerAddress;

    fn encode(&self, buf: &mut WriteCursor, value: &PeerAddress) -> Result<()> {
        FixedBytes(4).encode(buf, &value.address.to_vec())?;
        Int.encode(buf, &value.port)
    }

    fn decode(&self, buf: &mut ReadCursor) -> Result<PeerAddress> {
        let bytes = FixedBytes(4).decode(buf)?;
        let mut address = [0u8; 4];
        address.copy_from_slice(&bytes);
        Ok(PeerAddress {
            address,
            port: Int.decode(buf)?,
        })
    }
}

/// A fully decoded application message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    GetPeers,
    Peers(Vec<PeerAddress>),
    GetSignatures(Vec<String>),
    Signatures(Vec<String>),
    GetBlock(String),
    Block(Block),
    Transaction(Transaction),
    Unknown { code: u8, payload: Vec<u8> },
}

impl Message {
    pub fn code(&self) -> u8 {
        match self {
            Self::GetPeers => MessageCode::GetPeers as u8,
            Self::Peers(_) => MessageCode::Peers as u8,
            Self::GetSignatures(_) => MessageCode::GetSignatures as u8,
            Self::Signatures(_) => MessageCode::Signatures as u8,
            Self::GetBlock(_) => MessageCode::GetBlock as u8,
            Self::Block(_) => MessageCode::Block as u8,
            Self::Transaction(_) => MessageCode::Transaction as u8,
            Self::Unknown { code, .. } => *code,
        }
    }

    /// Interpret a decoded frame's payload.
    pub fn decode(frame: &Frame) -> Result<Self> {
        let mut buf = ReadCursor::new(frame.payload.clone());
        let message = match MessageCode::from_u8(frame.code) {
            Some(MessageCode::GetPeers) => Self::GetPeers,
            Some(MessageCode::Peers) => Self::Peers(CountedArray(PeerAddressCodec).decode(&mut buf)?),
            Some(MessageCode::GetSignatures) => {
                Self::GetSignatures(CountedArray(FixedBase58(SIGNATURE_SIZE)).decode(&mut buf)?)
            }
            Some(MessageCode::Signatures) => {
                Self::Signatures(CountedArray(FixedBase58(SIGNATURE_SIZE)).decode(&mut buf)?)
            }
            Some(MessageCode::GetBlock) => {
                Self::GetBlock(FixedBase58(SIGNATURE_SIZE).decode(&mut buf)?)
            }
            Some(MessageCode::Block) => Self::Block(Block::decode(&mut buf)?),
            Some(MessageCode::Transaction) => Self::Transaction(Transaction::decode_tagged(&mut buf)?),
            None => Self::Unknown {
                code: frame.code,
                payload: frame.payload.to_vec(),
            },
        };
        Ok(message)
    }

    /// Decode straight from frame bytes.
    pub fn from_frame_bytes(buf: &mut ReadCursor) -> Result<Self> {
        let frame = decode_frame(buf)?;
        Self::decode(&frame)
    }

    pub fn encode_payload(&self, buf: &mut WriteCursor) -> Result<()> {
        match self {
            Self::GetPeers => Ok(()),
            Self::Peers(peers) => CountedArray(PeerAddressCodec).encode(buf, peers),
            Self::GetSignatures(signatures) => {
                CountedArray(FixedBase58(SIGNATURE_SIZE)).encode(buf, signatures)
            }
            Self::Signatures(signatures) => {
                CountedArray(FixedBase58(SIGNATURE_SIZE)).encode(buf, signatures)
            }
            Self::GetBlock(signature) => FixedBase58(SIGNATURE_SIZE).encode(buf, signature),
            Self::Block(block) => block.encode(buf),
            Self::Transaction(transaction) => transaction.encode_tagged(buf),
            Self::Unknown { payload, .. } => {
                buf.write_bytes(payload);
                Ok(())
            }
        }
    }

    /// Encode as a complete wire frame.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_frame(self.code(), |buf| self.encode_payload(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(message: Message) -> Message {
        let bytes = message.to_bytes().unwrap();
        let mut r = ReadCursor::from(bytes);
        let decoded = Message::from_frame_bytes(&mut r).unwrap();
        assert_eq!(r.remaining(), 0);
        decoded
    }

    fn b58(byte: u8, len: usize) -> String {
        bs58::encode(vec![byte; len]).into_string()
    }

    #[test]
    fn test_get_peers_has_empty_payload() {
        let bytes = Message::GetPeers.to_bytes().unwrap();
        assert_eq!(bytes.len(), 13);
        assert_eq!(roundtrip(Message::GetPeers), Message::GetPeers);
    }

    #[test]
    fn test_peers_roundtrip() {
        let peers = vec![
            PeerAddress {
                address: [52, 52, 46, 76],
                port: 6868,
            },
            PeerAddress {
                address: [127, 0, 0, 1],
                port: 6863,
            },
        ];
        assert_eq!(roundtrip(Message::Peers(peers.clone())), Message::Peers(peers));
    }

    #[test]
    fn test_peer_address_display() {
        let peer = PeerAddress {
            address: [35, 156, 19, 4],
            port: 6868,
        };
        assert_eq!(peer.to_string(), "35.156.19.4:6868");
    }

    #[test]
    fn test_signature_messages_roundtrip() {
        let request = Message::GetSignatures(vec![b58(1, 64)]);
        assert_eq!(roundtrip(request.clone()), request);

        let reply = Message::Signatures(vec![b58(1, 64), b58(2, 64), b58(3, 64)]);
        assert_eq!(roundtrip(reply.clone()), reply);

        let get_block = Message::GetBlock(b58(4, 64));
        assert_eq!(roundtrip(get_block.clone()), get_block);
    }

    #[test]
    fn test_unknown_code_roundtrips_raw() {
        let message = Message::Unknown {
            code: 99,
            payload: vec![1, 2, 3, 4],
        };
        assert_eq!(roundtrip(message.clone()), message);
    }

    #[test]
    fn test_message_codes_match_wire_values() {
        assert_eq!(Message::GetPeers.code(), 1);
        assert_eq!(Message::Peers(vec![]).code(), 2);
        assert_eq!(Message::GetSignatures(vec![]).code(), 20);
        assert_eq!(Message::Signatures(vec![]).code(), 21);
        assert_eq!(Message::GetBlock(b58(0, 64)).code(), 22);
        assert_eq!(MessageCode::from_u8(23), Some(MessageCode::Block));
        assert_eq!(MessageCode::from_u8(25), Some(MessageCode::Transaction));
        assert_eq!(MessageCode::from_u8(3), None);
    }
}
