//! Block and transaction record shapes.
//!
//! A block is a fixed header plus a byte-budgeted region of transactions;
//! a transaction is a closed tagged union over the concrete shapes below
//! plus a guaranteed catch-all that carries unrecognized types as raw bytes,
//! sized from the declared transaction size so the cursor always lands on
//! the next record. These are pure value types produced by decode.
//!
//! Wire quirks worth knowing:
//! - the transaction-count field is 1 byte before block version 3 and
//!   4 bytes from version 3 on, and the feature-code array exists only from
//!   version 3;
//! - transfer and order records gate their asset ids behind a presence
//!   byte;
//! - issue and transfer bodies repeat the type byte after the signature.

use crate::codec::primitives::{
    Byte, FixedBase58, FixedString, Int, Long, PrefixedShorts, ShortPrefixedString,
};
use crate::codec::{decode_region, encode_region, Codec};
use crate::core::cursor::{ReadCursor, WriteCursor};
use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};

/// Transaction type tags.
pub mod transaction_type {
    pub const GENESIS: u8 = 1;
    pub const PAYMENT: u8 = 2;
    pub const ISSUE: u8 = 3;
    pub const TRANSFER: u8 = 4;
    pub const REISSUE: u8 = 5;
    pub const BURN: u8 = 6;
    pub const EXCHANGE: u8 = 7;
    pub const LEASE: u8 = 8;
    pub const LEASE_CANCEL: u8 = 9;
    pub const CREATE_ALIAS: u8 = 10;
}

/// A recipient: either a 25-byte address or a named alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AddressOrAlias {
    Address(String),
    Alias { version: u8, scheme: u8, alias: String },
}

impl AddressOrAlias {
    fn decode(buf: &mut ReadCursor) -> Result<Self> {
        let version = Byte.decode(buf)?;
        if version == 1 {
            Ok(Self::Address(FixedBase58(25).decode(buf)?))
        } else {
            let scheme = Byte.decode(buf)?;
            let len = buf.read_i16()?;
            if len < 0 {
                return Err(ProtocolError::DeserializeError(format!(
                    "Negative alias length: {len}"
                )));
            }
            let alias = FixedString(len as usize).decode(buf)?;
            Ok(Self::Alias {
                version,
                scheme,
                alias,
            })
        }
    }

    fn encode(&self, buf: &mut WriteCursor) -> Result<()> {
        match self {
            Self::Address(address) => {
                Byte.encode(buf, &1)?;
                FixedBase58(25).encode(buf, address)
            }
            Self::Alias {
                version,
                scheme,
                alias,
            } => {
                Byte.encode(buf, version)?;
                Byte.encode(buf, scheme)?;
                buf.write_i16(alias.len() as i16);
                FixedString(alias.len()).encode(buf, alias)
            }
        }
    }
}

/// Asset id gated behind a presence byte (1 = present).
fn decode_optional_asset(buf: &mut ReadCursor) -> Result<Option<String>> {
    let present = Byte.decode(buf)?;
    if present == 1 {
        Ok(Some(FixedBase58(32).decode(buf)?))
    } else {
        Ok(None)
    }
}

fn encode_optional_asset(buf: &mut WriteCursor, asset: &Option<String>) -> Result<()> {
    match asset {
        Some(id) => {
            Byte.encode(buf, &1)?;
            FixedBase58(32).encode(buf, id)
        }
        None => Byte.encode(buf, &0),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisTransaction {
    pub timestamp: i64,
    pub recipient: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub timestamp: i64,
    pub sender: String,
    pub recipient: String,
    pub amount: i64,
    pub fee: i64,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueTransaction {
    pub signature: String,
    pub sender: String,
    pub name: String,
    pub description: String,
    pub quantity: i64,
    pub decimals: u8,
    pub reissuable: bool,
    pub fee: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferTransaction {
    pub signature: String,
    pub sender: String,
    pub asset_id: Option<String>,
    pub fee_asset_id: Option<String>,
    pub timestamp: i64,
    pub amount: i64,
    pub fee: i64,
    pub recipient: AddressOrAlias,
    pub attachment: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReissueTransaction {
    pub signature: String,
    pub sender: String,
    pub asset_id: String,
    pub quantity: i64,
    pub reissuable: bool,
    pub fee: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnTransaction {
    pub sender: String,
    pub asset_id: String,
    pub amount: i64,
    pub fee: i64,
    pub timestamp: i64,
    pub signature: String,
}

/// One side of an exchange, embedded twice in every exchange transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub sender: String,
    pub matcher: String,
    pub asset_id: Option<String>,
    pub price_asset_id: Option<String>,
    pub order_type: u8,
    pub price: i64,
    pub amount: i64,
    pub timestamp: i64,
    pub expiration: i64,
    pub matcher_fee: i64,
    pub signature: String,
}

impl Order {
    fn decode(buf: &mut ReadCursor) -> Result<Self> {
        Ok(Self {
            sender: FixedBase58(32).decode(buf)?,
            matcher: FixedBase58(32).decode(buf)?,
            asset_id: decode_optional_asset(buf)?,
            price_asset_id: decode_optional_asset(buf)?,
            order_type: Byte.decode(buf)?,
            price: Long.decode(buf)?,
            amount: Long.decode(buf)?,
            timestamp: Long.decode(buf)?,
            expiration: Long.decode(buf)?,
            matcher_fee: Long.decode(buf)?,
            signature: FixedBase58(64).decode(buf)?,
        })
    }

    fn encode(&self, buf: &mut WriteCursor) -> Result<()> {
        FixedBase58(32).encode(buf, &self.sender)?;
        FixedBase58(32).encode(buf, &self.matcher)?;
        encode_optional_asset(buf, &self.asset_id)?;
        encode_optional_asset(buf, &self.price_asset_id)?;
        Byte.encode(buf, &self.order_type)?;
        Long.encode(buf, &self.price)?;
        Long.encode(buf, &self.amount)?;
        Long.encode(buf, &self.timestamp)?;
        Long.encode(buf, &self.expiration)?;
        Long.encode(buf, &self.matcher_fee)?;
        FixedBase58(64).encode(buf, &self.signature)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeTransaction {
    pub buy_order_size: i32,
    pub sell_order_size: i32,
    pub buy_order: Order,
    pub sell_order: Order,
    pub price: i64,
    pub amount: i64,
    pub buy_matcher_fee: i64,
    pub sell_matcher_fee: i64,
    pub fee: i64,
    pub timestamp: i64,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseTransaction {
    pub sender: String,
    pub recipient: AddressOrAlias,
    pub amount: i64,
    pub fee: i64,
    pub timestamp: i64,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseCancelTransaction {
    pub sender: String,
    pub fee: i64,
    pub timestamp: i64,
    pub lease_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAliasTransaction {
    pub sender: String,
    pub alias: String,
    pub fee: i64,
    pub timestamp: i64,
    pub signature: String,
}

/// The closed transaction union. Every unknown tag lands in `Unrecognized`
/// with its raw body, so decoding always advances by the declared size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Transaction {
    Genesis(GenesisTransaction),
    Payment(PaymentTransaction),
    Issue(IssueTransaction),
    Transfer(TransferTransaction),
    Reissue(ReissueTransaction),
    Burn(BurnTransaction),
    Exchange(ExchangeTransaction),
    Lease(LeaseTransaction),
    LeaseCancel(LeaseCancelTransaction),
    CreateAlias(CreateAliasTransaction),
    Unrecognized { type_id: u8, body: Vec<u8> },
}

impl Transaction {
    pub fn type_id(&self) -> u8 {
        match self {
            Self::Genesis(_) => transaction_type::GENESIS,
            Self::Payment(_) => transaction_type::PAYMENT,
            Self::Issue(_) => transaction_type::ISSUE,
            Self::Transfer(_) => transaction_type::TRANSFER,
            Self::Reissue(_) => transaction_type::REISSUE,
            Self::Burn(_) => transaction_type::BURN,
            Self::Exchange(_) => transaction_type::EXCHANGE,
            Self::Lease(_) => transaction_type::LEASE,
            Self::LeaseCancel(_) => transaction_type::LEASE_CANCEL,
            Self::CreateAlias(_) => transaction_type::CREATE_ALIAS,
            Self::Unrecognized { type_id, .. } => *type_id,
        }
    }

    /// Decode a transaction body for an already-read type tag.
    ///
    /// `body_size` is the byte count the body is known to occupy (declared
    /// transaction size minus the tag byte); `None` means the body runs to
    /// the end of the buffer, as in the standalone transaction message.
    pub fn decode_body(type_id: u8, buf: &mut ReadCursor, body_size: Option<usize>) -> Result<Self> {
        match type_id {
            transaction_type::GENESIS => Ok(Self::Genesis(GenesisTransaction {
                timestamp: Long.decode(buf)?,
                recipient: FixedBase58(26).decode(buf)?,
                amount: Long.decode(buf)?,
            })),
            transaction_type::PAYMENT => Ok(Self::Payment(PaymentTransaction {
                timestamp: Long.decode(buf)?,
                sender: FixedBase58(32).decode(buf)?,
                recipient: FixedBase58(26).decode(buf)?,
                amount: Long.decode(buf)?,
                fee: Long.decode(buf)?,
                signature: FixedBase58(64).decode(buf)?,
            })),
            transaction_type::ISSUE => {
                let signature = FixedBase58(64).decode(buf)?;
                let _inner_type = Byte.decode(buf)?;
                Ok(Self::Issue(IssueTransaction {
                    signature,
                    sender: FixedBase58(32).decode(buf)?,
                    name: ShortPrefixedString.decode(buf)?,
                    description: ShortPrefixedString.decode(buf)?,
                    quantity: Long.decode(buf)?,
                    decimals: Byte.decode(buf)?,
                    reissuable: Byte.decode(buf)? != 0,
                    fee: Long.decode(buf)?,
                    timestamp: Long.decode(buf)?,
                }))
            }
            transaction_type::TRANSFER => {
                let signature = FixedBase58(64).decode(buf)?;
                let _inner_type = Byte.decode(buf)?;
                let sender = FixedBase58(32).decode(buf)?;
                let asset_id = decode_optional_asset(buf)?;
                let fee_asset_id = decode_optional_asset(buf)?;
                let timestamp = Long.decode(buf)?;
                let amount = Long.decode(buf)?;
                let fee = Long.decode(buf)?;
                let recipient = AddressOrAlias::decode(buf)?;
                let attachment_len = buf.read_i16()?;
                if attachment_len < 0 {
                    return Err(ProtocolError::DeserializeError(format!(
                        "Negative attachment length: {attachment_len}"
                    )));
                }
                let attachment = buf.read_bytes(attachment_len as usize)?.to_vec();
                Ok(Self::Transfer(TransferTransaction {
                    signature,
                    sender,
                    asset_id,
                    fee_asset_id,
                    timestamp,
                    amount,
                    fee,
                    recipient,
                    attachment,
                }))
            }
            transaction_type::REISSUE => {
                let signature = FixedBase58(64).decode(buf)?;
                let _inner_type = Byte.decode(buf)?;
                Ok(Self::Reissue(ReissueTransaction {
                    signature,
                    sender: FixedBase58(32).decode(buf)?,
                    asset_id: FixedBase58(32).decode(buf)?,
                    quantity: Long.decode(buf)?,
                    reissuable: Byte.decode(buf)? != 0,
                    fee: Long.decode(buf)?,
                    timestamp: Long.decode(buf)?,
                }))
            }
            transaction_type::BURN => Ok(Self::Burn(BurnTransaction {
                sender: FixedBase58(32).decode(buf)?,
                asset_id: FixedBase58(32).decode(buf)?,
                amount: Long.decode(buf)?,
                fee: Long.decode(buf)?,
                timestamp: Long.decode(buf)?,
                signature: FixedBase58(64).decode(buf)?,
            })),
            transaction_type::EXCHANGE => Ok(Self::Exchange(ExchangeTransaction {
                buy_order_size: Int.decode(buf)?,
                sell_order_size: Int.decode(buf)?,
                buy_order: Order::decode(buf)?,
                sell_order: Order::decode(buf)?,
                price: Long.decode(buf)?,
                amount: Long.decode(buf)?,
                buy_matcher_fee: Long.decode(buf)?,
                sell_matcher_fee: Long.decode(buf)?,
                fee: Long.decode(buf)?,
                timestamp: Long.decode(buf)?,
                signature: FixedBase58(64).decode(buf)?,
            })),
            transaction_type::LEASE => Ok(Self::Lease(LeaseTransaction {
                sender: FixedBase58(32).decode(buf)?,
                recipient: AddressOrAlias::decode(buf)?,
                amount: Long.decode(buf)?,
                fee: Long.decode(buf)?,
                timestamp: Long.decode(buf)?,
                signature: FixedBase58(64).decode(buf)?,
            })),
            transaction_type::LEASE_CANCEL => Ok(Self::LeaseCancel(LeaseCancelTransaction {
                sender: FixedBase58(32).decode(buf)?,
                fee: Long.decode(buf)?,
                timestamp: Long.decode(buf)?,
                lease_id: FixedBase58(32).decode(buf)?,
                signature: FixedBase58(64).decode(buf)?,
            })),
            transaction_type::CREATE_ALIAS => Ok(Self::CreateAlias(CreateAliasTransaction {
                sender: FixedBase58(32).decode(buf)?,
                alias: ShortPrefixedString.decode(buf)?,
                fee: Long.decode(buf)?,
                timestamp: Long.decode(buf)?,
                signature: FixedBase58(64).decode(buf)?,
            })),
            _ => {
                let size = body_size.unwrap_or(buf.remaining());
                Ok(Self::Unrecognized {
                    type_id,
                    body: buf.read_bytes(size)?.to_vec(),
                })
            }
        }
    }

    pub fn encode_body(&self, buf: &mut WriteCursor) -> Result<()> {
        match self {
            Self::Genesis(tx) => {
                Long.encode(buf, &tx.timestamp)?;
                FixedBase58(26).encode(buf, &tx.recipient)?;
                Long.encode(buf, &tx.amount)
            }
            Self::Payment(tx) => {
                Long.encode(buf, &tx.timestamp)?;
                FixedBase58(32).encode(buf, &tx.sender)?;
                FixedBase58(26).encode(buf, &tx.recipient)?;
                Long.encode(buf, &tx.amount)?;
                Long.encode(buf, &tx.fee)?;
                FixedBase58(64).encode(buf, &tx.signature)
            }
            Self::Issue(tx) => {
                FixedBase58(64).encode(buf, &tx.signature)?;
                Byte.encode(buf, &transaction_type::ISSUE)?;
                FixedBase58(32).encode(buf, &tx.sender)?;
                ShortPrefixedString.encode(buf, &tx.name)?;
                ShortPrefixedString.encode(buf, &tx.description)?;
                Long.encode(buf, &tx.quantity)?;
                Byte.encode(buf, &tx.decimals)?;
                Byte.encode(buf, &(tx.reissuable as u8))?;
                Long.encode(buf, &tx.fee)?;
                Long.encode(buf, &tx.timestamp)
            }
            Self::Transfer(tx) => {
                FixedBase58(64).encode(buf, &tx.signature)?;
                Byte.encode(buf, &transaction_type::TRANSFER)?;
                FixedBase58(32).encode(buf, &tx.sender)?;
                encode_optional_asset(buf, &tx.asset_id)?;
                encode_optional_asset(buf, &tx.fee_asset_id)?;
                Long.encode(buf, &tx.timestamp)?;
                Long.encode(buf, &tx.amount)?;
                Long.encode(buf, &tx.fee)?;
                tx.recipient.encode(buf)?;
                if tx.attachment.len() > i16::MAX as usize {
                    return Err(ProtocolError::SerializeError(format!(
                        "Attachment of {} bytes exceeds 2-byte length prefix",
                        tx.attachment.len()
                    )));
                }
                buf.write_i16(tx.attachment.len() as i16);
                buf.write_bytes(&tx.attachment);
                Ok(())
            }
            Self::Reissue(tx) => {
                FixedBase58(64).encode(buf, &tx.signature)?;
                Byte.encode(buf, &transaction_type::REISSUE)?;
                FixedBase58(32).encode(buf, &tx.sender)?;
                FixedBase58(32).encode(buf, &tx.asset_id)?;
                Long.encode(buf, &tx.quantity)?;
                Byte.encode(buf, &(tx.reissuable as u8))?;
                Long.encode(buf, &tx.fee)?;
                Long.encode(buf, &tx.timestamp)
            }
            Self::Burn(tx) => {
                FixedBase58(32).encode(buf, &tx.sender)?;
                FixedBase58(32).encode(buf, &tx.asset_id)?;
                Long.encode(buf, &tx.amount)?;
                Long.encode(buf, &tx.fee)?;
                Long.encode(buf, &tx.timestamp)?;
                FixedBase58(64).encode(buf, &tx.signature)
            }
            Self::Exchange(tx) => {
                Int.encode(buf, &tx.buy_order_size)?;
                Int.encode(buf, &tx.sell_order_size)?;
                tx.buy_order.encode(buf)?;
                tx.sell_order.encode(buf)?;
                Long.encode(buf, &tx.price)?;
                Long.encode(buf, &tx.amount)?;
                Long.encode(buf, &tx.buy_matcher_fee)?;
                Long.encode(buf, &tx.sell_matcher_fee)?;
                Long.encode(buf, &tx.fee)?;
                Long.encode(buf, &tx.timestamp)?;
                FixedBase58(64).encode(buf, &tx.signature)
            }
            Self::Lease(tx) => {
                FixedBase58(32).encode(buf, &tx.sender)?;
                tx.recipient.encode(buf)?;
                Long.encode(buf, &tx.amount)?;
                Long.encode(buf, &tx.fee)?;
                Long.encode(buf, &tx.timestamp)?;
                FixedBase58(64).encode(buf, &tx.signature)
            }
            Self::LeaseCancel(tx) => {
                FixedBase58(32).encode(buf, &tx.sender)?;
                Long.encode(buf, &tx.fee)?;
                Long.encode(buf, &tx.timestamp)?;
                FixedBase58(32).encode(buf, &tx.lease_id)?;
                FixedBase58(64).encode(buf, &tx.signature)
            }
            Self::CreateAlias(tx) => {
                FixedBase58(32).encode(buf, &tx.sender)?;
                ShortPrefixedString.encode(buf, &tx.alias)?;
                Long.encode(buf, &tx.fee)?;
                Long.encode(buf, &tx.timestamp)?;
                FixedBase58(64).encode(buf, &tx.signature)
            }
            Self::Unrecognized { body, .. } => {
                buf.write_bytes(body);
                Ok(())
            }
        }
    }

    /// Decode a bare tag-plus-body record, as carried by the standalone
    /// transaction message (which has no size field; the body runs to the
    /// end of the payload).
    pub fn decode_tagged(buf: &mut ReadCursor) -> Result<Self> {
        let type_id = Byte.decode(buf)?;
        Self::decode_body(type_id, buf, None)
    }

    pub fn encode_tagged(&self, buf: &mut WriteCursor) -> Result<()> {
        Byte.encode(buf, &self.type_id())?;
        self.encode_body(buf)
    }
}

/// A transaction as embedded in a block's transaction region: a declared
/// total size, the type tag, and the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizedTransaction {
    pub size: i32,
    pub transaction: Transaction,
}

impl SizedTransaction {
    /// Wrap a transaction, computing its declared size.
    pub fn new(transaction: Transaction) -> Result<Self> {
        let mut probe = WriteCursor::new();
        transaction.encode_body(&mut probe)?;
        Ok(Self {
            size: probe.len() as i32 + 1,
            transaction,
        })
    }

    pub fn decode(buf: &mut ReadCursor) -> Result<Self> {
        let size = Int.decode(buf)?;
        if size < 1 {
            return Err(ProtocolError::DeserializeError(format!(
                "Transaction size {size} is below the 1-byte minimum"
            )));
        }
        let type_id = Byte.decode(buf)?;
        let transaction = Transaction::decode_body(type_id, buf, Some(size as usize - 1))?;
        Ok(Self { size, transaction })
    }

    pub fn encode(&self, buf: &mut WriteCursor) -> Result<()> {
        Int.encode(buf, &self.size)?;
        self.transaction.encode_tagged(buf)
    }
}

/// A full block: header, byte-budgeted transaction region, and (from
/// version 3) activated feature codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub version: u8,
    pub timestamp: i64,
    pub parent: String,
    pub consensus_size: i32,
    pub base_target: i64,
    pub generation_signature: String,
    pub transactions_block_size: i32,
    pub transaction_count: u32,
    pub transactions: Vec<SizedTransaction>,
    pub features: Option<Vec<u16>>,
    pub generator_public_key: String,
    pub signature: String,
}

impl Block {
    /// Width of the transaction-count field for this block version.
    fn count_width(version: u8) -> i32 {
        if version < 3 {
            1
        } else {
            4
        }
    }

    pub fn decode(buf: &mut ReadCursor) -> Result<Self> {
        let version = Byte.decode(buf)?;
        let timestamp = Long.decode(buf)?;
        let parent = FixedBase58(64).decode(buf)?;
        let consensus_size = Int.decode(buf)?;
        let base_target = Long.decode(buf)?;
        let generation_signature = FixedBase58(32).decode(buf)?;
        let transactions_block_size = Int.decode(buf)?;
        let transaction_count = if version < 3 {
            Byte.decode(buf)? as u32
        } else {
            let count = Int.decode(buf)?;
            if count < 0 {
                return Err(ProtocolError::DeserializeError(format!(
                    "Negative transaction count: {count}"
                )));
            }
            count as u32
        };

        // The region budget is the declared transactions-block size minus
        // the count field already consumed from it.
        let budget = transactions_block_size - Self::count_width(version);
        if budget < 0 {
            return Err(ProtocolError::DeserializeError(format!(
                "Transactions block size {transactions_block_size} smaller than its count field"
            )));
        }
        let transactions = decode_region(buf, budget as usize, SizedTransaction::decode)?;

        let features = if version < 3 {
            None
        } else {
            Some(PrefixedShorts.decode(buf)?)
        };

        Ok(Self {
            version,
            timestamp,
            parent,
            consensus_size,
            base_target,
            generation_signature,
            transactions_block_size,
            transaction_count,
            transactions,
            features,
            generator_public_key: FixedBase58(32).decode(buf)?,
            signature: FixedBase58(64).decode(buf)?,
        })
    }

    pub fn encode(&self, buf: &mut WriteCursor) -> Result<()> {
        Byte.encode(buf, &self.version)?;
        Long.encode(buf, &self.timestamp)?;
        FixedBase58(64).encode(buf, &self.parent)?;
        Int.encode(buf, &self.consensus_size)?;
        Long.encode(buf, &self.base_target)?;
        FixedBase58(32).encode(buf, &self.generation_signature)?;
        Int.encode(buf, &self.transactions_block_size)?;
        if self.version < 3 {
            if self.transaction_count > u8::MAX as u32 {
                return Err(ProtocolError::SerializeError(format!(
                    "Transaction count {} exceeds the 1-byte field of version {}",
                    self.transaction_count, self.version
                )));
            }
            Byte.encode(buf, &(self.transaction_count as u8))?;
        } else {
            Int.encode(buf, &(self.transaction_count as i32))?;
        }
        encode_region(buf, &self.transactions, |b, tx| tx.encode(b))?;
        if let Some(features) = &self.features {
            PrefixedShorts.encode(buf, features)?;
        }
        FixedBase58(32).encode(buf, &self.generator_public_key)?;
        FixedBase58(64).encode(buf, &self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b58(byte: u8, len: usize) -> String {
        bs58::encode(vec![byte; len]).into_string()
    }

    fn roundtrip_tagged(tx: Transaction) -> Transaction {
        let mut w = WriteCursor::new();
        tx.encode_tagged(&mut w).unwrap();
        let mut r = ReadCursor::from(w.into_vec());
        let decoded = Transaction::decode_tagged(&mut r).unwrap();
        assert_eq!(r.remaining(), 0);
        decoded
    }

    fn sample_order() -> Order {
        Order {
            sender: b58(1, 32),
            matcher: b58(2, 32),
            asset_id: Some(b58(3, 32)),
            price_asset_id: None,
            order_type: 0,
            price: 100_000,
            amount: 5,
            timestamp: 1_533_028_924_752,
            expiration: 1_533_028_999_999,
            matcher_fee: 300_000,
            signature: b58(4, 64),
        }
    }

    #[test]
    fn test_genesis_roundtrip() {
        let tx = Transaction::Genesis(GenesisTransaction {
            timestamp: 1_465_742_577_614,
            recipient: b58(9, 26),
            amount: 9_999_999_500_000_000,
        });
        assert_eq!(roundtrip_tagged(tx.clone()), tx);
    }

    #[test]
    fn test_payment_roundtrip() {
        let tx = Transaction::Payment(PaymentTransaction {
            timestamp: 1_533_028_924_752,
            sender: b58(1, 32),
            recipient: b58(2, 26),
            amount: 1_000,
            fee: 100_000,
            signature: b58(3, 64),
        });
        assert_eq!(roundtrip_tagged(tx.clone()), tx);
    }

    #[test]
    fn test_issue_roundtrip() {
        let tx = Transaction::Issue(IssueTransaction {
            signature: b58(1, 64),
            sender: b58(2, 32),
            name: "Token".into(),
            description: String::new(),
            quantity: 10_000_000,
            decimals: 8,
            reissuable: true,
            fee: 100_000_000,
            timestamp: 1_533_028_924_752,
        });
        assert_eq!(roundtrip_tagged(tx.clone()), tx);
    }

    #[test]
    fn test_transfer_roundtrip_with_alias_recipient() {
        let tx = Transaction::Transfer(TransferTransaction {
            signature: b58(1, 64),
            sender: b58(2, 32),
            asset_id: None,
            fee_asset_id: Some(b58(3, 32)),
            timestamp: 1_533_028_924_752,
            amount: 42,
            fee: 100_000,
            recipient: AddressOrAlias::Alias {
                version: 2,
                scheme: b'W',
                alias: "merchant".into(),
            },
            attachment: vec![1, 2, 3],
        });
        assert_eq!(roundtrip_tagged(tx.clone()), tx);
    }

    #[test]
    fn test_reissue_and_burn_roundtrip() {
        let reissue = Transaction::Reissue(ReissueTransaction {
            signature: b58(1, 64),
            sender: b58(2, 32),
            asset_id: b58(3, 32),
            quantity: 7,
            reissuable: false,
            fee: 100_000,
            timestamp: 1,
        });
        assert_eq!(roundtrip_tagged(reissue.clone()), reissue);

        let burn = Transaction::Burn(BurnTransaction {
            sender: b58(2, 32),
            asset_id: b58(3, 32),
            amount: 7,
            fee: 100_000,
            timestamp: 1,
            signature: b58(1, 64),
        });
        assert_eq!(roundtrip_tagged(burn.clone()), burn);
    }

    #[test]
    fn test_exchange_roundtrip() {
        let buy = sample_order();
        let sell = Order {
            order_type: 1,
            asset_id: None,
            price_asset_id: Some(b58(5, 32)),
            ..sample_order()
        };
        let mut probe = WriteCursor::new();
        buy.encode(&mut probe).unwrap();
        let buy_size = probe.len() as i32;
        probe.clear();
        sell.encode(&mut probe).unwrap();
        let sell_size = probe.len() as i32;

        let tx = Transaction::Exchange(ExchangeTransaction {
            buy_order_size: buy_size,
            sell_order_size: sell_size,
            buy_order: buy,
            sell_order: sell,
            price: 100_000,
            amount: 5,
            buy_matcher_fee: 1,
            sell_matcher_fee: 2,
            fee: 300_000,
            timestamp: 1_533_028_924_752,
            signature: b58(6, 64),
        });
        assert_eq!(roundtrip_tagged(tx.clone()), tx);
    }

    #[test]
    fn test_lease_family_roundtrip() {
        let lease = Transaction::Lease(LeaseTransaction {
            sender: b58(1, 32),
            recipient: AddressOrAlias::Address(b58(2, 25)),
            amount: 500,
            fee: 100_000,
            timestamp: 1,
            signature: b58(3, 64),
        });
        assert_eq!(roundtrip_tagged(lease.clone()), lease);

        let cancel = Transaction::LeaseCancel(LeaseCancelTransaction {
            sender: b58(1, 32),
            fee: 100_000,
            timestamp: 2,
            lease_id: b58(4, 32),
            signature: b58(3, 64),
        });
        assert_eq!(roundtrip_tagged(cancel.clone()), cancel);

        let alias = Transaction::CreateAlias(CreateAliasTransaction {
            sender: b58(1, 32),
            alias: "shiny".into(),
            fee: 100_000,
            timestamp: 3,
            signature: b58(3, 64),
        });
        assert_eq!(roundtrip_tagged(alias.clone()), alias);
    }

    #[test]
    fn test_unknown_type_advances_by_declared_size() {
        let unknown = SizedTransaction {
            size: 6,
            transaction: Transaction::Unrecognized {
                type_id: 200,
                body: vec![9, 8, 7, 6, 5],
            },
        };
        let known = SizedTransaction::new(Transaction::Genesis(GenesisTransaction {
            timestamp: 1,
            recipient: b58(9, 26),
            amount: 2,
        }))
        .unwrap();

        let mut w = WriteCursor::new();
        unknown.encode(&mut w).unwrap();
        known.encode(&mut w).unwrap();

        let mut r = ReadCursor::from(w.into_vec());
        assert_eq!(SizedTransaction::decode(&mut r).unwrap(), unknown);
        // The unknown record consumed exactly its declared size, so the
        // next one still decodes.
        assert_eq!(SizedTransaction::decode(&mut r).unwrap(), known);
    }

    fn sample_block(version: u8) -> Block {
        let transactions = vec![
            SizedTransaction::new(Transaction::Genesis(GenesisTransaction {
                timestamp: 1_465_742_577_614,
                recipient: b58(9, 26),
                amount: 100,
            }))
            .unwrap(),
            SizedTransaction::new(Transaction::Payment(PaymentTransaction {
                timestamp: 1_533_028_924_752,
                sender: b58(1, 32),
                recipient: b58(2, 26),
                amount: 10,
                fee: 1,
                signature: b58(3, 64),
            }))
            .unwrap(),
        ];
        let region: i32 = transactions.iter().map(|t| t.size + 4).sum();
        Block {
            version,
            timestamp: 1_533_028_924_752,
            parent: b58(7, 64),
            consensus_size: 40,
            base_target: 153_722_867,
            generation_signature: b58(8, 32),
            transactions_block_size: region + Block::count_width(version),
            transaction_count: transactions.len() as u32,
            transactions,
            features: if version < 3 { None } else { Some(vec![1, 2, 9]) },
            generator_public_key: b58(5, 32),
            signature: b58(6, 64),
        }
    }

    fn roundtrip_block(block: Block) -> Block {
        let mut w = WriteCursor::new();
        block.encode(&mut w).unwrap();
        let mut r = ReadCursor::from(w.into_vec());
        let decoded = Block::decode(&mut r).unwrap();
        assert_eq!(r.remaining(), 0);
        decoded
    }

    #[test]
    fn test_block_v1_roundtrip_no_features() {
        let block = sample_block(1);
        let decoded = roundtrip_block(block.clone());
        assert_eq!(decoded, block);
        assert_eq!(decoded.features, None);
    }

    #[test]
    fn test_block_v3_roundtrip_with_features() {
        let block = sample_block(3);
        let decoded = roundtrip_block(block.clone());
        assert_eq!(decoded, block);
        assert_eq!(decoded.features, Some(vec![1, 2, 9]));
    }

    #[test]
    fn test_count_field_width_depends_on_version() {
        let v1 = sample_block(1);
        let v3 = sample_block(3);
        let mut w1 = WriteCursor::new();
        v1.encode(&mut w1).unwrap();
        let mut w3 = WriteCursor::new();
        v3.encode(&mut w3).unwrap();
        // Same content, but v3 carries 3 extra count bytes and the
        // feature array (4-byte count + 3 * 2 bytes).
        assert_eq!(w3.len(), w1.len() + 3 + 4 + 6);
    }

    #[test]
    fn test_empty_transaction_region() {
        let mut block = sample_block(1);
        block.transactions.clear();
        block.transaction_count = 0;
        block.transactions_block_size = Block::count_width(1);
        let decoded = roundtrip_block(block.clone());
        assert!(decoded.transactions.is_empty());
    }
}
