//! Canonical XRPL binary encoding for the transaction drafts this app builds.
//!
//! Only the field set used by Payment and NFTokenMint drafts is supported;
//! anything else is rejected rather than guessed at. Fields are kept in a
//! `BTreeMap` keyed by their canonical (type code, field code) order, so
//! serialization is just an in-order walk.

use crate::error::CodecError;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha512};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Drops per XRP
pub const DROPS_PER_XRP: u64 = 1_000_000;

/// Largest native amount the ledger accepts (100 billion XRP)
pub const MAX_DROPS: u64 = 100_000_000_000 * DROPS_PER_XRP;

/// Prefix for transaction identifying hashes ("TXN\0")
const TXN_HASH_PREFIX: [u8; 4] = [0x54, 0x58, 0x4E, 0x00];

const TYPE_UINT16: u8 = 1;
const TYPE_UINT32: u8 = 2;
const TYPE_AMOUNT: u8 = 6;
const TYPE_BLOB: u8 = 7;
const TYPE_ACCOUNT: u8 = 8;

/// Transaction types the app can draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Payment,
    NFTokenMint,
}

impl TransactionType {
    pub fn code(self) -> u16 {
        match self {
            TransactionType::Payment => 0,
            TransactionType::NFTokenMint => 25,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TransactionType::Payment => "Payment",
            TransactionType::NFTokenMint => "NFTokenMint",
        }
    }

    pub fn from_code(code: u16) -> Result<Self, CodecError> {
        match code {
            0 => Ok(TransactionType::Payment),
            25 => Ok(TransactionType::NFTokenMint),
            other => Err(CodecError::UnknownTransactionType(other)),
        }
    }
}

/// Transaction fields known to the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    TransactionType,
    TransferFee,
    Flags,
    Sequence,
    DestinationTag,
    LastLedgerSequence,
    NFTokenTaxon,
    Amount,
    Fee,
    SigningPubKey,
    TxnSignature,
    Uri,
    Account,
    Destination,
}

const ALL_FIELDS: [Field; 14] = [
    Field::TransactionType,
    Field::TransferFee,
    Field::Flags,
    Field::Sequence,
    Field::DestinationTag,
    Field::LastLedgerSequence,
    Field::NFTokenTaxon,
    Field::Amount,
    Field::Fee,
    Field::SigningPubKey,
    Field::TxnSignature,
    Field::Uri,
    Field::Account,
    Field::Destination,
];

impl Field {
    /// (type code, field code) as registered in the XRPL field table
    pub fn id(self) -> (u8, u8) {
        match self {
            Field::TransactionType => (TYPE_UINT16, 2),
            Field::TransferFee => (TYPE_UINT16, 4),
            Field::Flags => (TYPE_UINT32, 2),
            Field::Sequence => (TYPE_UINT32, 4),
            Field::DestinationTag => (TYPE_UINT32, 14),
            Field::LastLedgerSequence => (TYPE_UINT32, 27),
            Field::NFTokenTaxon => (TYPE_UINT32, 42),
            Field::Amount => (TYPE_AMOUNT, 1),
            Field::Fee => (TYPE_AMOUNT, 8),
            Field::SigningPubKey => (TYPE_BLOB, 3),
            Field::TxnSignature => (TYPE_BLOB, 4),
            Field::Uri => (TYPE_BLOB, 5),
            Field::Account => (TYPE_ACCOUNT, 1),
            Field::Destination => (TYPE_ACCOUNT, 3),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::TransactionType => "TransactionType",
            Field::TransferFee => "TransferFee",
            Field::Flags => "Flags",
            Field::Sequence => "Sequence",
            Field::DestinationTag => "DestinationTag",
            Field::LastLedgerSequence => "LastLedgerSequence",
            Field::NFTokenTaxon => "NFTokenTaxon",
            Field::Amount => "Amount",
            Field::Fee => "Fee",
            Field::SigningPubKey => "SigningPubKey",
            Field::TxnSignature => "TxnSignature",
            Field::Uri => "URI",
            Field::Account => "Account",
            Field::Destination => "Destination",
        }
    }

    fn from_id(type_code: u8, field_code: u8) -> Result<Self, CodecError> {
        ALL_FIELDS
            .iter()
            .copied()
            .find(|f| f.id() == (type_code, field_code))
            .ok_or(CodecError::UnsupportedField {
                type_code,
                field_code,
            })
    }

    /// Signatures are never part of the data being signed
    fn is_signing_field(self) -> bool {
        self != Field::TxnSignature
    }

    fn expected_kind(self) -> &'static str {
        match self.id().0 {
            TYPE_UINT16 => "UInt16",
            TYPE_UINT32 => "UInt32",
            TYPE_AMOUNT => "Amount",
            TYPE_BLOB => "Blob",
            _ => "AccountID",
        }
    }
}

impl Ord for Field {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }
}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A field value. Accounts stay in their classic `r...` form until encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    UInt16(u16),
    UInt32(u32),
    /// Native amount in drops
    Drops(u64),
    Blob(Vec<u8>),
    Account(String),
}

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            FieldValue::UInt16(_) => "UInt16",
            FieldValue::UInt32(_) => "UInt32",
            FieldValue::Drops(_) => "Amount",
            FieldValue::Blob(_) => "Blob",
            FieldValue::Account(_) => "AccountID",
        }
    }
}

/// A transaction as an ordered field map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transaction {
    fields: BTreeMap<Field, FieldValue>,
}

impl Transaction {
    pub fn new(tx_type: TransactionType) -> Self {
        let mut tx = Self::default();
        tx.fields
            .insert(Field::TransactionType, FieldValue::UInt16(tx_type.code()));
        tx
    }

    pub fn with(mut self, field: Field, value: FieldValue) -> Self {
        self.fields.insert(field, value);
        self
    }

    pub fn set(&mut self, field: Field, value: FieldValue) {
        self.fields.insert(field, value);
    }

    pub fn remove(&mut self, field: Field) -> Option<FieldValue> {
        self.fields.remove(&field)
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&Field, &FieldValue)> {
        self.fields.iter()
    }

    pub fn transaction_type(&self) -> Result<TransactionType, CodecError> {
        match self.get(Field::TransactionType) {
            Some(FieldValue::UInt16(code)) => TransactionType::from_code(*code),
            Some(_) => Err(CodecError::FieldType {
                field: Field::TransactionType.name(),
                expected: "UInt16",
            }),
            None => Err(CodecError::MissingField("TransactionType")),
        }
    }

    pub fn uint32(&self, field: Field) -> Option<u32> {
        match self.get(field) {
            Some(FieldValue::UInt32(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn drops(&self, field: Field) -> Option<u64> {
        match self.get(field) {
            Some(FieldValue::Drops(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn account(&self, field: Field) -> Option<&str> {
        match self.get(field) {
            Some(FieldValue::Account(a)) => Some(a.as_str()),
            _ => None,
        }
    }

    /// JSON rendering with XRPL field names (amounts as drop strings, blobs as upper hex).
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (field, value) in &self.fields {
            let rendered = match (field, value) {
                (Field::TransactionType, FieldValue::UInt16(code)) => {
                    match TransactionType::from_code(*code) {
                        Ok(t) => json!(t.name()),
                        Err(_) => json!(code),
                    }
                }
                (_, FieldValue::UInt16(v)) => json!(v),
                (_, FieldValue::UInt32(v)) => json!(v),
                (_, FieldValue::Drops(v)) => json!(v.to_string()),
                (_, FieldValue::Blob(b)) => json!(hex::encode_upper(b)),
                (_, FieldValue::Account(a)) => json!(a),
            };
            map.insert(field.name().to_string(), rendered);
        }
        Value::Object(map)
    }
}

/// Decode a classic address into its 20-byte account id.
pub fn decode_address(address: &str) -> Result<[u8; 20], CodecError> {
    let invalid = || CodecError::InvalidAddress(address.to_string());
    let decoded = bs58::decode(address)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check(Some(0x00))
        .into_vec()
        .map_err(|_| invalid())?;
    let payload = match decoded.len() {
        21 if decoded[0] == 0x00 => &decoded[1..],
        20 => &decoded[..],
        _ => return Err(invalid()),
    };
    let mut id = [0u8; 20];
    id.copy_from_slice(payload);
    Ok(id)
}

/// Encode a 20-byte account id as a classic address.
pub fn encode_address(account_id: &[u8; 20]) -> String {
    bs58::encode(account_id)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check_version(0x00)
        .into_string()
}

/// Serialize every field, including any attached signature.
pub fn encode(tx: &Transaction) -> Result<Vec<u8>, CodecError> {
    serialize(tx, false)
}

/// Serialize the fields covered by the signature (the blob the device signs).
pub fn encode_for_signing(tx: &Transaction) -> Result<Vec<u8>, CodecError> {
    serialize(tx, true)
}

/// Identifying hash of a signed transaction blob, upper-case hex.
pub fn transaction_hash(signed_blob: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(TXN_HASH_PREFIX);
    hasher.update(signed_blob);
    let digest = hasher.finalize();
    hex::encode_upper(&digest[..32])
}

fn serialize(tx: &Transaction, signing_only: bool) -> Result<Vec<u8>, CodecError> {
    tx.transaction_type()?;
    let mut out = Vec::with_capacity(256);
    for (field, value) in &tx.fields {
        if signing_only && !field.is_signing_field() {
            continue;
        }
        write_field_id(&mut out, *field);
        write_value(&mut out, *field, value)?;
    }
    Ok(out)
}

fn write_field_id(out: &mut Vec<u8>, field: Field) {
    let (type_code, field_code) = field.id();
    match (type_code < 16, field_code < 16) {
        (true, true) => out.push((type_code << 4) | field_code),
        (true, false) => out.extend_from_slice(&[type_code << 4, field_code]),
        (false, true) => out.extend_from_slice(&[field_code, type_code]),
        (false, false) => out.extend_from_slice(&[0, type_code, field_code]),
    }
}

fn write_value(out: &mut Vec<u8>, field: Field, value: &FieldValue) -> Result<(), CodecError> {
    let mismatch = || CodecError::FieldType {
        field: field.name(),
        expected: field.expected_kind(),
    };
    if value.kind() != field.expected_kind() {
        return Err(mismatch());
    }
    match value {
        FieldValue::UInt16(v) => out.extend_from_slice(&v.to_be_bytes()),
        FieldValue::UInt32(v) => out.extend_from_slice(&v.to_be_bytes()),
        FieldValue::Drops(drops) => {
            if *drops > MAX_DROPS {
                return Err(CodecError::AmountOutOfRange(*drops));
            }
            // bit 63 clear = native, bit 62 set = positive
            out.extend_from_slice(&(drops | 0x4000_0000_0000_0000).to_be_bytes());
        }
        FieldValue::Blob(bytes) => {
            write_length(out, bytes.len())?;
            out.extend_from_slice(bytes);
        }
        FieldValue::Account(address) => {
            let id = decode_address(address)?;
            write_length(out, id.len())?;
            out.extend_from_slice(&id);
        }
    }
    Ok(())
}

fn write_length(out: &mut Vec<u8>, len: usize) -> Result<(), CodecError> {
    if len <= 192 {
        out.push(len as u8);
    } else if len <= 12_480 {
        let rest = len - 193;
        out.extend_from_slice(&[193 + (rest >> 8) as u8, (rest & 0xFF) as u8]);
    } else {
        return Err(CodecError::BlobTooLong(len));
    }
    Ok(())
}

/// Parse a binary transaction back into its field map.
pub fn decode(bytes: &[u8]) -> Result<Transaction, CodecError> {
    let mut reader = Reader { bytes, pos: 0 };
    let mut tx = Transaction::default();
    while !reader.is_empty() {
        let field = reader.field_id()?;
        let value = match field.id().0 {
            TYPE_UINT16 => FieldValue::UInt16(u16::from_be_bytes(reader.array("UInt16")?)),
            TYPE_UINT32 => FieldValue::UInt32(u32::from_be_bytes(reader.array("UInt32")?)),
            TYPE_AMOUNT => {
                let raw = u64::from_be_bytes(reader.array("Amount")?);
                if raw & 0x8000_0000_0000_0000 != 0 {
                    return Err(CodecError::IssuedAmount);
                }
                FieldValue::Drops(raw & 0x3FFF_FFFF_FFFF_FFFF)
            }
            TYPE_BLOB => {
                let len = reader.length()?;
                FieldValue::Blob(reader.take(len, "Blob")?.to_vec())
            }
            _ => {
                let len = reader.length()?;
                let raw = reader.take(len, "AccountID")?;
                let id: [u8; 20] = raw
                    .try_into()
                    .map_err(|_| CodecError::Truncated("AccountID"))?;
                FieldValue::Account(encode_address(&id))
            }
        };
        tx.fields.insert(field, value);
    }
    tx.transaction_type()?;
    Ok(tx)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], CodecError> {
        let bytes: &'a [u8] = self.bytes;
        let end = self.pos.checked_add(n).ok_or(CodecError::Truncated(what))?;
        let slice = bytes
            .get(self.pos..end)
            .ok_or(CodecError::Truncated(what))?;
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self, what: &'static str) -> Result<u8, CodecError> {
        Ok(self.take(1, what)?[0])
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], CodecError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N, what)?);
        Ok(buf)
    }

    fn field_id(&mut self) -> Result<Field, CodecError> {
        let first = self.byte("field id")?;
        let mut type_code = first >> 4;
        let mut field_code = first & 0x0F;
        if type_code == 0 {
            type_code = self.byte("field id")?;
        }
        if field_code == 0 {
            field_code = self.byte("field id")?;
        }
        Field::from_id(type_code, field_code)
    }

    fn length(&mut self) -> Result<usize, CodecError> {
        let b1 = self.byte("length prefix")? as usize;
        if b1 <= 192 {
            Ok(b1)
        } else if b1 <= 240 {
            let b2 = self.byte("length prefix")? as usize;
            Ok(193 + ((b1 - 193) << 8) + b2)
        } else {
            Err(CodecError::Truncated("length prefix"))
        }
    }
}
