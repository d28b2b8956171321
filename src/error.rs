//! Error taxonomy shared by the device, codec, network and workflow layers.
//!
//! Each layer owns its own enum; everything converges on [`WorkflowError`],
//! whose `Display` text is what the GUI shows inline.

use thiserror::Error;

/// Failures of the Transaction Codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Invalid XRPL address '{0}'")]
    InvalidAddress(String),
    #[error("Missing required field {0}")]
    MissingField(&'static str),
    #[error("Field {field} has the wrong type: expected {expected}")]
    FieldType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("Unsupported field id (type {type_code}, field {field_code})")]
    UnsupportedField { type_code: u8, field_code: u8 },
    #[error("Unknown transaction type {0}")]
    UnknownTransactionType(u16),
    #[error("Amount {0} drops exceeds the native amount range")]
    AmountOutOfRange(u64),
    #[error("Issued-currency amounts are not supported")]
    IssuedAmount,
    #[error("Blob of {0} bytes is too long")]
    BlobTooLong(usize),
    #[error("Unexpected end of input while reading {0}")]
    Truncated(&'static str),
}

/// Failures of the Hardware Signing Client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("No Ledger device available. Connect and unlock your Ledger, then try again.")]
    DeviceUnavailable,
    #[error(
        "Unable to connect to your Ledger Nano. Please unlock your device and clear any unsigned transactions before trying again."
    )]
    UnresponsiveDevice,
    /// Locked device, wrong app open, user declined: the vendor message is kept verbatim.
    #[error("{0}")]
    Device(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Failures of the Ledger Network Client. Always returned as a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("Connection to {url} failed: {reason}")]
    Connection { url: String, reason: String },
    #[error("{command} failed: {code}{}", .message.as_deref().map(|m| format!(" ({m})")).unwrap_or_default())]
    Rpc {
        command: &'static str,
        code: String,
        message: Option<String>,
    },
    #[error("Malformed {command} response: {reason}")]
    Malformed {
        command: &'static str,
        reason: String,
    },
    #[error("Transaction rejected: {engine_result} ({message})")]
    Rejected {
        engine_result: String,
        message: String,
    },
    #[error(
        "The latest validated ledger {latest} is past the transaction's LastLedgerSequence {last_ledger_sequence}"
    )]
    Expired {
        latest: u32,
        last_ledger_sequence: u32,
    },
    #[error("Transaction {hash} was not validated within {secs}s")]
    ValidationTimeout { hash: String, secs: u64 },
    /// The background task never produced a reply (bad endpoint, runtime failure)
    #[error("Network task failed: {0}")]
    Job(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Everything the workflow can surface to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("No Ledger device available. Connect and unlock your Ledger, then try again.")]
    DeviceUnavailable,
    #[error(
        "Unable to connect to your Ledger Nano. Please unlock your device and clear any unsigned transactions before trying again."
    )]
    UnresponsiveDevice,
    /// Vendor message from the device (locked, wrong app, declined).
    #[error("{0}")]
    Device(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Network(String),
    #[error("{0}")]
    Codec(String),
}

impl From<SignerError> for WorkflowError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::DeviceUnavailable => WorkflowError::DeviceUnavailable,
            SignerError::UnresponsiveDevice => WorkflowError::UnresponsiveDevice,
            SignerError::Device(msg) => WorkflowError::Device(msg),
            SignerError::Codec(e) => WorkflowError::Codec(e.to_string()),
        }
    }
}

impl From<NetworkError> for WorkflowError {
    fn from(err: NetworkError) -> Self {
        WorkflowError::Network(err.to_string())
    }
}

impl From<CodecError> for WorkflowError {
    fn from(err: CodecError) -> Self {
        WorkflowError::Codec(err.to_string())
    }
}
