//! APDU client for the XRP application running on the Ledger.
//!
//! Builds the get-address and sign commands and parses their replies.

use crate::error::SignerError;
use crate::transport::{ApduExchange, DeviceReply};
use ledger_apdu::APDUCommand;
use tracing::{debug, info};

const CLA: u8 = 0xE0;
const INS_GET_PUBLIC_KEY: u8 = 0x02;
const INS_SIGN: u8 = 0x04;

const P1_NON_CONFIRM: u8 = 0x00;
const P1_CONFIRM: u8 = 0x01;
const P1_FIRST: u8 = 0x00;
const P1_MORE: u8 = 0x80;

const P2_NO_CHAINCODE: u8 = 0x00;
const P2_CHAINCODE: u8 = 0x01;
const CURVE_SECP256K1: u8 = 0x40;
const CURVE_ED25519: u8 = 0x80;

/// Largest payload the app accepts in a single sign APDU
const MAX_CHUNK: usize = 150;

/// BIP-32 paths deeper than this are refused by the device
const MAX_PATH_DEPTH: usize = 10;

const HARDENED: u32 = 0x8000_0000;

/// Reply of the get-address command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressDetails {
    pub public_key: String,
    pub address: String,
    pub chain_code: Option<Vec<u8>>,
}

/// Encode a path like `44'/144'/0'/0/0` as count byte + big-endian components.
pub fn encode_bip32_path(path: &str) -> Result<Vec<u8>, SignerError> {
    let trimmed = path.trim().trim_start_matches("m/");
    let components: Vec<&str> = trimmed.split('/').filter(|c| !c.is_empty()).collect();
    if components.is_empty() || components.len() > MAX_PATH_DEPTH {
        return Err(SignerError::Device(format!("Invalid derivation path '{}'", path)));
    }

    let mut out = Vec::with_capacity(1 + components.len() * 4);
    out.push(components.len() as u8);
    for component in components {
        let (digits, hardened) = match component.strip_suffix(['\'', 'h', 'H']) {
            Some(d) => (d, true),
            None => (component, false),
        };
        let index: u32 = digits
            .parse()
            .ok()
            .filter(|i| *i < HARDENED)
            .ok_or_else(|| SignerError::Device(format!("Invalid derivation path '{}'", path)))?;
        let value = if hardened { index | HARDENED } else { index };
        out.extend_from_slice(&value.to_be_bytes());
    }
    Ok(out)
}

/// Readable message for a status word, in the vendor's "Ledger device: NAME (0xcode)" form.
pub fn status_message(status: u16) -> String {
    let (name, hint) = match status {
        0x6985 => ("CONDITIONS_OF_USE_NOT_SATISFIED", Some("request declined on the device")),
        0x5515 => ("LOCKED_DEVICE", Some("unlock the device")),
        0x6982 => ("SECURITY_STATUS_NOT_SATISFIED", Some("unlock the device")),
        0x6D00 => ("INS_NOT_SUPPORTED", Some("open the XRP app")),
        0x6E00 => ("CLA_NOT_SUPPORTED", Some("open the XRP app")),
        0x650F | 0x6511 => ("UNKNOWN_ERROR", Some("open the XRP app")),
        0x6A80 => ("INCORRECT_DATA", None),
        0x6700 => ("INCORRECT_LENGTH", None),
        0x6B00 => ("INCORRECT_P1_P2", None),
        _ => ("UNKNOWN_ERROR", None),
    };
    match hint {
        Some(hint) => format!("Ledger device: {} (0x{:04x}) - {}", name, status, hint),
        None => format!("Ledger device: {} (0x{:04x})", name, status),
    }
}

fn check(reply: DeviceReply) -> Result<Vec<u8>, SignerError> {
    if reply.is_ok() {
        Ok(reply.data)
    } else {
        Err(SignerError::Device(status_message(reply.status)))
    }
}

/// XRP app client over any APDU transport.
pub struct XrpApp<'a, T: ApduExchange + ?Sized> {
    transport: &'a T,
}

impl<'a, T: ApduExchange + ?Sized> XrpApp<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    fn send(&self, ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Result<Vec<u8>, SignerError> {
        let command = APDUCommand {
            cla: CLA,
            ins,
            p1,
            p2,
            data,
        };
        let reply = self
            .transport
            .exchange(&command)
            .map_err(|e| SignerError::Device(e.to_string()))?;
        check(reply)
    }

    /// Query the public key and classic address at `path`.
    pub fn get_address(
        &self,
        path: &str,
        display: bool,
        chain_code: bool,
        ed25519: bool,
    ) -> Result<AddressDetails, SignerError> {
        let p1 = if display { P1_CONFIRM } else { P1_NON_CONFIRM };
        let curve = if ed25519 { CURVE_ED25519 } else { CURVE_SECP256K1 };
        let p2 = curve | if chain_code { P2_CHAINCODE } else { P2_NO_CHAINCODE };

        debug!("Requesting XRP address at {}", path);
        let data = self.send(INS_GET_PUBLIC_KEY, p1, p2, encode_bip32_path(path)?)?;
        parse_address_reply(&data, chain_code)
    }

    /// Sign a serialized transaction (or any payload) with the key at `path`.
    /// Returns the raw signature bytes.
    pub fn sign(&self, path: &str, payload: &[u8], ed25519: bool) -> Result<Vec<u8>, SignerError> {
        let path_bytes = encode_bip32_path(path)?;
        let curve = if ed25519 { CURVE_ED25519 } else { CURVE_SECP256K1 };

        info!("Please review and confirm the transaction on your Ledger device...");
        let mut reply = Vec::new();
        for (i, apdu_data) in sign_chunks(&path_bytes, payload).into_iter().enumerate() {
            let p1 = if i == 0 { P1_FIRST } else { P1_MORE };
            reply = self.send(INS_SIGN, p1, curve, apdu_data)?;
        }
        if reply.is_empty() {
            return Err(SignerError::Device("Ledger returned an empty signature".into()));
        }
        Ok(reply)
    }
}

/// Split the sign request: the first APDU carries the path plus as much payload as fits.
fn sign_chunks(path_bytes: &[u8], payload: &[u8]) -> Vec<Vec<u8>> {
    let first_room = MAX_CHUNK - path_bytes.len();
    let first_len = payload.len().min(first_room);

    let mut first = path_bytes.to_vec();
    first.extend_from_slice(&payload[..first_len]);

    let mut chunks = vec![first];
    chunks.extend(payload[first_len..].chunks(MAX_CHUNK).map(|c| c.to_vec()));
    chunks
}

fn parse_address_reply(data: &[u8], chain_code: bool) -> Result<AddressDetails, SignerError> {
    let malformed = || SignerError::Device("Malformed address reply from Ledger".into());

    let pk_len = *data.first().ok_or_else(malformed)? as usize;
    let public_key = data.get(1..1 + pk_len).ok_or_else(malformed)?;
    let addr_len = *data.get(1 + pk_len).ok_or_else(malformed)? as usize;
    let addr_start = 2 + pk_len;
    let address = data
        .get(addr_start..addr_start + addr_len)
        .ok_or_else(malformed)?;
    let address = String::from_utf8(address.to_vec()).map_err(|_| malformed())?;

    let chain_code = if chain_code {
        let cc_start = addr_start + addr_len;
        let cc = data.get(cc_start..cc_start + 32).ok_or_else(malformed)?;
        Some(cc.to_vec())
    } else {
        None
    };

    Ok(AddressDetails {
        public_key: hex::encode(public_key),
        address,
        chain_code,
    })
}
