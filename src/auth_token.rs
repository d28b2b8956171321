//! Device-signed JSON Web Tokens.
//!
//! The header and claims are assembled locally and the signing input is
//! signed by the Ledger key of the fetched account. secp256k1 signatures come
//! back DER-encoded and are converted to the fixed-width `r || s` form JWS uses.

use crate::error::SignerError;
use crate::signer::{HardwareSigner, LedgerAccount};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default token lifetime
pub const DEFAULT_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAlgorithm {
    Es256k,
    EdDsa,
}

impl TokenAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            TokenAlgorithm::Es256k => "ES256K",
            TokenAlgorithm::EdDsa => "EdDSA",
        }
    }

    /// ed25519 keys are exposed by the device with an `ED` prefix byte
    pub fn for_public_key(public_key: &str) -> Self {
        let prefixed = public_key
            .get(..2)
            .is_some_and(|p| p.eq_ignore_ascii_case("ed"));
        if public_key.len() == 66 && prefixed {
            TokenAlgorithm::EdDsa
        } else {
            TokenAlgorithm::Es256k
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header<'a> {
    alg: &'a str,
    typ: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Classic address of the signing account
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    pub iat: i64,
    pub exp: i64,
    /// Public key, upper-case hex, so verifiers need no lookup
    pub pubkey: String,
}

impl Claims {
    pub fn new(account: &LedgerAccount, audience: Option<String>, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: account.address.clone(),
            aud: audience.filter(|a| !a.trim().is_empty()),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            pubkey: account.public_key.to_uppercase(),
        }
    }
}

/// `base64url(header) . base64url(claims)`
pub fn signing_input(alg: TokenAlgorithm, claims: &Claims) -> Result<String, serde_json::Error> {
    let header = serde_json::to_vec(&Header {
        alg: alg.name(),
        typ: "JWT",
    })?;
    let claims = serde_json::to_vec(claims)?;
    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(claims)
    ))
}

/// Build and sign a token for `account` on the device.
pub async fn issue_token<S: HardwareSigner + ?Sized>(
    signer: &S,
    account: &LedgerAccount,
    audience: Option<String>,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, SignerError> {
    let alg = TokenAlgorithm::for_public_key(&account.public_key);
    let claims = Claims::new(account, audience, now, ttl);
    let input = signing_input(alg, &claims)
        .map_err(|e| SignerError::Device(format!("Failed to encode token claims: {}", e)))?;

    info!("Requesting token signature for {} on device...", account.address);
    let signed = signer
        .sign_payload(input.as_bytes(), &account.derivation_path)
        .await?;

    let signature = match alg {
        TokenAlgorithm::Es256k => der_to_compact(&signed.signature)?.to_vec(),
        TokenAlgorithm::EdDsa => signed.signature,
    };
    Ok(format!("{}.{}", input, URL_SAFE_NO_PAD.encode(signature)))
}

/// Decode the claims of a token without verifying it (for display).
pub fn decode_claims(token: &str) -> Option<Claims> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Convert a DER `SEQUENCE { INTEGER r, INTEGER s }` into 64-byte `r || s`.
pub fn der_to_compact(der: &[u8]) -> Result<[u8; 64], SignerError> {
    let malformed = || SignerError::Device("Device returned a malformed DER signature".into());

    if der.len() < 8 || der[0] != 0x30 || der[1] as usize != der.len() - 2 {
        return Err(malformed());
    }
    let mut out = [0u8; 64];
    let mut pos = 2;
    for half in out.chunks_mut(32) {
        if der.get(pos) != Some(&0x02) {
            return Err(malformed());
        }
        let len = *der.get(pos + 1).ok_or_else(malformed)? as usize;
        let int = der.get(pos + 2..pos + 2 + len).ok_or_else(malformed)?;
        // Strip the sign-padding zero, then left-pad to 32 bytes
        let int = match int {
            [0, rest @ ..] if rest.len() == 32 => rest,
            _ => int,
        };
        if int.len() > 32 {
            return Err(malformed());
        }
        half[32 - int.len()..].copy_from_slice(int);
        pos += 2 + len;
    }
    if pos != der.len() {
        return Err(malformed());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Transaction;
    use crate::signer::{SignatureResult, SignedPayload};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn account(public_key: &str) -> LedgerAccount {
        LedgerAccount {
            address: "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh".into(),
            derivation_path: "44'/144'/0'/0/0".into(),
            chain_code: None,
            public_key: public_key.into(),
        }
    }

    fn der_signature() -> Vec<u8> {
        // r has a sign-padding byte, s is short
        let mut der = vec![0x30, 0x00, 0x02, 0x21, 0x00];
        der.extend_from_slice(&[0x81; 32]);
        der.extend_from_slice(&[0x02, 0x1F]);
        der.extend_from_slice(&[0x22; 31]);
        der[1] = (der.len() - 2) as u8;
        der
    }

    struct PayloadSigner {
        signature: Vec<u8>,
        seen: Mutex<Vec<(Vec<u8>, String)>>,
    }

    #[async_trait]
    impl HardwareSigner for PayloadSigner {
        async fn get_account(&self, _a: u32, _k: u32) -> Result<LedgerAccount, SignerError> {
            unreachable!()
        }

        async fn sign_transaction(&self, _tx: &Transaction, _p: &str) -> Result<SignatureResult, SignerError> {
            unreachable!()
        }

        async fn sign_payload(&self, payload: &[u8], path: &str) -> Result<SignedPayload, SignerError> {
            self.seen
                .lock()
                .unwrap()
                .push((payload.to_vec(), path.to_string()));
            Ok(SignedPayload {
                signature: self.signature.clone(),
                derivation_path: path.to_string(),
            })
        }
    }

    #[test]
    fn test_der_to_compact() {
        let compact = der_to_compact(&der_signature()).unwrap();
        assert_eq!(&compact[..32], &[0x81; 32]);
        assert_eq!(compact[32], 0x00);
        assert_eq!(&compact[33..], &[0x22; 31]);
    }

    #[test]
    fn test_der_to_compact_rejects_garbage() {
        assert!(der_to_compact(&[0x30, 0x02, 0x02, 0x00]).is_err());
        let mut bad = der_signature();
        bad[0] = 0x31;
        assert!(der_to_compact(&bad).is_err());
        let mut trailing = der_signature();
        trailing.push(0);
        assert!(der_to_compact(&trailing).is_err());
    }

    #[test]
    fn test_algorithm_from_key() {
        assert_eq!(TokenAlgorithm::for_public_key(&"02".repeat(33)), TokenAlgorithm::Es256k);
        assert_eq!(
            TokenAlgorithm::for_public_key(&format!("ED{}", "11".repeat(32))),
            TokenAlgorithm::EdDsa
        );
    }

    #[tokio::test]
    async fn test_issue_token_signs_header_and_claims() {
        let signer = PayloadSigner {
            signature: der_signature(),
            seen: Mutex::new(Vec::new()),
        };
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let token = issue_token(
            &signer,
            &account(&format!("03{}", "ab".repeat(32))),
            Some("https://example.org".into()),
            Duration::minutes(DEFAULT_TTL_MINUTES),
            now,
        )
        .await
        .unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[0]).unwrap()).unwrap();
        assert_eq!(header["alg"], "ES256K");
        assert_eq!(header["typ"], "JWT");

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub, "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh");
        assert_eq!(claims.aud.as_deref(), Some("https://example.org"));
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.iat, now.timestamp());

        assert_eq!(URL_SAFE_NO_PAD.decode(parts[2]).unwrap().len(), 64);

        let seen = signer.seen.lock().unwrap();
        assert_eq!(seen[0].0, format!("{}.{}", parts[0], parts[1]).into_bytes());
        assert_eq!(seen[0].1, "44'/144'/0'/0/0");
    }

    #[test]
    fn test_blank_audience_is_omitted() {
        let claims = Claims::new(&account("02"), Some("  ".into()), Utc::now(), Duration::minutes(1));
        assert!(claims.aud.is_none());
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("aud").is_none());
    }
}
