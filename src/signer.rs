//! Hardware Signing Client.
//!
//! Talks to the XRP app on a Ledger to derive accounts and sign transactions.
//! HID calls are blocking, so they run on tokio's blocking pool; the address
//! query is raced against a timeout because a locked or sleeping device can
//! leave it hanging forever.

use crate::codec::{self, Transaction};
use crate::config::{derivation_path, DEVICE_TIMEOUT_MS};
use crate::error::SignerError;
use crate::transport::{acquire_transport, hid_lock, HidTransport};
use crate::xrp_app::{AddressDetails, XrpApp};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// An XRP account derived on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAccount {
    pub address: String,
    pub derivation_path: String,
    pub chain_code: Option<Vec<u8>>,
    /// Compressed public key, hex as returned by the device
    pub public_key: String,
}

/// Signature produced by the device for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureResult {
    pub signature: Vec<u8>,
    pub derivation_path: String,
}

impl SignatureResult {
    pub fn signature_hex(&self) -> String {
        hex::encode_upper(&self.signature)
    }
}

/// Signature over an arbitrary payload (used for device-signed tokens).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    pub signature: Vec<u8>,
    pub derivation_path: String,
}

/// Raw access to the XRP app. Implemented over HID, and by mocks in tests.
#[async_trait]
pub trait XrpDevice: Send + Sync {
    async fn get_address(
        &self,
        path: &str,
        chain_code: bool,
        ed25519: bool,
    ) -> Result<AddressDetails, SignerError>;

    async fn sign(&self, path: &str, payload: Vec<u8>, ed25519: bool) -> Result<Vec<u8>, SignerError>;
}

/// XRP app over USB HID.
#[derive(Debug, Default, Clone, Copy)]
pub struct HidXrpDevice;

impl HidXrpDevice {
    async fn run<T, F>(&self, op: F) -> Result<T, SignerError>
    where
        T: Send + 'static,
        F: FnOnce(&XrpApp<'_, HidTransport>) -> Result<T, SignerError> + Send + 'static,
    {
        // Not cancelled on timeout: the call finishes on its own and the
        // lock keeps the next request from interleaving with it.
        tokio::task::spawn_blocking(move || {
            let _guard = hid_lock();
            let transport = acquire_transport().ok_or(SignerError::DeviceUnavailable)?;
            op(&XrpApp::new(transport.as_ref()))
        })
        .await
        .map_err(|e| {
            error!("Ledger worker panicked: {}", e);
            SignerError::Device(format!("Ledger worker failed: {}", e))
        })?
    }
}

#[async_trait]
impl XrpDevice for HidXrpDevice {
    async fn get_address(
        &self,
        path: &str,
        chain_code: bool,
        ed25519: bool,
    ) -> Result<AddressDetails, SignerError> {
        let path = path.to_string();
        self.run(move |app| app.get_address(&path, false, chain_code, ed25519))
            .await
    }

    async fn sign(&self, path: &str, payload: Vec<u8>, ed25519: bool) -> Result<Vec<u8>, SignerError> {
        let path = path.to_string();
        self.run(move |app| app.sign(&path, &payload, ed25519)).await
    }
}

/// Account derivation and signing as the workflow needs them.
#[async_trait]
pub trait HardwareSigner: Send + Sync {
    /// Derive the account at `44'/144'/{account_index}'/0/{key_index}`.
    async fn get_account(&self, account_index: u32, key_index: u32) -> Result<LedgerAccount, SignerError>;

    /// Sign `tx` (minus any attached signature) with the key at `derivation_path`.
    ///
    /// The path must be the fetched account's `LedgerAccount::derivation_path`,
    /// so the signing key is the one `get_account` derived.
    async fn sign_transaction(
        &self,
        tx: &Transaction,
        derivation_path: &str,
    ) -> Result<SignatureResult, SignerError>;

    /// Sign raw bytes with the key at `derivation_path`, also taken from `LedgerAccount`.
    async fn sign_payload(&self, payload: &[u8], derivation_path: &str) -> Result<SignedPayload, SignerError>;
}

pub struct LedgerSigner<D: XrpDevice> {
    device: Arc<D>,
    timeout: Duration,
    ed25519: bool,
    request_chain_code: bool,
}

impl LedgerSigner<HidXrpDevice> {
    /// Signer backed by the first connected Ledger
    pub fn hid(timeout: Duration) -> Self {
        Self::new(HidXrpDevice, timeout)
    }
}

impl Default for LedgerSigner<HidXrpDevice> {
    fn default() -> Self {
        Self::hid(Duration::from_millis(DEVICE_TIMEOUT_MS))
    }
}

impl<D: XrpDevice> LedgerSigner<D> {
    pub fn new(device: D, timeout: Duration) -> Self {
        Self {
            device: Arc::new(device),
            timeout,
            ed25519: false,
            request_chain_code: false,
        }
    }

    /// Use the ed25519 curve instead of secp256k1
    pub fn with_ed25519(mut self, ed25519: bool) -> Self {
        self.ed25519 = ed25519;
        self
    }

    pub fn with_chain_code(mut self, request: bool) -> Self {
        self.request_chain_code = request;
        self
    }
}

#[async_trait]
impl<D: XrpDevice> HardwareSigner for LedgerSigner<D> {
    async fn get_account(&self, account_index: u32, key_index: u32) -> Result<LedgerAccount, SignerError> {
        let path = derivation_path(account_index, key_index);
        info!("Querying Ledger for XRP address at {}", path);

        let query = self
            .device
            .get_address(&path, self.request_chain_code, self.ed25519);
        let details = match tokio::time::timeout(self.timeout, query).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    "Ledger did not answer within {} ms; discarding the pending request",
                    self.timeout.as_millis()
                );
                return Err(SignerError::UnresponsiveDevice);
            }
        };

        info!("Ledger address at {}: {}", path, details.address);
        Ok(LedgerAccount {
            address: details.address,
            derivation_path: path,
            chain_code: details.chain_code,
            public_key: details.public_key,
        })
    }

    async fn sign_transaction(
        &self,
        tx: &Transaction,
        derivation_path: &str,
    ) -> Result<SignatureResult, SignerError> {
        let blob = codec::encode_for_signing(tx)?;
        debug!("Signing {} byte transaction at {}", blob.len(), derivation_path);

        let signature = self.device.sign(derivation_path, blob, self.ed25519).await?;
        info!("Transaction signed on device ({} byte signature)", signature.len());
        Ok(SignatureResult {
            signature,
            derivation_path: derivation_path.to_string(),
        })
    }

    /// Sign raw bytes with the key at `derivation_path`, also taken from `LedgerAccount`.
    async fn sign_payload(&self, payload: &[u8], derivation_path: &str) -> Result<SignedPayload, SignerError> {
        debug!("Signing {} byte payload at {}", payload.len(), derivation_path);
        let signature = self
            .device
            .sign(derivation_path, payload.to_vec(), self.ed25519)
            .await?;
        Ok(SignedPayload {
            signature,
            derivation_path: derivation_path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Field, FieldValue, TransactionType};
    use std::sync::Mutex;

    enum Behavior {
        Answer,
        Hang,
        Fail(SignerError),
    }

    struct MockDevice {
        behavior: Behavior,
        signed: Mutex<Vec<(String, Vec<u8>, bool)>>,
        queried: Mutex<Vec<(String, bool)>>,
    }

    impl MockDevice {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                signed: Mutex::new(Vec::new()),
                queried: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl XrpDevice for MockDevice {
        async fn get_address(
            &self,
            path: &str,
            chain_code: bool,
            _ed25519: bool,
        ) -> Result<AddressDetails, SignerError> {
            self.queried.lock().unwrap().push((path.to_string(), chain_code));
            match &self.behavior {
                Behavior::Answer => Ok(AddressDetails {
                    public_key: "02ab".repeat(16) + "cd",
                    address: "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh".into(),
                    chain_code: chain_code.then(|| vec![7; 32]),
                }),
                Behavior::Hang => std::future::pending().await,
                Behavior::Fail(e) => Err(e.clone()),
            }
        }

        async fn sign(&self, path: &str, payload: Vec<u8>, ed25519: bool) -> Result<Vec<u8>, SignerError> {
            self.signed
                .lock()
                .unwrap()
                .push((path.to_string(), payload, ed25519));
            match &self.behavior {
                Behavior::Fail(e) => Err(e.clone()),
                _ => Ok(vec![0x30, 0x44, 0x02, 0x20]),
            }
        }
    }

    fn signer(behavior: Behavior) -> LedgerSigner<MockDevice> {
        LedgerSigner::new(MockDevice::new(behavior), Duration::from_millis(DEVICE_TIMEOUT_MS))
    }

    fn draft() -> Transaction {
        Transaction::new(TransactionType::Payment)
            .with(
                Field::Account,
                FieldValue::Account("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh".into()),
            )
            .with(Field::Amount, FieldValue::Drops(1_000_000))
            .with(Field::Fee, FieldValue::Drops(12))
            .with(Field::Sequence, FieldValue::UInt32(1))
    }

    #[tokio::test]
    async fn test_get_account_uses_xrp_path() {
        let signer = signer(Behavior::Answer);
        let account = signer.get_account(2, 5).await.unwrap();
        assert_eq!(account.derivation_path, "44'/144'/2'/0/5");
        assert_eq!(account.address, "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh");
        assert!(account.chain_code.is_none());
        assert_eq!(
            signer.device.queried.lock().unwrap()[0],
            ("44'/144'/2'/0/5".to_string(), false)
        );
    }

    #[tokio::test]
    async fn test_get_account_with_chain_code() {
        let signer = signer(Behavior::Answer).with_chain_code(true);
        let account = signer.get_account(0, 0).await.unwrap();
        assert_eq!(account.chain_code, Some(vec![7; 32]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_device_times_out_as_unresponsive() {
        let signer = signer(Behavior::Hang);
        let started = tokio::time::Instant::now();
        let result = signer.get_account(0, 0).await;
        assert_eq!(result, Err(SignerError::UnresponsiveDevice));
        assert!(started.elapsed() >= Duration::from_millis(DEVICE_TIMEOUT_MS));
    }

    #[tokio::test]
    async fn test_device_error_passes_through() {
        let signer = signer(Behavior::Fail(SignerError::DeviceUnavailable));
        assert_eq!(signer.get_account(0, 0).await, Err(SignerError::DeviceUnavailable));
    }

    #[tokio::test]
    async fn test_sign_transaction_sends_signing_blob() {
        let signer = signer(Behavior::Answer);
        let tx = draft().with(Field::TxnSignature, FieldValue::Blob(vec![0xFF; 70]));
        let result = signer.sign_transaction(&tx, "44'/144'/0'/0/0").await.unwrap();

        assert_eq!(result.signature_hex(), "30440220");
        assert_eq!(result.derivation_path, "44'/144'/0'/0/0");

        let signed = signer.device.signed.lock().unwrap();
        assert_eq!(signed[0].1, codec::encode(&draft()).unwrap());
        assert!(!signed[0].2);
    }

    #[tokio::test]
    async fn test_sign_transaction_rejects_unencodable_draft() {
        let signer = signer(Behavior::Answer);
        let tx = draft().with(Field::Destination, FieldValue::Account("not-an-address".into()));
        assert!(matches!(
            signer.sign_transaction(&tx, "44'/144'/0'/0/0").await,
            Err(SignerError::Codec(_))
        ));
        assert!(signer.device.signed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_declined_sign_keeps_vendor_message() {
        let signer = signer(Behavior::Fail(SignerError::Device(
            "Ledger device: CONDITIONS_OF_USE_NOT_SATISFIED (0x6985)".into(),
        )));
        match signer.sign_transaction(&draft(), "44'/144'/0'/0/0").await {
            Err(SignerError::Device(msg)) => assert!(msg.contains("0x6985")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sign_payload_with_ed25519() {
        let signer = signer(Behavior::Answer).with_ed25519(true);
        let signed = signer.sign_payload(b"header.claims", "44'/144'/0'/0/1").await.unwrap();
        assert_eq!(signed.derivation_path, "44'/144'/0'/0/1");

        let calls = signer.device.signed.lock().unwrap();
        assert_eq!(calls[0].1, b"header.claims".to_vec());
        assert!(calls[0].2);
    }
}
