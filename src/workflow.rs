//! Payment workflow: account → ledger state → draft → signature → submission.
//!
//! The controller is synchronous. Each async step is split into `begin_*`,
//! which validates and hands out a [`Ticket`], and `finish_*`, which applies
//! the result only if that ticket is still the current one. The GUI runs the
//! awaited part on a background job; tests use the `*_with` helpers.

use crate::codec::{self, Field, FieldValue, Transaction, TransactionType, DROPS_PER_XRP, MAX_DROPS};
use crate::config::{DEFAULT_FEE_DROPS, LAST_LEDGER_OFFSET};
use crate::error::{NetworkError, SignerError, WorkflowError};
use crate::network::{AccountLedgerState, LedgerNetwork, SubmissionResult};
use crate::signer::{HardwareSigner, LedgerAccount, SignatureResult};
use tracing::{debug, info, warn};

const DEVICE_HINT: &str =
    "Check that the Ledger Device is unlocked and that you are using the XRP app. Error message from device: ";

/// `tfTransferable` on NFTokenMint
pub const NFT_FLAG_TRANSFERABLE: u32 = 0x0000_0008;

/// Highest NFTokenMint TransferFee (50%)
pub const MAX_TRANSFER_FEE: u16 = 50_000;

/// URIs longer than this are rejected by the ledger
pub const MAX_URI_BYTES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStage {
    Idle,
    AccountFetched,
    LedgerStateFetched,
    TxDrafted,
    TxSigned,
    Submitted,
}

impl WorkflowStage {
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowStage::Idle => "Connect your Ledger",
            WorkflowStage::AccountFetched => "Account fetched",
            WorkflowStage::LedgerStateFetched => "Ready to draft",
            WorkflowStage::TxDrafted => "Draft ready to sign",
            WorkflowStage::TxSigned => "Signed, ready to submit",
            WorkflowStage::Submitted => "Submitted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    FetchAccount,
    FetchLedgerState,
    Sign,
    Submit,
}

/// Proof that a result belongs to the most recent request of its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    action: Action,
    generation: u64,
}

impl Ticket {
    pub fn action(&self) -> Action {
        self.action
    }
}

/// Payment form input, as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct PaymentForm {
    pub destination: String,
    /// XRP, up to six decimals
    pub amount: String,
    /// Optional
    pub destination_tag: String,
}

/// NFTokenMint form input.
#[derive(Debug, Clone, Default)]
pub struct NftMintForm {
    pub uri: String,
    pub taxon: String,
    /// Basis points of 1/100000 (0..=50000); needs `transferable`
    pub transfer_fee: String,
    pub transferable: bool,
}

/// Work handed to the signer by [`PaymentWorkflow::begin_sign`].
#[derive(Debug, Clone)]
pub struct SignRequest {
    pub ticket: Ticket,
    pub transaction: Transaction,
    pub derivation_path: String,
}

/// Work handed to the network by [`PaymentWorkflow::begin_submit`].
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub ticket: Ticket,
    /// Draft without its signature field
    pub prepared: Transaction,
    pub signature: Vec<u8>,
}

#[derive(Debug)]
pub struct PaymentWorkflow {
    account: Option<LedgerAccount>,
    ledger_state: Option<AccountLedgerState>,
    draft: Option<Transaction>,
    signature: Option<SignatureResult>,
    /// Fingerprint of the draft content the signature was made for
    signed_fingerprint: Option<String>,
    /// Fingerprint of the draft sent to the device by the pending sign request
    pending_fingerprint: Option<String>,
    outcome: Option<Result<SubmissionResult, WorkflowError>>,
    error: Option<WorkflowError>,
    fee_drops: u64,
    generation: u64,
    in_flight: Option<Ticket>,
}

impl Default for PaymentWorkflow {
    fn default() -> Self {
        Self::new(DEFAULT_FEE_DROPS)
    }
}

impl PaymentWorkflow {
    pub fn new(fee_drops: u64) -> Self {
        Self {
            account: None,
            ledger_state: None,
            draft: None,
            signature: None,
            signed_fingerprint: None,
            pending_fingerprint: None,
            outcome: None,
            error: None,
            fee_drops,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn stage(&self) -> WorkflowStage {
        if self.signature.is_some() {
            WorkflowStage::TxSigned
        } else if self.draft.is_some() {
            WorkflowStage::TxDrafted
        } else if self.outcome.is_some() {
            WorkflowStage::Submitted
        } else if self.ledger_state.is_some() {
            WorkflowStage::LedgerStateFetched
        } else if self.account.is_some() {
            WorkflowStage::AccountFetched
        } else {
            WorkflowStage::Idle
        }
    }

    pub fn account(&self) -> Option<&LedgerAccount> {
        self.account.as_ref()
    }

    pub fn ledger_state(&self) -> Option<&AccountLedgerState> {
        self.ledger_state.as_ref()
    }

    pub fn draft(&self) -> Option<&Transaction> {
        self.draft.as_ref()
    }

    pub fn signature(&self) -> Option<&SignatureResult> {
        self.signature.as_ref()
    }

    pub fn outcome(&self) -> Option<&Result<SubmissionResult, WorkflowError>> {
        self.outcome.as_ref()
    }

    pub fn error(&self) -> Option<&WorkflowError> {
        self.error.as_ref()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    pub fn fee_drops(&self) -> u64 {
        self.fee_drops
    }

    pub fn set_fee_drops(&mut self, fee_drops: u64) {
        self.fee_drops = fee_drops;
    }

    /// Action currently awaiting its result, if any
    pub fn in_flight(&self) -> Option<Action> {
        self.in_flight.map(|t| t.action)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Forget everything (network switch, account change). Pending results become stale.
    pub fn reset(&mut self) {
        let fee_drops = self.fee_drops;
        let generation = self.generation + 1;
        *self = Self::new(fee_drops);
        self.generation = generation;
    }

    fn issue(&mut self, action: Action) -> Ticket {
        self.generation += 1;
        let ticket = Ticket {
            action,
            generation: self.generation,
        };
        if let Some(previous) = self.in_flight.replace(ticket) {
            debug!("{:?} superseded by {:?}", previous.action, action);
        }
        ticket
    }

    fn redeem(&mut self, ticket: Ticket) -> bool {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
            true
        } else {
            debug!("Discarding stale {:?} result", ticket.action);
            false
        }
    }

    fn fail(&mut self, error: WorkflowError) -> WorkflowError {
        warn!("{}", error);
        self.error = Some(error.clone());
        error
    }

    fn result(&self) -> Result<(), WorkflowError> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    // ---- Idle → AccountFetched ----

    pub fn begin_fetch_account(&mut self) -> Ticket {
        self.clear_error();
        self.issue(Action::FetchAccount)
    }

    /// Returns false when the result was stale and ignored.
    pub fn finish_fetch_account(
        &mut self,
        ticket: Ticket,
        result: Result<LedgerAccount, SignerError>,
    ) -> bool {
        if !self.redeem(ticket) {
            return false;
        }
        match result {
            Ok(account) => {
                info!("Using account {} ({})", account.address, account.derivation_path);
                let changed = self.account.as_ref().map(|a| &a.address) != Some(&account.address);
                if changed {
                    self.ledger_state = None;
                    self.drop_draft();
                    self.outcome = None;
                }
                self.account = Some(account);
            }
            Err(e) => {
                self.fail(device_error(e));
            }
        }
        true
    }

    // ---- AccountFetched → LedgerStateFetched ----

    /// Returns the ticket and the address to query.
    pub fn begin_fetch_ledger_state(&mut self) -> Result<(Ticket, String), WorkflowError> {
        self.clear_error();
        let address = match &self.account {
            Some(account) => account.address.clone(),
            None => {
                return Err(self.fail(WorkflowError::Validation(
                    "Connect your Ledger and get the account first".into(),
                )))
            }
        };
        Ok((self.issue(Action::FetchLedgerState), address))
    }

    pub fn finish_fetch_ledger_state(
        &mut self,
        ticket: Ticket,
        result: Result<AccountLedgerState, NetworkError>,
    ) -> bool {
        if !self.redeem(ticket) {
            return false;
        }
        match result {
            Ok(state) => {
                let current = self.account.as_ref().map(|a| a.address.as_str());
                if current != Some(state.account.as_str()) {
                    debug!("Ledger state for {} no longer matches the account", state.account);
                    self.fail(WorkflowError::Validation(format!(
                        "Account lookup returned {} instead of the connected account",
                        state.account
                    )));
                    return true;
                }
                // A draft built from the previous snapshot would carry its sequence
                self.drop_draft();
                self.ledger_state = Some(state);
            }
            Err(e) => {
                self.fail(e.into());
            }
        }
        true
    }

    // ---- LedgerStateFetched → TxDrafted ----

    pub fn draft_payment(&mut self, form: &PaymentForm) -> Result<(), WorkflowError> {
        self.clear_error();
        let destination = form.destination.trim();
        if destination.is_empty() || form.amount.trim().is_empty() {
            return Err(self.fail(WorkflowError::Validation(
                "Please enter an amount and destination address".into(),
            )));
        }
        let built = self.base_draft(TransactionType::Payment).and_then(|tx| {
            check_address_shape(destination)?;
            let drops = xrp_to_drops(&form.amount)?;
            let mut tx = tx
                .with(Field::Destination, FieldValue::Account(destination.to_string()))
                .with(Field::Amount, FieldValue::Drops(drops));
            let tag = form.destination_tag.trim();
            if !tag.is_empty() {
                let tag: u32 = tag.parse().map_err(|_| {
                    WorkflowError::Validation(format!("Invalid destination tag '{}'", tag))
                })?;
                tx.set(Field::DestinationTag, FieldValue::UInt32(tag));
            }
            Ok(tx)
        });
        self.install_draft(built)
    }

    pub fn draft_nft_mint(&mut self, form: &NftMintForm) -> Result<(), WorkflowError> {
        self.clear_error();
        let built = self.base_draft(TransactionType::NFTokenMint).and_then(|tx| {
            let taxon = match form.taxon.trim() {
                "" => 0,
                t => t.parse::<u32>().map_err(|_| {
                    WorkflowError::Validation(format!("Invalid taxon '{}'", t))
                })?,
            };
            let transfer_fee = match form.transfer_fee.trim() {
                "" => 0,
                f => f
                    .parse::<u16>()
                    .ok()
                    .filter(|fee| *fee <= MAX_TRANSFER_FEE)
                    .ok_or_else(|| {
                        WorkflowError::Validation(format!(
                            "Transfer fee must be between 0 and {}",
                            MAX_TRANSFER_FEE
                        ))
                    })?,
            };
            if transfer_fee > 0 && !form.transferable {
                return Err(WorkflowError::Validation(
                    "A transfer fee requires the NFT to be transferable".into(),
                ));
            }
            let uri = form.uri.trim();
            if uri.len() > MAX_URI_BYTES {
                return Err(WorkflowError::Validation(format!(
                    "URI is longer than {} bytes",
                    MAX_URI_BYTES
                )));
            }

            let mut tx = tx.with(Field::NFTokenTaxon, FieldValue::UInt32(taxon));
            if form.transferable {
                tx.set(Field::Flags, FieldValue::UInt32(NFT_FLAG_TRANSFERABLE));
            }
            if transfer_fee > 0 {
                tx.set(Field::TransferFee, FieldValue::UInt16(transfer_fee));
            }
            if !uri.is_empty() {
                tx.set(Field::Uri, FieldValue::Blob(uri.as_bytes().to_vec()));
            }
            Ok(tx)
        });
        self.install_draft(built)
    }

    /// Fields every draft shares, taken from the account and ledger snapshot.
    fn base_draft(&self, tx_type: TransactionType) -> Result<Transaction, WorkflowError> {
        let (account, state) = match (&self.account, &self.ledger_state) {
            (Some(a), Some(s)) => (a, s),
            _ => {
                return Err(WorkflowError::Validation(
                    "Get the account details before drafting a transaction".into(),
                ))
            }
        };
        let last_ledger = state
            .sequence
            .checked_add(LAST_LEDGER_OFFSET)
            .ok_or_else(|| WorkflowError::Validation("Account sequence out of range".into()))?;
        let public_key = hex::decode(account.public_key.to_uppercase()).map_err(|e| {
            WorkflowError::Codec(format!("Device returned an invalid public key: {}", e))
        })?;

        Ok(Transaction::new(tx_type)
            .with(Field::Account, FieldValue::Account(account.address.clone()))
            .with(Field::Fee, FieldValue::Drops(self.fee_drops))
            .with(Field::Sequence, FieldValue::UInt32(state.sequence))
            .with(Field::LastLedgerSequence, FieldValue::UInt32(last_ledger))
            .with(Field::SigningPubKey, FieldValue::Blob(public_key)))
    }

    fn install_draft(&mut self, built: Result<Transaction, WorkflowError>) -> Result<(), WorkflowError> {
        match built {
            Ok(tx) => {
                info!("Drafted {}", tx.to_json());
                // An in-flight sign or submit refers to the old draft
                if matches!(self.in_flight(), Some(Action::Sign) | Some(Action::Submit)) {
                    self.in_flight = None;
                }
                self.drop_draft();
                self.outcome = None;
                self.draft = Some(tx);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn drop_draft(&mut self) {
        self.draft = None;
        self.signature = None;
        self.signed_fingerprint = None;
        self.pending_fingerprint = None;
    }

    // ---- TxDrafted → TxSigned ----

    pub fn begin_sign(&mut self) -> Result<SignRequest, WorkflowError> {
        self.clear_error();
        let (draft, path) = match (&self.draft, &self.account) {
            (Some(d), Some(a)) => (d.clone(), a.derivation_path.clone()),
            _ => {
                return Err(self.fail(WorkflowError::Validation(
                    "Create a transaction before signing".into(),
                )))
            }
        };
        let content = fingerprint(&draft).map_err(|e| self.fail(e))?;

        // A fresh request replaces any earlier signature
        self.signature = None;
        self.signed_fingerprint = None;
        if let Some(d) = self.draft.as_mut() {
            d.remove(Field::TxnSignature);
        }
        self.pending_fingerprint = Some(content);

        let mut transaction = draft;
        transaction.remove(Field::TxnSignature);
        Ok(SignRequest {
            ticket: self.issue(Action::Sign),
            transaction,
            derivation_path: path,
        })
    }

    pub fn finish_sign(&mut self, ticket: Ticket, result: Result<SignatureResult, SignerError>) -> bool {
        if !self.redeem(ticket) {
            return false;
        }
        let expected = self.pending_fingerprint.take();
        match result {
            Ok(signature) => {
                let current = match self.draft.as_ref().map(fingerprint) {
                    Some(Ok(fp)) => fp,
                    _ => return false,
                };
                if expected.as_deref() != Some(current.as_str()) {
                    debug!("Draft changed while the device was signing; discarding signature");
                    return false;
                }
                if let Some(draft) = self.draft.as_mut() {
                    draft.set(Field::TxnSignature, FieldValue::Blob(signature.signature.clone()));
                }
                info!("Draft signed with {}", signature.derivation_path);
                self.signature = Some(signature);
                self.signed_fingerprint = Some(current);
            }
            Err(e) => {
                self.fail(device_error(e));
            }
        }
        true
    }

    // ---- TxSigned → Submitted ----

    pub fn begin_submit(&mut self) -> Result<SubmitRequest, WorkflowError> {
        self.clear_error();
        let checked = match (&self.draft, &self.signature) {
            (Some(d), Some(s)) => fingerprint(d).map(|fp| (fp, d.clone(), s.signature.clone())),
            _ => Err(WorkflowError::Validation(
                "Please sign the transaction first".into(),
            )),
        };
        let (current, mut prepared, signature) = checked.map_err(|e| self.fail(e))?;
        if self.signed_fingerprint.as_deref() != Some(current.as_str()) {
            return Err(self.fail(WorkflowError::Validation(
                "The transaction changed after it was signed. Please sign it again".into(),
            )));
        }

        prepared.remove(Field::TxnSignature);
        Ok(SubmitRequest {
            ticket: self.issue(Action::Submit),
            prepared,
            signature,
        })
    }

    pub fn finish_submit(
        &mut self,
        ticket: Ticket,
        result: Result<SubmissionResult, NetworkError>,
    ) -> bool {
        if !self.redeem(ticket) {
            return false;
        }
        // Either way the signed draft is spent
        self.drop_draft();
        match result {
            Ok(submission) => {
                info!(
                    "Transaction {} finished: {:?}",
                    submission.hash, submission.transaction_result
                );
                self.outcome = Some(Ok(submission));
            }
            Err(e) => {
                let error = self.fail(WorkflowError::Network(format!(
                    "Error submitting transaction: {}",
                    e
                )));
                self.outcome = Some(Err(error));
            }
        }
        true
    }

    // ---- Awaiting helpers ----

    /// Query the device, then (on success) the network for the account's state.
    pub async fn connect_with<S, N>(
        &mut self,
        signer: &S,
        network: &N,
        account_index: u32,
        key_index: u32,
    ) -> Result<(), WorkflowError>
    where
        S: HardwareSigner + ?Sized,
        N: LedgerNetwork + ?Sized,
    {
        self.fetch_account_with(signer, account_index, key_index).await?;
        self.fetch_ledger_state_with(network).await
    }

    pub async fn fetch_account_with<S: HardwareSigner + ?Sized>(
        &mut self,
        signer: &S,
        account_index: u32,
        key_index: u32,
    ) -> Result<(), WorkflowError> {
        let ticket = self.begin_fetch_account();
        let result = signer.get_account(account_index, key_index).await;
        self.finish_fetch_account(ticket, result);
        self.result()
    }

    pub async fn fetch_ledger_state_with<N: LedgerNetwork + ?Sized>(
        &mut self,
        network: &N,
    ) -> Result<(), WorkflowError> {
        let (ticket, address) = self.begin_fetch_ledger_state()?;
        let result = network.get_account_info(&address).await;
        self.finish_fetch_ledger_state(ticket, result);
        self.result()
    }

    pub async fn sign_with<S: HardwareSigner + ?Sized>(&mut self, signer: &S) -> Result<(), WorkflowError> {
        let request = self.begin_sign()?;
        let result = signer
            .sign_transaction(&request.transaction, &request.derivation_path)
            .await;
        self.finish_sign(request.ticket, result);
        self.result()
    }

    pub async fn submit_with<N: LedgerNetwork + ?Sized>(&mut self, network: &N) -> Result<(), WorkflowError> {
        let request = self.begin_submit()?;
        let result = network
            .submit_and_wait(&request.prepared, &request.signature)
            .await;
        self.finish_submit(request.ticket, result);
        self.result()
    }
}

/// Device failures during account or sign requests get the troubleshooting hint.
fn device_error(err: SignerError) -> WorkflowError {
    match err {
        SignerError::Device(msg) => WorkflowError::Device(format!("{}{}", DEVICE_HINT, msg)),
        other => other.into(),
    }
}

/// Identity of the signed content (the signing blob's hash).
fn fingerprint(tx: &Transaction) -> Result<String, WorkflowError> {
    Ok(codec::transaction_hash(&codec::encode_for_signing(tx)?))
}

/// Cheap syntax check; the codec verifies the checksum when encoding.
fn check_address_shape(address: &str) -> Result<(), WorkflowError> {
    const RIPPLE_ALPHABET: &str = "rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz";
    let valid = address.starts_with('r')
        && (25..=35).contains(&address.len())
        && address.chars().all(|c| RIPPLE_ALPHABET.contains(c));
    if valid {
        Ok(())
    } else {
        Err(WorkflowError::Validation(format!(
            "'{}' is not a valid XRP address",
            address
        )))
    }
}

/// Parse an XRP amount ("10", "0.25") into drops.
pub fn xrp_to_drops(input: &str) -> Result<u64, WorkflowError> {
    let s = input.trim();
    let invalid = || WorkflowError::Validation(format!("Invalid XRP amount '{}'", s));
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > 6 {
        return Err(WorkflowError::Validation(
            "XRP amounts have at most 6 decimal places".into(),
        ));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac: u64 = format!("{:0<6}", frac).parse().map_err(|_| invalid())?;
    let drops = whole
        .checked_mul(DROPS_PER_XRP)
        .and_then(|d| d.checked_add(frac))
        .filter(|d| *d <= MAX_DROPS)
        .ok_or_else(invalid)?;
    if drops == 0 {
        return Err(WorkflowError::Validation(
            "Amount must be greater than zero".into(),
        ));
    }
    Ok(drops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ServerStatus;
    use crate::signer::{LedgerSigner, SignedPayload, XrpDevice};
    use crate::xrp_app::AddressDetails;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
    const DESTINATION: &str = "rB7jaUK567mGTHKwEGPFFZ4wE3sN2z5Yi4";
    const PUBKEY: &str = "0330e7fc9d56bb25d6893ba3f317ae5bcf33b3291bd63db32654a313222f7fd020";

    fn account() -> LedgerAccount {
        LedgerAccount {
            address: ADDRESS.into(),
            derivation_path: "44'/144'/0'/0/0".into(),
            chain_code: None,
            public_key: PUBKEY.into(),
        }
    }

    fn ledger_state(sequence: u32) -> AccountLedgerState {
        AccountLedgerState {
            account: ADDRESS.into(),
            sequence,
            balance_drops: 50_000_000,
            owner_count: 0,
            flags: 0,
            ledger_index: Some(90_000_000),
            validated: true,
            account_data: json!({ "Account": ADDRESS, "Sequence": sequence }),
        }
    }

    fn submission() -> SubmissionResult {
        SubmissionResult {
            engine_result: "tesSUCCESS".into(),
            engine_result_message: "The transaction was applied.".into(),
            hash: "E08D6E9754025BA2534A78707605E0601F03ACE063687A0CA1BDDACFCD1698C7".into(),
            validated: true,
            ledger_index: Some(90_000_001),
            transaction_result: Some("tesSUCCESS".into()),
            meta: json!({ "TransactionResult": "tesSUCCESS" }),
            warnings: Vec::new(),
        }
    }

    struct MockSigner {
        account: Result<LedgerAccount, SignerError>,
        sign: Result<Vec<u8>, SignerError>,
        signed: Mutex<Vec<Transaction>>,
    }

    impl MockSigner {
        fn ok() -> Self {
            Self {
                account: Ok(account()),
                sign: Ok(vec![0x30, 0x44, 0x02, 0x20, 0x01]),
                signed: Mutex::new(Vec::new()),
            }
        }

        fn declining(msg: &str) -> Self {
            Self {
                sign: Err(SignerError::Device(msg.into())),
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl HardwareSigner for MockSigner {
        async fn get_account(&self, _a: u32, _k: u32) -> Result<LedgerAccount, SignerError> {
            self.account.clone()
        }

        async fn sign_transaction(
            &self,
            tx: &Transaction,
            derivation_path: &str,
        ) -> Result<SignatureResult, SignerError> {
            self.signed.lock().unwrap().push(tx.clone());
            self.sign.clone().map(|signature| SignatureResult {
                signature,
                derivation_path: derivation_path.to_string(),
            })
        }

        async fn sign_payload(&self, _p: &[u8], path: &str) -> Result<SignedPayload, SignerError> {
            self.sign.clone().map(|signature| SignedPayload {
                signature,
                derivation_path: path.to_string(),
            })
        }
    }

    struct MockNetwork {
        sequence: u32,
        submit: Result<SubmissionResult, NetworkError>,
        submit_calls: AtomicUsize,
        info_calls: AtomicUsize,
    }

    impl MockNetwork {
        fn new(sequence: u32) -> Self {
            Self {
                sequence,
                submit: Ok(submission()),
                submit_calls: AtomicUsize::new(0),
                info_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LedgerNetwork for MockNetwork {
        async fn get_account_info(&self, address: &str) -> Result<AccountLedgerState, NetworkError> {
            self.info_calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(address, ADDRESS);
            Ok(ledger_state(self.sequence))
        }

        async fn submit_and_wait(
            &self,
            prepared: &Transaction,
            signature: &[u8],
        ) -> Result<SubmissionResult, NetworkError> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            assert!(!prepared.contains(Field::TxnSignature));
            assert!(!signature.is_empty());
            self.submit.clone()
        }

        async fn server_info(&self) -> Result<ServerStatus, NetworkError> {
            Ok(ServerStatus {
                build_version: "test".into(),
                server_state: "full".into(),
                validated_ledger: Some(1),
            })
        }
    }

    fn form(amount: &str, destination: &str) -> PaymentForm {
        PaymentForm {
            destination: destination.into(),
            amount: amount.into(),
            destination_tag: String::new(),
        }
    }

    async fn ready(sequence: u32) -> PaymentWorkflow {
        let mut wf = PaymentWorkflow::default();
        wf.connect_with(&MockSigner::ok(), &MockNetwork::new(sequence), 0, 0)
            .await
            .unwrap();
        wf
    }

    #[tokio::test]
    async fn test_stages_follow_the_happy_path() {
        let signer = MockSigner::ok();
        let network = MockNetwork::new(100);
        let mut wf = PaymentWorkflow::default();
        assert_eq!(wf.stage(), WorkflowStage::Idle);

        wf.fetch_account_with(&signer, 0, 0).await.unwrap();
        assert_eq!(wf.stage(), WorkflowStage::AccountFetched);

        wf.fetch_ledger_state_with(&network).await.unwrap();
        assert_eq!(wf.stage(), WorkflowStage::LedgerStateFetched);

        wf.draft_payment(&form("10", DESTINATION)).unwrap();
        assert_eq!(wf.stage(), WorkflowStage::TxDrafted);

        wf.sign_with(&signer).await.unwrap();
        assert_eq!(wf.stage(), WorkflowStage::TxSigned);

        wf.submit_with(&network).await.unwrap();
        assert_eq!(wf.stage(), WorkflowStage::Submitted);
        assert!(!wf.is_busy());
    }

    #[test]
    fn test_payment_draft_fields() {
        let mut wf = tokio_test::block_on(ready(100));
        wf.draft_payment(&form("10", DESTINATION)).unwrap();
        let json = wf.draft().unwrap().to_json();

        assert_eq!(json["TransactionType"], "Payment");
        assert_eq!(json["Account"], ADDRESS);
        assert_eq!(json["Amount"], "10000000");
        assert_eq!(json["Destination"], DESTINATION);
        assert_eq!(json["Fee"], "12");
        assert_eq!(json["Sequence"], 100);
        assert_eq!(json["LastLedgerSequence"], 10100);
        assert_eq!(json["SigningPubKey"], PUBKEY.to_uppercase());
    }

    #[tokio::test]
    async fn test_draft_requires_amount_and_destination() {
        let mut wf = ready(1).await;
        for (amount, destination) in [("", DESTINATION), ("5", ""), ("  ", "  ")] {
            let err = wf.draft_payment(&form(amount, destination)).unwrap_err();
            assert_eq!(
                err,
                WorkflowError::Validation("Please enter an amount and destination address".into())
            );
            assert_eq!(wf.stage(), WorkflowStage::LedgerStateFetched);
            assert!(wf.error_message().is_some());
        }
    }

    #[tokio::test]
    async fn test_draft_rejects_bad_input() {
        let mut wf = ready(1).await;
        assert!(wf.draft_payment(&form("ten", DESTINATION)).is_err());
        assert!(wf.draft_payment(&form("1", "xNotRipple")).is_err());
        let mut tagged = form("1", DESTINATION);
        tagged.destination_tag = "-4".into();
        assert!(wf.draft_payment(&tagged).is_err());
        assert!(wf.draft().is_none());
    }

    #[tokio::test]
    async fn test_destination_tag_is_attached() {
        let mut wf = ready(1).await;
        let mut tagged = form("1", DESTINATION);
        tagged.destination_tag = "12345".into();
        wf.draft_payment(&tagged).unwrap();
        assert_eq!(wf.draft().unwrap().uint32(Field::DestinationTag), Some(12345));
    }

    #[test]
    fn test_draft_before_ledger_state_fails() {
        let mut wf = PaymentWorkflow::default();
        assert!(matches!(
            wf.draft_payment(&form("1", DESTINATION)),
            Err(WorkflowError::Validation(_))
        ));
        assert_eq!(wf.stage(), WorkflowStage::Idle);
    }

    #[test]
    fn test_xrp_to_drops() {
        assert_eq!(xrp_to_drops("10").unwrap(), 10_000_000);
        assert_eq!(xrp_to_drops(" 0.25 ").unwrap(), 250_000);
        assert_eq!(xrp_to_drops(".000001").unwrap(), 1);
        assert_eq!(xrp_to_drops("1.").unwrap(), 1_000_000);
        assert!(xrp_to_drops("0").is_err());
        assert!(xrp_to_drops("1.0000001").is_err());
        assert!(xrp_to_drops("-1").is_err());
        assert!(xrp_to_drops(".").is_err());
        assert!(xrp_to_drops("100000000001").is_err());
    }

    #[tokio::test]
    async fn test_submit_without_signature_never_touches_network() {
        let network = MockNetwork::new(100);
        let mut wf = ready(100).await;
        wf.draft_payment(&form("10", DESTINATION)).unwrap();

        let err = wf.submit_with(&network).await.unwrap_err();
        assert_eq!(
            err,
            WorkflowError::Validation("Please sign the transaction first".into())
        );
        assert_eq!(network.submit_calls.load(Ordering::SeqCst), 0);
        assert_eq!(wf.stage(), WorkflowStage::TxDrafted);

        // Nothing drafted at all
        let mut empty = PaymentWorkflow::default();
        assert!(empty.submit_with(&network).await.is_err());
        assert_eq!(network.submit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sign_failure_keeps_draft_and_shows_device_message() {
        let mut wf = ready(100).await;
        wf.draft_payment(&form("10", DESTINATION)).unwrap();
        let before = wf.draft().cloned();

        let signer = MockSigner::declining("Ledger device: CONDITIONS_OF_USE_NOT_SATISFIED (0x6985)");
        let err = wf.sign_with(&signer).await.unwrap_err();

        assert_eq!(wf.stage(), WorkflowStage::TxDrafted);
        assert_eq!(wf.draft().cloned(), before);
        assert!(wf.signature().is_none());
        let msg = err.to_string();
        assert!(msg.starts_with("Check that the Ledger Device is unlocked and that you are using the XRP app."));
        assert!(msg.ends_with("(0x6985)"));
        assert_eq!(wf.error_message(), Some(msg));
    }

    #[tokio::test]
    async fn test_signature_attached_and_signed_content_excludes_it() {
        let signer = MockSigner::ok();
        let mut wf = ready(100).await;
        wf.draft_payment(&form("10", DESTINATION)).unwrap();
        wf.sign_with(&signer).await.unwrap();

        let draft = wf.draft().unwrap();
        assert_eq!(
            draft.get(Field::TxnSignature),
            Some(&FieldValue::Blob(vec![0x30, 0x44, 0x02, 0x20, 0x01]))
        );
        let sent = signer.signed.lock().unwrap();
        assert!(!sent[0].contains(Field::TxnSignature));

        // Re-signing sends the unsigned content again
        drop(sent);
        wf.sign_with(&signer).await.unwrap();
        assert!(!signer.signed.lock().unwrap()[1].contains(Field::TxnSignature));
    }

    #[tokio::test]
    async fn test_successful_submission_clears_draft_and_signature() {
        let network = MockNetwork::new(100);
        let mut wf = ready(100).await;
        wf.draft_payment(&form("10", DESTINATION)).unwrap();
        wf.sign_with(&MockSigner::ok()).await.unwrap();
        wf.submit_with(&network).await.unwrap();

        assert_eq!(network.submit_calls.load(Ordering::SeqCst), 1);
        assert!(wf.draft().is_none());
        assert!(wf.signature().is_none());
        assert!(matches!(wf.outcome(), Some(Ok(r)) if r.succeeded()));
        assert_eq!(wf.stage(), WorkflowStage::Submitted);

        // Ready for the next payment
        wf.draft_payment(&form("1", DESTINATION)).unwrap();
        assert_eq!(wf.stage(), WorkflowStage::TxDrafted);
        assert!(wf.outcome().is_none());
    }

    #[tokio::test]
    async fn test_failed_submission_is_kept_as_outcome() {
        let mut network = MockNetwork::new(100);
        network.submit = Err(NetworkError::Rejected {
            engine_result: "tefPAST_SEQ".into(),
            message: "This sequence number has already passed.".into(),
        });
        let mut wf = ready(100).await;
        wf.draft_payment(&form("10", DESTINATION)).unwrap();
        wf.sign_with(&MockSigner::ok()).await.unwrap();

        let err = wf.submit_with(&network).await.unwrap_err();
        assert!(err.to_string().starts_with("Error submitting transaction: "));
        assert!(err.to_string().contains("tefPAST_SEQ"));
        assert_eq!(wf.stage(), WorkflowStage::Submitted);
        assert!(matches!(wf.outcome(), Some(Err(_))));
    }

    #[tokio::test]
    async fn test_error_cleared_at_start_of_next_action() {
        let mut wf = ready(100).await;
        let _ = wf.draft_payment(&form("", ""));
        assert!(wf.error().is_some());

        wf.draft_payment(&form("2", DESTINATION)).unwrap();
        assert!(wf.error().is_none());
    }

    #[tokio::test]
    async fn test_stale_results_are_discarded() {
        let mut wf = ready(100).await;
        wf.draft_payment(&form("10", DESTINATION)).unwrap();

        let first = wf.begin_sign().unwrap();
        let second = wf.begin_sign().unwrap();

        let sig = |bytes: Vec<u8>| {
            Ok(SignatureResult {
                signature: bytes,
                derivation_path: "44'/144'/0'/0/0".into(),
            })
        };
        assert!(!wf.finish_sign(first.ticket, sig(vec![1])));
        assert!(wf.signature().is_none());

        assert!(wf.finish_sign(second.ticket, sig(vec![2])));
        assert_eq!(wf.signature().unwrap().signature, vec![2]);
    }

    #[tokio::test]
    async fn test_redraft_while_signing_drops_signature() {
        let mut wf = ready(100).await;
        wf.draft_payment(&form("10", DESTINATION)).unwrap();
        let request = wf.begin_sign().unwrap();

        wf.draft_payment(&form("11", DESTINATION)).unwrap();
        let applied = wf.finish_sign(
            request.ticket,
            Ok(SignatureResult {
                signature: vec![9],
                derivation_path: "44'/144'/0'/0/0".into(),
            }),
        );
        assert!(!applied);
        assert_eq!(wf.stage(), WorkflowStage::TxDrafted);
        assert_eq!(wf.draft().unwrap().drops(Field::Amount), Some(11_000_000));
    }

    #[tokio::test]
    async fn test_reset_makes_pending_results_stale() {
        let mut wf = ready(100).await;
        let (ticket, _) = wf.begin_fetch_ledger_state().unwrap();
        wf.reset();
        assert!(!wf.finish_fetch_ledger_state(ticket, Ok(ledger_state(5))));
        assert_eq!(wf.stage(), WorkflowStage::Idle);
    }

    #[tokio::test]
    async fn test_refetching_ledger_state_drops_stale_draft() {
        let network = MockNetwork::new(120);
        let mut wf = ready(100).await;
        wf.draft_payment(&form("10", DESTINATION)).unwrap();

        wf.fetch_ledger_state_with(&network).await.unwrap();
        assert_eq!(wf.stage(), WorkflowStage::LedgerStateFetched);
        assert_eq!(wf.ledger_state().unwrap().sequence, 120);
        assert_eq!(network.info_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ledger_state_for_another_account_is_reported() {
        let mut wf = PaymentWorkflow::default();
        let ticket = wf.begin_fetch_account();
        assert!(wf.finish_fetch_account(ticket, Ok(account())));

        let (ticket, _) = wf.begin_fetch_ledger_state().unwrap();
        let mut state = ledger_state(5);
        state.account = DESTINATION.into();
        assert!(wf.finish_fetch_ledger_state(ticket, Ok(state)));

        assert_eq!(wf.stage(), WorkflowStage::AccountFetched);
        assert!(wf.ledger_state().is_none());
        assert!(matches!(wf.error(), Some(WorkflowError::Validation(msg)) if msg.contains(DESTINATION)));
        assert!(!wf.is_busy());
    }

    #[tokio::test]
    async fn test_nft_mint_draft() {
        let mut wf = ready(7).await;
        wf.draft_nft_mint(&NftMintForm {
            uri: "ipfs://bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi".into(),
            taxon: "42".into(),
            transfer_fee: "2500".into(),
            transferable: true,
        })
        .unwrap();

        let draft = wf.draft().unwrap();
        assert_eq!(draft.transaction_type().unwrap(), TransactionType::NFTokenMint);
        assert_eq!(draft.uint32(Field::NFTokenTaxon), Some(42));
        assert_eq!(draft.uint32(Field::Flags), Some(NFT_FLAG_TRANSFERABLE));
        assert_eq!(draft.get(Field::TransferFee), Some(&FieldValue::UInt16(2500)));
        assert_eq!(draft.uint32(Field::LastLedgerSequence), Some(10_007));
        assert!(codec::encode_for_signing(draft).is_ok());
    }

    #[tokio::test]
    async fn test_nft_transfer_fee_requires_transferable() {
        let mut wf = ready(7).await;
        let err = wf
            .draft_nft_mint(&NftMintForm {
                transfer_fee: "100".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("transferable"));
        assert!(wf
            .draft_nft_mint(&NftMintForm {
                transfer_fee: "50001".into(),
                transferable: true,
                ..Default::default()
            })
            .is_err());
    }

    /// Device that never answers.
    struct SilentDevice;

    #[async_trait]
    impl XrpDevice for SilentDevice {
        async fn get_address(&self, _p: &str, _c: bool, _e: bool) -> Result<AddressDetails, SignerError> {
            std::future::pending().await
        }

        async fn sign(&self, _p: &str, _b: Vec<u8>, _e: bool) -> Result<Vec<u8>, SignerError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresponsive_device_leaves_state_unchanged() {
        let mut wf = ready(100).await;
        let before_account = wf.account().cloned();
        let before_state = wf.ledger_state().cloned();

        let silent = LedgerSigner::new(SilentDevice, Duration::from_millis(5_000));
        let err = wf.fetch_account_with(&silent, 1, 0).await.unwrap_err();

        assert_eq!(err, WorkflowError::UnresponsiveDevice);
        assert_eq!(wf.stage(), WorkflowStage::LedgerStateFetched);
        assert_eq!(wf.account().cloned(), before_account);
        assert_eq!(wf.ledger_state().cloned(), before_state);
        assert!(!wf.is_busy());
    }

    #[tokio::test]
    async fn test_missing_device_message() {
        let signer = MockSigner {
            account: Err(SignerError::DeviceUnavailable),
            ..MockSigner::ok()
        };
        let mut wf = PaymentWorkflow::default();
        assert_eq!(
            wf.fetch_account_with(&signer, 0, 0).await,
            Err(WorkflowError::DeviceUnavailable)
        );
        assert_eq!(wf.stage(), WorkflowStage::Idle);
    }

    #[tokio::test]
    async fn test_drafted_payment_round_trips_through_codec() {
        let mut wf = ready(100).await;
        wf.draft_payment(&form("10", "rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe"))
            .unwrap();
        let draft = wf.draft().unwrap();
        let decoded = codec::decode(&codec::encode(draft).unwrap()).unwrap();
        assert_eq!(&decoded, draft);
    }
}
