//! Ledger Network Client: JSON-RPC against a public XRPL server.
//!
//! Every call opens its own HTTP client and drops it when the call returns,
//! so nothing stays connected between user actions.

use crate::codec::{self, Field, FieldValue, Transaction};
use crate::config::Config;
use crate::error::NetworkError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Per-request HTTP timeout
const REQUEST_TIMEOUT_SECS: u64 = 20;

/// Snapshot of an account as of the latest validated ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountLedgerState {
    pub account: String,
    pub sequence: u32,
    pub balance_drops: u64,
    pub owner_count: u32,
    pub flags: u32,
    pub ledger_index: Option<u32>,
    pub validated: bool,
    /// `account_data` exactly as the server returned it
    pub account_data: Value,
}

impl AccountLedgerState {
    pub fn balance_xrp(&self) -> String {
        format_drops(self.balance_drops)
    }
}

/// Outcome of a submitted transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionResult {
    pub engine_result: String,
    pub engine_result_message: String,
    pub hash: String,
    pub validated: bool,
    pub ledger_index: Option<u32>,
    /// `TransactionResult` from the validated metadata
    pub transaction_result: Option<String>,
    pub meta: Value,
    /// Server warnings attached to the submit response
    pub warnings: Vec<String>,
}

impl SubmissionResult {
    pub fn succeeded(&self) -> bool {
        self.validated && self.transaction_result.as_deref() == Some("tesSUCCESS")
    }
}

/// Connectivity summary from `server_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub build_version: String,
    pub server_state: String,
    pub validated_ledger: Option<u32>,
}

/// What the workflow needs from the network.
#[async_trait]
pub trait LedgerNetwork: Send + Sync {
    async fn get_account_info(&self, address: &str) -> Result<AccountLedgerState, NetworkError>;

    /// Attach `signature`, submit, and wait until the result is final.
    async fn submit_and_wait(
        &self,
        prepared: &Transaction,
        signature: &[u8],
    ) -> Result<SubmissionResult, NetworkError>;

    async fn server_info(&self) -> Result<ServerStatus, NetworkError>;
}

/// One JSON-RPC round trip, returning the `result` object.
#[async_trait]
pub trait JsonRpc: Send + Sync {
    async fn call(&self, method: &'static str, params: Value) -> Result<Value, NetworkError>;
}

/// JSON-RPC over HTTP(S) with reqwest.
#[derive(Debug, Clone)]
pub struct HttpJsonRpc {
    endpoint: Url,
}

impl HttpJsonRpc {
    pub fn new(endpoint: Url) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl JsonRpc for HttpJsonRpc {
    async fn call(&self, method: &'static str, params: Value) -> Result<Value, NetworkError> {
        let url = self.endpoint.to_string();
        let connection = |reason: String| NetworkError::Connection {
            url: url.clone(),
            reason,
        };

        // Scoped to this call; dropped (and its sockets closed) on return
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| connection(e.to_string()))?;

        debug!("RPC {} -> {}", method, url);
        let body: Value = client
            .post(self.endpoint.clone())
            .json(&json!({ "method": method, "params": [params] }))
            .send()
            .await
            .map_err(|e| connection(e.to_string()))?
            .error_for_status()
            .map_err(|e| connection(e.to_string()))?
            .json()
            .await
            .map_err(|e| NetworkError::Malformed {
                command: method,
                reason: e.to_string(),
            })?;

        unwrap_result(method, body)
    }
}

/// Pull `result` out of a response envelope, turning `status: error` into an error.
fn unwrap_result(method: &'static str, body: Value) -> Result<Value, NetworkError> {
    let result = match body {
        Value::Object(mut map) => map.remove("result").ok_or_else(|| NetworkError::Malformed {
            command: method,
            reason: "missing result".into(),
        })?,
        _ => {
            return Err(NetworkError::Malformed {
                command: method,
                reason: "response is not an object".into(),
            })
        }
    };

    let is_error = result.get("status").and_then(Value::as_str) == Some("error")
        || result.get("error").is_some();
    if is_error {
        return Err(NetworkError::Rpc {
            command: method,
            code: result
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            message: result
                .get("error_message")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }
    Ok(result)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccountRoot {
    account: String,
    balance: String,
    sequence: u32,
    #[serde(default)]
    owner_count: u32,
    #[serde(default)]
    flags: u32,
}

fn parse_account_info(result: &Value) -> Result<AccountLedgerState, NetworkError> {
    let malformed = |reason: String| NetworkError::Malformed {
        command: "account_info",
        reason,
    };
    let account_data = result
        .get("account_data")
        .cloned()
        .ok_or_else(|| malformed("missing account_data".into()))?;
    let root: AccountRoot =
        serde_json::from_value(account_data.clone()).map_err(|e| malformed(e.to_string()))?;
    let balance_drops = root
        .balance
        .parse()
        .map_err(|_| malformed(format!("bad balance '{}'", root.balance)))?;

    Ok(AccountLedgerState {
        account: root.account,
        sequence: root.sequence,
        balance_drops,
        owner_count: root.owner_count,
        flags: root.flags,
        ledger_index: result
            .get("ledger_index")
            .and_then(Value::as_u64)
            .and_then(|i| u32::try_from(i).ok()),
        validated: result
            .get("validated")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        account_data,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Preliminary {
    engine_result: String,
    engine_result_message: String,
    hash: Option<String>,
    warnings: Vec<String>,
}

impl Preliminary {
    /// Malformed or failed to apply: will never make it into a ledger
    fn is_final_failure(&self) -> bool {
        self.engine_result.starts_with("tem") || self.engine_result.starts_with("tef")
    }
}

fn parse_submit(result: &Value) -> Result<Preliminary, NetworkError> {
    let engine_result = result
        .get("engine_result")
        .and_then(Value::as_str)
        .ok_or_else(|| NetworkError::Malformed {
            command: "submit",
            reason: "missing engine_result".into(),
        })?;
    Ok(Preliminary {
        engine_result: engine_result.to_string(),
        engine_result_message: result
            .get("engine_result_message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        hash: result
            .pointer("/tx_json/hash")
            .and_then(Value::as_str)
            .map(str::to_string),
        warnings: parse_warnings(result),
    })
}

/// `warnings: [{id, message}]` as plain messages
fn parse_warnings(result: &Value) -> Vec<String> {
    result
        .get("warnings")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|w| w.get("message").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
enum TxStatus {
    Pending,
    Validated {
        ledger_index: Option<u32>,
        transaction_result: Option<String>,
        meta: Value,
    },
}

fn parse_tx(result: &Value) -> TxStatus {
    if result.get("validated").and_then(Value::as_bool) != Some(true) {
        return TxStatus::Pending;
    }
    let meta = result.get("meta").cloned().unwrap_or(Value::Null);
    TxStatus::Validated {
        ledger_index: result
            .get("ledger_index")
            .and_then(Value::as_u64)
            .and_then(|i| u32::try_from(i).ok()),
        transaction_result: meta
            .get("TransactionResult")
            .and_then(Value::as_str)
            .map(str::to_string),
        meta,
    }
}

fn parse_server_info(result: &Value) -> ServerStatus {
    let info = result.get("info").cloned().unwrap_or(Value::Null);
    let text = |key: &str| {
        info.get(key)
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string()
    };
    ServerStatus {
        build_version: text("build_version"),
        server_state: text("server_state"),
        validated_ledger: info
            .pointer("/validated_ledger/seq")
            .and_then(Value::as_u64)
            .and_then(|s| u32::try_from(s).ok()),
    }
}

/// Format drops as XRP without trailing zeros
pub fn format_drops(drops: u64) -> String {
    let whole = drops / codec::DROPS_PER_XRP;
    let frac = drops % codec::DROPS_PER_XRP;
    if frac == 0 {
        whole.to_string()
    } else {
        let frac = format!("{:06}", frac);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }
}

/// XRPL client on top of any JSON-RPC transport.
pub struct XrplClient<R: JsonRpc> {
    rpc: R,
    validation_timeout: Duration,
    poll_interval: Duration,
}

impl XrplClient<HttpJsonRpc> {
    /// Client for the endpoint and timings in `config`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(HttpJsonRpc::new(config.endpoint()?))
            .with_timing(config.validation_timeout, config.poll_interval))
    }
}

impl<R: JsonRpc> XrplClient<R> {
    pub fn new(rpc: R) -> Self {
        Self {
            rpc,
            validation_timeout: Duration::from_secs(crate::config::DEFAULT_VALIDATION_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(crate::config::DEFAULT_POLL_INTERVAL_MS),
        }
    }

    pub fn with_timing(mut self, validation_timeout: Duration, poll_interval: Duration) -> Self {
        self.validation_timeout = validation_timeout;
        self.poll_interval = poll_interval;
        self
    }

    async fn latest_validated_ledger(&self) -> Result<Option<u32>, NetworkError> {
        let result = self.rpc.call("server_info", json!({})).await?;
        Ok(parse_server_info(&result).validated_ledger)
    }

    async fn wait_for_validation(
        &self,
        hash: &str,
        last_ledger_sequence: Option<u32>,
        preliminary: Preliminary,
    ) -> Result<SubmissionResult, NetworkError> {
        let deadline = Instant::now() + self.validation_timeout;
        loop {
            tokio::time::sleep(self.poll_interval).await;

            let status = match self
                .rpc
                .call("tx", json!({ "transaction": hash, "binary": false }))
                .await
            {
                Ok(result) => parse_tx(&result),
                Err(NetworkError::Rpc { code, .. }) if code == "txnNotFound" => TxStatus::Pending,
                Err(e) => return Err(e),
            };

            if let TxStatus::Validated {
                ledger_index,
                transaction_result,
                meta,
            } = status
            {
                info!(
                    "Transaction {} validated in ledger {:?}: {:?}",
                    hash, ledger_index, transaction_result
                );
                return Ok(SubmissionResult {
                    engine_result: preliminary.engine_result,
                    engine_result_message: preliminary.engine_result_message,
                    hash: hash.to_string(),
                    validated: true,
                    ledger_index,
                    transaction_result,
                    meta,
                    warnings: preliminary.warnings,
                });
            }

            if let Some(last) = last_ledger_sequence {
                if let Some(latest) = self.latest_validated_ledger().await? {
                    if latest > last {
                        warn!("Transaction {} expired at ledger {}", hash, latest);
                        return Err(NetworkError::Expired {
                            latest,
                            last_ledger_sequence: last,
                        });
                    }
                }
            }

            if Instant::now() >= deadline {
                return Err(NetworkError::ValidationTimeout {
                    hash: hash.to_string(),
                    secs: self.validation_timeout.as_secs(),
                });
            }
        }
    }
}

#[async_trait]
impl<R: JsonRpc> LedgerNetwork for XrplClient<R> {
    async fn get_account_info(&self, address: &str) -> Result<AccountLedgerState, NetworkError> {
        info!("Fetching account info for {}", address);
        let result = self
            .rpc
            .call(
                "account_info",
                json!({ "account": address, "ledger_index": "validated" }),
            )
            .await?;
        let state = parse_account_info(&result)?;
        debug!(
            "{}: sequence {}, balance {} XRP",
            state.account,
            state.sequence,
            state.balance_xrp()
        );
        Ok(state)
    }

    async fn submit_and_wait(
        &self,
        prepared: &Transaction,
        signature: &[u8],
    ) -> Result<SubmissionResult, NetworkError> {
        let mut signed = prepared.clone();
        signed.set(Field::TxnSignature, FieldValue::Blob(signature.to_vec()));
        let blob = codec::encode(&signed)?;
        let local_hash = codec::transaction_hash(&blob);

        info!("Submitting transaction {}", local_hash);
        let result = self
            .rpc
            .call("submit", json!({ "tx_blob": hex::encode_upper(&blob) }))
            .await?;
        let preliminary = parse_submit(&result)?;
        for warning in &preliminary.warnings {
            warn!("Server warning: {}", warning);
        }
        info!(
            "Preliminary result: {} ({})",
            preliminary.engine_result, preliminary.engine_result_message
        );

        if preliminary.is_final_failure() {
            return Err(NetworkError::Rejected {
                engine_result: preliminary.engine_result,
                message: preliminary.engine_result_message,
            });
        }

        let hash = preliminary.hash.clone().unwrap_or(local_hash);
        let last_ledger = prepared.uint32(Field::LastLedgerSequence);
        self.wait_for_validation(&hash, last_ledger, preliminary)
            .await
    }

    async fn server_info(&self) -> Result<ServerStatus, NetworkError> {
        let result = self.rpc.call("server_info", json!({})).await?;
        Ok(parse_server_info(&result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TransactionType;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Plays back canned `result` objects (or errors) per method.
    struct ScriptedRpc {
        calls: Mutex<Vec<(&'static str, Value)>>,
        replies: Mutex<VecDeque<(&'static str, Result<Value, NetworkError>)>>,
    }

    impl ScriptedRpc {
        fn new(replies: Vec<(&'static str, Result<Value, NetworkError>)>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(replies.into()),
            }
        }

        fn methods(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().iter().map(|(m, _)| *m).collect()
        }
    }

    #[async_trait]
    impl JsonRpc for ScriptedRpc {
        async fn call(&self, method: &'static str, params: Value) -> Result<Value, NetworkError> {
            self.calls.lock().unwrap().push((method, params));
            let (expected, reply) = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected RPC call");
            assert_eq!(expected, method);
            reply
        }
    }

    fn not_found() -> Result<Value, NetworkError> {
        Err(NetworkError::Rpc {
            command: "tx",
            code: "txnNotFound".into(),
            message: Some("Transaction not found.".into()),
        })
    }

    fn prepared() -> Transaction {
        Transaction::new(TransactionType::Payment)
            .with(
                Field::Account,
                FieldValue::Account("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh".into()),
            )
            .with(
                Field::Destination,
                FieldValue::Account("rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe".into()),
            )
            .with(Field::Amount, FieldValue::Drops(10_000_000))
            .with(Field::Fee, FieldValue::Drops(12))
            .with(Field::Sequence, FieldValue::UInt32(100))
            .with(Field::LastLedgerSequence, FieldValue::UInt32(10_100))
    }

    fn client(rpc: ScriptedRpc) -> XrplClient<ScriptedRpc> {
        XrplClient::new(rpc).with_timing(Duration::from_secs(10), Duration::from_secs(1))
    }

    #[test]
    fn test_unwrap_result_surfaces_rpc_error() {
        let body = json!({
            "result": {
                "error": "actNotFound",
                "error_message": "Account not found.",
                "status": "error"
            }
        });
        let err = unwrap_result("account_info", body).unwrap_err();
        assert_eq!(err.to_string(), "account_info failed: actNotFound (Account not found.)");

        assert!(matches!(
            unwrap_result("account_info", json!([1, 2])),
            Err(NetworkError::Malformed { .. })
        ));
    }

    #[test]
    fn test_parse_account_info() {
        let result = json!({
            "account_data": {
                "Account": "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh",
                "Balance": "25000000",
                "Flags": 0,
                "LedgerEntryType": "AccountRoot",
                "OwnerCount": 2,
                "Sequence": 100
            },
            "ledger_index": 86_000_000u64,
            "status": "success",
            "validated": true
        });
        let state = parse_account_info(&result).unwrap();
        assert_eq!(state.sequence, 100);
        assert_eq!(state.balance_drops, 25_000_000);
        assert_eq!(state.owner_count, 2);
        assert_eq!(state.ledger_index, Some(86_000_000));
        assert!(state.validated);
        assert_eq!(state.balance_xrp(), "25");
        assert_eq!(state.account_data["LedgerEntryType"], "AccountRoot");
    }

    #[test]
    fn test_parse_account_info_missing_data() {
        assert!(matches!(
            parse_account_info(&json!({ "validated": true })),
            Err(NetworkError::Malformed { .. })
        ));
    }

    #[test]
    fn test_out_of_range_ledger_index_is_dropped() {
        let result = json!({
            "account_data": { "Account": "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh", "Balance": "1", "Sequence": 1 },
            "ledger_index": 4_294_967_296u64,
            "validated": true
        });
        assert_eq!(parse_account_info(&result).unwrap().ledger_index, None);

        let status = parse_server_info(&json!({
            "info": { "validated_ledger": { "seq": 8_589_934_593u64 } }
        }));
        assert_eq!(status.validated_ledger, None);
    }

    #[test]
    fn test_format_drops() {
        assert_eq!(format_drops(0), "0");
        assert_eq!(format_drops(12), "0.000012");
        assert_eq!(format_drops(1_500_000), "1.5");
    }

    #[test]
    fn test_submit_warnings_are_kept() {
        let preliminary = parse_submit(&json!({
            "engine_result": "terQUEUED",
            "warnings": [{ "id": 1004, "message": "This is a reporting server." }]
        }))
        .unwrap();
        assert_eq!(preliminary.warnings, vec!["This is a reporting server.".to_string()]);
        assert!(!preliminary.is_final_failure());
    }

    #[test]
    fn test_parse_server_info() {
        let status = parse_server_info(&json!({
            "info": {
                "build_version": "2.2.0",
                "server_state": "full",
                "validated_ledger": { "seq": 90_000_000u64 }
            }
        }));
        assert_eq!(status.server_state, "full");
        assert_eq!(status.validated_ledger, Some(90_000_000));
    }

    #[tokio::test]
    async fn test_get_account_info_requests_validated_ledger() {
        let rpc = ScriptedRpc::new(vec![(
            "account_info",
            Ok(json!({
                "account_data": {
                    "Account": "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh",
                    "Balance": "1000",
                    "Sequence": 7
                },
                "validated": true
            })),
        )]);
        let client = client(rpc);
        let state = client
            .get_account_info("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh")
            .await
            .unwrap();
        assert_eq!(state.sequence, 7);

        let calls = client.rpc.calls.lock().unwrap();
        assert_eq!(calls[0].1["ledger_index"], "validated");
        assert_eq!(calls[0].1["account"], "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh");
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_and_wait_until_validated() {
        let rpc = ScriptedRpc::new(vec![
            (
                "submit",
                Ok(json!({
                    "engine_result": "tesSUCCESS",
                    "engine_result_message": "The transaction was applied.",
                    "tx_json": { "hash": "ABCD" }
                })),
            ),
            ("tx", not_found()),
            ("server_info", Ok(json!({ "info": { "validated_ledger": { "seq": 10_050 } } }))),
            (
                "tx",
                Ok(json!({
                    "validated": true,
                    "ledger_index": 10_051,
                    "meta": { "TransactionResult": "tesSUCCESS" }
                })),
            ),
        ]);
        let client = client(rpc);
        let result = client.submit_and_wait(&prepared(), &[0x30, 0x44]).await.unwrap();

        assert!(result.succeeded());
        assert_eq!(result.hash, "ABCD");
        assert_eq!(result.ledger_index, Some(10_051));
        assert_eq!(result.engine_result, "tesSUCCESS");

        let calls = client.rpc.calls.lock().unwrap();
        let blob = hex::decode(calls[0].1["tx_blob"].as_str().unwrap()).unwrap();
        let submitted = codec::decode(&blob).unwrap();
        assert_eq!(
            submitted.get(Field::TxnSignature),
            Some(&FieldValue::Blob(vec![0x30, 0x44]))
        );
        assert_eq!(calls[1].1["transaction"], "ABCD");
    }

    #[tokio::test]
    async fn test_malformed_preliminary_result_fails_fast() {
        let rpc = ScriptedRpc::new(vec![(
            "submit",
            Ok(json!({
                "engine_result": "temBAD_FEE",
                "engine_result_message": "Invalid fee, negative or not XRP."
            })),
        )]);
        let client = client(rpc);
        let err = client.submit_and_wait(&prepared(), &[0x30]).await.unwrap_err();
        assert_eq!(
            err,
            NetworkError::Rejected {
                engine_result: "temBAD_FEE".into(),
                message: "Invalid fee, negative or not XRP.".into()
            }
        );
        assert_eq!(client.rpc.methods(), vec!["submit"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_when_ledger_passes_last_sequence() {
        let rpc = ScriptedRpc::new(vec![
            (
                "submit",
                Ok(json!({ "engine_result": "terQUEUED", "engine_result_message": "Held until escalated fee drops." })),
            ),
            ("tx", Ok(json!({ "validated": false }))),
            ("server_info", Ok(json!({ "info": { "validated_ledger": { "seq": 10_101 } } }))),
        ]);
        let client = client(rpc);
        let err = client.submit_and_wait(&prepared(), &[0x30]).await.unwrap_err();
        assert_eq!(
            err,
            NetworkError::Expired {
                latest: 10_101,
                last_ledger_sequence: 10_100
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_timeout() {
        let mut replies = vec![(
            "submit",
            Ok(json!({ "engine_result": "tesSUCCESS", "tx_json": { "hash": "FFFF" } })),
        )];
        for _ in 0..10 {
            replies.push(("tx", not_found()));
            replies.push(("server_info", Ok(json!({ "info": { "validated_ledger": { "seq": 100 } } }))));
        }
        let client = client(ScriptedRpc::new(replies));
        let err = client.submit_and_wait(&prepared(), &[0x30]).await.unwrap_err();
        assert_eq!(
            err,
            NetworkError::ValidationTimeout {
                hash: "FFFF".into(),
                secs: 10
            }
        );
    }
}
