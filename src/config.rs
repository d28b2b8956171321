use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;
use url::Url;

/// Network category for grouping in the UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkCategory {
    Mainnet,
    Testnet,
}

/// A public XRPL network with its JSON-RPC endpoint and explorer.
#[derive(Clone, Debug)]
pub struct XrplNetwork {
    pub key: &'static str,
    pub label: &'static str,
    pub default_rpc: &'static str,
    pub explorer: &'static str,
    pub category: NetworkCategory,
}

impl XrplNetwork {
    pub const fn new(
        key: &'static str,
        label: &'static str,
        default_rpc: &'static str,
        explorer: &'static str,
        category: NetworkCategory,
    ) -> Self {
        Self {
            key,
            label,
            default_rpc,
            explorer,
            category,
        }
    }
}

use NetworkCategory::*;

/// Public XRPL networks reachable without an API key.
pub const NETWORKS: &[XrplNetwork] = &[
    XrplNetwork::new("mainnet", "XRPL Mainnet", "https://s1.ripple.com:51234/", "https://livenet.xrpl.org", Mainnet),
    XrplNetwork::new("testnet", "XRPL Testnet", "https://s.altnet.rippletest.net:51234/", "https://testnet.xrpl.org", Testnet),
    XrplNetwork::new("devnet", "XRPL Devnet", "https://s.devnet.rippletest.net:51234/", "https://devnet.xrpl.org", Testnet),
];

/// Find a network by its short key ("mainnet", "testnet", "devnet")
pub fn find_network(key: &str) -> Option<&'static XrplNetwork> {
    let key = key.trim();
    NETWORKS.iter().find(|n| n.key.eq_ignore_ascii_case(key))
}

/// Find the index of a network in NETWORKS by key
pub fn find_network_index(key: &str) -> Option<usize> {
    NETWORKS.iter().position(|n| n.key.eq_ignore_ascii_case(key.trim()))
}

/// Get the full URL to view a transaction on the network's explorer
pub fn get_tx_explorer_url(network_key: &str, tx_hash: &str) -> Option<String> {
    find_network(network_key).map(|n| format!("{}/transactions/{}", n.explorer, tx_hash))
}

/// Get the full URL to view an account on the network's explorer
pub fn get_account_explorer_url(network_key: &str, address: &str) -> Option<String> {
    find_network(network_key).map(|n| format!("{}/accounts/{}", n.explorer, address))
}

/// SLIP-44 coin type for XRP
pub const XRP_COIN_TYPE: u32 = 144;

/// Fee attached to drafted transactions, in drops
pub const DEFAULT_FEE_DROPS: u64 = 12;

/// Offset added to the account sequence to form LastLedgerSequence
pub const LAST_LEDGER_OFFSET: u32 = 10_000;

/// How long the device gets to answer an address query
pub const DEVICE_TIMEOUT_MS: u64 = 5_000;

/// How long submit-and-wait polls for validation before giving up
pub const DEFAULT_VALIDATION_TIMEOUT_SECS: u64 = 120;

/// Delay between `tx` polls while waiting for validation
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// BIP-44 path for an XRP key, in the form the XRP app expects (no `m/`).
pub fn derivation_path(account_index: u32, key_index: u32) -> String {
    format!("44'/{}'/{}'/0/{}", XRP_COIN_TYPE, account_index, key_index)
}

#[derive(Clone, Debug)]
pub struct Config {
    pub network_key: String,
    pub rpc_url: String,
    pub fee_drops: u64,
    pub account_index: u32,
    pub key_index: u32,
    pub device_timeout: Duration,
    pub validation_timeout: Duration,
    pub poll_interval: Duration,
    // Override for custom endpoints
    pub label_override: Option<String>,
}

impl Config {
    pub fn new(rpc_url: String, network_key: &str) -> Self {
        Self {
            network_key: network_key.to_string(),
            rpc_url,
            fee_drops: DEFAULT_FEE_DROPS,
            account_index: 0,
            key_index: 0,
            device_timeout: Duration::from_millis(DEVICE_TIMEOUT_MS),
            validation_timeout: Duration::from_secs(DEFAULT_VALIDATION_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            label_override: None,
        }
    }

    pub fn from_network(network: &XrplNetwork) -> Self {
        Self::new(network.default_rpc.to_string(), network.key)
    }

    /// Build a config from the process environment (after `.env` has been loaded)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key/value source; unparsable values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let network = lookup("XRPL_NETWORK")
            .and_then(|key| {
                let found = find_network(&key);
                if found.is_none() {
                    tracing::warn!("Unknown XRPL_NETWORK '{}', using mainnet", key);
                }
                found
            })
            .unwrap_or(&NETWORKS[0]);

        let mut config = Self::from_network(network);

        if let Some(url) = lookup("XRPL_RPC_URL").filter(|u| !u.trim().is_empty()) {
            config.rpc_url = url.trim().to_string();
            config.label_override = Some(format!("{} (custom RPC)", network.label));
        }
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        if let Some(fee) = parsed("XRPL_FEE_DROPS") {
            config.fee_drops = fee;
        }
        if let Some(index) = lookup("LEDGER_ACCOUNT_INDEX").and_then(|v| v.trim().parse().ok()) {
            config.account_index = index;
        }
        if let Some(index) = lookup("LEDGER_KEY_INDEX").and_then(|v| v.trim().parse().ok()) {
            config.key_index = index;
        }
        if let Some(ms) = parsed("LEDGER_TIMEOUT_MS") {
            config.device_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = parsed("XRPL_VALIDATION_TIMEOUT_SECS") {
            config.validation_timeout = Duration::from_secs(secs);
        }
        config
    }

    /// Derivation path for the currently selected account/key index
    pub fn get_derivation_path(&self) -> String {
        derivation_path(self.account_index, self.key_index)
    }

    pub fn network_label(&self) -> &str {
        if let Some(ref label) = self.label_override {
            label.as_str()
        } else {
            find_network(&self.network_key)
                .map(|n| n.label)
                .unwrap_or("Unknown")
        }
    }

    /// Validated RPC endpoint
    pub fn endpoint(&self) -> Result<Url> {
        let url = Url::parse(self.rpc_url.trim())
            .map_err(|e| anyhow!("Invalid RPC URL '{}': {}", self.rpc_url, e))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(anyhow!("Unsupported RPC scheme '{}', expected http(s)", other)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_network(&NETWORKS[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_find_network_case_insensitive() {
        assert_eq!(find_network("Testnet").unwrap().key, "testnet");
        assert!(find_network("betanet").is_none());
        assert_eq!(find_network_index("devnet"), Some(2));
    }

    #[test]
    fn test_explorer_urls() {
        assert_eq!(
            get_tx_explorer_url("mainnet", "ABC").as_deref(),
            Some("https://livenet.xrpl.org/transactions/ABC")
        );
        assert_eq!(
            get_account_explorer_url("testnet", "rXYZ").as_deref(),
            Some("https://testnet.xrpl.org/accounts/rXYZ")
        );
        assert!(get_tx_explorer_url("nowhere", "ABC").is_none());
    }

    #[test]
    fn test_derivation_path_format() {
        assert_eq!(derivation_path(0, 0), "44'/144'/0'/0/0");
        assert_eq!(derivation_path(3, 7), "44'/144'/3'/0/7");
    }

    #[test]
    fn test_default_is_mainnet_with_fixed_constants() {
        let config = Config::default();
        assert_eq!(config.network_key, "mainnet");
        assert_eq!(config.rpc_url, "https://s1.ripple.com:51234/");
        assert_eq!(config.fee_drops, 12);
        assert_eq!(config.device_timeout, Duration::from_millis(5_000));
        assert_eq!(config.network_label(), "XRPL Mainnet");
        assert_eq!(config.get_derivation_path(), "44'/144'/0'/0/0");
    }

    #[test]
    fn test_lookup_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("XRPL_NETWORK", "testnet"),
            ("XRPL_FEE_DROPS", "15"),
            ("LEDGER_ACCOUNT_INDEX", "2"),
            ("LEDGER_KEY_INDEX", "1"),
            ("XRPL_VALIDATION_TIMEOUT_SECS", "30"),
        ]));
        assert_eq!(config.network_key, "testnet");
        assert_eq!(config.rpc_url, "https://s.altnet.rippletest.net:51234/");
        assert_eq!(config.fee_drops, 15);
        assert_eq!(config.get_derivation_path(), "44'/144'/2'/0/1");
        assert_eq!(config.validation_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_custom_rpc_sets_label_override() {
        let config = Config::from_lookup(lookup_from(&[("XRPL_RPC_URL", " http://localhost:5005/ ")]));
        assert_eq!(config.rpc_url, "http://localhost:5005/");
        assert_eq!(config.network_label(), "XRPL Mainnet (custom RPC)");
        assert!(config.endpoint().is_ok());
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("XRPL_NETWORK", "moonnet"),
            ("XRPL_FEE_DROPS", "cheap"),
        ]));
        assert_eq!(config.network_key, "mainnet");
        assert_eq!(config.fee_drops, DEFAULT_FEE_DROPS);
    }

    #[test]
    fn test_endpoint_rejects_websocket_scheme() {
        let config = Config::new("wss://s1.ripple.com/".to_string(), "mainnet");
        assert!(config.endpoint().is_err());
    }
}
