//! Provider configuration.
//!
//! A `ProviderConfig` is built once, moved into an adapter, and never
//! mutated afterwards. Chain-specific extras live in `options`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default Aptos fullnode REST endpoint
pub const APTOS_DEFAULT_ENDPOINT: &str = "https://fullnode.mainnet.aptoslabs.com/v1";

/// Default Aztec API endpoint when `AZTEC_API_URL` is unset
pub const AZTEC_DEFAULT_ENDPOINT: &str = "http://localhost:8080";

/// Default Aztec bridge service when `AZTEC_BRIDGE_SERVICE_URL` is unset
pub const AZTEC_DEFAULT_BRIDGE_SERVICE: &str = "http://localhost:3002";

/// Option keys understood by the adapters.
pub mod keys {
    /// Aztec: base URL of the Node bridge service
    pub const BRIDGE_SERVICE_URL: &str = "bridge_service_url";
    /// Aztec: wallet account alias used by the bridge service
    pub const ACCOUNT_ALIAS: &str = "account_alias";
    /// Aztec: deployed bridge contract
    pub const BRIDGE_CONTRACT_ADDRESS: &str = "bridge_contract_address";
    /// Aztec: deployed stablecoin contract
    pub const STABLECOIN_CONTRACT_ADDRESS: &str = "stablecoin_contract_address";
}

/// Private key material. `Debug` never prints the key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the raw key. Only signers should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey(<redacted>)")
    }
}

/// Configuration for one provider instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// RPC / REST endpoint URL
    pub endpoint: String,

    /// Network identifier (mainnet, sandbox, ...)
    pub network: String,

    /// Chain private key (Ethereum activation requires it)
    #[serde(skip_serializing)]
    pub private_key: Option<SecretKey>,

    /// Contract the adapter stores records in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,

    /// Account the node manages for unsigned submissions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_address: Option<String>,

    /// EVM chain id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,

    /// API key sent as `x-api-key`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout. `None` keeps the transport default.
    #[serde(skip)]
    pub timeout: Option<Duration>,

    /// Custom options (chain-specific)
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

impl ProviderConfig {
    /// Create a config for an endpoint and network
    pub fn new(endpoint: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            network: network.into(),
            private_key: None,
            contract_address: None,
            account_address: None,
            chain_id: None,
            api_key: None,
            timeout: None,
            options: HashMap::new(),
        }
    }

    /// Aptos mainnet fullnode
    pub fn aptos() -> Self {
        Self::new(APTOS_DEFAULT_ENDPOINT, "mainnet")
    }

    /// Ethereum node with the storage contract
    pub fn ethereum(
        host: impl Into<String>,
        private_key: impl Into<String>,
        chain_id: u64,
        contract_address: impl Into<String>,
    ) -> Self {
        let network = match chain_id {
            1 => "mainnet",
            11155111 => "sepolia",
            17000 => "holesky",
            _ => "custom",
        };
        Self::new(host, network)
            .with_private_key(private_key)
            .with_chain_id(chain_id)
            .with_contract_address(contract_address)
    }

    /// Aztec sandbox, reading `AZTEC_API_URL`, `AZTEC_API_KEY` and
    /// `AZTEC_BRIDGE_SERVICE_URL` from the environment.
    pub fn aztec_from_env() -> Self {
        let endpoint =
            std::env::var("AZTEC_API_URL").unwrap_or_else(|_| AZTEC_DEFAULT_ENDPOINT.to_string());
        let bridge = std::env::var("AZTEC_BRIDGE_SERVICE_URL")
            .unwrap_or_else(|_| AZTEC_DEFAULT_BRIDGE_SERVICE.to_string());

        let mut config = Self::new(endpoint, "sandbox").option(keys::BRIDGE_SERVICE_URL, bridge);
        if let Ok(api_key) = std::env::var("AZTEC_API_KEY") {
            config = config.with_api_key(api_key);
        }
        config
    }

    /// Set the private key
    pub fn with_private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(SecretKey::new(key));
        self
    }

    /// Set the contract address
    pub fn with_contract_address(mut self, address: impl Into<String>) -> Self {
        self.contract_address = Some(address.into());
        self
    }

    /// Set the node-managed account address
    pub fn with_account_address(mut self, address: impl Into<String>) -> Self {
        self.account_address = Some(address.into());
        self
    }

    /// Set the chain id
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the network name
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    /// Add a custom option
    pub fn option(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.options.insert(key.into(), v);
        }
        self
    }

    /// Get a custom option
    pub fn get_option<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.options
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Endpoint without a trailing slash
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}
