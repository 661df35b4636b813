//! Composite provider.
//!
//! A `Provider` holds a lifecycle handle plus whichever capability
//! implementations its chain offers. Callers ask for a capability and
//! get `None` when the chain has no such surface.

use crate::capability::{
    BridgeCapability, NftCapability, SmartContractCapability, StorageCapability,
    TransactionCapability,
};
use crate::lifecycle::ProviderLifecycle;
use crate::result::OperationResult;
use crate::types::{Capability, ProviderInfo, ProviderType};
use std::sync::Arc;

/// A provider assembled from independent capabilities.
#[derive(Clone)]
pub struct Provider {
    lifecycle: Arc<dyn ProviderLifecycle>,
    storage: Option<Arc<dyn StorageCapability>>,
    transactions: Option<Arc<dyn TransactionCapability>>,
    nfts: Option<Arc<dyn NftCapability>>,
    contracts: Option<Arc<dyn SmartContractCapability>>,
    bridge: Option<Arc<dyn BridgeCapability>>,
}

impl Provider {
    pub fn builder(lifecycle: Arc<dyn ProviderLifecycle>) -> ProviderBuilder {
        ProviderBuilder::new(lifecycle)
    }

    pub fn info(&self) -> &ProviderInfo {
        self.lifecycle.info()
    }

    pub fn provider_type(&self) -> ProviderType {
        self.lifecycle.provider_type()
    }

    pub fn lifecycle(&self) -> &dyn ProviderLifecycle {
        self.lifecycle.as_ref()
    }

    pub async fn activate(&self) -> OperationResult<bool> {
        self.lifecycle.activate().await
    }

    pub async fn deactivate(&self) -> OperationResult<bool> {
        self.lifecycle.deactivate().await
    }

    pub async fn is_activated(&self) -> bool {
        self.lifecycle.is_activated().await
    }

    pub fn storage(&self) -> Option<&dyn StorageCapability> {
        self.storage.as_deref()
    }

    pub fn transactions(&self) -> Option<&dyn TransactionCapability> {
        self.transactions.as_deref()
    }

    pub fn nfts(&self) -> Option<&dyn NftCapability> {
        self.nfts.as_deref()
    }

    pub fn contracts(&self) -> Option<&dyn SmartContractCapability> {
        self.contracts.as_deref()
    }

    pub fn bridge(&self) -> Option<&dyn BridgeCapability> {
        self.bridge.as_deref()
    }

    /// Capabilities this provider offers.
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut caps = Vec::new();
        if self.storage.is_some() {
            caps.push(Capability::new("storage", "Avatar and holon persistence"));
        }
        if self.transactions.is_some() {
            caps.push(Capability::new("transactions", "Value transfers and lookups"));
        }
        if self.nfts.is_some() {
            caps.push(Capability::new("nft", "Mint, transfer and load NFTs"));
        }
        if self.contracts.is_some() {
            caps.push(Capability::new("smart_contract", "Arbitrary contract calls"));
        }
        if self.bridge.is_some() {
            caps.push(Capability::new("bridge", "Cross-chain deposits and withdrawals"));
        }
        caps
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities().iter().any(|c| c.name == name)
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.capabilities().into_iter().map(|c| c.name).collect();
        f.debug_struct("Provider")
            .field("provider", &self.provider_type())
            .field("capabilities", &names)
            .finish()
    }
}

/// Builder for `Provider`.
pub struct ProviderBuilder {
    provider: Provider,
}

impl ProviderBuilder {
    pub fn new(lifecycle: Arc<dyn ProviderLifecycle>) -> Self {
        Self {
            provider: Provider {
                lifecycle,
                storage: None,
                transactions: None,
                nfts: None,
                contracts: None,
                bridge: None,
            },
        }
    }

    pub fn storage(mut self, storage: Arc<dyn StorageCapability>) -> Self {
        self.provider.storage = Some(storage);
        self
    }

    pub fn transactions(mut self, transactions: Arc<dyn TransactionCapability>) -> Self {
        self.provider.transactions = Some(transactions);
        self
    }

    pub fn nfts(mut self, nfts: Arc<dyn NftCapability>) -> Self {
        self.provider.nfts = Some(nfts);
        self
    }

    pub fn contracts(mut self, contracts: Arc<dyn SmartContractCapability>) -> Self {
        self.provider.contracts = Some(contracts);
        self
    }

    pub fn bridge(mut self, bridge: Arc<dyn BridgeCapability>) -> Self {
        self.provider.bridge = Some(bridge);
        self
    }

    pub fn build(self) -> Provider {
        self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::errors::ProviderResult;
    use crate::lifecycle::{delegate_lifecycle, AdapterCore, Connect};
    use async_trait::async_trait;

    struct Always;

    #[async_trait]
    impl Connect for Always {
        type Client = ();

        async fn connect(&self, _config: &ProviderConfig) -> ProviderResult<()> {
            Ok(())
        }
    }

    struct StorageOnly {
        core: AdapterCore<Always>,
    }

    delegate_lifecycle!(StorageOnly);

    impl StorageCapability for StorageOnly {}

    #[tokio::test]
    async fn test_capability_queries() {
        let adapter = Arc::new(StorageOnly {
            core: AdapterCore::new(
                ProviderInfo::new(ProviderType::Aztec, "Aztec", "test"),
                ProviderConfig::new("http://localhost:1", "sandbox"),
                Always,
            ),
        });
        let provider = Provider::builder(adapter.clone()).storage(adapter).build();

        assert!(provider.storage().is_some());
        assert!(provider.transactions().is_none());
        assert!(provider.bridge().is_none());
        assert!(provider.has_capability("storage"));
        assert!(!provider.has_capability("nft"));
        assert_eq!(provider.provider_type(), ProviderType::Aztec);

        assert!(provider.activate().await.is_success());
        assert!(provider.is_activated().await);
    }
}
