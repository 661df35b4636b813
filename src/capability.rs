//! Capability traits.
//!
//! A provider implements only the capabilities its chain supports.
//! Every method has a default that activates the provider once and then
//! reports `UnsupportedOperation`, so an adapter overrides exactly the
//! operations it can perform.

use crate::entities::{
    AccountKeys, Avatar, BridgeStatus, BridgeTransaction, GeoQuery, Holon, HolonFilter,
    MintNftRequest, Nft, NftTransferRequest, SearchHit, SearchParams, SearchResults,
    TransactionReceipt, TransactionRequest,
};
use crate::errors::ProviderError;
use crate::keys::AvatarRef;
use crate::lifecycle::ProviderLifecycle;
use crate::result::{OperationResult, Provenance};
use crate::types::EntityId;
use async_trait::async_trait;

/// Activate once, then report `operation` as unsupported.
pub async fn unsupported<T: Send>(
    provider: &(impl ProviderLifecycle + ?Sized),
    operation: &str,
) -> OperationResult<T> {
    if let Err(err) = provider.ensure_activated().await {
        return OperationResult::error(err);
    }
    OperationResult::unsupported(provider.provider_type(), operation)
}

// ═══════════════════════════════════════════════════════════════════
// STORAGE
// ═══════════════════════════════════════════════════════════════════

/// Avatar and holon persistence.
#[async_trait]
pub trait StorageCapability: ProviderLifecycle {
    async fn load_avatar(&self, _id: EntityId) -> OperationResult<Avatar> {
        unsupported(self, "load_avatar").await
    }

    async fn load_avatar_by_provider_key(&self, _key: &str) -> OperationResult<Avatar> {
        unsupported(self, "load_avatar_by_provider_key").await
    }

    async fn load_avatar_by_username(&self, _username: &str) -> OperationResult<Avatar> {
        unsupported(self, "load_avatar_by_username").await
    }

    async fn load_avatar_by_email(&self, _email: &str) -> OperationResult<Avatar> {
        unsupported(self, "load_avatar_by_email").await
    }

    async fn load_all_avatars(&self) -> OperationResult<Vec<Avatar>> {
        unsupported(self, "load_all_avatars").await
    }

    async fn save_avatar(&self, _avatar: Avatar) -> OperationResult<Avatar> {
        unsupported(self, "save_avatar").await
    }

    async fn delete_avatar(&self, _id: EntityId) -> OperationResult<bool> {
        unsupported(self, "delete_avatar").await
    }

    async fn load_holon(&self, _id: EntityId) -> OperationResult<Holon> {
        unsupported(self, "load_holon").await
    }

    async fn load_holon_by_provider_key(&self, _key: &str) -> OperationResult<Holon> {
        unsupported(self, "load_holon_by_provider_key").await
    }

    async fn load_holons_for_parent(
        &self,
        _parent: EntityId,
        _filter: HolonFilter,
    ) -> OperationResult<Vec<Holon>> {
        unsupported(self, "load_holons_for_parent").await
    }

    async fn load_all_holons(&self, _filter: HolonFilter) -> OperationResult<Vec<Holon>> {
        unsupported(self, "load_all_holons").await
    }

    async fn save_holon(&self, _holon: Holon) -> OperationResult<Holon> {
        unsupported(self, "save_holon").await
    }

    async fn delete_holon(&self, _id: EntityId) -> OperationResult<bool> {
        unsupported(self, "delete_holon").await
    }

    /// Filter the `load_all_*` results by the search text.
    async fn search(&self, params: &SearchParams) -> OperationResult<SearchResults> {
        search_loaded(self, params).await
    }

    /// Geospatial queries have no meaning on a ledger.
    async fn avatars_near_me(&self, _geo: &GeoQuery) -> OperationResult<Vec<Avatar>> {
        unsupported(self, "avatars_near_me").await
    }

    async fn holons_near_me(
        &self,
        _geo: &GeoQuery,
        _filter: HolonFilter,
    ) -> OperationResult<Vec<Holon>> {
        unsupported(self, "holons_near_me").await
    }
}

/// Search over whatever `load_all_avatars` and `load_all_holons` return.
///
/// A failed source becomes a warning. The search fails only if every
/// requested source failed.
pub async fn search_loaded<S: StorageCapability + ?Sized>(
    storage: &S,
    params: &SearchParams,
) -> OperationResult<SearchResults> {
    if let Err(err) = storage.ensure_activated().await {
        return OperationResult::error(err);
    }

    let provider = storage.provider_type();
    let mut hits = Vec::new();
    let mut warnings = Vec::new();
    let mut provenances = Vec::new();
    let mut requested = 0;
    let mut last_fault: Option<ProviderError> = None;

    if params.include_avatars {
        requested += 1;
        let loaded = storage.load_all_avatars().await;
        if loaded.is_error {
            warnings.push(format!("avatars skipped: {}", loaded.message));
            last_fault = loaded.fault;
        } else {
            provenances.push(loaded.provenance);
            warnings.extend(loaded.warnings);
            for avatar in loaded.result.unwrap_or_default() {
                let first = avatar.first_name.as_deref().unwrap_or_default();
                let last = avatar.last_name.as_deref().unwrap_or_default();
                if params.matches(&[avatar.username.as_str(), avatar.email.as_str(), first, last]) {
                    hits.push(SearchHit::avatar(provider, avatar));
                }
            }
        }
    }

    if params.include_holons {
        requested += 1;
        let loaded = storage.load_all_holons(params.holon_filter).await;
        if loaded.is_error {
            warnings.push(format!("holons skipped: {}", loaded.message));
            last_fault = loaded.fault;
        } else {
            provenances.push(loaded.provenance);
            warnings.extend(loaded.warnings);
            for holon in loaded.result.unwrap_or_default() {
                if params.holon_filter.matches(&holon)
                    && params.matches(&[holon.name.as_str(), holon.description.as_str()])
                {
                    hits.push(SearchHit::holon(provider, holon));
                }
            }
        }
    }

    if requested > 0 && provenances.is_empty() {
        let fault = last_fault
            .unwrap_or_else(|| ProviderError::internal("Search failed without a fault"));
        let mut result = OperationResult::error(fault);
        result.warnings = warnings;
        return result;
    }

    let total = hits.len();
    let results = SearchResults {
        results: hits,
        total,
    };
    let message = format!("{} search found {} result(s)", provider, total);

    if !warnings.is_empty() {
        OperationResult::degraded(results, message, warnings)
    } else if !provenances.is_empty() && provenances.iter().all(|p| *p == Provenance::Local) {
        OperationResult::local(results, message)
    } else {
        OperationResult::success(results, message)
    }
}

// ═══════════════════════════════════════════════════════════════════
// TRANSACTIONS
// ═══════════════════════════════════════════════════════════════════

/// Value transfers and lookups. Amounts are in base units.
#[async_trait]
pub trait TransactionCapability: ProviderLifecycle {
    async fn send_transaction(
        &self,
        _request: &TransactionRequest,
    ) -> OperationResult<TransactionReceipt> {
        unsupported(self, "send_transaction").await
    }

    /// Transfer between two identities, resolving addresses through
    /// the key manager.
    async fn send_between_avatars(
        &self,
        _from: &AvatarRef,
        _to: &AvatarRef,
        _amount: u128,
        _token: Option<String>,
    ) -> OperationResult<TransactionReceipt> {
        unsupported(self, "send_between_avatars").await
    }

    async fn get_transaction(&self, _hash: &str) -> OperationResult<TransactionReceipt> {
        unsupported(self, "get_transaction").await
    }

    async fn get_balance(&self, _address: &str) -> OperationResult<u128> {
        unsupported(self, "get_balance").await
    }
}

// ═══════════════════════════════════════════════════════════════════
// NFT / SMART CONTRACT
// ═══════════════════════════════════════════════════════════════════

#[async_trait]
pub trait NftCapability: ProviderLifecycle {
    async fn mint_nft(&self, _request: &MintNftRequest) -> OperationResult<TransactionReceipt> {
        unsupported(self, "mint_nft").await
    }

    async fn send_nft(&self, _request: &NftTransferRequest) -> OperationResult<TransactionReceipt> {
        unsupported(self, "send_nft").await
    }

    async fn load_nft(&self, _token_id: u128) -> OperationResult<Nft> {
        unsupported(self, "load_nft").await
    }
}

/// Arbitrary contract calls. `signature` is a Solidity-style function
/// signature such as `transfer(address,uint256)`; `args` are JSON values
/// matching its parameter list.
#[async_trait]
pub trait SmartContractCapability: ProviderLifecycle {
    async fn send_function(
        &self,
        _contract: &str,
        _signature: &str,
        _args: &[serde_json::Value],
    ) -> OperationResult<TransactionReceipt> {
        unsupported(self, "send_function").await
    }

    /// Read-only call; returns the raw hex result.
    async fn call_view(
        &self,
        _contract: &str,
        _signature: &str,
        _args: &[serde_json::Value],
    ) -> OperationResult<String> {
        unsupported(self, "call_view").await
    }
}

// ═══════════════════════════════════════════════════════════════════
// BRIDGE
// ═══════════════════════════════════════════════════════════════════

/// Cross-chain bridge operations.
#[async_trait]
pub trait BridgeCapability: ProviderLifecycle {
    async fn account_balance(&self, _address: &str) -> OperationResult<u128> {
        unsupported(self, "account_balance").await
    }

    async fn create_account(&self) -> OperationResult<AccountKeys> {
        unsupported(self, "create_account").await
    }

    async fn restore_account(&self, _seed_phrase: &str) -> OperationResult<AccountKeys> {
        unsupported(self, "restore_account").await
    }

    async fn deposit(&self, _amount: u128, _receiver: &str) -> OperationResult<BridgeTransaction> {
        unsupported(self, "deposit").await
    }

    async fn withdraw(&self, _amount: u128, _sender: &str) -> OperationResult<BridgeTransaction> {
        unsupported(self, "withdraw").await
    }

    /// On error, carries `BridgeStatus::NotFound` as the default.
    async fn transaction_status(&self, _hash: &str) -> OperationResult<BridgeStatus> {
        unsupported(self, "transaction_status")
            .await
            .with_error_default(BridgeStatus::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorCode, ProviderResult};
    use crate::entities::HolonType;
    use crate::events::EventManager;
    use crate::types::{ProviderInfo, ProviderType};
    use std::sync::atomic::{AtomicU64, Ordering};

    struct Ledger {
        info: ProviderInfo,
        events: EventManager,
        activations: AtomicU64,
        avatars_fail: bool,
        holons_fail: bool,
    }

    impl Ledger {
        fn new(avatars_fail: bool, holons_fail: bool) -> Self {
            Self {
                info: ProviderInfo::new(ProviderType::Aptos, "Ledger", "in-memory ledger"),
                events: EventManager::default(),
                activations: AtomicU64::new(0),
                avatars_fail,
                holons_fail,
            }
        }
    }

    #[async_trait]
    impl ProviderLifecycle for Ledger {
        fn info(&self) -> &ProviderInfo {
            &self.info
        }

        async fn activate(&self) -> OperationResult<bool> {
            OperationResult::success(true, "activated")
        }

        async fn deactivate(&self) -> OperationResult<bool> {
            OperationResult::success(true, "deactivated")
        }

        async fn is_activated(&self) -> bool {
            self.activations.load(Ordering::SeqCst) > 0
        }

        async fn ensure_activated(&self) -> ProviderResult<()> {
            self.activations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn activation_attempts(&self) -> u64 {
            self.activations.load(Ordering::SeqCst)
        }

        fn events(&self) -> &EventManager {
            &self.events
        }
    }

    #[async_trait]
    impl StorageCapability for Ledger {
        async fn load_all_avatars(&self) -> OperationResult<Vec<Avatar>> {
            if self.avatars_fail {
                return OperationResult::error(ProviderError::transport("avatars down"));
            }
            OperationResult::success(
                vec![
                    Avatar::new(EntityId::new(), "alice", "alice@example.com"),
                    Avatar::new(EntityId::new(), "bob", "bob@example.com"),
                ],
                "ok",
            )
        }

        async fn load_all_holons(&self, _filter: HolonFilter) -> OperationResult<Vec<Holon>> {
            if self.holons_fail {
                return OperationResult::error(ProviderError::transport("holons down"));
            }
            OperationResult::success(
                vec![
                    Holon::new(EntityId::new(), "Alice's garden", HolonType::Holon),
                    Holon::new(EntityId::new(), "bridge", HolonType::Bridge),
                ],
                "ok",
            )
        }
    }

    #[tokio::test]
    async fn test_unsupported_default_activates_first() {
        let ledger = Ledger::new(false, false);
        let result = ledger.load_avatar(EntityId::new()).await;
        assert_eq!(result.error_code(), Some(ErrorCode::UnsupportedOperation));
        assert_eq!(ledger.activation_attempts(), 1);

        let near = ledger
            .avatars_near_me(&GeoQuery {
                lat: 51,
                long: 0,
                radius_meters: 100,
            })
            .await;
        assert!(near.is_error);
    }

    #[tokio::test]
    async fn test_search_matches_both_sources() {
        let ledger = Ledger::new(false, false);
        let result = ledger.search(&SearchParams::text("alice")).await;
        let results = result.value().unwrap();
        assert_eq!(results.total, 2);
        assert_eq!(result.provenance, Provenance::Verified);
    }

    #[tokio::test]
    async fn test_search_survives_one_failed_source() {
        let ledger = Ledger::new(true, false);
        let result = ledger.search(&SearchParams::text("alice")).await;
        assert!(result.is_success());
        assert_eq!(result.value().unwrap().total, 1);
        assert_eq!(result.provenance, Provenance::Degraded);
        assert!(result.warnings[0].starts_with("avatars skipped"));
    }

    #[tokio::test]
    async fn test_search_fails_when_every_source_fails() {
        let ledger = Ledger::new(true, true);
        let result = ledger.search(&SearchParams::text("alice")).await;
        assert!(result.is_error);
        assert_eq!(result.error_code(), Some(ErrorCode::Transport));
        assert_eq!(result.warnings.len(), 2);

        let holons_only = Ledger::new(true, false)
            .search(&SearchParams::text("bridge").holons_only())
            .await;
        assert!(holons_only.is_success());
    }

    #[tokio::test]
    async fn test_bridge_status_default_on_error() {
        struct NoBridge(Ledger);

        #[async_trait]
        impl ProviderLifecycle for NoBridge {
            fn info(&self) -> &ProviderInfo {
                self.0.info()
            }
            async fn activate(&self) -> OperationResult<bool> {
                self.0.activate().await
            }
            async fn deactivate(&self) -> OperationResult<bool> {
                self.0.deactivate().await
            }
            async fn is_activated(&self) -> bool {
                self.0.is_activated().await
            }
            async fn ensure_activated(&self) -> ProviderResult<()> {
                self.0.ensure_activated().await
            }
            fn activation_attempts(&self) -> u64 {
                self.0.activation_attempts()
            }
            fn events(&self) -> &EventManager {
                self.0.events()
            }
        }

        impl BridgeCapability for NoBridge {}

        let bridge = NoBridge(Ledger::new(false, false));
        let status = bridge.transaction_status("0xabc").await;
        assert!(status.is_error);
        assert_eq!(status.result, Some(BridgeStatus::NotFound));
    }
}
