//! Shared domain entities produced by translators.
//!
//! Entities are plain data records. After construction, the only
//! mutation is attaching provider metadata.

use crate::types::{EntityId, Metadata, ProviderMetadata, ProviderType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attach provider-specific metadata to an entity.
pub trait WithProviderMetadata: Sized {
    fn provider_metadata_mut(&mut self) -> &mut ProviderMetadata;

    /// Insert one key under the provider's side-map.
    fn with_provider_metadata(
        mut self,
        provider: ProviderType,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.provider_metadata_mut()
            .entry(provider)
            .or_default()
            .insert(key.into(), value.into());
        self
    }
}

macro_rules! impl_provider_metadata {
    ($($ty:ty),*) => {
        $(impl WithProviderMetadata for $ty {
            fn provider_metadata_mut(&mut self) -> &mut ProviderMetadata {
                &mut self.provider_metadata
            }
        })*
    };
}

// ═══════════════════════════════════════════════════════════════════
// STORAGE ENTITIES
// ═══════════════════════════════════════════════════════════════════

/// A user identity stored on a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    pub id: EntityId,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub provider_metadata: ProviderMetadata,
}

impl Avatar {
    pub fn new(id: EntityId, username: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            username: username.into(),
            email: email.into(),
            first_name: None,
            last_name: None,
            created_date: now,
            modified_date: now,
            metadata: Metadata::new(),
            provider_metadata: ProviderMetadata::new(),
        }
    }

    pub fn with_names(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }
}

/// Kind of holon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HolonType {
    Holon,
    Bridge,
    Note,
    Nft,
    Contract,
    Zome,
}

impl std::fmt::Display for HolonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::str::FromStr for HolonType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "holon" | "default" => Ok(Self::Holon),
            "bridge" => Ok(Self::Bridge),
            "note" => Ok(Self::Note),
            "nft" => Ok(Self::Nft),
            "contract" => Ok(Self::Contract),
            "zome" => Ok(Self::Zome),
            _ => Err(()),
        }
    }
}

/// Optional holon-type filter; `All` matches everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HolonFilter {
    #[default]
    All,
    Only(HolonType),
}

impl HolonFilter {
    pub fn matches(&self, holon: &Holon) -> bool {
        match self {
            Self::All => true,
            Self::Only(t) => holon.holon_type == *t,
        }
    }

    /// Query-string value
    pub fn as_query(&self) -> String {
        match self {
            Self::All => "All".to_string(),
            Self::Only(t) => t.to_string(),
        }
    }
}

/// A generic data record stored on a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holon {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub holon_type: HolonType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_key: Option<String>,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub provider_metadata: ProviderMetadata,
}

impl Holon {
    pub fn new(id: EntityId, name: impl Into<String>, holon_type: HolonType) -> Self {
        let now = Utc::now();
        Self {
            id,
            parent_id: None,
            name: name.into(),
            description: String::new(),
            holon_type,
            provider_key: None,
            created_date: now,
            modified_date: now,
            metadata: HashMap::new(),
            provider_metadata: ProviderMetadata::new(),
        }
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════
// TRANSACTIONS
// ═══════════════════════════════════════════════════════════════════

/// A value transfer between two wallet addresses.
///
/// `amount` is in the chain's smallest unit (wei, octas, note units).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub from_address: String,
    pub to_address: String,
    pub amount: u128,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Token contract for fungible-token transfers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl TransactionRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: u128) -> Self {
        Self {
            from_address: from.into(),
            to_address: to.into(),
            amount,
            memo: None,
            token: None,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Lifecycle state of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Pending,
    Completed,
    Failed,
    NotFound,
}

/// Receipt for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub hash: String,
    pub status: TxStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default)]
    pub provider_metadata: ProviderMetadata,
}

impl TransactionReceipt {
    pub fn new(hash: impl Into<String>, status: TxStatus) -> Self {
        Self {
            hash: hash.into(),
            status,
            from_address: None,
            to_address: None,
            amount: None,
            block_number: None,
            memo: None,
            provider_metadata: ProviderMetadata::new(),
        }
    }

    /// Copy addressing fields from the originating request.
    pub fn for_request(mut self, request: &TransactionRequest) -> Self {
        self.from_address = Some(request.from_address.clone());
        self.to_address = Some(request.to_address.clone());
        self.amount = Some(request.amount);
        self.memo = request.memo.clone();
        self
    }
}

// ═══════════════════════════════════════════════════════════════════
// NFT
// ═══════════════════════════════════════════════════════════════════

/// Mint request for a metadata-URI NFT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintNftRequest {
    pub to_address: String,
    pub metadata_uri: String,
}

/// Cross-provider NFT transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftTransferRequest {
    pub from_address: String,
    pub to_address: String,
    pub token_id: u128,
    pub from_provider: ProviderType,
    pub to_provider: ProviderType,
    pub amount: u128,
    #[serde(default)]
    pub memo: String,
}

/// NFT as read back from a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nft {
    pub token_id: u128,
    pub owner: String,
    pub metadata_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub provider_metadata: ProviderMetadata,
}

// ═══════════════════════════════════════════════════════════════════
// PRIVACY / BRIDGE
// ═══════════════════════════════════════════════════════════════════

/// A private (encrypted) value note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateNote {
    pub note_id: String,
    pub value: u128,
    pub owner_public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A zero-knowledge proof produced by a proving service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkProof {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_id: Option<String>,
    pub proof_type: String,
    /// Base64-encoded proof bytes
    pub proof_data: String,
    #[serde(default)]
    pub public_inputs: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Transaction record returned by a privacy chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyTransaction {
    pub transaction_id: String,
    pub status: TxStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u128>,
}

/// State of a bridge transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeStatus {
    Pending,
    Completed,
    Canceled,
    NotFound,
}

impl BridgeStatus {
    /// Map a chain-reported status string.
    pub fn from_chain_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "mined" | "confirmed" => Self::Completed,
            "failed" | "reverted" => Self::Canceled,
            _ => Self::Pending,
        }
    }
}

/// Outcome of a bridge deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeTransaction {
    pub transaction_id: String,
    pub transaction_hash: String,
    pub success: bool,
    pub message: String,
    pub status: BridgeStatus,
}

/// Freshly created chain account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountKeys {
    pub public_key: String,
    pub private_key: crate::config::SecretKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_phrase: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════
// SEARCH / GEO
// ═══════════════════════════════════════════════════════════════════

/// Search request across avatars and holons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Case-insensitive substring; `None` matches everything
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub include_avatars: bool,
    pub include_holons: bool,
    #[serde(default)]
    pub holon_filter: HolonFilter,
}

impl SearchParams {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            include_avatars: true,
            include_holons: true,
            holon_filter: HolonFilter::All,
        }
    }

    pub fn avatars_only(mut self) -> Self {
        self.include_avatars = true;
        self.include_holons = false;
        self
    }

    pub fn holons_only(mut self) -> Self {
        self.include_avatars = false;
        self.include_holons = true;
        self
    }

    /// True if any of the fields contains the search text.
    pub fn matches(&self, fields: &[&str]) -> bool {
        match &self.text {
            None => true,
            Some(text) => {
                let needle = text.to_lowercase();
                fields.iter().any(|f| f.to_lowercase().contains(&needle))
            }
        }
    }
}

/// What a search hit points to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchHitKind {
    Avatar { avatar: Box<Avatar> },
    Holon { holon: Box<Holon> },
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub provider: ProviderType,
    pub id: EntityId,
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub kind: SearchHitKind,
}

impl SearchHit {
    pub fn avatar(provider: ProviderType, avatar: Avatar) -> Self {
        Self {
            provider,
            id: avatar.id,
            name: avatar.username.clone(),
            description: avatar.email.clone(),
            kind: SearchHitKind::Avatar {
                avatar: Box::new(avatar),
            },
        }
    }

    pub fn holon(provider: ProviderType, holon: Holon) -> Self {
        Self {
            provider,
            id: holon.id,
            name: holon.name.clone(),
            description: holon.description.clone(),
            kind: SearchHitKind::Holon {
                holon: Box::new(holon),
            },
        }
    }
}

/// Aggregated search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<SearchHit>,
    pub total: usize,
}

/// A geospatial query (lat/long in micro-degrees).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoQuery {
    pub lat: i64,
    pub long: i64,
    pub radius_meters: u32,
}

impl_provider_metadata!(Avatar, Holon, TransactionReceipt, Nft);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_metadata_side_map() {
        let avatar = Avatar::new(EntityId::new(), "alice", "alice@example.com")
            .with_provider_metadata(ProviderType::Ethereum, "ContractAddress", "0xabc")
            .with_provider_metadata(ProviderType::Ethereum, "Network", "sepolia")
            .with_provider_metadata(ProviderType::Aptos, "AptosAddress", "0x1");

        assert_eq!(avatar.provider_metadata.len(), 2);
        assert_eq!(
            avatar.provider_metadata[&ProviderType::Ethereum]["Network"],
            "sepolia"
        );
    }

    #[test]
    fn test_bridge_status_mapping() {
        assert_eq!(BridgeStatus::from_chain_status("PENDING"), BridgeStatus::Pending);
        assert_eq!(BridgeStatus::from_chain_status("mined"), BridgeStatus::Completed);
        assert_eq!(BridgeStatus::from_chain_status("confirmed"), BridgeStatus::Completed);
        assert_eq!(BridgeStatus::from_chain_status("reverted"), BridgeStatus::Canceled);
        assert_eq!(BridgeStatus::from_chain_status("failed"), BridgeStatus::Canceled);
        assert_eq!(BridgeStatus::from_chain_status("dropped"), BridgeStatus::Pending);
    }

    #[test]
    fn test_search_params_matching() {
        let params = SearchParams::text("ALI");
        assert!(params.matches(&["alice", "x"]));
        assert!(!params.matches(&["bob"]));
        assert!(SearchParams::default().matches(&[]));
    }

    #[test]
    fn test_holon_filter() {
        let holon = Holon::new(EntityId::new(), "event", HolonType::Bridge);
        assert!(HolonFilter::All.matches(&holon));
        assert!(HolonFilter::Only(HolonType::Bridge).matches(&holon));
        assert!(!HolonFilter::Only(HolonType::Note).matches(&holon));
        assert_eq!(HolonFilter::Only(HolonType::Nft).as_query(), "Nft");
        assert_eq!("bridge".parse::<HolonType>(), Ok(HolonType::Bridge));
    }

    #[test]
    fn test_search_hit_serialization() {
        let hit = SearchHit::holon(
            ProviderType::Aztec,
            Holon::new(EntityId::nil(), "n", HolonType::Note),
        );
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["kind"], "holon");
        assert_eq!(json["provider"], "aztec");
    }
}
