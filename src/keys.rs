//! External key collaborators.
//!
//! Key storage and signing live outside this crate. Adapters consume
//! them through these traits and never implement either themselves.

use crate::config::SecretKey;
use crate::errors::{ProviderError, ProviderResult};
use crate::types::{EntityId, ProviderType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Logical identity whose keys are requested.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum AvatarRef {
    Id(EntityId),
    Username(String),
    Email(String),
}

impl std::fmt::Display for AvatarRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {}", id),
            Self::Username(name) => write!(f, "username {}", name),
            Self::Email(email) => write!(f, "email {}", email),
        }
    }
}

/// Supplies keys and addresses for a logical identity on one chain.
#[async_trait]
pub trait KeyManager: Send + Sync {
    async fn private_keys(
        &self,
        avatar: &AvatarRef,
        provider: ProviderType,
    ) -> ProviderResult<Vec<SecretKey>>;

    async fn public_keys(
        &self,
        avatar: &AvatarRef,
        provider: ProviderType,
    ) -> ProviderResult<Vec<String>>;

    async fn wallet_addresses(
        &self,
        avatar: &AvatarRef,
        provider: ProviderType,
    ) -> ProviderResult<Vec<String>>;
}

/// First wallet address, or a `KeyManagement` error if there is none.
pub async fn first_wallet_address(
    keys: &dyn KeyManager,
    avatar: &AvatarRef,
    provider: ProviderType,
) -> ProviderResult<String> {
    keys.wallet_addresses(avatar, provider)
        .await?
        .into_iter()
        .find(|a| !a.trim().is_empty())
        .ok_or_else(|| {
            ProviderError::key_management(format!(
                "No {} wallet address for avatar {}",
                provider, avatar
            ))
        })
}

/// First private key, or a `KeyManagement` error if there is none.
pub async fn first_private_key(
    keys: &dyn KeyManager,
    avatar: &AvatarRef,
    provider: ProviderType,
) -> ProviderResult<SecretKey> {
    keys.private_keys(avatar, provider)
        .await?
        .into_iter()
        .find(|k| !k.is_empty())
        .ok_or_else(|| {
            ProviderError::key_management(format!(
                "No {} private key for avatar {}",
                provider, avatar
            ))
        })
}

/// An EVM transaction ready for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub chain_id: u64,
    pub nonce: u128,
    pub from: String,
    /// `None` for contract creation
    pub to: Option<String>,
    pub value: u128,
    pub gas_price: u128,
    pub gas_limit: u128,
    /// `0x`-prefixed call data
    pub data: String,
}

/// Signs transactions with key material supplied by the caller.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Raw signed transaction as `0x`-prefixed hex.
    async fn sign(&self, tx: &UnsignedTransaction, key: &SecretKey) -> ProviderResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    struct EmptyKeys;

    #[async_trait]
    impl KeyManager for EmptyKeys {
        async fn private_keys(
            &self,
            _: &AvatarRef,
            _: ProviderType,
        ) -> ProviderResult<Vec<SecretKey>> {
            Ok(vec![SecretKey::new("  ")])
        }

        async fn public_keys(&self, _: &AvatarRef, _: ProviderType) -> ProviderResult<Vec<String>> {
            Ok(vec![])
        }

        async fn wallet_addresses(
            &self,
            _: &AvatarRef,
            _: ProviderType,
        ) -> ProviderResult<Vec<String>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_missing_keys_are_key_management_errors() {
        let avatar = AvatarRef::Username("alice".into());
        let err = first_wallet_address(&EmptyKeys, &avatar, ProviderType::Aptos)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::KeyManagement);
        assert!(err.message.contains("username alice"));

        let err = first_private_key(&EmptyKeys, &avatar, ProviderType::Ethereum)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::KeyManagement);
    }

    #[test]
    fn test_avatar_ref_serialization() {
        let json = serde_json::to_value(AvatarRef::Email("a@b.c".into())).unwrap();
        assert_eq!(json["by"], "email");
        assert_eq!(json["value"], "a@b.c");
    }
}
