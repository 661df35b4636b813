//! Deterministic identifiers for records the chain does not identify.
//!
//! Repeated loads of the same underlying record must yield the same
//! identity, so every derived id is a pure function of
//! `(provider, natural key)`.

use crate::types::{EntityId, ProviderType};
use uuid::Uuid;

/// Derive a stable entity id from a chain-native natural key
/// (address, username, email, ...).
///
/// BLAKE3 over `"<provider>:<natural_key>"`, truncated to 16 bytes.
/// A blank natural key maps to the nil id.
pub fn derive_entity_id(provider: ProviderType, natural_key: &str) -> EntityId {
    let key = natural_key.trim();
    if key.is_empty() {
        return EntityId::nil();
    }

    let mut hasher = blake3::Hasher::new();
    hasher.update(provider.key().as_bytes());
    hasher.update(b":");
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest.as_bytes()[..16]);
    EntityId(Uuid::from_bytes(bytes))
}

/// Numeric key used for the contract-side `uint256` entity id.
///
/// First 8 bytes (big-endian) of BLAKE3 over the hyphenated id.
pub fn numeric_entity_id(id: &EntityId) -> u64 {
    let digest = blake3::hash(id.to_string().as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_entity_id(ProviderType::Aptos, "0x1");
        let b = derive_entity_id(ProviderType::Aptos, "0x1");
        assert_eq!(a, b);
        assert!(!a.is_nil());
    }

    #[test]
    fn test_derivation_separates_providers() {
        let aptos = derive_entity_id(ProviderType::Aptos, "alice");
        let eth = derive_entity_id(ProviderType::Ethereum, "alice");
        assert_ne!(aptos, eth);
    }

    #[test]
    fn test_blank_key_is_nil() {
        assert!(derive_entity_id(ProviderType::Aztec, "").is_nil());
        assert!(derive_entity_id(ProviderType::Aztec, "   ").is_nil());
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        assert_eq!(
            derive_entity_id(ProviderType::Aptos, " 0xabc "),
            derive_entity_id(ProviderType::Aptos, "0xabc")
        );
    }

    #[test]
    fn test_numeric_id_stable() {
        let id = EntityId::parse("7c9e6679-7425-40de-944b-e07fc1f90ae7").unwrap();
        assert_eq!(numeric_entity_id(&id), numeric_entity_id(&id));
        assert_ne!(numeric_entity_id(&id), numeric_entity_id(&EntityId::new()));
    }
}
