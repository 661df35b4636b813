//! # Chain Providers
//!
//! Blockchain provider adapters behind one operation contract.
//!
//! Each adapter (Aptos, Ethereum, Aztec) talks to its chain through the
//! chain's native interface and hands back the same things:
//!
//! - **OperationResult**: every call returns a fresh envelope with a
//!   payload, an error flag, a message and the provenance of the payload
//! - **Lifecycle**: explicit `activate`/`deactivate`, plus exactly one
//!   implicit activation before the first operation that needs it
//! - **Capabilities**: storage, transactions, NFTs, smart contracts and
//!   bridging are separate traits; a `Provider` reports which it offers
//! - **Translators**: chain responses decode once into typed schemas,
//!   and missing fields fall back deterministically instead of failing
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! chain-providers = "0.1"
//! ```
//!
//! ```rust,ignore
//! use chain_providers::prelude::*;
//!
//! let provider = AptosProvider::new(ProviderConfig::aptos()).into_provider();
//! let balance = provider
//!     .transactions()
//!     .expect("aptos transfers")
//!     .get_balance("0x1")
//!     .await;
//!
//! if balance.is_success() {
//!     println!("{} octas", balance.value().unwrap());
//! } else {
//!     eprintln!("{}", balance.message);
//! }
//! ```
//!
//! Signing and key custody stay outside the crate: adapters take a
//! [`KeyManager`] and, for Ethereum, a [`TransactionSigner`].

pub mod abi;
pub mod aptos;
pub mod aztec;
pub mod aztec_bridge;
pub mod capability;
pub mod config;
pub mod entities;
pub mod errors;
pub mod ethereum;
pub mod events;
pub mod http;
pub mod identity;
pub mod jsonrpc;
pub mod keys;
pub mod lifecycle;
pub mod logging;
pub mod provider;
pub mod repository;
pub mod result;
pub mod translate;
pub mod types;

// Re-export the public surface in prelude for convenience
pub mod prelude {
    pub use crate::aptos::AptosProvider;
    pub use crate::aztec::AztecProvider;
    pub use crate::capability::{
        BridgeCapability, NftCapability, SmartContractCapability, StorageCapability,
        TransactionCapability,
    };
    pub use crate::config::{ProviderConfig, SecretKey};
    pub use crate::entities::*;
    pub use crate::errors::*;
    pub use crate::ethereum::EthereumProvider;
    pub use crate::events::*;
    pub use crate::identity::{derive_entity_id, numeric_entity_id};
    pub use crate::keys::{AvatarRef, KeyManager, TransactionSigner, UnsignedTransaction};
    pub use crate::lifecycle::{AdapterCore, Connect, ProviderLifecycle};
    pub use crate::provider::{Provider, ProviderBuilder};
    pub use crate::repository::HolonRepository;
    pub use crate::result::*;
    pub use crate::translate::{Fallback, Translated, Translator};
    pub use crate::types::*;
}

// Also re-export at crate root
pub use prelude::*;
