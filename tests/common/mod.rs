//! Shared fixtures: stub servers on an ephemeral port and in-memory
//! key collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chain_providers::prelude::*;
use std::collections::HashMap;
use std::sync::Mutex;

/// Serve `router` on 127.0.0.1 and return its base URL.
pub async fn serve(router: Router) -> String {
    chain_providers::logging::init("chain_providers=debug");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A URL nothing listens on.
pub async fn dead_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

// ═══════════════════════════════════════════════════════════════════
// KEY COLLABORATORS
// ═══════════════════════════════════════════════════════════════════

/// Key manager backed by a username map.
#[derive(Default)]
pub struct MockKeys {
    wallets: HashMap<String, (String, String)>,
}

impl MockKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wallet(mut self, username: &str, address: &str, private_key: &str) -> Self {
        self.wallets
            .insert(username.to_string(), (address.to_string(), private_key.to_string()));
        self
    }

    fn lookup(&self, avatar: &AvatarRef) -> Option<&(String, String)> {
        match avatar {
            AvatarRef::Username(name) => self.wallets.get(name),
            _ => None,
        }
    }
}

#[async_trait]
impl KeyManager for MockKeys {
    async fn private_keys(
        &self,
        avatar: &AvatarRef,
        _provider: ProviderType,
    ) -> ProviderResult<Vec<SecretKey>> {
        Ok(self
            .lookup(avatar)
            .map(|(_, key)| vec![SecretKey::new(key.clone())])
            .unwrap_or_default())
    }

    async fn public_keys(
        &self,
        avatar: &AvatarRef,
        _provider: ProviderType,
    ) -> ProviderResult<Vec<String>> {
        Ok(self
            .lookup(avatar)
            .map(|(address, _)| vec![format!("pub-{}", address)])
            .unwrap_or_default())
    }

    async fn wallet_addresses(
        &self,
        avatar: &AvatarRef,
        _provider: ProviderType,
    ) -> ProviderResult<Vec<String>> {
        Ok(self
            .lookup(avatar)
            .map(|(address, _)| vec![address.clone()])
            .unwrap_or_default())
    }
}

/// Signer that records what it signed and returns a fake raw payload.
#[derive(Default)]
pub struct RecordingSigner {
    pub signed: Mutex<Vec<(UnsignedTransaction, String)>>,
}

#[async_trait]
impl TransactionSigner for RecordingSigner {
    async fn sign(&self, tx: &UnsignedTransaction, key: &SecretKey) -> ProviderResult<String> {
        self.signed
            .lock()
            .unwrap()
            .push((tx.clone(), key.expose().to_string()));
        Ok(format!("0xf86c{:02x}", tx.nonce))
    }
}

pub fn tx_hash(n: u8) -> String {
    format!("0x{}", format!("{:02x}", n).repeat(32))
}
