//! Aptos adapter over the fullnode REST API.
//!
//! Accounts are read as avatars, transfers go through `POST /transactions`,
//! and balances come from the account's `CoinStore` resource. Aptos has
//! no holon store beyond the listing endpoint, so most storage writes
//! are unsupported.

use crate::capability::{StorageCapability, TransactionCapability};
use crate::config::ProviderConfig;
use crate::entities::{
    Avatar, Holon, HolonFilter, HolonType, TransactionReceipt, TransactionRequest, TxStatus,
    WithProviderMetadata,
};
use crate::errors::{ProviderError, ProviderResult};
use crate::http::{build_client, HttpJson};
use crate::keys::{first_wallet_address, AvatarRef, KeyManager};
use crate::lifecycle::{delegate_lifecycle, AdapterCore, Connect};
use crate::provider::Provider;
use crate::result::OperationResult;
use crate::translate::{non_blank, Fallback, FallbackLog, Translated, Translator};
use crate::types::{EntityId, ProviderInfo, ProviderType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

const PROVIDER: ProviderType = ProviderType::Aptos;

/// Resource path of the native coin balance.
pub const APT_COIN_STORE: &str = "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>";

// ═══════════════════════════════════════════════════════════════════
// CONNECTION
// ═══════════════════════════════════════════════════════════════════

/// Builds the REST client and requires a 2xx from `GET /`.
#[derive(Debug, Default)]
pub struct AptosConnector;

#[async_trait]
impl Connect for AptosConnector {
    type Client = HttpJson;

    async fn connect(&self, config: &ProviderConfig) -> ProviderResult<HttpJson> {
        if config.endpoint.trim().is_empty() {
            return Err(ProviderError::missing_config("endpoint"));
        }

        let http = HttpJson::new(build_client(config)?, config.base_url())
            .with_api_key(config.api_key.clone());

        let resp = http.get_raw("/").await.map_err(|e| {
            ProviderError::activation(format!("Failed to connect to Aptos network: {}", e.message))
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::activation(format!(
                "Failed to connect to Aptos network: {}",
                status
            ))
            .with_context("http_status", status.as_u16()));
        }

        tracing::debug!(target: "chain_providers::aptos", endpoint = %http.base(), "endpoint reachable");
        Ok(http)
    }
}

// ═══════════════════════════════════════════════════════════════════
// WIRE SCHEMAS AND TRANSLATORS
// ═══════════════════════════════════════════════════════════════════

/// Account record as returned by `/accounts/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AccountSchema {
    pub id: Option<String>,
    pub address: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// Holon record as returned by `/accounts/holons`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HolonSchema {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub holon_type: Option<String>,
    pub provider_key: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

/// Transaction as returned by `/transactions/by_hash/{hash}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TransactionSchema {
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
    pub hash: Option<String>,
    pub success: Option<bool>,
    pub sender: Option<String>,
    pub version: Option<String>,
    pub vm_status: Option<String>,
}

fn parse_date(value: Option<String>) -> Option<DateTime<Utc>> {
    value.and_then(|v| DateTime::parse_from_rfc3339(v.trim()).ok().map(|d| d.with_timezone(&Utc)))
}

fn parse_id(value: Option<String>) -> Option<EntityId> {
    value.and_then(|v| EntityId::parse(&v))
}

pub struct AvatarTranslator;

impl Translator for AvatarTranslator {
    type Schema = AccountSchema;
    type Entity = Avatar;

    fn build(schema: AccountSchema, fallback: &Fallback) -> Translated<Avatar> {
        let mut log = FallbackLog::new();
        let address = non_blank(schema.address);
        let natural_key = address.clone().unwrap_or_else(|| fallback.natural_key.clone());

        let id = match parse_id(schema.id).or(fallback.id) {
            Some(id) => id,
            None => log.take("id", None, || fallback.derive(&natural_key)),
        };
        let username = log.text("username", non_blank(schema.username).or(address.clone()), || {
            "aptos_user".into()
        });
        let email = log.text("email", schema.email, || "user@aptos.example".into());
        let created = log.take("created_date", parse_date(schema.created), || fallback.now);
        let modified = log.take("modified_date", parse_date(schema.modified), || created);

        let mut avatar = Avatar::new(id, username, email);
        avatar.first_name = non_blank(schema.first_name);
        avatar.last_name = non_blank(schema.last_name);
        avatar.created_date = created;
        avatar.modified_date = modified;
        if let Some(address) = address {
            avatar = avatar.with_provider_metadata(PROVIDER, "AptosAddress", address);
        }
        log.finish(avatar)
    }

    fn fallback(fallback: &Fallback) -> Avatar {
        let mut avatar = Avatar::new(fallback.entity_id(), "aptos_user", "user@aptos.example");
        avatar.created_date = fallback.now;
        avatar.modified_date = fallback.now;
        avatar
    }
}

pub struct HolonTranslator;

impl Translator for HolonTranslator {
    type Schema = HolonSchema;
    type Entity = Holon;

    fn build(schema: HolonSchema, fallback: &Fallback) -> Translated<Holon> {
        let mut log = FallbackLog::new();
        let id = match parse_id(schema.id).or(fallback.id) {
            Some(id) => id,
            None => log.take("id", None, || fallback.entity_id()),
        };
        let name = log.text("name", schema.name, || fallback.natural_key.clone());
        let holon_type = log.take(
            "holon_type",
            schema.holon_type.and_then(|t| t.parse::<HolonType>().ok()),
            || HolonType::Holon,
        );
        let created = log.take("created_date", parse_date(schema.created), || fallback.now);
        let modified = log.take("modified_date", parse_date(schema.modified), || created);

        let mut holon = Holon::new(id, name, holon_type);
        holon.parent_id = parse_id(schema.parent_id);
        holon.description = non_blank(schema.description).unwrap_or_default();
        holon.provider_key = non_blank(schema.provider_key);
        holon.metadata = schema.metadata.unwrap_or_default();
        holon.created_date = created;
        holon.modified_date = modified;
        log.finish(holon)
    }

    fn fallback(fallback: &Fallback) -> Holon {
        let mut holon = Holon::new(
            fallback.entity_id(),
            fallback.natural_key.clone(),
            HolonType::Holon,
        );
        holon.created_date = fallback.now;
        holon.modified_date = fallback.now;
        holon
    }
}

pub struct TransactionTranslator;

impl Translator for TransactionTranslator {
    type Schema = TransactionSchema;
    type Entity = TransactionReceipt;

    fn build(schema: TransactionSchema, fallback: &Fallback) -> Translated<TransactionReceipt> {
        let mut log = FallbackLog::new();
        let status = match (schema.tx_type.as_deref(), schema.success) {
            (Some("pending_transaction"), _) => Some(TxStatus::Pending),
            (_, Some(true)) => Some(TxStatus::Completed),
            (_, Some(false)) => Some(TxStatus::Failed),
            _ => None,
        };
        let status = log.take("status", status, || TxStatus::Pending);
        let hash = log.text("hash", schema.hash, || fallback.natural_key.clone());

        let mut receipt = TransactionReceipt::new(hash, status);
        receipt.from_address = non_blank(schema.sender);
        receipt.block_number = schema.version.and_then(|v| v.parse().ok());
        if let Some(vm_status) = non_blank(schema.vm_status) {
            receipt = receipt.with_provider_metadata(PROVIDER, "VmStatus", vm_status);
        }
        log.finish(receipt)
    }

    fn fallback(fallback: &Fallback) -> TransactionReceipt {
        TransactionReceipt::new(fallback.natural_key.clone(), TxStatus::Pending)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransferBody<'a> {
    from: &'a str,
    to: &'a str,
    amount: u128,
    gas: u64,
    gas_price: u64,
}

#[derive(Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    hash: Option<String>,
}

#[derive(Deserialize)]
struct CoinStoreResponse {
    data: CoinStoreData,
}

#[derive(Deserialize)]
struct CoinStoreData {
    coin: CoinValue,
}

#[derive(Deserialize)]
struct CoinValue {
    value: String,
}

// ═══════════════════════════════════════════════════════════════════
// PROVIDER
// ═══════════════════════════════════════════════════════════════════

/// Aptos provider.
pub struct AptosProvider {
    core: AdapterCore<AptosConnector>,
    keys: Option<Arc<dyn KeyManager>>,
}

delegate_lifecycle!(AptosProvider);

impl AptosProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let info = ProviderInfo::new(
            PROVIDER,
            "AptosOASIS",
            "Aptos provider over the fullnode REST API",
        )
        .with_website("https://aptos.dev");
        Self {
            core: AdapterCore::new(info, config, AptosConnector),
            keys: None,
        }
    }

    pub fn with_key_manager(mut self, keys: Arc<dyn KeyManager>) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        self.core.config()
    }

    /// Storage and transaction capabilities.
    pub fn into_provider(self) -> Provider {
        let adapter = Arc::new(self);
        Provider::builder(adapter.clone())
            .storage(adapter.clone())
            .transactions(adapter)
            .build()
    }

    fn network(&self) -> String {
        self.core.config().network.clone()
    }

    async fn load_account(
        &self,
        operation: &str,
        key: String,
        id: Option<EntityId>,
    ) -> OperationResult<Avatar> {
        let network = self.network();
        self.core
            .guarded_translated(operation, |http| async move {
                tracing::debug!(target: "chain_providers::aptos", %key, "loading account");
                let raw = http
                    .get_bytes(&format!("/accounts/{}", key), &format!("Avatar {}", key))
                    .await?;
                let fallback = Fallback::new(PROVIDER, key).with_id(id);
                let translated = AvatarTranslator::translate(&raw, &fallback);
                log_fallbacks("avatar", &translated);
                Ok(translated.map(|a| a.with_provider_metadata(PROVIDER, "Network", network)))
            })
            .await
    }

    async fn post_transfer(
        &self,
        http: &HttpJson,
        request: &TransactionRequest,
    ) -> ProviderResult<TransactionReceipt> {
        if request.token.is_some() {
            return Err(ProviderError::unsupported(PROVIDER, "token transfers"));
        }
        let body = TransferBody {
            from: &request.from_address,
            to: &request.to_address,
            amount: request.amount,
            gas: 0,
            gas_price: 0,
        };
        let resp: SubmitResponse = http.post_json("/transactions", &body, "Transaction").await?;
        let hash = non_blank(resp.hash)
            .ok_or_else(|| ProviderError::decode("Transaction response carried no hash"))?;

        tracing::debug!(target: "chain_providers::aptos", %hash, "transaction submitted");
        Ok(TransactionReceipt::new(hash, TxStatus::Pending)
            .for_request(request)
            .with_provider_metadata(PROVIDER, "Network", self.network()))
    }
}

fn log_fallbacks<T>(kind: &str, translated: &Translated<T>) {
    if translated.is_degraded() {
        tracing::debug!(
            target: "chain_providers::aptos",
            kind,
            fields = ?translated.fallbacks,
            "translator used fallbacks"
        );
    }
}

#[async_trait]
impl StorageCapability for AptosProvider {
    async fn load_avatar(&self, id: EntityId) -> OperationResult<Avatar> {
        self.load_account("load_avatar", id.to_string(), Some(id)).await
    }

    async fn load_avatar_by_provider_key(&self, key: &str) -> OperationResult<Avatar> {
        self.load_account("load_avatar_by_provider_key", key.to_string(), None)
            .await
    }

    async fn load_all_holons(&self, filter: HolonFilter) -> OperationResult<Vec<Holon>> {
        self.core
            .guarded_with("load_all_holons", |http| async move {
                let path = format!("/accounts/holons?type={}", filter.as_query());
                let raw: Vec<serde_json::Value> = http.get_json(&path, "Holons").await?;

                let mut holons = Vec::with_capacity(raw.len());
                let mut warnings = Vec::new();
                for (index, item) in raw.into_iter().enumerate() {
                    let natural_key = item
                        .get("name")
                        .and_then(|n| n.as_str())
                        .filter(|n| !n.trim().is_empty())
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("holons[{}]", index));
                    let fallback = Fallback::new(PROVIDER, natural_key);
                    let translated = HolonTranslator::translate_value(item, &fallback);
                    log_fallbacks("holon", &translated);
                    warnings.extend(
                        translated
                            .warnings()
                            .into_iter()
                            .map(|w| format!("holons[{}]: {}", index, w)),
                    );
                    if filter.matches(&translated.entity) {
                        holons.push(translated.entity);
                    }
                }

                let message = format!("Loaded {} holon(s) from Aptos", holons.len());
                Ok(if warnings.is_empty() {
                    OperationResult::success(holons, message)
                } else {
                    OperationResult::degraded(holons, message, warnings)
                })
            })
            .await
    }
}

#[async_trait]
impl TransactionCapability for AptosProvider {
    async fn send_transaction(
        &self,
        request: &TransactionRequest,
    ) -> OperationResult<TransactionReceipt> {
        self.core
            .guarded("send_transaction", |http| async move {
                self.post_transfer(&http, request).await
            })
            .await
    }

    async fn send_between_avatars(
        &self,
        from: &AvatarRef,
        to: &AvatarRef,
        amount: u128,
        token: Option<String>,
    ) -> OperationResult<TransactionReceipt> {
        if token.is_some() {
            return crate::capability::unsupported(self, "token transfers").await;
        }
        self.core
            .guarded("send_between_avatars", |http| async move {
                let keys = self.keys.clone().ok_or_else(|| {
                    ProviderError::key_management(
                        "No key manager configured for the Aptos provider",
                    )
                })?;
                let from_address = first_wallet_address(keys.as_ref(), from, PROVIDER).await?;
                let to_address = first_wallet_address(keys.as_ref(), to, PROVIDER).await?;
                let request = TransactionRequest::new(from_address, to_address, amount);
                self.post_transfer(&http, &request).await
            })
            .await
    }

    async fn get_transaction(&self, hash: &str) -> OperationResult<TransactionReceipt> {
        let hash = hash.to_string();
        self.core
            .guarded_translated("get_transaction", |http| async move {
                let raw = http
                    .get_bytes(
                        &format!("/transactions/by_hash/{}", hash),
                        &format!("Transaction {}", hash),
                    )
                    .await?;
                let translated =
                    TransactionTranslator::translate(&raw, &Fallback::new(PROVIDER, hash));
                log_fallbacks("transaction", &translated);
                Ok(translated)
            })
            .await
    }

    async fn get_balance(&self, address: &str) -> OperationResult<u128> {
        let address = address.to_string();
        self.core
            .guarded("get_balance", |http| async move {
                let path = format!("/accounts/{}/resource/{}", address, APT_COIN_STORE);
                let store: CoinStoreResponse =
                    http.get_json(&path, &format!("CoinStore for {}", address)).await?;
                let value = store.data.coin.value.trim();
                value.parse::<u128>().map_err(|e| {
                    ProviderError::decode(format!("Invalid coin value {}: {}", value, e))
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::derive_entity_id;
    use crate::translate::WHOLE_RECORD;

    #[test]
    fn test_account_without_id_derives_from_address() {
        let raw = br#"{"address":"0xabc","email":"a@b.c","created":"2024-01-01T00:00:00Z"}"#;
        let fb = Fallback::new(PROVIDER, "0xabc");
        let first = AvatarTranslator::translate(raw, &fb);
        let second = AvatarTranslator::translate(raw, &Fallback::new(PROVIDER, "0xabc"));

        assert_eq!(first.entity.id, derive_entity_id(PROVIDER, "0xabc"));
        assert_eq!(first.entity.id, second.entity.id);
        assert_eq!(first.entity.username, "0xabc");
        assert_eq!(first.entity.email, "a@b.c");
        assert_eq!(
            first.entity.provider_metadata[&PROVIDER]["AptosAddress"],
            "0xabc"
        );
        assert!(first.fallbacks.contains(&"id"));
    }

    #[test]
    fn test_account_defaults() {
        let fb = Fallback::new(PROVIDER, "0xdef");
        let t = AvatarTranslator::translate(br#"{"sequence_number":"3"}"#, &fb);
        assert_eq!(t.entity.username, "aptos_user");
        assert_eq!(t.entity.email, "user@aptos.example");
        assert!(t.fallbacks.contains(&"email"));
        assert!(t.fallbacks.contains(&"username"));
    }

    #[test]
    fn test_native_id_preferred() {
        let id = EntityId::new();
        let raw = format!(r#"{{"id":"{}","address":"0x1"}}"#, id);
        let t = AvatarTranslator::translate(raw.as_bytes(), &Fallback::new(PROVIDER, "0x1"));
        assert_eq!(t.entity.id, id);
        assert!(!t.fallbacks.contains(&"id"));
    }

    #[test]
    fn test_non_json_account_is_whole_fallback() {
        let fb = Fallback::new(PROVIDER, "0x9");
        let t = AvatarTranslator::translate(b"not json", &fb);
        assert_eq!(t.fallbacks, vec![WHOLE_RECORD]);
        assert_eq!(t.entity.id, derive_entity_id(PROVIDER, "0x9"));
    }

    #[test]
    fn test_transaction_status_mapping() {
        let fb = Fallback::new(PROVIDER, "0xh");
        let pending = TransactionTranslator::translate(br#"{"type":"pending_transaction"}"#, &fb);
        assert_eq!(pending.entity.status, TxStatus::Pending);
        assert!(!pending.fallbacks.contains(&"status"));

        let done = TransactionTranslator::translate(
            br#"{"type":"user_transaction","success":true,"version":"42"}"#,
            &fb,
        );
        assert_eq!(done.entity.status, TxStatus::Completed);
        assert_eq!(done.entity.block_number, Some(42));

        let failed = TransactionTranslator::translate(br#"{"success":false}"#, &fb);
        assert_eq!(failed.entity.status, TxStatus::Failed);
    }

    #[test]
    fn test_holon_type_fallback() {
        let fb = Fallback::new(PROVIDER, "garden");
        let t = HolonTranslator::translate(br#"{"name":"garden","type":"Spaceship"}"#, &fb);
        assert_eq!(t.entity.holon_type, HolonType::Holon);
        assert!(t.fallbacks.contains(&"holon_type"));
        assert_eq!(t.entity.id, derive_entity_id(PROVIDER, "garden"));
    }

    #[test]
    fn test_transfer_body_shape() {
        let body = TransferBody {
            from: "0x1",
            to: "0x2",
            amount: 5,
            gas: 0,
            gas_price: 0,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["gasPrice"], 0);
        assert_eq!(json["amount"], 5);
    }
}
