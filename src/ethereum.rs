//! Ethereum adapter over JSON-RPC.
//!
//! Avatars and holons live in a storage contract keyed by
//! `numeric_entity_id`; each record is `(uint256 EntityId, string Id,
//! string Info)` where `Info` is the entity serialized as JSON.
//!
//! Transactions are signed by an external `TransactionSigner` when one
//! is configured, otherwise submitted with `eth_sendTransaction` from the
//! node-managed `account_address`.

use crate::abi::{self, DynFunction, EntityRecord, RecordKind};
use crate::capability::{
    NftCapability, SmartContractCapability, StorageCapability, TransactionCapability,
};
use crate::config::{ProviderConfig, SecretKey};
use crate::entities::{
    Avatar, Holon, HolonType, MintNftRequest, Nft, NftTransferRequest, TransactionReceipt,
    TransactionRequest, TxStatus, WithProviderMetadata,
};
use crate::errors::{ProviderError, ProviderResult, SuggestedAction};
use crate::http::build_client;
use crate::identity::numeric_entity_id;
use crate::jsonrpc::{parse_quantity, quantity, JsonRpcClient};
use crate::keys::{
    first_private_key, first_wallet_address, AvatarRef, KeyManager, TransactionSigner,
    UnsignedTransaction,
};
use crate::lifecycle::{delegate_lifecycle, AdapterCore, Connect};
use crate::provider::Provider;
use crate::result::OperationResult;
use crate::translate::{non_blank, Fallback, FallbackLog, Translated, Translator};
use crate::types::{EntityId, Metadata, ProviderInfo, ProviderType};
use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

const PROVIDER: ProviderType = ProviderType::Ethereum;

/// Option key for a separate NFT contract. Falls back to `contract_address`.
pub const NFT_CONTRACT_ADDRESS: &str = "nft_contract_address";

// ═══════════════════════════════════════════════════════════════════
// CONNECTION
// ═══════════════════════════════════════════════════════════════════

/// Validates the config and checks `eth_chainId` against it.
#[derive(Debug, Default)]
pub struct EthereumConnector;

#[async_trait]
impl Connect for EthereumConnector {
    type Client = JsonRpcClient;

    async fn connect(&self, config: &ProviderConfig) -> ProviderResult<JsonRpcClient> {
        if config.endpoint.trim().is_empty() {
            return Err(ProviderError::missing_config("endpoint"));
        }
        if config.private_key.as_ref().map_or(true, SecretKey::is_empty) {
            return Err(ProviderError::missing_config("private_key"));
        }
        let expected = match config.chain_id {
            Some(id) if id > 0 => id,
            _ => return Err(ProviderError::missing_config("chain_id")),
        };

        let rpc = JsonRpcClient::new(build_client(config)?, config.endpoint.trim());
        let reported: String = rpc.call("eth_chainId", json!([])).await.map_err(|e| {
            ProviderError::activation(format!("Failed to connect to Ethereum node: {}", e.message))
        })?;
        let reported = parse_quantity(&reported)?;
        if reported != u128::from(expected) {
            return Err(ProviderError::activation(format!(
                "Chain id mismatch: configured {} but node reports {}",
                expected, reported
            ))
            .with_suggestion(SuggestedAction::CheckConfig {
                key: "chain_id".into(),
            }));
        }

        tracing::debug!(target: "chain_providers::ethereum", chain_id = expected, "endpoint reachable");
        Ok(rpc)
    }

    fn describe_fault(&self, operation: &str, fault: ProviderError) -> ProviderError {
        fault.prefixed(format!(
            "Error in {} method in Ethereum provider. Reason: ",
            operation
        ))
    }
}

// ═══════════════════════════════════════════════════════════════════
// RECORD TRANSLATORS
// ═══════════════════════════════════════════════════════════════════

/// Avatar as stored in a contract record's `Info` JSON.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AvatarInfoSchema {
    #[serde(alias = "Id")]
    pub id: Option<String>,
    #[serde(alias = "Username")]
    pub username: Option<String>,
    #[serde(alias = "Email")]
    pub email: Option<String>,
    #[serde(alias = "firstName", alias = "FirstName")]
    pub first_name: Option<String>,
    #[serde(alias = "lastName", alias = "LastName")]
    pub last_name: Option<String>,
    #[serde(alias = "createdDate", alias = "CreatedDate")]
    pub created_date: Option<String>,
    #[serde(alias = "modifiedDate", alias = "ModifiedDate")]
    pub modified_date: Option<String>,
    #[serde(alias = "MetaData")]
    pub metadata: Option<Metadata>,
}

/// Holon as stored in a contract record's `Info` JSON.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HolonInfoSchema {
    #[serde(alias = "Id")]
    pub id: Option<String>,
    #[serde(alias = "parentId", alias = "ParentHolonId")]
    pub parent_id: Option<String>,
    #[serde(alias = "Name")]
    pub name: Option<String>,
    #[serde(alias = "Description")]
    pub description: Option<String>,
    #[serde(alias = "holonType", alias = "HolonType")]
    pub holon_type: Option<String>,
    #[serde(alias = "createdDate", alias = "CreatedDate")]
    pub created_date: Option<String>,
    #[serde(alias = "modifiedDate", alias = "ModifiedDate")]
    pub modified_date: Option<String>,
    #[serde(alias = "MetaData")]
    pub metadata: Option<HashMap<String, String>>,
}

fn parse_date(value: Option<String>) -> Option<DateTime<Utc>> {
    value.and_then(|v| DateTime::parse_from_rfc3339(v.trim()).ok().map(|d| d.with_timezone(&Utc)))
}

pub struct AvatarInfoTranslator;

impl Translator for AvatarInfoTranslator {
    type Schema = AvatarInfoSchema;
    type Entity = Avatar;

    fn build(schema: AvatarInfoSchema, fallback: &Fallback) -> Translated<Avatar> {
        let mut log = FallbackLog::new();
        let id = match schema.id.and_then(|v| EntityId::parse(&v)).or(fallback.id) {
            Some(id) => id,
            None => log.take("id", None, || fallback.entity_id()),
        };
        let username = log.text("username", schema.username, || "ethereum_user".into());
        let email = log.text("email", schema.email, || "user@ethereum.example".into());
        let created = log.take("created_date", parse_date(schema.created_date), || fallback.now);
        let modified = log.take("modified_date", parse_date(schema.modified_date), || created);

        let mut avatar = Avatar::new(id, username, email);
        avatar.first_name = non_blank(schema.first_name);
        avatar.last_name = non_blank(schema.last_name);
        avatar.created_date = created;
        avatar.modified_date = modified;
        avatar.metadata = schema.metadata.unwrap_or_default();
        log.finish(avatar)
    }

    fn fallback(fallback: &Fallback) -> Avatar {
        let mut avatar =
            Avatar::new(fallback.entity_id(), "ethereum_user", "user@ethereum.example");
        avatar.created_date = fallback.now;
        avatar.modified_date = fallback.now;
        avatar
    }
}

pub struct HolonInfoTranslator;

impl Translator for HolonInfoTranslator {
    type Schema = HolonInfoSchema;
    type Entity = Holon;

    fn build(schema: HolonInfoSchema, fallback: &Fallback) -> Translated<Holon> {
        let mut log = FallbackLog::new();
        let id = match schema.id.and_then(|v| EntityId::parse(&v)).or(fallback.id) {
            Some(id) => id,
            None => log.take("id", None, || fallback.entity_id()),
        };
        let name = log.text("name", schema.name, || fallback.natural_key.clone());
        let holon_type = log.take(
            "holon_type",
            schema.holon_type.and_then(|t| t.parse::<HolonType>().ok()),
            || HolonType::Holon,
        );
        let created = log.take("created_date", parse_date(schema.created_date), || fallback.now);
        let modified = log.take("modified_date", parse_date(schema.modified_date), || created);

        let mut holon = Holon::new(id, name, holon_type);
        holon.parent_id = schema.parent_id.and_then(|v| EntityId::parse(&v));
        holon.description = non_blank(schema.description).unwrap_or_default();
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

// ═══════════════════════════════════════════════════════════════════
// RPC SHAPES
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
}

/// A transaction the adapter is about to submit.
#[derive(Debug, Clone)]
struct Outgoing {
    from: Option<String>,
    to: String,
    value: u128,
    data: String,
    key: Option<SecretKey>,
}

impl Outgoing {
    fn call(to: impl Into<String>, data: String) -> Self {
        Self {
            from: None,
            to: to.into(),
            value: 0,
            data,
            key: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// PROVIDER
// ═══════════════════════════════════════════════════════════════════

/// Ethereum provider.
pub struct EthereumProvider {
    core: AdapterCore<EthereumConnector>,
    keys: Option<Arc<dyn KeyManager>>,
    signer: Option<Arc<dyn TransactionSigner>>,
}

delegate_lifecycle!(EthereumProvider);

impl EthereumProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let info = ProviderInfo::new(
            PROVIDER,
            "EthereumOASIS",
            "Ethereum provider backed by a storage contract",
        )
        .with_website("https://ethereum.org");
        Self {
            core: AdapterCore::new(info, config, EthereumConnector),
            keys: None,
            signer: None,
        }
    }

    pub fn with_key_manager(mut self, keys: Arc<dyn KeyManager>) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn with_signer(mut self, signer: Arc<dyn TransactionSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        self.core.config()
    }

    /// Storage, transaction, NFT and smart-contract capabilities.
    pub fn into_provider(self) -> Provider {
        let adapter = Arc::new(self);
        Provider::builder(adapter.clone())
            .storage(adapter.clone())
            .transactions(adapter.clone())
            .nfts(adapter.clone())
            .contracts(adapter)
            .build()
    }

    /// Number of avatar records in the contract.
    pub async fn avatars_count(&self) -> OperationResult<u128> {
        self.count("avatars_count", RecordKind::Avatar).await
    }

    /// Number of holon records in the contract.
    pub async fn holons_count(&self) -> OperationResult<u128> {
        self.count("holons_count", RecordKind::Holon).await
    }

    async fn count(&self, operation: &str, kind: RecordKind) -> OperationResult<u128> {
        self.core
            .guarded(operation, |rpc| async move {
                let contract = self.contract()?;
                let raw = self.eth_call(&rpc, contract, kind.count()).await?;
                abi::to_u128(kind.decode_count(&raw)?, operation)
            })
            .await
    }

    fn contract(&self) -> ProviderResult<&str> {
        self.core
            .config()
            .contract_address
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::missing_config("contract_address"))
    }

    fn nft_contract(&self) -> ProviderResult<String> {
        match self.core.config().get_option::<String>(NFT_CONTRACT_ADDRESS) {
            Some(address) if !address.trim().is_empty() => Ok(address),
            _ => self.contract().map(str::to_string),
        }
    }

    /// Attach the standard Ethereum provider metadata.
    fn stamp<T: WithProviderMetadata>(&self, entity: T, tx_hash: Option<&str>) -> T {
        let config = self.core.config();
        let mut entity = entity
            .with_provider_metadata(PROVIDER, "Blockchain", "Ethereum")
            .with_provider_metadata(PROVIDER, "Network", config.network.clone());
        if let Some(contract) = &config.contract_address {
            entity = entity.with_provider_metadata(PROVIDER, "ContractAddress", contract.clone());
        }
        if let Some(chain_id) = config.chain_id {
            entity = entity.with_provider_metadata(PROVIDER, "ChainId", chain_id.to_string());
        }
        if let Some(hash) = tx_hash {
            entity = entity.with_provider_metadata(PROVIDER, "ProviderKey", hash);
        }
        entity
    }

    async fn eth_call(
        &self,
        rpc: &JsonRpcClient,
        to: &str,
        data: Vec<u8>,
    ) -> ProviderResult<Vec<u8>> {
        let result: String = rpc
            .call("eth_call", json!([{ "to": to, "data": abi::to_hex(&data) }, "latest"]))
            .await?;
        abi::decode_hex(&result)
    }

    async fn load_record(
        &self,
        rpc: &JsonRpcClient,
        kind: RecordKind,
        id: EntityId,
    ) -> ProviderResult<Option<EntityRecord>> {
        let contract = self.contract()?;
        let raw = self.eth_call(rpc, contract, kind.get(record_key(id))).await?;
        if raw.is_empty() || raw.iter().all(|b| *b == 0) {
            return Ok(None);
        }
        let record = kind.decode_get(&raw)?;
        Ok((!record.is_empty()).then_some(record))
    }

    async fn load_avatar_record(
        &self,
        rpc: &JsonRpcClient,
        id: EntityId,
    ) -> ProviderResult<Translated<Avatar>> {
        let record = self
            .load_record(rpc, RecordKind::Avatar, id)
            .await?
            .ok_or_else(|| ProviderError::not_found(format!("Avatar (with id {})", id)))?;
        let fallback = Fallback::new(PROVIDER, record.id).with_id(Some(id));
        let translated = AvatarInfoTranslator::translate(record.info.as_bytes(), &fallback);
        Ok(translated.map(|a| self.stamp(a, None)))
    }

    async fn load_holon_record(
        &self,
        rpc: &JsonRpcClient,
        id: EntityId,
    ) -> ProviderResult<Translated<Holon>> {
        let record = self
            .load_record(rpc, RecordKind::Holon, id)
            .await?
            .ok_or_else(|| ProviderError::not_found(format!("Holon (with id {})", id)))?;
        let fallback = Fallback::new(PROVIDER, record.id).with_id(Some(id));
        let translated = HolonInfoTranslator::translate(record.info.as_bytes(), &fallback);
        Ok(translated.map(|h| self.stamp(h, None)))
    }

    /// Submit a transaction, then look the receipt up once.
    async fn submit(
        &self,
        rpc: &JsonRpcClient,
        tx: Outgoing,
    ) -> ProviderResult<TransactionReceipt> {
        let config = self.core.config();
        let from = tx
            .from
            .clone()
            .or_else(|| config.account_address.clone());

        let hash: String = match &self.signer {
            Some(signer) => {
                let key = tx
                    .key
                    .clone()
                    .or_else(|| config.private_key.clone())
                    .ok_or_else(|| ProviderError::key_management("No private key to sign with"))?;
                let from = from.ok_or_else(|| {
                    ProviderError::key_management("No sender address for a signed transaction")
                })?;

                let nonce: String = rpc
                    .call("eth_getTransactionCount", json!([from, "pending"]))
                    .await?;
                let gas_price: String = rpc.call("eth_gasPrice", json!([])).await?;
                let gas: String = rpc
                    .call(
                        "eth_estimateGas",
                        json!([{
                            "from": from,
                            "to": tx.to,
                            "value": quantity(tx.value),
                            "data": tx.data,
                        }]),
                    )
                    .await?;

                let unsigned = UnsignedTransaction {
                    chain_id: config.chain_id.unwrap_or_default(),
                    nonce: parse_quantity(&nonce)?,
                    from: from.clone(),
                    to: Some(tx.to.clone()),
                    value: tx.value,
                    gas_price: parse_quantity(&gas_price)?,
                    gas_limit: parse_quantity(&gas)?,
                    data: tx.data.clone(),
                };
                let raw = signer.sign(&unsigned, &key).await?;
                rpc.call("eth_sendRawTransaction", json!([raw])).await?
            }
            None => {
                let from = from.ok_or_else(|| {
                    ProviderError::key_management(
                        "No transaction signer or node-managed account configured",
                    )
                    .with_suggestion(SuggestedAction::CheckConfig {
                        key: "account_address".into(),
                    })
                })?;
                rpc.call(
                    "eth_sendTransaction",
                    json!([{
                        "from": from,
                        "to": tx.to,
                        "value": quantity(tx.value),
                        "data": tx.data,
                    }]),
                )
                .await?
            }
        };

        tracing::debug!(
            target: "chain_providers::ethereum",
            %hash,
            to = %tx.to,
            "transaction submitted"
        );

        let mut receipt = TransactionReceipt::new(hash.clone(), TxStatus::Pending);
        receipt.to_address = Some(tx.to.clone());
        receipt.amount = Some(tx.value);

        let mined: Option<RpcReceipt> = rpc
            .call("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if let Some(mined) = mined {
            if mined.status.as_deref() == Some("0x0") {
                return Err(ProviderError::rejected(format!("Transaction {} reverted", hash))
                    .with_context("tx_hash", &hash));
            }
            receipt.status = TxStatus::Completed;
            receipt.block_number = parse_block(mined.block_number.as_deref());
            receipt.from_address = mined.from;
        }
        Ok(receipt)
    }

    async fn save_record(
        &self,
        rpc: &JsonRpcClient,
        kind: RecordKind,
        id: EntityId,
        info: String,
    ) -> ProviderResult<TransactionReceipt> {
        let contract = self.contract()?.to_string();
        let key = record_key(id);
        let exists = self.load_record(rpc, kind, id).await?.is_some();

        let data = if exists {
            kind.update(key, info)
        } else {
            kind.create(key, id.to_string(), info)
        };
        tracing::debug!(
            target: "chain_providers::ethereum",
            kind = kind.name(),
            %id,
            exists,
            "saving record"
        );
        self.submit(rpc, Outgoing::call(contract, abi::to_hex(&data))).await
    }

    async fn delete_record(
        &self,
        rpc: &JsonRpcClient,
        kind: RecordKind,
        id: EntityId,
    ) -> ProviderResult<bool> {
        let contract = self.contract()?.to_string();
        let data = kind.delete(record_key(id));
        self.submit(rpc, Outgoing::call(contract, abi::to_hex(&data))).await?;
        Ok(true)
    }

    fn transfer(
        &self,
        request: &TransactionRequest,
        key: Option<SecretKey>,
    ) -> ProviderResult<Outgoing> {
        let (to, value, data) = match &request.token {
            Some(token) => (
                token.clone(),
                0,
                abi::to_hex(&abi::erc20_transfer(&request.to_address, request.amount)?),
            ),
            None => (
                request.to_address.clone(),
                request.amount,
                match &request.memo {
                    Some(memo) => abi::to_hex(memo.as_bytes()),
                    None => "0x".to_string(),
                },
            ),
        };
        Ok(Outgoing {
            from: non_blank(Some(request.from_address.clone())),
            to,
            value,
            data,
            key,
        })
    }
}

fn parse_block(value: Option<&str>) -> Option<u64> {
    value
        .and_then(|v| parse_quantity(v).ok())
        .and_then(|v| u64::try_from(v).ok())
}

/// Storage-contract key for an entity id.
fn record_key(id: EntityId) -> U256 {
    U256::from(numeric_entity_id(&id))
}

fn parse_key(kind: &str, key: &str) -> ProviderResult<EntityId> {
    EntityId::parse(key.trim()).ok_or_else(|| {
        ProviderError::invalid_input(format!(
            "{} provider key must be an entity id, got {}",
            kind, key
        ))
    })
}

#[async_trait]
impl StorageCapability for EthereumProvider {
    async fn load_avatar(&self, id: EntityId) -> OperationResult<Avatar> {
        self.core
            .guarded_translated("load_avatar", |rpc| async move {
                self.load_avatar_record(&rpc, id).await
            })
            .await
    }

    async fn load_avatar_by_provider_key(&self, key: &str) -> OperationResult<Avatar> {
        self.core
            .guarded_translated("load_avatar_by_provider_key", |rpc| async move {
                let id = parse_key("Avatar", key)?;
                self.load_avatar_record(&rpc, id).await
            })
            .await
    }

    async fn save_avatar(&self, avatar: Avatar) -> OperationResult<Avatar> {
        self.core
            .guarded("save_avatar", |rpc| async move {
                let info = serde_json::to_string(&avatar)?;
                let receipt = self
                    .save_record(&rpc, RecordKind::Avatar, avatar.id, info)
                    .await?;
                Ok(self.stamp(avatar, Some(&receipt.hash)))
            })
            .await
    }

    async fn delete_avatar(&self, id: EntityId) -> OperationResult<bool> {
        self.core
            .guarded("delete_avatar", |rpc| async move {
                self.delete_record(&rpc, RecordKind::Avatar, id).await
            })
            .await
    }

    async fn load_holon(&self, id: EntityId) -> OperationResult<Holon> {
        self.core
            .guarded_translated("load_holon", |rpc| async move {
                self.load_holon_record(&rpc, id).await
            })
            .await
    }

    async fn load_holon_by_provider_key(&self, key: &str) -> OperationResult<Holon> {
        self.core
            .guarded_translated("load_holon_by_provider_key", |rpc| async move {
                let id = parse_key("Holon", key)?;
                self.load_holon_record(&rpc, id).await
            })
            .await
    }

    async fn save_holon(&self, holon: Holon) -> OperationResult<Holon> {
        self.core
            .guarded("save_holon", |rpc| async move {
                let info = serde_json::to_string(&holon)?;
                let receipt = self
                    .save_record(&rpc, RecordKind::Holon, holon.id, info)
                    .await?;
                let mut holon = self.stamp(holon, Some(&receipt.hash));
                holon.provider_key = Some(receipt.hash);
                Ok(holon)
            })
            .await
    }

    async fn delete_holon(&self, id: EntityId) -> OperationResult<bool> {
        self.core
            .guarded("delete_holon", |rpc| async move {
                self.delete_record(&rpc, RecordKind::Holon, id).await
            })
            .await
    }
}

#[async_trait]
impl TransactionCapability for EthereumProvider {
    async fn send_transaction(
        &self,
        request: &TransactionRequest,
    ) -> OperationResult<TransactionReceipt> {
        self.core
            .guarded("send_transaction", |rpc| async move {
                let outgoing = self.transfer(request, None)?;
                let receipt = self.submit(&rpc, outgoing).await?;
                let mut receipt = receipt.for_request(request);
                receipt.to_address = Some(request.to_address.clone());
                Ok(self.stamp(receipt, None))
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
        self.core
            .guarded("send_between_avatars", |rpc| async move {
                let keys = self.keys.clone().ok_or_else(|| {
                    ProviderError::key_management(
                        "No key manager configured for the Ethereum provider",
                    )
                })?;
                let key = first_private_key(keys.as_ref(), from, PROVIDER).await?;
                let from_address = first_wallet_address(keys.as_ref(), from, PROVIDER).await?;
                let to_address = first_wallet_address(keys.as_ref(), to, PROVIDER).await?;

                let mut request = TransactionRequest::new(from_address, to_address, amount);
                request.token = token;
                let outgoing = self.transfer(&request, Some(key))?;
                let receipt = self.submit(&rpc, outgoing).await?.for_request(&request);
                Ok(self.stamp(receipt, None))
            })
            .await
    }

    async fn get_transaction(&self, hash: &str) -> OperationResult<TransactionReceipt> {
        self.core
            .guarded("get_transaction", |rpc| async move {
                let mined: Option<RpcReceipt> = rpc
                    .call("eth_getTransactionReceipt", json!([hash]))
                    .await?;
                if let Some(mined) = mined {
                    let status = match mined.status.as_deref() {
                        Some("0x0") => TxStatus::Failed,
                        _ => TxStatus::Completed,
                    };
                    let mut receipt = TransactionReceipt::new(hash, status);
                    receipt.block_number = parse_block(mined.block_number.as_deref());
                    receipt.from_address = mined.from;
                    receipt.to_address = mined.to;
                    return Ok(self.stamp(receipt, None));
                }

                let pending: Option<RpcTransaction> = rpc
                    .call("eth_getTransactionByHash", json!([hash]))
                    .await?;
                let pending = pending
                    .ok_or_else(|| ProviderError::not_found(format!("Transaction {}", hash)))?;
                let mut receipt = TransactionReceipt::new(hash, TxStatus::Pending);
                receipt.from_address = pending.from;
                receipt.to_address = pending.to;
                receipt.amount = pending.value.as_deref().and_then(|v| parse_quantity(v).ok());
                receipt.block_number = parse_block(pending.block_number.as_deref());
                Ok(self.stamp(receipt, None))
            })
            .await
    }

    async fn get_balance(&self, address: &str) -> OperationResult<u128> {
        self.core
            .guarded("get_balance", |rpc| async move {
                let balance: String = rpc.call("eth_getBalance", json!([address, "latest"])).await?;
                parse_quantity(&balance)
            })
            .await
    }
}

#[async_trait]
impl NftCapability for EthereumProvider {
    async fn mint_nft(&self, request: &MintNftRequest) -> OperationResult<TransactionReceipt> {
        self.core
            .guarded("mint_nft", |rpc| async move {
                let contract = self.nft_contract()?;
                let data = abi::mintCall {
                    to: abi::parse_address(&request.to_address)?,
                    tokenUri: request.metadata_uri.clone(),
                }
                .abi_encode();
                let receipt = self
                    .submit(&rpc, Outgoing::call(contract, abi::to_hex(&data)))
                    .await?;
                Ok(self.stamp(receipt, None))
            })
            .await
    }

    async fn send_nft(&self, request: &NftTransferRequest) -> OperationResult<TransactionReceipt> {
        self.core
            .guarded("send_nft", |rpc| async move {
                let contract = self.nft_contract()?;
                let data = abi::sendNFTCall {
                    fromWalletAddress: abi::parse_address(&request.from_address)?,
                    toWalletAddress: abi::parse_address(&request.to_address)?,
                    tokenId: U256::from(request.token_id),
                    fromProviderType: request.from_provider.display_name().to_string(),
                    toProviderType: request.to_provider.display_name().to_string(),
                    amount: U256::from(request.amount),
                    memoText: request.memo.clone(),
                }
                .abi_encode();
                let mut outgoing = Outgoing::call(contract, abi::to_hex(&data));
                outgoing.from = non_blank(Some(request.from_address.clone()));
                let receipt = self.submit(&rpc, outgoing).await?;
                Ok(self.stamp(receipt, None))
            })
            .await
    }

    async fn load_nft(&self, token_id: u128) -> OperationResult<Nft> {
        self.core
            .guarded("load_nft", |rpc| async move {
                let contract = self.nft_contract()?;
                let token = U256::from(token_id);
                let uri_raw = self
                    .eth_call(&rpc, &contract, abi::tokenURICall { tokenId: token }.abi_encode())
                    .await?;
                if uri_raw.is_empty() {
                    return Err(ProviderError::not_found(format!("NFT {}", token_id)));
                }
                let owner_raw = self
                    .eth_call(&rpc, &contract, abi::ownerOfCall { tokenId: token }.abi_encode())
                    .await?;

                let metadata_uri = abi::decode_token_uri(&uri_raw)?;
                let owner = abi::decode_owner(&owner_raw)?;

                let nft = Nft {
                    token_id,
                    owner,
                    metadata_uri,
                    contract_address: Some(contract),
                    provider_metadata: Default::default(),
                };
                Ok(self.stamp(nft, None))
            })
            .await
    }
}

#[async_trait]
impl SmartContractCapability for EthereumProvider {
    async fn send_function(
        &self,
        contract: &str,
        signature: &str,
        args: &[serde_json::Value],
    ) -> OperationResult<TransactionReceipt> {
        self.core
            .guarded("send_function", |rpc| async move {
                let data = DynFunction::parse(signature)?.encode_json(args)?;
                let receipt = self
                    .submit(&rpc, Outgoing::call(contract, abi::to_hex(&data)))
                    .await?;
                Ok(self.stamp(receipt, None))
            })
            .await
    }

    async fn call_view(
        &self,
        contract: &str,
        signature: &str,
        args: &[serde_json::Value],
    ) -> OperationResult<String> {
        self.core
            .guarded("call_view", |rpc| async move {
                let data = DynFunction::parse(signature)?.encode_json(args)?;
                let raw = self.eth_call(&rpc, contract, data).await?;
                Ok(abi::to_hex(&raw))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::WHOLE_RECORD;

    #[test]
    fn test_info_accepts_pascal_case() {
        let id = EntityId::new();
        let info = format!(
            r#"{{"Id":"{}","Username":"alice","Email":"a@b.c","FirstName":"Alice"}}"#,
            id
        );
        let t = AvatarInfoTranslator::translate(info.as_bytes(), &Fallback::new(PROVIDER, "x"));
        assert_eq!(t.entity.id, id);
        assert_eq!(t.entity.username, "alice");
        assert_eq!(t.entity.first_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_info_roundtrips_serialized_avatar() {
        let avatar = Avatar::new(EntityId::new(), "bob", "bob@example.com").with_names("Bob", "B");
        let info = serde_json::to_string(&avatar).unwrap();
        let t = AvatarInfoTranslator::translate(info.as_bytes(), &Fallback::new(PROVIDER, "x"));
        assert!(!t.is_degraded());
        assert_eq!(t.entity.id, avatar.id);
        assert_eq!(t.entity.last_name.as_deref(), Some("B"));
    }

    #[test]
    fn test_corrupt_info_keeps_requested_id() {
        let id = EntityId::new();
        let fb = Fallback::new(PROVIDER, id.to_string()).with_id(Some(id));
        let t = AvatarInfoTranslator::translate(b"{not json", &fb);
        assert_eq!(t.fallbacks, vec![WHOLE_RECORD]);
        assert_eq!(t.entity.id, id);
        assert_eq!(t.entity.username, "ethereum_user");
    }

    #[test]
    fn test_fault_prefix() {
        let err = EthereumConnector.describe_fault("load_avatar", ProviderError::transport("down"));
        assert_eq!(
            err.message,
            "Error in load_avatar method in Ethereum provider. Reason: down"
        );
    }

    #[tokio::test]
    async fn test_activation_requires_key_and_chain_id() {
        let mut config = ProviderConfig::new("http://127.0.0.1:1", "custom").with_chain_id(1);
        let err = EthereumConnector.connect(&config).await.unwrap_err();
        assert!(err.message.contains("private_key"));

        config = config.with_private_key("0xkey").with_chain_id(0);
        let err = EthereumConnector.connect(&config).await.unwrap_err();
        assert!(err.message.contains("chain_id"));
    }

    #[test]
    fn test_token_transfer_encodes_erc20_call() {
        let provider = EthereumProvider::new(ProviderConfig::ethereum(
            "http://localhost:8545",
            "0xkey",
            1,
            "0x00000000000000000000000000000000000000c0",
        ));
        let request = TransactionRequest::new(
            "0x00000000000000000000000000000000000000a1",
            "0x00000000000000000000000000000000000000b2",
            10,
        )
        .with_token("0x00000000000000000000000000000000000000d3");

        let outgoing = provider.transfer(&request, None).unwrap();
        assert_eq!(outgoing.to, "0x00000000000000000000000000000000000000d3");
        assert_eq!(outgoing.value, 0);
        assert!(outgoing.data.starts_with("0xa9059cbb"));

        let plain = TransactionRequest::new("0xa", "0xb", 10).with_memo("hi");
        let outgoing = provider.transfer(&plain, None).unwrap();
        assert_eq!(outgoing.data, "0x6869");
        assert_eq!(outgoing.value, 10);
    }
}
