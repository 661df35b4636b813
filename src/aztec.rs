//! Aztec adapter.
//!
//! Talks to two services: the Aztec API (notes, proofs, Zcash bridge,
//! transaction status) and the bridge service that submits contract
//! calls from a named wallet account. Holons are kept in an in-memory
//! repository owned by the adapter, so storage results are `Local`.

use crate::aztec_bridge::{BridgeServiceClient, Submitted};
use crate::capability::{
    BridgeCapability, SmartContractCapability, StorageCapability, TransactionCapability,
};
use crate::config::{keys, ProviderConfig, AZTEC_DEFAULT_BRIDGE_SERVICE};
use crate::entities::{
    AccountKeys, BridgeStatus, BridgeTransaction, Holon, HolonFilter, HolonType, PrivacyTransaction,
    PrivateNote, TransactionReceipt, TxStatus, WithProviderMetadata, ZkProof,
};
use crate::errors::{ProviderError, ProviderResult, SuggestedAction};
use crate::http::{build_client, HttpJson};
use crate::identity::derive_entity_id;
use crate::lifecycle::{delegate_lifecycle, AdapterCore, Connect};
use crate::provider::Provider;
use crate::repository::HolonRepository;
use crate::result::OperationResult;
use crate::translate::{non_blank, Fallback, FallbackLog, Translated, Translator};
use crate::types::{EntityId, ProviderInfo, ProviderType};
use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

const PROVIDER: ProviderType = ProviderType::Aztec;

// ═══════════════════════════════════════════════════════════════════
// CONNECTION
// ═══════════════════════════════════════════════════════════════════

/// Both service handles, created together at activation.
#[derive(Debug, Clone)]
pub struct AztecClient {
    pub api: HttpJson,
    pub bridge: BridgeServiceClient,
}

/// Builds the API and bridge-service clients; any HTTP answer from the
/// API root counts as reachable.
#[derive(Debug, Default)]
pub struct AztecConnector;

#[async_trait]
impl Connect for AztecConnector {
    type Client = AztecClient;

    async fn connect(&self, config: &ProviderConfig) -> ProviderResult<AztecClient> {
        if config.endpoint.trim().is_empty() {
            return Err(ProviderError::missing_config("endpoint"));
        }

        let client = build_client(config)?;
        let api = HttpJson::new(client.clone(), config.base_url())
            .with_api_key(config.api_key.clone());
        let bridge_url = config
            .get_option::<String>(keys::BRIDGE_SERVICE_URL)
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| AZTEC_DEFAULT_BRIDGE_SERVICE.to_string());
        let bridge = BridgeServiceClient::new(
            HttpJson::new(client, bridge_url),
            config.get_option::<String>(keys::ACCOUNT_ALIAS),
        );

        let resp = api.get_raw("/").await.map_err(|e| {
            ProviderError::activation(format!("Failed to connect to Aztec network: {}", e.message))
                .with_suggestion(SuggestedAction::CheckConfig {
                    key: "endpoint".into(),
                })
        })?;
        tracing::debug!(
            target: "chain_providers::aztec",
            endpoint = %api.base(),
            bridge = %bridge.base(),
            status = resp.status().as_u16(),
            "endpoint reachable"
        );

        Ok(AztecClient { api, bridge })
    }
}

// ═══════════════════════════════════════════════════════════════════
// WIRE SCHEMAS
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct NoteSchema {
    note_id: Option<String>,
    #[serde(deserialize_with = "lenient_amount")]
    value: Option<u128>,
    owner_public_key: Option<String>,
    metadata: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProofSchema {
    proof_id: Option<String>,
    #[serde(alias = "type")]
    proof_type: Option<String>,
    #[serde(alias = "data")]
    proof_data: Option<String>,
    public_inputs: Option<Vec<String>>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TransactionSchema {
    #[serde(alias = "id", alias = "txHash")]
    transaction_id: Option<String>,
    status: Option<String>,
    note_id: Option<String>,
    #[serde(deserialize_with = "lenient_amount")]
    amount: Option<u128>,
    block_number: Option<u64>,
}

/// A JSON number or a decimal string. Anything else reads as absent.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<u128>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProofPayload<'a> {
    #[serde(rename = "type")]
    proof_type: &'a str,
    data: &'a str,
    public_inputs: &'a [String],
}

impl<'a> From<&'a ZkProof> for ProofPayload<'a> {
    fn from(proof: &'a ZkProof) -> Self {
        Self {
            proof_type: &proof.proof_type,
            data: &proof.proof_data,
            public_inputs: &proof.public_inputs,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// TRANSLATORS
// ═══════════════════════════════════════════════════════════════════

/// Private note. The natural key is the owner; a missing note id comes
/// from the fallback id.
struct NoteTranslator;

impl Translator for NoteTranslator {
    type Schema = NoteSchema;
    type Entity = PrivateNote;

    fn build(schema: NoteSchema, fallback: &Fallback) -> Translated<PrivateNote> {
        let mut log = FallbackLog::new();
        let note = PrivateNote {
            note_id: log.text("note_id", schema.note_id, || fallback.entity_id().to_string()),
            value: log.take("value", schema.value, || 0),
            owner_public_key: log.text("owner_public_key", schema.owner_public_key, || {
                fallback.natural_key.clone()
            }),
            metadata: non_blank(schema.metadata),
            created_at: log.take("created_at", schema.created_at, || fallback.now),
        };
        log.finish(note)
    }

    fn fallback(fallback: &Fallback) -> PrivateNote {
        PrivateNote {
            note_id: fallback.entity_id().to_string(),
            value: 0,
            owner_public_key: fallback.natural_key.clone(),
            metadata: None,
            created_at: fallback.now,
        }
    }
}

/// Proof. The natural key is the requested proof type.
struct ProofTranslator;

impl Translator for ProofTranslator {
    type Schema = ProofSchema;
    type Entity = ZkProof;

    fn build(schema: ProofSchema, fallback: &Fallback) -> Translated<ZkProof> {
        let mut log = FallbackLog::new();
        let proof = ZkProof {
            proof_id: non_blank(schema.proof_id),
            proof_type: log.text("proof_type", schema.proof_type, || fallback.natural_key.clone()),
            proof_data: log.text("proof_data", schema.proof_data, String::new),
            public_inputs: schema.public_inputs.unwrap_or_default(),
            created_at: log.take("created_at", schema.created_at, || fallback.now),
        };
        log.finish(proof)
    }

    fn fallback(fallback: &Fallback) -> ZkProof {
        ZkProof {
            proof_id: None,
            proof_type: fallback.natural_key.clone(),
            proof_data: String::new(),
            public_inputs: Vec::new(),
            created_at: fallback.now,
        }
    }
}

/// A proof nobody can verify is an error, not a degraded result.
fn check_proof_data(proof: &ZkProof) -> ProviderResult<()> {
    if proof.proof_data.trim().is_empty() {
        return Err(ProviderError::decode("Aztec API returned a proof without data"));
    }
    base64::engine::general_purpose::STANDARD
        .decode(proof.proof_data.trim())
        .map(|_| ())
        .map_err(|e| ProviderError::decode(format!("Proof data is not base64: {}", e)))
}

/// Map an Aztec transaction status string.
pub fn tx_status(status: &str) -> Option<TxStatus> {
    match status.trim().to_ascii_lowercase().as_str() {
        "pending" => Some(TxStatus::Pending),
        "mined" | "confirmed" | "success" => Some(TxStatus::Completed),
        "failed" | "reverted" | "dropped" => Some(TxStatus::Failed),
        _ => None,
    }
}

/// Privacy transaction. The natural key is the id the caller asked
/// about, empty when the service is expected to assign one.
struct PrivacyTxTranslator;

impl Translator for PrivacyTxTranslator {
    type Schema = TransactionSchema;
    type Entity = PrivacyTransaction;

    fn build(schema: TransactionSchema, fallback: &Fallback) -> Translated<PrivacyTransaction> {
        let mut log = FallbackLog::new();
        let transaction_id = non_blank(schema.transaction_id)
            .unwrap_or_else(|| fallback.natural_key.clone());
        let status = log.take(
            "status",
            schema.status.as_deref().and_then(tx_status),
            || TxStatus::Pending,
        );
        log.finish(PrivacyTransaction {
            transaction_id,
            status,
            note_id: non_blank(schema.note_id),
            amount: schema.amount,
        })
    }

    fn fallback(fallback: &Fallback) -> PrivacyTransaction {
        PrivacyTransaction {
            transaction_id: fallback.natural_key.clone(),
            status: TxStatus::Pending,
            note_id: None,
            amount: None,
        }
    }
}

/// Translate a transaction reply; an id is required either from the
/// reply or from the caller.
fn privacy_tx(
    raw: Value,
    known_id: Option<&str>,
) -> ProviderResult<Translated<PrivacyTransaction>> {
    let fallback = Fallback::new(PROVIDER, known_id.unwrap_or_default());
    let tx = PrivacyTxTranslator::translate_value(raw, &fallback);
    if tx.entity.transaction_id.trim().is_empty() {
        return Err(ProviderError::decode("Aztec API returned a transaction without an id"));
    }
    Ok(tx)
}

/// Notes of one account plus per-note fallback warnings.
#[derive(Debug, Default)]
struct NoteBatch {
    notes: Vec<PrivateNote>,
    warnings: Vec<String>,
}

impl NoteBatch {
    /// Total value. Saturates with a warning instead of wrapping.
    fn total(&self) -> (u128, Option<String>) {
        let total = self
            .notes
            .iter()
            .try_fold(0u128, |acc, note| acc.checked_add(note.value));
        match total {
            Some(total) => (total, None),
            None => (u128::MAX, Some("note values exceed u128, balance saturated".to_string())),
        }
    }
}

/// `Degraded` when there are warnings, `Verified` otherwise.
fn with_warnings<T>(value: T, message: String, warnings: Vec<String>) -> OperationResult<T> {
    if warnings.is_empty() {
        OperationResult::success(value, message)
    } else {
        OperationResult::degraded(value, message, warnings)
    }
}

// ═══════════════════════════════════════════════════════════════════
// PROVIDER
// ═══════════════════════════════════════════════════════════════════

/// Aztec privacy provider.
pub struct AztecProvider {
    core: AdapterCore<AztecConnector>,
    repository: HolonRepository,
}

delegate_lifecycle!(AztecProvider);

impl AztecProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let info = ProviderInfo::new(PROVIDER, "AztecOASIS", "Aztec Privacy Provider")
            .with_website("https://aztec.network");
        Self {
            core: AdapterCore::new(info, config, AztecConnector),
            repository: HolonRepository::new(),
        }
    }

    /// Reads `AZTEC_API_URL`, `AZTEC_API_KEY` and `AZTEC_BRIDGE_SERVICE_URL`.
    pub fn from_env() -> Self {
        Self::new(ProviderConfig::aztec_from_env())
    }

    pub fn config(&self) -> &ProviderConfig {
        self.core.config()
    }

    /// Adapter-owned holon store.
    pub fn repository(&self) -> &HolonRepository {
        &self.repository
    }

    /// Storage, transaction, bridge and smart-contract capabilities.
    pub fn into_provider(self) -> Provider {
        let adapter = std::sync::Arc::new(self);
        Provider::builder(adapter.clone())
            .storage(adapter.clone())
            .transactions(adapter.clone())
            .bridge(adapter.clone())
            .contracts(adapter)
            .build()
    }

    fn contract_option(&self, key: &str) -> ProviderResult<String> {
        self.core
            .config()
            .get_option::<String>(key)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::missing_config(key))
    }

    /// Store a `Bridge` holon describing a deposit or withdrawal.
    async fn record_bridge_event(
        &self,
        event_type: &str,
        reference: &str,
        note_id: Option<&str>,
        aztec_tx_id: &str,
    ) -> Holon {
        let holon = Holon::new(
            EntityId::new(),
            format!("Aztec Bridge Event - {}", event_type),
            HolonType::Bridge,
        )
        .with_description(format!("Event reference: {}", reference))
        .with_meta("EventType", event_type)
        .with_meta("Reference", reference)
        .with_meta("NoteId", note_id.unwrap_or_default())
        .with_meta("AztecTransactionId", aztec_tx_id)
        .with_provider_metadata(PROVIDER, "Network", self.core.config().network.clone());

        tracing::debug!(
            target: "chain_providers::aztec",
            event_type,
            reference,
            tx = aztec_tx_id,
            "bridge event stored"
        );
        self.repository.save(holon).await
    }

    /// Wrap a bridge-service submission as a result, degraded when the
    /// hash looked wrong.
    fn submitted<T>(&self, submitted: &Submitted, value: T, message: String) -> OperationResult<T> {
        with_warnings(value, message, submitted.warning.iter().cloned().collect())
    }

    async fn bridge_transfer(
        &self,
        operation: &str,
        function: &'static str,
        amount: u128,
        account: &str,
    ) -> OperationResult<BridgeTransaction> {
        self.core
            .guarded_with(operation, |client| async move {
                let contract = self.contract_option(keys::BRIDGE_CONTRACT_ADDRESS)?;
                let args = [json!(account), json!(amount.to_string())];
                let submitted = client
                    .bridge
                    .send_transaction(&contract, function, &args)
                    .await?;
                self.record_bridge_event(function, account, None, &submitted.tx_hash)
                    .await;

                let message = format!("Aztec {} transaction submitted", function);
                let tx = BridgeTransaction {
                    transaction_id: submitted.tx_hash.clone(),
                    transaction_hash: submitted.tx_hash.clone(),
                    success: true,
                    message: message.clone(),
                    status: BridgeStatus::Pending,
                };
                Ok(self.submitted(&submitted, tx, message))
            })
            .await
    }

    async fn stablecoin_call(
        &self,
        operation: &str,
        function: &'static str,
        args: Vec<Value>,
    ) -> OperationResult<String> {
        self.core
            .guarded_with(operation, |client| async move {
                let contract = self.contract_option(keys::STABLECOIN_CONTRACT_ADDRESS)?;
                let submitted = client
                    .bridge
                    .send_transaction(&contract, function, &args)
                    .await?;
                let message = format!("Aztec {} submitted", function);
                Ok(self.submitted(&submitted, submitted.tx_hash.clone(), message))
            })
            .await
    }

    /// One note that fails to translate falls back on its own; the rest
    /// of the batch is kept.
    async fn fetch_notes(&self, api: &HttpJson, address: &str) -> ProviderResult<NoteBatch> {
        let raw: Vec<Value> = api
            .get_json(&format!("/accounts/{}/notes", address), "Aztec notes")
            .await?;
        let mut batch = NoteBatch::default();
        for (index, item) in raw.into_iter().enumerate() {
            let note_key = format!("{}:{}", address, index);
            let fallback = Fallback::new(PROVIDER, address)
                .with_id(Some(derive_entity_id(PROVIDER, &note_key)));
            let note = NoteTranslator::translate_value(item, &fallback);
            if note.is_degraded() {
                tracing::debug!(
                    target: "chain_providers::aztec",
                    address,
                    index,
                    fields = ?note.fallbacks,
                    "note decoded with fallbacks"
                );
            }
            batch.warnings.extend(
                note.warnings()
                    .into_iter()
                    .map(|w| format!("notes[{}]: {}", index, w)),
            );
            batch.notes.push(note.entity);
        }
        Ok(batch)
    }

    // ═══════════════════════════════════════════════════════════════
    // PRIVACY API
    // ═══════════════════════════════════════════════════════════════

    /// Create a private value note owned by `owner`.
    pub async fn create_private_note(
        &self,
        value: u128,
        owner: &str,
        metadata: Option<String>,
    ) -> OperationResult<PrivateNote> {
        self.core
            .guarded_translated("create_private_note", |client| async move {
                let body = json!({ "value": value, "owner": owner, "metadata": metadata });
                let raw: Value = client.api.post_json("/notes", &body, "Aztec note").await?;
                let fallback = Fallback::new(PROVIDER, owner).with_id(Some(EntityId::new()));
                let mut note = NoteTranslator::translate_value(raw, &fallback);
                if note.fallbacks.contains(&"value") {
                    note.entity.value = value;
                }
                note.entity.metadata = note.entity.metadata.take().or(metadata);
                Ok(note)
            })
            .await
    }

    /// Ask the proving service for a proof over `payload`.
    pub async fn generate_proof(
        &self,
        proof_type: &str,
        payload: Value,
    ) -> OperationResult<ZkProof> {
        self.core
            .guarded_translated("generate_proof", |client| async move {
                let body = json!({ "type": proof_type, "payload": payload });
                let raw: Value = client.api.post_json("/proofs", &body, "Aztec proof").await?;
                let proof =
                    ProofTranslator::translate_value(raw, &Fallback::new(PROVIDER, proof_type));
                check_proof_data(&proof.entity)?;
                Ok(proof)
            })
            .await
    }

    pub async fn submit_proof(&self, proof: &ZkProof) -> OperationResult<PrivacyTransaction> {
        self.core
            .guarded_translated("submit_proof", |client| async move {
                let mut body = serde_json::to_value(ProofPayload::from(proof))?;
                if let Some(id) = &proof.proof_id {
                    body["proofId"] = json!(id);
                }
                let raw: Value = client
                    .api
                    .post_json("/proofs/submit", &body, "Aztec proof submission")
                    .await?;
                privacy_tx(raw, None)
            })
            .await
    }

    /// Credit a Zcash deposit to an Aztec note and record the event.
    pub async fn deposit_from_zcash(
        &self,
        amount: u128,
        zcash_tx_id: &str,
        note: &PrivateNote,
    ) -> OperationResult<PrivacyTransaction> {
        self.core
            .guarded_translated("deposit_from_zcash", |client| async move {
                let body = json!({
                    "amount": amount,
                    "zcashTxId": zcash_tx_id,
                    "noteId": note.note_id,
                    "owner": note.owner_public_key,
                });
                let raw: Value = client
                    .api
                    .post_json("/bridge/deposit", &body, "Aztec bridge deposit")
                    .await?;
                let tx = privacy_tx(raw, None)?;
                self.record_bridge_event(
                    "deposit",
                    zcash_tx_id,
                    Some(&note.note_id),
                    &tx.entity.transaction_id,
                )
                .await;
                Ok(tx)
            })
            .await
    }

    /// Spend a note back to a Zcash address and record the event.
    pub async fn withdraw_to_zcash(
        &self,
        note: &PrivateNote,
        proof: &ZkProof,
        destination: &str,
    ) -> OperationResult<PrivacyTransaction> {
        self.core
            .guarded_translated("withdraw_to_zcash", |client| async move {
                let body = json!({
                    "noteId": note.note_id,
                    "value": note.value,
                    "destinationAddress": destination,
                    "proof": ProofPayload::from(proof),
                });
                let raw: Value = client
                    .api
                    .post_json("/bridge/withdraw", &body, "Aztec bridge withdrawal")
                    .await?;
                let tx = privacy_tx(raw, None)?;
                self.record_bridge_event(
                    "withdraw",
                    destination,
                    Some(&note.note_id),
                    &tx.entity.transaction_id,
                )
                .await;
                Ok(tx)
            })
            .await
    }

    pub async fn sync_bridge_event(&self, event_id: &str) -> OperationResult<PrivacyTransaction> {
        self.core
            .guarded_translated("sync_bridge_event", |client| async move {
                let raw: Value = client
                    .api
                    .get_json(&format!("/bridge/events/{}", event_id), "Aztec bridge event")
                    .await?;
                privacy_tx(raw, Some(event_id))
            })
            .await
    }

    /// Private notes held by `address`.
    pub async fn private_notes(&self, address: &str) -> OperationResult<Vec<PrivateNote>> {
        self.core
            .guarded_with("private_notes", |client| async move {
                let batch = self.fetch_notes(&client.api, address).await?;
                let message = format!("{} private notes loaded", batch.notes.len());
                Ok(with_warnings(batch.notes, message, batch.warnings))
            })
            .await
    }

    // ═══════════════════════════════════════════════════════════════
    // STABLECOIN
    // ═══════════════════════════════════════════════════════════════

    pub async fn mint_stablecoin(
        &self,
        address: &str,
        amount: u128,
        zcash_tx_hash: &str,
        viewing_key: &str,
    ) -> OperationResult<String> {
        let args = vec![
            json!(address),
            json!(amount.to_string()),
            json!(zcash_tx_hash),
            json!(viewing_key),
        ];
        self.stablecoin_call("mint_stablecoin", "mint", args).await
    }

    pub async fn burn_stablecoin(
        &self,
        address: &str,
        amount: u128,
        position_id: &str,
    ) -> OperationResult<String> {
        let args = vec![json!(address), json!(amount.to_string()), json!(position_id)];
        self.stablecoin_call("burn_stablecoin", "burn", args).await
    }

    pub async fn deploy_to_yield_strategy(
        &self,
        address: &str,
        amount: u128,
        strategy: &str,
    ) -> OperationResult<String> {
        let args = vec![json!(address), json!(amount.to_string()), json!(strategy)];
        self.stablecoin_call("deploy_to_yield_strategy", "deploy_to_yield", args)
            .await
    }

    pub async fn seize_collateral(&self, address: &str, amount: u128) -> OperationResult<String> {
        let args = vec![json!(address), json!(amount.to_string())];
        self.stablecoin_call("seize_collateral", "seize_collateral", args)
            .await
    }

    fn wallet_cli_only<T>(&self, operation: &str, command: &str) -> OperationResult<T> {
        OperationResult::error(ProviderError::unsupported(PROVIDER, operation).with_suggestion(
            SuggestedAction::UserAction {
                description: format!("Use 'aztec-wallet {}' to manage Aztec accounts", command),
            },
        ))
    }
}

#[async_trait]
impl StorageCapability for AztecProvider {
    async fn load_holon(&self, id: EntityId) -> OperationResult<Holon> {
        self.core
            .guarded_with("load_holon", |_| async move {
                let holon = self
                    .repository
                    .get(id)
                    .await
                    .ok_or_else(|| ProviderError::not_found(format!("Holon (with id {})", id)))?;
                Ok(OperationResult::local(holon, "Holon loaded from the Aztec repository"))
            })
            .await
    }

    async fn load_holon_by_provider_key(&self, key: &str) -> OperationResult<Holon> {
        self.core
            .guarded_with("load_holon_by_provider_key", |_| async move {
                let holon = self.repository.by_provider_key(key).await.ok_or_else(|| {
                    ProviderError::not_found(format!("Holon (with provider key {})", key))
                })?;
                Ok(OperationResult::local(holon, "Holon loaded from the Aztec repository"))
            })
            .await
    }

    async fn load_holons_for_parent(
        &self,
        parent: EntityId,
        filter: HolonFilter,
    ) -> OperationResult<Vec<Holon>> {
        self.core
            .guarded_with("load_holons_for_parent", |_| async move {
                let holons = self.repository.children(parent, filter).await;
                let message = format!("{} holons loaded from the Aztec repository", holons.len());
                Ok(OperationResult::local(holons, message))
            })
            .await
    }

    async fn load_all_holons(&self, filter: HolonFilter) -> OperationResult<Vec<Holon>> {
        self.core
            .guarded_with("load_all_holons", |_| async move {
                let holons = self.repository.all(filter).await;
                let message = format!("{} holons loaded from the Aztec repository", holons.len());
                Ok(OperationResult::local(holons, message))
            })
            .await
    }

    async fn save_holon(&self, holon: Holon) -> OperationResult<Holon> {
        self.core
            .guarded_with("save_holon", |_| async move {
                let saved = self.repository.save(holon).await;
                Ok(OperationResult::local(saved, "Holon saved to the Aztec repository"))
            })
            .await
    }

    async fn delete_holon(&self, id: EntityId) -> OperationResult<bool> {
        self.core
            .guarded_with("delete_holon", |_| async move {
                if !self.repository.delete(id).await {
                    return Err(ProviderError::not_found(format!("Holon (with id {})", id)));
                }
                Ok(OperationResult::local(true, "Holon deleted from the Aztec repository"))
            })
            .await
    }
}

#[async_trait]
impl TransactionCapability for AztecProvider {
    async fn get_transaction(&self, hash: &str) -> OperationResult<TransactionReceipt> {
        self.core
            .guarded_translated("get_transaction", |client| async move {
                let raw: Value = client
                    .api
                    .get_json(&format!("/transactions/{}", hash), &format!("Transaction {}", hash))
                    .await?;
                let block_number = raw.get("blockNumber").and_then(Value::as_u64);
                let network = self.core.config().network.clone();
                let tx = privacy_tx(raw, Some(hash))?;
                Ok(tx.map(|tx| {
                    let mut receipt = TransactionReceipt::new(tx.transaction_id, tx.status);
                    receipt.block_number = block_number;
                    receipt.amount = tx.amount;
                    receipt.with_provider_metadata(PROVIDER, "Network", network)
                }))
            })
            .await
    }

    async fn get_balance(&self, address: &str) -> OperationResult<u128> {
        self.account_balance(address).await
    }
}

#[async_trait]
impl BridgeCapability for AztecProvider {
    /// Sum of the account's private note values.
    async fn account_balance(&self, address: &str) -> OperationResult<u128> {
        self.core
            .guarded_with("account_balance", |client| async move {
                let mut batch = self.fetch_notes(&client.api, address).await?;
                let (total, overflow) = batch.total();
                if let Some(warning) = overflow {
                    tracing::warn!(target: "chain_providers::aztec", address, "{}", warning);
                    batch.warnings.push(warning);
                }
                let message = format!("Balance of {} from {} notes", address, batch.notes.len());
                Ok(with_warnings(total, message, batch.warnings))
            })
            .await
    }

    async fn create_account(&self) -> OperationResult<AccountKeys> {
        if let Err(err) = self.core.ensure_activated().await {
            return OperationResult::error(err);
        }
        self.wallet_cli_only("create_account", "create-account")
    }

    async fn restore_account(&self, _seed_phrase: &str) -> OperationResult<AccountKeys> {
        if let Err(err) = self.core.ensure_activated().await {
            return OperationResult::error(err);
        }
        self.wallet_cli_only("restore_account", "import")
    }

    async fn deposit(&self, amount: u128, receiver: &str) -> OperationResult<BridgeTransaction> {
        self.bridge_transfer("deposit", "deposit", amount, receiver).await
    }

    async fn withdraw(&self, amount: u128, sender: &str) -> OperationResult<BridgeTransaction> {
        self.bridge_transfer("withdraw", "withdraw", amount, sender).await
    }

    async fn transaction_status(&self, hash: &str) -> OperationResult<BridgeStatus> {
        #[derive(Default, Deserialize)]
        #[serde(default)]
        struct StatusOnly {
            status: Option<String>,
        }

        self.core
            .guarded("transaction_status", |client| async move {
                let reply: StatusOnly = client
                    .api
                    .get_json(&format!("/transactions/{}", hash), &format!("Transaction {}", hash))
                    .await?;
                Ok(reply
                    .status
                    .as_deref()
                    .map_or(BridgeStatus::Pending, BridgeStatus::from_chain_status))
            })
            .await
            .with_error_default(BridgeStatus::NotFound)
    }
}

#[async_trait]
impl SmartContractCapability for AztecProvider {
    /// Submit through the bridge service. `signature` may be a bare
    /// function name or a full `name(types)` signature.
    async fn send_function(
        &self,
        contract: &str,
        signature: &str,
        args: &[Value],
    ) -> OperationResult<TransactionReceipt> {
        self.core
            .guarded_with("send_function", |client| async move {
                let function = signature.split('(').next().unwrap_or_default().trim();
                if function.is_empty() {
                    return Err(ProviderError::invalid_input("Function name is empty"));
                }
                let submitted = client.bridge.send_transaction(contract, function, args).await?;
                let mut receipt =
                    TransactionReceipt::new(submitted.tx_hash.clone(), TxStatus::Pending);
                receipt.to_address = Some(contract.to_string());
                let message = format!("Aztec {} submitted", function);
                Ok(self.submitted(&submitted, receipt, message))
            })
            .await
    }
}
