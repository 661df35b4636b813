//! Ethereum adapter against a stub JSON-RPC node running the storage
//! contract in memory.

mod common;

use alloy_primitives::U256;
use alloy_sol_types::{SolCall, SolValue};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chain_providers::abi::{self, EntityRecord};
use chain_providers::prelude::*;
use common::{dead_endpoint, serve, tx_hash, MockKeys, RecordingSigner};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const CHAIN_ID: u64 = 11155111;
const CONTRACT: &str = "0x00000000000000000000000000000000000000c0";
const NODE_ACCOUNT: &str = "0x00000000000000000000000000000000000000a0";

#[derive(Default)]
struct Node {
    calls: Mutex<Vec<String>>,
    avatars: Mutex<HashMap<U256, (String, String)>>,
    /// Raw `eth_call` replies served verbatim for a record key.
    raw_replies: Mutex<HashMap<U256, String>>,
    sent: Mutex<Vec<Value>>,
    revert_next: Mutex<bool>,
}

impl Node {
    fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|m| *m == method).count()
    }

    fn next_hash(&self) -> String {
        tx_hash(self.sent.lock().unwrap().len() as u8)
    }

    /// Store an avatar row directly, bypassing the adapter.
    fn put_avatar(&self, id: EntityId, info: &str) {
        self.avatars.lock().unwrap().insert(
            U256::from(numeric_entity_id(&id)),
            (id.to_string(), info.to_string()),
        );
    }

    /// Apply a storage-contract transaction.
    fn execute(&self, data: &str) {
        let bytes = abi::decode_hex(data).unwrap();
        let mut avatars = self.avatars.lock().unwrap();
        if let Ok(call) = abi::CreateAvatarCall::abi_decode(&bytes, true) {
            avatars.insert(call.entityId, (call.avatarId, call.info));
        } else if let Ok(call) = abi::UpdateAvatarCall::abi_decode(&bytes, true) {
            if let Some(record) = avatars.get_mut(&call.entityId) {
                record.1 = call.info;
            }
        } else if let Ok(call) = abi::DeleteAvatarCall::abi_decode(&bytes, true) {
            avatars.remove(&call.entityId);
        }
    }

    /// Answer an `eth_call` against the storage contract.
    fn view(&self, data: &str) -> String {
        let bytes = abi::decode_hex(data).unwrap();
        let avatars = self.avatars.lock().unwrap();

        if let Ok(call) = abi::GetAvatarByIdCall::abi_decode(&bytes, true) {
            if let Some(raw) = self.raw_replies.lock().unwrap().get(&call.entityId) {
                return raw.clone();
            }
            return match avatars.get(&call.entityId) {
                None => "0x".to_string(),
                Some((id, info)) => {
                    let record = EntityRecord {
                        entityId: call.entityId,
                        id: id.clone(),
                        info: info.clone(),
                    };
                    abi::to_hex(&abi::GetAvatarByIdCall::abi_encode_returns(&(record,)))
                }
            };
        }
        if abi::GetAvatarsCountCall::abi_decode(&bytes, true).is_ok() {
            let count = U256::from(avatars.len());
            return abi::to_hex(&abi::GetAvatarsCountCall::abi_encode_returns(&(count,)));
        }
        if bytes.starts_with(&abi::DynFunction::parse("balanceOf(address)").unwrap().selector()) {
            return abi::to_hex(&U256::from(42u64).abi_encode());
        }
        "0x".to_string()
    }
}

async fn rpc(State(node): State<Arc<Node>>, Json(req): Json<Value>) -> Json<Value> {
    let method = req["method"].as_str().unwrap_or_default().to_string();
    node.calls.lock().unwrap().push(method.clone());
    let params = &req["params"];

    let result = match method.as_str() {
        "eth_chainId" => json!(format!("0x{:x}", CHAIN_ID)),
        "eth_call" => json!(node.view(params[0]["data"].as_str().unwrap_or("0x"))),
        "eth_sendTransaction" => {
            let tx = params[0].clone();
            node.execute(tx["data"].as_str().unwrap_or("0x"));
            node.sent.lock().unwrap().push(tx);
            json!(node.next_hash())
        }
        "eth_sendRawTransaction" => {
            node.sent.lock().unwrap().push(params[0].clone());
            json!(node.next_hash())
        }
        "eth_getTransactionCount" => json!("0x5"),
        "eth_gasPrice" => json!("0x3b9aca00"),
        "eth_estimateGas" => json!("0x5208"),
        "eth_getBalance" => json!("0xde0b6b3a7640000"),
        "eth_getTransactionReceipt" => {
            if params[0] == json!(tx_hash(0xee)) {
                Value::Null
            } else {
                let mut revert = node.revert_next.lock().unwrap();
                let status = if *revert { "0x0" } else { "0x1" };
                *revert = false;
                json!({
                    "status": status,
                    "blockNumber": "0x10",
                    "from": NODE_ACCOUNT,
                    "to": CONTRACT,
                })
            }
        }
        "eth_getTransactionByHash" => Value::Null,
        _ => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": req["id"],
                "error": { "code": -32601, "message": "method not found" }
            }))
        }
    };
    Json(json!({ "jsonrpc": "2.0", "id": req["id"], "result": result }))
}

async fn node() -> (Arc<Node>, String) {
    let node = Arc::new(Node::default());
    let router = Router::new().route("/", post(rpc)).with_state(node.clone());
    let url = serve(router).await;
    (node, url)
}

fn config(url: &str) -> ProviderConfig {
    ProviderConfig::ethereum(url, "0xprivate", CHAIN_ID, CONTRACT)
        .with_account_address(NODE_ACCOUNT)
}

#[tokio::test]
async fn test_avatar_contract_round_trip() {
    let (node, url) = node().await;
    let eth = EthereumProvider::new(config(&url));
    let avatar = Avatar::new(EntityId::new(), "alice", "alice@example.com")
        .with_names("Alice", "Liddell");

    let saved = eth.save_avatar(avatar.clone()).await;
    assert!(saved.is_success(), "{}", saved.message);
    let saved = saved.into_result().unwrap();
    let meta = &saved.provider_metadata[&ProviderType::Ethereum];
    assert_eq!(meta["ContractAddress"], CONTRACT);
    assert_eq!(meta["ChainId"], CHAIN_ID.to_string());
    assert_eq!(meta["Blockchain"], "Ethereum");
    assert_eq!(meta["ProviderKey"], tx_hash(1));

    let loaded = eth.load_avatar(avatar.id).await;
    assert_eq!(loaded.provenance, Provenance::Verified);
    let loaded = loaded.into_result().unwrap();
    assert_eq!(loaded.id, avatar.id);
    assert_eq!(loaded.username, "alice");
    assert_eq!(loaded.last_name.as_deref(), Some("Liddell"));

    let by_key = eth.load_avatar_by_provider_key(&avatar.id.to_string()).await;
    assert_eq!(by_key.into_result().unwrap().id, avatar.id);

    assert_eq!(eth.avatars_count().await.into_result().unwrap(), 1);
    assert_eq!(node.count("eth_chainId"), 1);
}

#[tokio::test]
async fn test_second_save_updates() {
    let (node, url) = node().await;
    let eth = EthereumProvider::new(config(&url));
    let mut avatar = Avatar::new(EntityId::new(), "bob", "bob@example.com");

    assert!(eth.save_avatar(avatar.clone()).await.is_success());
    avatar.email = "robert@example.com".into();
    assert!(eth.save_avatar(avatar.clone()).await.is_success());

    let sent = node.sent.lock().unwrap().clone();
    let update = abi::to_hex(&abi::UpdateAvatarCall::SELECTOR);
    assert!(sent[1]["data"].as_str().unwrap().starts_with(&update));

    let loaded = eth.load_avatar(avatar.id).await.into_result().unwrap();
    assert_eq!(loaded.email, "robert@example.com");
}

#[tokio::test]
async fn test_missing_record_is_not_found() {
    let (_node, url) = node().await;
    let eth = EthereumProvider::new(config(&url));
    let id = EntityId::new();

    let result = eth.load_avatar(id).await;
    assert_eq!(result.error_code(), Some(ErrorCode::NotFound));
    assert!(result
        .message
        .contains(&format!("Avatar (with id {}) not found", id)));
    assert!(result.message.contains("Error in load_avatar method in Ethereum provider"));
}

#[tokio::test]
async fn test_delete_removes_record() {
    let (_node, url) = node().await;
    let eth = EthereumProvider::new(config(&url));
    let avatar = Avatar::new(EntityId::new(), "carol", "carol@example.com");

    eth.save_avatar(avatar.clone()).await.into_result().unwrap();
    assert!(eth.delete_avatar(avatar.id).await.into_result().unwrap());
    assert_eq!(eth.load_avatar(avatar.id).await.error_code(), Some(ErrorCode::NotFound));
}

#[tokio::test]
async fn test_reverted_save_is_rejected() {
    let (node, url) = node().await;
    let eth = EthereumProvider::new(config(&url));
    *node.revert_next.lock().unwrap() = true;

    let result = eth
        .save_avatar(Avatar::new(EntityId::new(), "dave", "dave@example.com"))
        .await;
    assert_eq!(result.error_code(), Some(ErrorCode::Rejected));
}

#[tokio::test]
async fn test_activation_rejects_wrong_chain() {
    let (_node, url) = node().await;
    let eth = EthereumProvider::new(ProviderConfig::ethereum(&url, "0xprivate", 1, CONTRACT));

    let result = eth.activate().await;
    assert!(result.is_error);
    assert_eq!(result.result, Some(false));
    assert!(result.message.contains("Chain id mismatch"));
    assert!(!eth.is_activated().await);
}

#[tokio::test]
async fn test_unreachable_node() {
    let eth = EthereumProvider::new(config(&dead_endpoint().await));
    let result = eth.get_balance(NODE_ACCOUNT).await;

    assert_eq!(result.error_code(), Some(ErrorCode::Activation));
    assert!(!eth.is_activated().await);
}

#[tokio::test]
async fn test_balance_and_transfers() {
    let (node, url) = node().await;
    let eth = EthereumProvider::new(config(&url));

    let balance = eth.get_balance(NODE_ACCOUNT).await.into_result().unwrap();
    assert_eq!(balance, 1_000_000_000_000_000_000);

    let to = "0x00000000000000000000000000000000000000b2";
    let request = TransactionRequest::new(NODE_ACCOUNT, to, 7).with_memo("rent");
    let receipt = eth.send_transaction(&request).await.into_result().unwrap();
    assert_eq!(receipt.status, TxStatus::Completed);
    assert_eq!(receipt.block_number, Some(16));
    assert_eq!(receipt.amount, Some(7));

    let sent = node.sent.lock().unwrap()[0].clone();
    assert_eq!(sent["value"], "0x7");
    assert_eq!(sent["data"], format!("0x{}", hex::encode("rent")));
}

#[tokio::test]
async fn test_signed_transfer_between_avatars() {
    let (node, url) = node().await;
    let signer = Arc::new(RecordingSigner::default());
    let keys = MockKeys::new()
        .with_wallet("alice", "0x00000000000000000000000000000000000000a1", "alice-key")
        .with_wallet("bob", "0x00000000000000000000000000000000000000b2", "bob-key");
    let eth = EthereumProvider::new(config(&url))
        .with_key_manager(Arc::new(keys))
        .with_signer(signer.clone());

    let receipt = eth
        .send_between_avatars(
            &AvatarRef::Username("alice".into()),
            &AvatarRef::Username("bob".into()),
            1_000,
            None,
        )
        .await;
    assert!(receipt.is_success(), "{}", receipt.message);

    let signed = signer.signed.lock().unwrap().clone();
    assert_eq!(signed.len(), 1);
    let (tx, key) = &signed[0];
    assert_eq!(key, "alice-key");
    assert_eq!(tx.nonce, 5);
    assert_eq!(tx.gas_limit, 21_000);
    assert_eq!(tx.chain_id, CHAIN_ID);
    assert_eq!(tx.from, "0x00000000000000000000000000000000000000a1");
    assert_eq!(node.count("eth_sendRawTransaction"), 1);
    assert_eq!(node.count("eth_sendTransaction"), 0);
}

#[tokio::test]
async fn test_unknown_transaction_is_not_found() {
    let (_node, url) = node().await;
    let eth = EthereumProvider::new(config(&url));

    let result = eth.get_transaction(&tx_hash(0xee)).await;
    assert_eq!(result.error_code(), Some(ErrorCode::NotFound));
}

#[tokio::test]
async fn test_call_view_returns_hex() {
    let (_node, url) = node().await;
    let provider = EthereumProvider::new(config(&url)).into_provider();
    let contracts = provider.contracts().unwrap();

    let out = contracts
        .call_view(CONTRACT, "balanceOf(address)", &[json!(NODE_ACCOUNT)])
        .await
        .into_result()
        .unwrap();
    let decoded = U256::abi_decode(&abi::decode_hex(&out).unwrap(), true).unwrap();
    assert_eq!(decoded, U256::from(42u64));

    let bad = contracts
        .call_view(CONTRACT, "balanceOf(address)", &[])
        .await;
    assert_eq!(bad.error_code(), Some(ErrorCode::InvalidInput));
}

#[tokio::test]
async fn test_enumeration_is_unsupported() {
    let (_node, url) = node().await;
    let eth = EthereumProvider::new(config(&url));

    let all = eth.load_all_avatars().await;
    assert_eq!(all.error_code(), Some(ErrorCode::UnsupportedOperation));
    assert!(eth.is_activated().await);
}

#[tokio::test]
async fn test_provider_key_lookup_activates_first() {
    let (node, url) = node().await;
    let eth = EthereumProvider::new(config(&url));

    let avatar = eth.load_avatar_by_provider_key("not-an-entity-id").await;
    assert_eq!(avatar.error_code(), Some(ErrorCode::InvalidInput));
    assert_eq!(eth.activation_attempts(), 1);
    assert!(eth.is_activated().await);

    let holon = eth.load_holon_by_provider_key("also-not-an-id").await;
    assert_eq!(holon.error_code(), Some(ErrorCode::InvalidInput));
    assert_eq!(eth.activation_attempts(), 1);
    assert_eq!(node.count("eth_chainId"), 1);
}

#[tokio::test]
async fn test_partial_record_info_is_degraded() {
    let (node, url) = node().await;
    let eth = EthereumProvider::new(config(&url));
    let sparse = EntityId::new();
    let corrupt = EntityId::new();
    let positional = EntityId::new();
    node.put_avatar(sparse, r#"{"Username":"eve"}"#);
    node.put_avatar(corrupt, "{not json");
    node.put_avatar(positional, r#"["mallory","mallory@example.com"]"#);

    let result = eth.load_avatar(sparse).await;
    assert!(result.is_success(), "{}", result.message);
    assert_eq!(result.provenance, Provenance::Degraded);
    assert!(result.warnings.iter().any(|w| w.starts_with("email")));
    let avatar = result.value().unwrap();
    assert_eq!(avatar.id, sparse);
    assert_eq!(avatar.username, "eve");
    assert_eq!(avatar.email, "user@ethereum.example");

    let result = eth.load_avatar(corrupt).await;
    assert!(result.is_success());
    assert_eq!(result.provenance, Provenance::Degraded);
    let avatar = result.value().unwrap();
    assert_eq!(avatar.id, corrupt);
    assert_eq!(avatar.username, "ethereum_user");

    let result = eth.load_avatar(positional).await;
    assert!(result.is_success());
    assert_eq!(result.provenance, Provenance::Degraded);
    let avatar = result.value().unwrap();
    assert_eq!(avatar.id, positional);
    assert_eq!(avatar.username, "ethereum_user");
}

#[tokio::test]
async fn test_hostile_abi_reply_is_decode_error() {
    let (node, url) = node().await;
    let eth = EthereumProvider::new(config(&url));
    let id = EntityId::new();
    // offset word pointing far past the reply
    let reply = format!("0x{}{}", "00".repeat(24), "ff".repeat(8));
    node.raw_replies
        .lock()
        .unwrap()
        .insert(U256::from(numeric_entity_id(&id)), reply);

    let result = eth.load_avatar(id).await;
    assert!(result.is_error);
    assert_eq!(result.error_code(), Some(ErrorCode::Decode));
    assert!(result.value().is_none());
}
