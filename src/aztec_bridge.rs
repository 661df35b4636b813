//! Client for the Aztec bridge service.
//!
//! The bridge service is a small Node process wrapping Aztec.js. It owns
//! the wallet accounts and submits contract calls on their behalf:
//!
//! ```text
//! POST {bridge_service_url}/api/send-transaction
//! { "accountAlias", "contractAddress", "functionName", "args" }
//! -> { "success", "txHash", "error"? }
//! ```

use crate::config::keys;
use crate::errors::{ProviderError, ProviderResult, SuggestedAction};
use crate::http::HttpJson;
use serde::{Deserialize, Serialize};

const SEND_TRANSACTION: &str = "/api/send-transaction";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendTransactionBody<'a> {
    account_alias: &'a str,
    contract_address: &'a str,
    function_name: &'a str,
    args: &'a [serde_json::Value],
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SendTransactionReply {
    success: bool,
    tx_hash: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

/// A transaction the service accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub tx_hash: String,
    /// Set when the hash does not look like an Aztec transaction hash
    pub warning: Option<String>,
}

/// True for `0x` followed by exactly 64 hex digits.
pub fn is_tx_hash(hash: &str) -> bool {
    hash.len() == 66
        && hash.starts_with("0x")
        && hash[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Bridge-service handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BridgeServiceClient {
    http: HttpJson,
    account_alias: Option<String>,
}

impl BridgeServiceClient {
    pub fn new(http: HttpJson, account_alias: Option<String>) -> Self {
        Self {
            http,
            account_alias: account_alias.filter(|a| !a.trim().is_empty()),
        }
    }

    pub fn base(&self) -> &str {
        self.http.base()
    }

    pub fn account_alias(&self) -> Option<&str> {
        self.account_alias.as_deref()
    }

    /// Submit `function` on `contract` from the configured account.
    pub async fn send_transaction(
        &self,
        contract: &str,
        function: &str,
        args: &[serde_json::Value],
    ) -> ProviderResult<Submitted> {
        let alias = self
            .account_alias
            .as_deref()
            .ok_or_else(|| ProviderError::missing_config(keys::ACCOUNT_ALIAS))?;
        if contract.trim().is_empty() {
            return Err(ProviderError::invalid_input("Contract address is empty"));
        }

        let body = SendTransactionBody {
            account_alias: alias,
            contract_address: contract,
            function_name: function,
            args,
        };
        tracing::debug!(
            target: "chain_providers::aztec",
            contract,
            function,
            args = args.len(),
            "bridge service submission"
        );

        let reply: SendTransactionReply = self
            .http
            .post_json(SEND_TRANSACTION, &body, "Bridge service transaction")
            .await?;

        if !reply.success {
            let reason = reply
                .error
                .or(reply.message)
                .unwrap_or_else(|| "no reason given".to_string());
            return Err(ProviderError::rejected(format!(
                "Bridge service refused {}: {}",
                function, reason
            ))
            .with_context("contract", contract)
            .with_context("function", function));
        }

        let tx_hash = reply
            .tx_hash
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::decode("Bridge service reported success without a txHash")
                    .with_suggestion(SuggestedAction::ReportBug)
            })?;

        let warning = (!is_tx_hash(&tx_hash)).then(|| {
            tracing::warn!(
                target: "chain_providers::aztec",
                %tx_hash,
                "unexpected transaction hash shape"
            );
            format!("transaction hash {} is not 0x plus 64 hex digits", tx_hash)
        });
        Ok(Submitted { tx_hash, warning })
    }
}
