//! Error types shared by every provider adapter.
//!
//! Two error layers:
//!
//! 1. **RpcError**: a JSON-RPC 2.0 error object returned by a chain node
//!    (unknown method, bad params, execution reverted).
//!
//! 2. **ProviderError**: the adapter-level fault carried inside
//!    `OperationResult::fault`. An `RpcError` is folded into a
//!    `ProviderError` with code `Rejected` before it leaves the adapter.
//!
//! # Boundary rule
//!
//! Nothing in this module is ever returned as `Err` from a public
//! operation. Operations return `OperationResult<T>` with `is_error: true`
//! and the `ProviderError` attached as the fault.

use crate::types::ProviderType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════
// LAYER 1: JSON-RPC error objects (returned by chain nodes)
// ═══════════════════════════════════════════════════════════════════

/// Standard JSON-RPC 2.0 error codes, plus the EVM revert code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpcErrorCode {
    /// JSON parse error (-32700)
    ParseError,

    /// Invalid JSON-RPC request (-32600)
    InvalidRequest,

    /// Method not found (-32601)
    MethodNotFound,

    /// Invalid method parameters (-32602)
    InvalidParams,

    /// Internal JSON-RPC error (-32603)
    InternalError,

    /// Execution reverted (3), returned by geth-style nodes for `eth_call`
    ExecutionReverted,

    /// Any server-defined code outside the table above
    Server(i64),
}

impl RpcErrorCode {
    /// Classify a numeric JSON-RPC error code.
    pub fn from_code(code: i64) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            3 => Self::ExecutionReverted,
            other => Self::Server(other),
        }
    }

    /// Get the numeric JSON-RPC error code
    pub fn code(&self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ExecutionReverted => 3,
            Self::Server(code) => *code,
        }
    }
}

impl std::fmt::Display for RpcErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseError => write!(f, "Parse error"),
            Self::InvalidRequest => write!(f, "Invalid request"),
            Self::MethodNotFound => write!(f, "Method not found"),
            Self::InvalidParams => write!(f, "Invalid params"),
            Self::InternalError => write!(f, "Internal error"),
            Self::ExecutionReverted => write!(f, "Execution reverted"),
            Self::Server(code) => write!(f, "Server error {}", code),
        }
    }
}

/// JSON-RPC error object as it appears on the wire.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("[{code}] {message}")]
pub struct RpcError {
    /// Numeric JSON-RPC error code
    pub code: i64,

    /// Node-supplied message
    pub message: String,

    /// Optional structured data (revert reason, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    /// Create a new RPC error
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Add structured data to the error
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Classified error code
    pub fn kind(&self) -> RpcErrorCode {
        RpcErrorCode::from_code(self.code)
    }
}

impl From<RpcError> for ProviderError {
    fn from(e: RpcError) -> Self {
        let kind = e.kind();
        let mut err = ProviderError::rejected(format!("{}: {}", kind, e.message))
            .with_context("rpc_code", e.code);
        if let Some(data) = e.data {
            err = err.with_context("rpc_data", data);
        }
        err
    }
}

// ═══════════════════════════════════════════════════════════════════
// LAYER 2: Adapter faults (carried inside OperationResult)
// ═══════════════════════════════════════════════════════════════════

/// Fault produced by a provider adapter.
///
/// Carried as `OperationResult::fault`; never thrown across the
/// adapter boundary.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("[{code}] {message}")]
pub struct ProviderError {
    /// Error code (machine-readable)
    pub code: ErrorCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Additional context (for debugging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, serde_json::Value>>,

    /// Is this recoverable?
    pub recoverable: bool,

    /// Suggested action for recovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<SuggestedAction>,
}

impl ProviderError {
    /// Create a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let severity = code.default_severity();
        let recoverable = code.is_typically_recoverable();

        Self {
            code,
            severity,
            message: message.into(),
            context: None,
            recoverable,
            suggested_action: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let context = self.context.get_or_insert_with(HashMap::new);
        if let Ok(v) = serde_json::to_value(value) {
            context.insert(key.into(), v);
        }
        self
    }

    /// Set recoverable flag
    pub fn recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }

    /// Set suggested action
    pub fn with_suggestion(mut self, action: SuggestedAction) -> Self {
        self.suggested_action = Some(action);
        self
    }

    /// Set severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Prefix the message, keeping code and context.
    pub fn prefixed(mut self, prefix: impl std::fmt::Display) -> Self {
        self.message = format!("{}{}", prefix, self.message);
        self
    }

    /// Read a context value back.
    pub fn context_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.context.as_ref().and_then(|c| c.get(key))
    }

    /// Format as a caller-facing message.
    ///
    /// Includes what went wrong AND what to try instead.
    pub fn to_display_message(&self) -> String {
        let mut msg = format!("Error: {}", self.message);
        if let Some(ref action) = self.suggested_action {
            match action {
                SuggestedAction::Retry { after_ms } => {
                    msg.push_str(&format!(". Retry after {}ms", after_ms));
                }
                SuggestedAction::Alternative { description } => {
                    msg.push_str(&format!(". Try: {}", description));
                }
                SuggestedAction::UserAction { description } => {
                    msg.push_str(&format!(". User action needed: {}", description));
                }
                SuggestedAction::Reactivate => {
                    msg.push_str(". Try deactivating and activating the provider");
                }
                SuggestedAction::CheckConfig { key } => {
                    msg.push_str(&format!(". Check config key: {}", key));
                }
                SuggestedAction::ReportBug => {
                    msg.push_str(". This may be a bug, please report it");
                }
            }
        }
        msg
    }

    // ═══════════════════════════════════════════════════════════
    // Common error constructors
    // ═══════════════════════════════════════════════════════════

    /// Network/HTTP failure reaching the endpoint
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Transport, message)
    }

    /// Provider misconfigured or endpoint unreachable during activation
    pub fn activation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Activation, message)
    }

    /// Response arrived but did not match the expected shape
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Decode, message)
    }

    /// Well-formed "no such record" answer from the chain
    pub fn not_found(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        Self::new(ErrorCode::NotFound, format!("{} not found", resource)).with_suggestion(
            SuggestedAction::Alternative {
                description: "Check the id or provider key of the record".into(),
            },
        )
    }

    /// Operation impossible on this chain
    pub fn unsupported(provider: ProviderType, operation: &str) -> Self {
        Self::new(
            ErrorCode::UnsupportedOperation,
            format!("{} is not supported by the {} provider", operation, provider),
        )
        .with_context("provider", provider)
        .with_context("operation", operation)
    }

    /// Invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Key manager could not supply keys or addresses
    pub fn key_management(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::KeyManagement, message)
    }

    /// The chain refused the request
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Rejected, message)
    }

    /// Internal error (bug)
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
            .with_severity(Severity::Fatal)
            .recoverable(false)
            .with_suggestion(SuggestedAction::ReportBug)
    }

    /// Missing configuration value
    pub fn missing_config(key: &str) -> Self {
        Self::activation(format!("Missing configuration value: {}", key))
            .with_suggestion(SuggestedAction::CheckConfig { key: key.into() })
    }
}

impl Default for ProviderError {
    fn default() -> Self {
        Self::new(ErrorCode::Internal, "Unknown error")
    }
}

/// Error codes shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Network/HTTP failure reaching the chain endpoint
    Transport,

    /// Provider not configured or endpoint unreachable during activation
    Activation,

    /// Response could not be parsed into the expected shape
    Decode,

    /// No such record on chain
    NotFound,

    /// Operation impossible on this chain
    UnsupportedOperation,

    /// Caller supplied bad arguments
    InvalidInput,

    /// Key manager could not supply keys or addresses
    KeyManagement,

    /// Chain accepted the request but refused it (RPC error, revert)
    Rejected,

    /// Internal error (bug)
    Internal,
}

impl ErrorCode {
    /// Get default severity for this error code
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::Internal => Severity::Fatal,
            Self::Decode => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Check if this error is typically recoverable
    pub fn is_typically_recoverable(&self) -> bool {
        match self {
            Self::Internal | Self::UnsupportedOperation => false,
            Self::Transport | Self::Activation => true, // Can retry later
            Self::NotFound => true,                      // Can try different id
            Self::InvalidInput | Self::KeyManagement => true, // Can fix input
            Self::Decode | Self::Rejected => true,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Transport => "TRANSPORT",
            Self::Activation => "ACTIVATION",
            Self::Decode => "DECODE",
            Self::NotFound => "NOT_FOUND",
            Self::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            Self::InvalidInput => "INVALID_INPUT",
            Self::KeyManagement => "KEY_MANAGEMENT",
            Self::Rejected => "REJECTED",
            Self::Internal => "INTERNAL",
        };
        write!(f, "{}", s)
    }
}

/// Severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational, not really an error
    Info,

    /// Warning, operation may have partially succeeded
    Warning,

    /// Error, operation failed but recoverable
    Error,

    /// Fatal, adapter is in a bad state
    Fatal,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

/// Suggested actions for error recovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Retry the operation
    Retry {
        /// Milliseconds to wait before retry
        after_ms: u64,
    },

    /// Use a different approach
    Alternative {
        /// Description of the alternative
        description: String,
    },

    /// User intervention needed
    UserAction {
        /// Description of what the user should do
        description: String,
    },

    /// Deactivate and activate the provider again
    Reactivate,

    /// Check configuration
    CheckConfig {
        /// Configuration key to check
        key: String,
    },

    /// Contact support / report bug
    ReportBug,
}

// Implement From for common error types

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        let mut err = if e.is_decode() {
            ProviderError::decode(format!("Malformed response body: {}", e))
        } else {
            ProviderError::transport(format!("HTTP error: {}", e))
                .with_suggestion(SuggestedAction::Retry { after_ms: 1000 })
        };
        if let Some(status) = e.status() {
            err = err.with_context("http_status", status.as_u16());
        }
        if let Some(url) = e.url() {
            err = err.with_context("url", url.as_str());
        }
        err
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError::decode(format!("JSON error: {}", e))
    }
}

/// Result type alias used inside adapters
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ProviderError::not_found("Avatar 42");
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(err.recoverable);
        assert!(err.message.contains("Avatar 42"));
    }

    #[test]
    fn test_error_with_context() {
        let err = ProviderError::invalid_input("bad address")
            .with_context("field", "to")
            .with_context("provided", "");

        assert!(err.context.is_some());
        assert_eq!(err.context_value("field").unwrap(), "to");
    }

    #[test]
    fn test_error_serialization() {
        let err = ProviderError::unsupported(ProviderType::Aptos, "mint_nft");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("UNSUPPORTED_OPERATION"));

        let recovered: ProviderError = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered.code, ErrorCode::UnsupportedOperation);
        assert!(!recovered.recoverable);
    }

    #[test]
    fn test_rpc_error_folds_into_rejected() {
        let rpc = RpcError::new(3, "execution reverted")
            .with_data(serde_json::json!("0x08c379a0"));
        assert_eq!(rpc.kind(), RpcErrorCode::ExecutionReverted);

        let err: ProviderError = rpc.into();
        assert_eq!(err.code, ErrorCode::Rejected);
        assert_eq!(err.context_value("rpc_code").unwrap(), 3);
        assert!(err.message.contains("Execution reverted"));
    }

    #[test]
    fn test_rpc_error_code_values() {
        assert_eq!(RpcErrorCode::ParseError.code(), -32700);
        assert_eq!(RpcErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(RpcErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(RpcErrorCode::InvalidParams.code(), -32602);
        assert_eq!(RpcErrorCode::InternalError.code(), -32603);
        assert_eq!(RpcErrorCode::from_code(-32000), RpcErrorCode::Server(-32000));
    }

    #[test]
    fn test_display_message_formatting() {
        let err = ProviderError::not_found("Holon abc");
        let msg = err.to_display_message();
        assert!(msg.contains("Holon abc not found"));
        assert!(msg.contains("Try:"));

        let err2 = ProviderError::missing_config("private_key");
        assert!(err2.to_display_message().contains("Check config key: private_key"));
    }

    #[test]
    fn test_prefixed_keeps_code() {
        let err = ProviderError::decode("bad word").prefixed("Error in load_avatar. Reason: ");
        assert_eq!(err.code, ErrorCode::Decode);
        assert!(err.message.starts_with("Error in load_avatar"));
    }
}
