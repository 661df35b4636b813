//! The uniform operation envelope.
//!
//! Every public provider operation returns an `OperationResult<T>`,
//! created fresh per call. If `is_error` is true, `result` may still
//! hold a best-effort default, which callers must not treat as
//! authoritative.

use crate::errors::{ErrorCode, ProviderError};
use crate::types::ProviderType;
use serde::Serialize;

/// Where the payload of a successful result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Decoded in full from a chain response
    Verified,

    /// Decoded from a chain response, with some fields substituted
    /// by deterministic fallbacks (listed in `warnings`)
    Degraded,

    /// Adapter-side data that was never read from a chain
    Local,

    /// No payload, or a non-authoritative default on error
    None,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified => write!(f, "verified"),
            Self::Degraded => write!(f, "degraded"),
            Self::Local => write!(f, "local"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Outcome of one provider operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult<T> {
    /// Payload. On error, at most a non-authoritative default.
    pub result: Option<T>,

    /// True if the operation failed
    pub is_error: bool,

    /// Human-readable outcome
    pub message: String,

    /// Underlying fault, when `is_error` is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<ProviderError>,

    /// Origin of `result`
    pub provenance: Provenance,

    /// Non-fatal issues (fallback fields, skipped sources)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl<T> OperationResult<T> {
    /// Verified success
    pub fn success(value: T, message: impl Into<String>) -> Self {
        Self {
            result: Some(value),
            is_error: false,
            message: message.into(),
            fault: None,
            provenance: Provenance::Verified,
            warnings: vec![],
        }
    }

    /// Success built partly from fallbacks
    pub fn degraded(value: T, message: impl Into<String>, warnings: Vec<String>) -> Self {
        Self {
            provenance: Provenance::Degraded,
            warnings,
            ..Self::success(value, message)
        }
    }

    /// Success served from adapter-side data
    pub fn local(value: T, message: impl Into<String>) -> Self {
        Self {
            provenance: Provenance::Local,
            ..Self::success(value, message)
        }
    }

    /// Failure with no payload
    pub fn error(fault: ProviderError) -> Self {
        Self {
            result: None,
            is_error: true,
            message: fault.to_display_message(),
            fault: Some(fault),
            provenance: Provenance::None,
            warnings: vec![],
        }
    }

    /// Failure carrying a best-effort default
    pub fn error_with_default(fault: ProviderError, default: T) -> Self {
        Self {
            result: Some(default),
            ..Self::error(fault)
        }
    }

    /// Operation impossible on this chain
    pub fn unsupported(provider: ProviderType, operation: &str) -> Self {
        Self::error(ProviderError::unsupported(provider, operation))
    }

    /// On failure, carry `default` as the best-effort payload.
    pub fn with_error_default(mut self, default: T) -> Self {
        if self.is_error && self.result.is_none() {
            self.result = Some(default);
        }
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// True if the operation succeeded
    pub fn is_success(&self) -> bool {
        !self.is_error
    }

    /// Payload of a successful result
    pub fn value(&self) -> Option<&T> {
        if self.is_error {
            None
        } else {
            self.result.as_ref()
        }
    }

    /// Error code of a failed result
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.fault.as_ref().map(|f| f.code)
    }

    /// Convert into a plain `Result`, dropping any error default.
    pub fn into_result(self) -> Result<T, ProviderError> {
        if self.is_error {
            return Err(self
                .fault
                .unwrap_or_else(|| ProviderError::internal(self.message)));
        }
        self.result
            .ok_or_else(|| ProviderError::internal("Successful result without a payload"))
    }

    /// Map the payload, keeping every other field.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<U> {
        OperationResult {
            result: self.result.map(f),
            is_error: self.is_error,
            message: self.message,
            fault: self.fault,
            provenance: self.provenance,
            warnings: self.warnings,
        }
    }
}

impl<T> From<ProviderError> for OperationResult<T> {
    fn from(fault: ProviderError) -> Self {
        Self::error(fault)
    }
}
