//! Provider lifecycle and the operation envelope.
//!
//! Every adapter holds an `AdapterCore`. The core owns the activation
//! slot (the lazily built client handle), and every public operation
//! runs through `AdapterCore::guarded`, which:
//!
//! 1. obtains the client, activating at most once if needed,
//! 2. propagates an activation failure unchanged,
//! 3. runs the body and converts any fault into `is_error = true`,
//! 4. emits an event and logs the outcome.
//!
//! Nothing is retried. Each call makes at most one attempt.

use crate::config::ProviderConfig;
use crate::errors::{ProviderError, ProviderResult, SuggestedAction};
use crate::events::{EventManager, ProviderEvent};
use crate::result::OperationResult;
use crate::translate::Translated;
use crate::types::{ProviderInfo, ProviderType};
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::RwLock;

/// Per-chain connection setup.
///
/// `connect` builds the client handle and runs the connectivity check.
/// The handle must be cheap to clone and safe for concurrent reuse.
#[async_trait]
pub trait Connect: Send + Sync + 'static {
    type Client: Clone + Send + Sync + 'static;

    async fn connect(&self, config: &ProviderConfig) -> ProviderResult<Self::Client>;

    /// Rewrite a fault raised by an operation body.
    fn describe_fault(&self, _operation: &str, fault: ProviderError) -> ProviderError {
        fault
    }
}

/// Lifecycle every provider exposes.
#[async_trait]
pub trait ProviderLifecycle: Send + Sync {
    fn info(&self) -> &ProviderInfo;

    fn provider_type(&self) -> ProviderType {
        self.info().provider_type
    }

    /// Idempotent. Probes the endpoint only if not yet active.
    async fn activate(&self) -> OperationResult<bool>;

    /// Always succeeds and releases the client handle.
    async fn deactivate(&self) -> OperationResult<bool>;

    async fn is_activated(&self) -> bool;

    /// Activate if needed, at most one attempt.
    async fn ensure_activated(&self) -> ProviderResult<()>;

    /// Number of activation handshakes run so far.
    fn activation_attempts(&self) -> u64;

    fn events(&self) -> &EventManager;
}

/// Shared state and envelope behind every adapter.
pub struct AdapterCore<K: Connect> {
    info: ProviderInfo,
    config: ProviderConfig,
    connector: K,
    client: RwLock<Option<K::Client>>,
    activation_attempts: AtomicU64,
    events: EventManager,
}

impl<K: Connect> AdapterCore<K> {
    pub fn new(info: ProviderInfo, config: ProviderConfig, connector: K) -> Self {
        Self {
            info,
            config,
            connector,
            client: RwLock::new(None),
            activation_attempts: AtomicU64::new(0),
            events: EventManager::default(),
        }
    }

    pub fn info(&self) -> &ProviderInfo {
        &self.info
    }

    pub fn provider_type(&self) -> ProviderType {
        self.info.provider_type
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn connector(&self) -> &K {
        &self.connector
    }

    pub fn events(&self) -> &EventManager {
        &self.events
    }

    pub fn activation_attempts(&self) -> u64 {
        self.activation_attempts.load(Ordering::SeqCst)
    }

    pub async fn is_activated(&self) -> bool {
        self.client.read().await.is_some()
    }

    pub async fn activate(&self) -> OperationResult<bool> {
        let mut slot = self.client.write().await;
        if slot.is_some() {
            return OperationResult::success(
                true,
                format!("{} provider is already activated", self.provider_type()),
            );
        }

        match self.handshake().await {
            Ok(client) => {
                *slot = Some(client);
                let message = format!("{} provider activated", self.provider_type());
                OperationResult::success(true, message)
            }
            Err(err) => OperationResult::error_with_default(err, false),
        }
    }

    pub async fn deactivate(&self) -> OperationResult<bool> {
        let released = self.client.write().await.take().is_some();
        if released {
            tracing::info!(
                target: "chain_providers::lifecycle",
                provider = %self.provider_type(),
                "provider deactivated"
            );
            self.events.emit(ProviderEvent::deactivated(self.provider_type()));
        }
        OperationResult::success(true, format!("{} provider deactivated", self.provider_type()))
    }

    /// The client handle, activating once if the slot is empty.
    pub async fn client(&self) -> ProviderResult<K::Client> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut slot = self.client.write().await;
        // Another caller may have activated while we waited.
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = self.handshake().await?;
        *slot = Some(client.clone());
        Ok(client)
    }

    pub async fn ensure_activated(&self) -> ProviderResult<()> {
        self.client().await.map(|_| ())
    }

    async fn handshake(&self) -> ProviderResult<K::Client> {
        let attempt = self.activation_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let provider = self.provider_type();

        match self.connector.connect(&self.config).await {
            Ok(client) => {
                tracing::info!(
                    target: "chain_providers::lifecycle",
                    %provider,
                    endpoint = %self.config.endpoint,
                    network = %self.config.network,
                    attempt,
                    "provider activated"
                );
                self.events.emit(ProviderEvent::activated(provider));
                Ok(client)
            }
            Err(err) => {
                let err = if err.suggested_action.is_none() {
                    err.with_suggestion(SuggestedAction::Reactivate)
                } else {
                    err
                };
                tracing::warn!(
                    target: "chain_providers::lifecycle",
                    %provider,
                    endpoint = %self.config.endpoint,
                    attempt,
                    error = %err,
                    "activation failed"
                );
                self.events.emit(ProviderEvent::activation_failed(provider, &err));
                Err(err)
            }
        }
    }

    /// Run `body` inside the envelope; success is `Verified`.
    pub async fn guarded<T, F, Fut>(&self, operation: &str, body: F) -> OperationResult<T>
    where
        F: FnOnce(K::Client) -> Fut + Send,
        Fut: Future<Output = ProviderResult<T>> + Send,
        T: Send,
    {
        let provider = self.provider_type();
        self.guarded_with(operation, |client| async move {
            body(client).await.map(|value| {
                OperationResult::success(value, format!("{} {} succeeded", provider, operation))
            })
        })
        .await
    }

    /// Run a translating `body`; fallbacks make the result `Degraded`.
    pub async fn guarded_translated<T, F, Fut>(
        &self,
        operation: &str,
        body: F,
    ) -> OperationResult<T>
    where
        F: FnOnce(K::Client) -> Fut + Send,
        Fut: Future<Output = ProviderResult<Translated<T>>> + Send,
        T: Send,
    {
        let provider = self.provider_type();
        self.guarded_with(operation, |client| async move {
            let translated = body(client).await?;
            if translated.is_degraded() {
                let warnings = translated.warnings();
                Ok(OperationResult::degraded(
                    translated.entity,
                    format!("{} {} succeeded with fallback fields", provider, operation),
                    warnings,
                ))
            } else {
                Ok(OperationResult::success(
                    translated.entity,
                    format!("{} {} succeeded", provider, operation),
                ))
            }
        })
        .await
    }

    /// Run a `body` that builds its own result (local data, warnings).
    pub async fn guarded_with<T, F, Fut>(&self, operation: &str, body: F) -> OperationResult<T>
    where
        F: FnOnce(K::Client) -> Fut + Send,
        Fut: Future<Output = ProviderResult<OperationResult<T>>> + Send,
        T: Send,
    {
        let provider = self.provider_type();
        let client = match self.client().await {
            Ok(client) => client,
            Err(err) => {
                self.events
                    .emit(ProviderEvent::operation_failed(provider, operation, &err));
                return OperationResult::error(err);
            }
        };

        let started = Instant::now();
        let outcome = body(client).await;

        match outcome {
            Ok(result) if !result.is_error => {
                tracing::debug!(
                    target: "chain_providers::lifecycle",
                    %provider,
                    operation,
                    provenance = %result.provenance,
                    warnings = result.warnings.len(),
                    "operation completed"
                );
                self.events.emit(ProviderEvent::operation_completed(
                    provider,
                    operation,
                    started.elapsed(),
                ));
                result
            }
            Ok(result) => {
                let fault = result
                    .fault
                    .clone()
                    .unwrap_or_else(|| ProviderError::internal(result.message.clone()));
                self.record_failure(operation, &fault);
                result
            }
            Err(fault) => {
                let fault = self.connector.describe_fault(operation, fault);
                self.record_failure(operation, &fault);
                OperationResult::error(fault)
            }
        }
    }

    fn record_failure(&self, operation: &str, fault: &ProviderError) {
        let provider = self.provider_type();
        tracing::warn!(
            target: "chain_providers::lifecycle",
            %provider,
            operation,
            code = %fault.code,
            error = %fault.message,
            "operation failed"
        );
        self.events
            .emit(ProviderEvent::operation_failed(provider, operation, fault));
    }

    /// Activate once, then report `operation` as unsupported.
    pub async fn unsupported<T>(&self, operation: &str) -> OperationResult<T> {
        if let Err(err) = self.ensure_activated().await {
            return OperationResult::error(err);
        }
        OperationResult::unsupported(self.provider_type(), operation)
    }
}

impl<K: Connect> std::fmt::Debug for AdapterCore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterCore")
            .field("provider", &self.info.provider_type)
            .field("endpoint", &self.config.endpoint)
            .field("activation_attempts", &self.activation_attempts())
            .finish()
    }
}

/// Implement `ProviderLifecycle` for an adapter with a `core` field.
macro_rules! delegate_lifecycle {
    ($adapter:ty) => {
        #[async_trait::async_trait]
        impl $crate::lifecycle::ProviderLifecycle for $adapter {
            fn info(&self) -> &$crate::types::ProviderInfo {
                self.core.info()
            }

            async fn activate(&self) -> $crate::result::OperationResult<bool> {
                self.core.activate().await
            }

            async fn deactivate(&self) -> $crate::result::OperationResult<bool> {
                self.core.deactivate().await
            }

            async fn is_activated(&self) -> bool {
                self.core.is_activated().await
            }

            async fn ensure_activated(&self) -> $crate::errors::ProviderResult<()> {
                self.core.ensure_activated().await
            }

            fn activation_attempts(&self) -> u64 {
                self.core.activation_attempts()
            }

            fn events(&self) -> &$crate::events::EventManager {
                self.core.events()
            }
        }
    };
}

pub(crate) use delegate_lifecycle;
