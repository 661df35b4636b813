//! Lifecycle and operation events.
//!
//! Every adapter owns an `EventManager` and emits standardized events
//! that callers can subscribe to for monitoring.

use crate::errors::ProviderError;
use crate::types::{EntityId, ProviderType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;

/// Event kinds every adapter emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventKind {
    /// Activation handshake succeeded.
    Activated,

    /// Activation handshake or configuration check failed.
    ActivationFailed { message: String },

    /// Provider deactivated and client handle released.
    Deactivated,

    /// Operation completed successfully.
    OperationCompleted {
        operation: String,
        #[serde(with = "duration_millis")]
        duration: Duration,
    },

    /// Operation failed.
    OperationFailed {
        operation: String,
        error_code: String,
        error_message: String,
    },
}

impl EventKind {
    /// Short name, used for filtering.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Activated => "activated",
            Self::ActivationFailed { .. } => "activation_failed",
            Self::Deactivated => "deactivated",
            Self::OperationCompleted { .. } => "operation_completed",
            Self::OperationFailed { .. } => "operation_failed",
        }
    }
}

/// Event emitted by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEvent {
    /// Unique event ID.
    pub id: EntityId,

    /// Which provider emitted this.
    pub provider: ProviderType,

    /// Event type and data.
    #[serde(flatten)]
    pub kind: EventKind,

    /// Timestamp.
    pub timestamp: DateTime<Utc>,
}

impl ProviderEvent {
    /// Create a new event.
    pub fn new(provider: ProviderType, kind: EventKind) -> Self {
        Self {
            id: EntityId::new(),
            provider,
            kind,
            timestamp: Utc::now(),
        }
    }

    // Event constructors

    pub fn activated(provider: ProviderType) -> Self {
        Self::new(provider, EventKind::Activated)
    }

    pub fn activation_failed(provider: ProviderType, error: &ProviderError) -> Self {
        Self::new(
            provider,
            EventKind::ActivationFailed {
                message: error.message.clone(),
            },
        )
    }

    pub fn deactivated(provider: ProviderType) -> Self {
        Self::new(provider, EventKind::Deactivated)
    }

    pub fn operation_completed(
        provider: ProviderType,
        operation: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self::new(
            provider,
            EventKind::OperationCompleted {
                operation: operation.into(),
                duration,
            },
        )
    }

    pub fn operation_failed(
        provider: ProviderType,
        operation: impl Into<String>,
        error: &ProviderError,
    ) -> Self {
        Self::new(
            provider,
            EventKind::OperationFailed {
                operation: operation.into(),
                error_code: error.code.to_string(),
                error_message: error.message.clone(),
            },
        )
    }
}

/// Filter for selecting events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Filter by provider.
    pub provider: Option<ProviderType>,

    /// Filter by event kind names.
    pub kinds: Option<Vec<String>>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_provider(mut self, provider: ProviderType) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn of_kind(mut self, kind: impl Into<String>) -> Self {
        self.kinds.get_or_insert_with(Vec::new).push(kind.into());
        self
    }

    /// Check if an event matches this filter.
    pub fn matches(&self, event: &ProviderEvent) -> bool {
        if let Some(p) = &self.provider {
            if event.provider != *p {
                return false;
            }
        }

        if let Some(kinds) = &self.kinds {
            if !kinds.iter().any(|k| k == event.kind.name()) {
                return false;
            }
        }

        true
    }
}

/// Event receiver (broadcast channel).
pub type EventReceiver = broadcast::Receiver<ProviderEvent>;

/// Event sender (broadcast channel).
pub type EventSender = broadcast::Sender<ProviderEvent>;

/// Broadcast channel plus a bounded buffer of recent events.
pub struct EventManager {
    sender: EventSender,
    recent: Mutex<VecDeque<ProviderEvent>>,
    max_recent: usize,
}

impl EventManager {
    /// Create a new event manager.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            recent: Mutex::new(VecDeque::new()),
            max_recent: 100,
        }
    }

    /// Emit an event.
    pub fn emit(&self, event: ProviderEvent) {
        {
            let mut recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
            recent.push_back(event.clone());
            while recent.len() > self.max_recent {
                recent.pop_front();
            }
        }

        // No subscribers is not an error
        let _ = self.sender.send(event);
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Get recent events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ProviderEvent> {
        let recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
        recent.iter().rev().take(limit).cloned().collect()
    }

    /// Recent events matching a filter, newest first.
    pub fn recent_matching(&self, filter: &EventFilter, limit: usize) -> Vec<ProviderEvent> {
        let recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
        recent
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect()
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("subscribers", &self.sender.receiver_count())
            .field("max_recent", &self.max_recent)
            .finish()
    }
}

// Duration serialization as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = ProviderEvent::activated(ProviderType::Aptos);
        assert!(matches!(event.kind, EventKind::Activated));
        assert_eq!(event.provider, ProviderType::Aptos);
    }

    #[test]
    fn test_event_filter() {
        let event = ProviderEvent::deactivated(ProviderType::Ethereum);
        assert!(EventFilter::new()
            .for_provider(ProviderType::Ethereum)
            .matches(&event));
        assert!(!EventFilter::new()
            .for_provider(ProviderType::Aztec)
            .matches(&event));
        assert!(EventFilter::new().of_kind("deactivated").matches(&event));
        assert!(!EventFilter::new().of_kind("activated").matches(&event));
    }

    #[test]
    fn test_event_manager_bounded() {
        let manager = EventManager::new(10);
        for _ in 0..150 {
            manager.emit(ProviderEvent::activated(ProviderType::Aptos));
        }
        assert_eq!(manager.recent(1000).len(), 100);
    }

    #[tokio::test]
    async fn test_subscribe_receives() {
        let manager = EventManager::new(8);
        let mut rx = manager.subscribe();
        let err = ProviderError::transport("down");
        manager.emit(ProviderEvent::operation_failed(
            ProviderType::Aztec,
            "load_holon",
            &err,
        ));

        let event = rx.recv().await.unwrap();
        match event.kind {
            EventKind::OperationFailed { error_code, .. } => assert_eq!(error_code, "TRANSPORT"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_event_serialization() {
        let event = ProviderEvent::operation_completed(
            ProviderType::Aptos,
            "load_avatar",
            Duration::from_millis(42),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "operation_completed");
        assert_eq!(json["duration"], 42);
    }
}
