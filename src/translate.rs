//! Wire-to-entity translation.
//!
//! A translator decodes a raw response into a typed schema in one step,
//! then builds the entity. Missing fields are filled from a `Fallback`
//! and named in `Translated::fallbacks`; a body that does not decode at
//! all yields the full fallback entity instead of an error.

use crate::errors::{ProviderError, ProviderResult};
use crate::identity::derive_entity_id;
use crate::types::{EntityId, ProviderType};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

/// Marker used when the whole record came from fallbacks.
pub const WHOLE_RECORD: &str = "record";

/// Deterministic defaults available to a translator.
#[derive(Debug, Clone)]
pub struct Fallback {
    pub provider: ProviderType,

    /// Chain-native key the record was requested by
    pub natural_key: String,

    /// Id the caller already knows, if any
    pub id: Option<EntityId>,

    /// Timestamp used for missing dates
    pub now: DateTime<Utc>,
}

impl Fallback {
    pub fn new(provider: ProviderType, natural_key: impl Into<String>) -> Self {
        Self {
            provider,
            natural_key: natural_key.into(),
            id: None,
            now: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: Option<EntityId>) -> Self {
        self.id = id;
        self
    }

    /// Known id, else derived from the natural key.
    pub fn entity_id(&self) -> EntityId {
        self.id
            .unwrap_or_else(|| derive_entity_id(self.provider, &self.natural_key))
    }

    /// Id derived from another natural key of the same provider.
    pub fn derive(&self, natural_key: &str) -> EntityId {
        derive_entity_id(self.provider, natural_key)
    }
}

/// An entity plus the names of the fields that fell back.
#[derive(Debug, Clone, PartialEq)]
pub struct Translated<T> {
    pub entity: T,
    pub fallbacks: Vec<&'static str>,
}

impl<T> Translated<T> {
    pub fn verified(entity: T) -> Self {
        Self {
            entity,
            fallbacks: vec![],
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.fallbacks.is_empty()
    }

    /// One warning line per substituted field.
    pub fn warnings(&self) -> Vec<String> {
        self.fallbacks
            .iter()
            .map(|field| format!("{} substituted with a fallback value", field))
            .collect()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Translated<U> {
        Translated {
            entity: f(self.entity),
            fallbacks: self.fallbacks,
        }
    }
}

/// Records which fields fell back while building an entity.
#[derive(Debug, Default)]
pub struct FallbackLog(Vec<&'static str>);

impl FallbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take `value`, or record `field` and use `default`.
    pub fn take<T>(
        &mut self,
        field: &'static str,
        value: Option<T>,
        default: impl FnOnce() -> T,
    ) -> T {
        match value {
            Some(v) => v,
            None => {
                self.0.push(field);
                default()
            }
        }
    }

    /// Like `take`, treating blank strings as missing.
    pub fn text(
        &mut self,
        field: &'static str,
        value: Option<String>,
        default: impl FnOnce() -> String,
    ) -> String {
        self.take(field, non_blank(value), default)
    }

    pub fn finish<T>(self, entity: T) -> Translated<T> {
        Translated {
            entity,
            fallbacks: self.0,
        }
    }
}

/// `None` for missing or whitespace-only strings.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Per-chain conversion from a wire schema into a domain entity.
pub trait Translator {
    /// Typed wire shape; every field optional.
    type Schema: DeserializeOwned;

    type Entity;

    /// Build from a decoded schema, filling gaps from `fallback`.
    fn build(schema: Self::Schema, fallback: &Fallback) -> Translated<Self::Entity>;

    /// Entity made entirely of fallbacks.
    fn fallback(fallback: &Fallback) -> Self::Entity;

    /// The single schema-validating decode step.
    fn decode(raw: &[u8]) -> ProviderResult<Self::Schema> {
        let value: serde_json::Value =
            serde_json::from_slice(raw).map_err(|e| ProviderError::decode(e.to_string()))?;
        Self::decode_value(value)
    }

    /// Schemas are records: anything but a JSON object is rejected, so a
    /// sequence never fills struct fields by position.
    fn decode_value(value: serde_json::Value) -> ProviderResult<Self::Schema> {
        if !value.is_object() {
            return Err(ProviderError::decode(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }
        serde_json::from_value(value).map_err(|e| ProviderError::decode(e.to_string()))
    }

    /// Decode and build. Never fails.
    fn translate(raw: &[u8], fallback: &Fallback) -> Translated<Self::Entity> {
        match Self::decode(raw) {
            Ok(schema) => Self::build(schema, fallback),
            Err(err) => Self::whole_fallback(fallback, &err),
        }
    }

    /// Same as `translate`, for an already-parsed JSON value.
    fn translate_value(value: serde_json::Value, fallback: &Fallback) -> Translated<Self::Entity> {
        match Self::decode_value(value) {
            Ok(schema) => Self::build(schema, fallback),
            Err(err) => Self::whole_fallback(fallback, &err),
        }
    }

    #[doc(hidden)]
    fn whole_fallback(fallback: &Fallback, err: &ProviderError) -> Translated<Self::Entity> {
        tracing::debug!(
            target: "chain_providers::translate",
            provider = %fallback.provider,
            natural_key = %fallback.natural_key,
            error = %err.message,
            "response did not decode, using fallback record"
        );
        Translated {
            entity: Self::fallback(fallback),
            fallbacks: vec![WHOLE_RECORD],
        }
    }
}
