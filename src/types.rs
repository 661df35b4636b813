//! Shared types used across all providers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Every chain this crate has an adapter for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Aptos,
    Ethereum,
    Aztec,
}

impl ProviderType {
    /// Stable lowercase key, used in derived identifiers and log targets.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Aptos => "aptos",
            Self::Ethereum => "ethereum",
            Self::Aztec => "aztec",
        }
    }

    /// Human-readable chain name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Aptos => "Aptos",
            Self::Ethereum => "Ethereum",
            Self::Aztec => "Aztec",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Static description of an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub provider_type: ProviderType,
    pub name: String,
    pub description: String,
    pub version: semver::Version,
    pub website: Option<String>,
}

impl ProviderInfo {
    pub fn new(
        provider_type: ProviderType,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            provider_type,
            name: name.into(),
            description: description.into(),
            version: semver::Version::new(1, 0, 0),
            website: None,
        }
    }

    pub fn with_version(mut self, version: semver::Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }
}

/// Capability that a provider offers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub description: String,
}

impl Capability {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Generic metadata map.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Provider-specific metadata side-map, keyed by provider type.
pub type ProviderMetadata = HashMap<ProviderType, HashMap<String, String>>;

/// Identifier of a domain entity (UUID-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Parse a hyphenated or simple UUID string.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(Self)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
