//! In-memory holon store for adapters whose chain has no record storage.
//!
//! The repository belongs to the adapter instance, not to its connection,
//! so records survive deactivation and reactivation. Nothing in it was
//! read from a chain.

use crate::entities::{Holon, HolonFilter};
use crate::types::EntityId;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Holons keyed by id.
#[derive(Debug, Default)]
pub struct HolonRepository {
    holons: RwLock<HashMap<EntityId, Holon>>,
}

impl HolonRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced holon keeps its original
    /// `created_date`; a holon without a provider key gets its id.
    pub async fn save(&self, mut holon: Holon) -> Holon {
        let mut holons = self.holons.write().await;
        let now = Utc::now();
        if let Some(existing) = holons.get(&holon.id) {
            holon.created_date = existing.created_date;
        }
        holon.modified_date = now;
        if holon.provider_key.is_none() {
            holon.provider_key = Some(holon.id.to_string());
        }
        holons.insert(holon.id, holon.clone());
        holon
    }

    pub async fn get(&self, id: EntityId) -> Option<Holon> {
        self.holons.read().await.get(&id).cloned()
    }

    pub async fn by_provider_key(&self, key: &str) -> Option<Holon> {
        self.holons
            .read()
            .await
            .values()
            .find(|h| h.provider_key.as_deref() == Some(key))
            .cloned()
    }

    /// Children of `parent`, oldest first.
    pub async fn children(&self, parent: EntityId, filter: HolonFilter) -> Vec<Holon> {
        self.collect(|h| h.parent_id == Some(parent) && filter.matches(h))
            .await
    }

    /// Every holon matching `filter`, oldest first.
    pub async fn all(&self, filter: HolonFilter) -> Vec<Holon> {
        self.collect(|h| filter.matches(h)).await
    }

    /// Returns false if nothing was stored under `id`.
    pub async fn delete(&self, id: EntityId) -> bool {
        self.holons.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.holons.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn collect(&self, keep: impl Fn(&Holon) -> bool) -> Vec<Holon> {
        let mut found: Vec<Holon> = self
            .holons
            .read()
            .await
            .values()
            .filter(|h| keep(h))
            .cloned()
            .collect();
        found.sort_by_key(|h| (h.created_date, h.id));
        found
    }
}
