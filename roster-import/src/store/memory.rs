//! In-memory store
//!
//! Keeps insertion order per kind so registries built from it behave like the
//! SQLite store's `ORDER BY rowid`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{CanonicalEntity, EntityKind, RegistryKind, WriteKind};
use crate::resolve::normalize::normalize_identifier;
use crate::validate::{NaturalKey, ValidatedPayload};

use super::{BatchRecord, CanonicalStore, StoreError, Upserted};

#[derive(Debug, Default)]
struct MemoryState {
    /// (natural key, entity) per kind, in insertion order
    entities: HashMap<EntityKind, Vec<(String, CanonicalEntity)>>,
    batches: Vec<BatchRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an existing entity, keyed by its normalized identifier
    pub fn seed(&self, kind: EntityKind, entity: CanonicalEntity) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let key = normalize_identifier(&entity.primary_identifier);
        state.entities.entry(kind).or_default().push((key, entity));
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CanonicalStore for MemoryStore {
    async fn find_all(&self, kind: RegistryKind) -> Result<Vec<CanonicalEntity>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .entities
            .get(&kind.entity_kind())
            .map(|entries| entries.iter().map(|(_, e)| e.clone()).collect())
            .unwrap_or_default())
    }

    async fn upsert(
        &self,
        key: &NaturalKey,
        payload: &ValidatedPayload,
    ) -> Result<Upserted, StoreError> {
        let mut state = self.lock()?;
        let entries = state.entities.entry(key.kind).or_default();

        if let Some((_, existing)) = entries.iter_mut().find(|(k, _)| *k == key.value) {
            let entity = payload.to_entity(existing.id);
            *existing = entity.clone();
            return Ok(Upserted {
                entity,
                write: WriteKind::Updated,
            });
        }

        let entity = payload.to_entity(Uuid::new_v4());
        entries.push((key.value.clone(), entity.clone()));
        Ok(Upserted {
            entity,
            write: WriteKind::Created,
        })
    }

    async fn count(&self, kind: EntityKind) -> Result<usize, StoreError> {
        let state = self.lock()?;
        Ok(state.entities.get(&kind).map_or(0, Vec::len))
    }

    async fn record_batch(&self, record: &BatchRecord) -> Result<(), StoreError> {
        self.lock()?.batches.push(record.clone());
        Ok(())
    }

    async fn load_batch(&self, batch_id: Uuid) -> Result<Option<BatchRecord>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .batches
            .iter()
            .find(|b| b.batch_id == batch_id)
            .cloned())
    }
}
