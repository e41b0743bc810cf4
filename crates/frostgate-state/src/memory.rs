use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use frostgate_core::{ensure_transition, CollectionRecord, CollectionState, CoreResult};
use tokio::sync::RwLock;

use crate::StateStore;

/// In-memory state store for tests and single-process development runs.
///
/// Mirrors the SQLite semantics exactly: validated transitions, touch is a
/// no-op for unknown collections, idle listing only considers Hot records
/// that have a last-access timestamp.
#[derive(Default)]
pub struct MemoryStateStore {
    records: RwLock<HashMap<String, CollectionRecord>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn upsert(&self, name: &str, state: CollectionState) {
        let mut records = self.records.write().await;
        let now = Utc::now();
        records
            .entry(name.to_string())
            .and_modify(|record| {
                record.state = state;
                record.updated_at = now;
            })
            .or_insert_with(|| CollectionRecord {
                name: name.to_string(),
                state,
                last_accessed_at: None,
                updated_at: now,
            });
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, name: &str) -> CoreResult<Option<CollectionState>> {
        let records = self.records.read().await;
        Ok(records.get(name).map(|record| record.state))
    }

    async fn set(&self, name: &str, state: CollectionState) -> CoreResult<()> {
        let current = self.get(name).await?;
        ensure_transition(name, current, state)?;
        self.upsert(name, state).await;
        Ok(())
    }

    async fn force_set(&self, name: &str, state: CollectionState) -> CoreResult<()> {
        self.upsert(name, state).await;
        Ok(())
    }

    async fn exists(&self, name: &str) -> CoreResult<bool> {
        let records = self.records.read().await;
        Ok(records.contains_key(name))
    }

    async fn touch(&self, name: &str) -> CoreResult<()> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(name) {
            record.last_accessed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_idle_since(&self, idle_for: Duration) -> CoreResult<Vec<String>> {
        let cutoff = Utc::now() - idle_for;
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|record| record.state == CollectionState::Hot)
            .filter(|record| matches!(record.last_accessed_at, Some(at) if at < cutoff))
            .map(|record| record.name.clone())
            .collect())
    }

    async fn was_recently_accessed(&self, name: &str, window: Duration) -> CoreResult<bool> {
        let cutoff = Utc::now() - window;
        let records = self.records.read().await;
        Ok(records
            .get(name)
            .and_then(|record| record.last_accessed_at)
            .is_some_and(|at| at > cutoff))
    }

    async fn count_by_state(&self) -> CoreResult<HashMap<CollectionState, i64>> {
        let records = self.records.read().await;
        let mut out = HashMap::new();
        for record in records.values() {
            *out.entry(record.state).or_insert(0) += 1;
        }
        Ok(out)
    }
}
