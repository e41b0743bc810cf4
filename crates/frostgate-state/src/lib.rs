//! Durable lifecycle-state adapters for the Frostgate control plane.
//!
//! The [`StateStore`] trait is the single synchronization point shared by the
//! proxy, the lifecycle manager, and the idle scheduler. Implementations must
//! validate every `set` against the lifecycle transition graph so illegal
//! transitions are rejected at one choke point instead of in every caller.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Duration;
use frostgate_core::{CollectionState, CoreResult};

mod memory;
mod sqlite;

pub use memory::MemoryStateStore;
pub use sqlite::{create_sqlite_pool, run_migrations, SqliteStateStore, MIGRATOR};

/// Authoritative record of each collection's lifecycle state and last access.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current state, or `None` for a collection the system has never observed.
    async fn get(&self, name: &str) -> CoreResult<Option<CollectionState>>;

    /// Records a state transition, validated against the lifecycle graph.
    /// Inserting a previously unknown collection is always permitted.
    async fn set(&self, name: &str, state: CollectionState) -> CoreResult<()>;

    /// Records a state transition without consulting the transition graph.
    /// Reserved for administrative overrides.
    async fn force_set(&self, name: &str, state: CollectionState) -> CoreResult<()>;

    /// Whether the collection has ever been observed by the system.
    async fn exists(&self, name: &str) -> CoreResult<bool>;

    /// Updates the last-access timestamp. No-op for unknown collections.
    async fn touch(&self, name: &str) -> CoreResult<()>;

    /// Hot collections whose last access predates now minus `idle_for`.
    async fn list_idle_since(&self, idle_for: Duration) -> CoreResult<Vec<String>>;

    /// Whether the collection was accessed within the trailing `window`.
    async fn was_recently_accessed(&self, name: &str, window: Duration) -> CoreResult<bool>;

    /// Number of collections per lifecycle state.
    async fn count_by_state(&self) -> CoreResult<HashMap<CollectionState, i64>>;
}
