//! Lifecycle manager: performs reload (disk -> engine) and offload
//! (engine -> disk) transitions, guarded by the current recorded state and
//! bounded by a global reload semaphore.

use std::sync::Arc;
use std::time::Instant;

use frostgate_core::{metrics, CollectionState, CoreError, CoreResult};
use frostgate_state::StateStore;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::engine::EngineClient;
use crate::snapshot::SnapshotStore;

/// Whether a reload call actually moved the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The collection was reloaded into the engine.
    Reloaded,
    /// The precondition did not hold; nothing was done.
    Skipped,
}

pub struct LifecycleManager {
    engine: Arc<EngineClient>,
    snapshots: Arc<SnapshotStore>,
    store: Arc<dyn StateStore>,
    reload_slots: Semaphore,
}

impl LifecycleManager {
    pub fn new(
        engine: Arc<EngineClient>,
        snapshots: Arc<SnapshotStore>,
        store: Arc<dyn StateStore>,
        max_concurrent_reloads: usize,
    ) -> Self {
        Self {
            engine,
            snapshots,
            store,
            reload_slots: Semaphore::new(max_concurrent_reloads),
        }
    }

    /// Revives a cold collection from its snapshot.
    ///
    /// No-op unless the current state is Cold: racing callers may nudge a
    /// transition freely and a mismatched precondition is not an error. On
    /// failure the state is reverted to Cold so the very next access retries.
    pub async fn reload(&self, name: &str) -> CoreResult<ReloadOutcome> {
        if self.store.get(name).await? != Some(CollectionState::Cold) {
            debug!(collection = %name, "reload skipped: not cold");
            return Ok(ReloadOutcome::Skipped);
        }

        let _permit = self
            .reload_slots
            .acquire()
            .await
            .map_err(|_| CoreError::internal("reload semaphore closed"))?;

        // The state may have moved while we waited for a slot.
        if self.store.get(name).await? != Some(CollectionState::Cold) {
            debug!(collection = %name, "reload skipped: raced while waiting for slot");
            return Ok(ReloadOutcome::Skipped);
        }

        let started = Instant::now();
        info!(collection = %name, "reload start");
        self.store.set(name, CollectionState::Loading).await?;

        match self.run_reload(name).await {
            Ok(()) => {
                self.store.set(name, CollectionState::Hot).await?;
                metrics::RELOAD_TOTAL.inc();
                metrics::RELOAD_DURATION.observe(started.elapsed().as_secs_f64());
                info!(
                    collection = %name,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "reload complete"
                );
                Ok(ReloadOutcome::Reloaded)
            }
            Err(err) => {
                warn!(collection = %name, error = %err, "reload failed, reverting to cold");
                if let Err(revert) = self.store.set(name, CollectionState::Cold).await {
                    error!(collection = %name, error = %revert, "failed to revert state to cold");
                }
                Err(err)
            }
        }
    }

    /// Administrative reload that bypasses the Cold precondition, at the
    /// caller's risk.
    pub async fn force_reload(&self, name: &str) -> CoreResult<()> {
        info!(collection = %name, "forced reload start");
        self.store.force_set(name, CollectionState::Loading).await?;

        match self.run_reload(name).await {
            Ok(()) => {
                self.store.force_set(name, CollectionState::Hot).await?;
                metrics::RELOAD_TOTAL.inc();
                info!(collection = %name, "forced reload complete");
                Ok(())
            }
            Err(err) => {
                warn!(collection = %name, error = %err, "forced reload failed, reverting to cold");
                if let Err(revert) = self.store.force_set(name, CollectionState::Cold).await {
                    error!(collection = %name, error = %revert, "failed to revert state to cold");
                }
                Err(err)
            }
        }
    }

    async fn run_reload(&self, name: &str) -> CoreResult<()> {
        let snapshot = self.snapshots.load(name).await?;
        self.engine.create_collection(&snapshot.schema).await?;
        self.engine.import_documents(name, snapshot.documents).await
    }

    /// Hibernate a draining collection to disk and delete it from the engine.
    ///
    /// No-op unless the current state is Draining. Any failure aborts without
    /// changing state; the caller decides recovery.
    pub async fn offload(&self, name: &str) -> CoreResult<()> {
        if self.store.get(name).await? != Some(CollectionState::Draining) {
            debug!(collection = %name, "offload skipped: not draining");
            return Ok(());
        }

        info!(collection = %name, "offload start");

        let schema = self.engine.get_schema(name).await?;
        self.snapshots.save_schema(name, &schema).await?;

        let documents = self.engine.export_documents(name).await?;
        self.snapshots.save_documents(name, documents).await?;

        self.engine.delete_collection(name).await?;

        self.store.set(name, CollectionState::Cold).await?;
        metrics::OFFLOAD_TOTAL.inc();
        info!(collection = %name, "offload complete");
        Ok(())
    }
}
