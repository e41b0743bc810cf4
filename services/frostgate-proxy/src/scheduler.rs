//! Idle scheduler: a periodic control loop that finds collections idle past
//! the configured threshold, drains them, and offloads them to disk.
//!
//! Marking a collection Draining happens immediately on detection so the
//! proxy starts rejecting writes; the actual offload only runs after a grace
//! period, and renewed activity during that window cancels it. The
//! "recently accessed" check deliberately reuses the full idle window, not
//! the grace window: a collection must be silent across idle + grace before
//! it is unloaded.

use std::sync::Arc;
use std::time::Duration;

use frostgate_core::{metrics, CollectionState, CoreResult, SchedulerConfig};
use frostgate_state::StateStore;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::lifecycle::LifecycleManager;

pub struct IdleScheduler {
    store: Arc<dyn StateStore>,
    manager: Arc<LifecycleManager>,
    offload_after: chrono::Duration,
    grace_period: Duration,
    tick_interval: Duration,
    drain_slots: Arc<Semaphore>,
}

impl IdleScheduler {
    pub fn new(
        store: Arc<dyn StateStore>,
        manager: Arc<LifecycleManager>,
        config: &SchedulerConfig,
    ) -> Self {
        Self::with_timings(
            store,
            manager,
            chrono::Duration::seconds(config.offload_after_secs as i64),
            config.drain_grace(),
            config.tick_interval(),
            config.max_concurrent_drains,
        )
    }

    /// Constructor with explicit timings, mainly for tests that need
    /// sub-second windows.
    pub fn with_timings(
        store: Arc<dyn StateStore>,
        manager: Arc<LifecycleManager>,
        offload_after: chrono::Duration,
        grace_period: Duration,
        tick_interval: Duration,
        max_concurrent_drains: usize,
    ) -> Self {
        Self {
            store,
            manager,
            offload_after,
            grace_period,
            tick_interval,
            drain_slots: Arc::new(Semaphore::new(max_concurrent_drains)),
        }
    }

    /// Starts the ticking control loop.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        info!(interval = ?scheduler.tick_interval, "idle scheduler started");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.tick_interval);
            // interval fires immediately; the first real tick comes one
            // period later, matching a plain ticker
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = scheduler.run_once().await {
                    error!(error = %err, "scheduler tick failed");
                }
                scheduler.publish_state_gauges().await;
            }
        })
    }

    /// One tick: mark every idle hot collection Draining and launch its
    /// drain-and-offload sequence. Public so tests can drive ticks directly.
    pub async fn run_once(self: &Arc<Self>) -> CoreResult<()> {
        let idle = self.store.list_idle_since(self.offload_after).await?;

        for name in idle {
            info!(
                collection = %name,
                idle_threshold_secs = self.offload_after.num_seconds(),
                "marking draining"
            );
            if let Err(err) = self.store.set(&name, CollectionState::Draining).await {
                // Raced by another actor; skip this collection, not the tick
                warn!(collection = %name, error = %err, "failed to mark draining");
                continue;
            }

            let scheduler = Arc::clone(self);
            tokio::spawn(async move {
                let permit = match Arc::clone(&scheduler.drain_slots).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                scheduler.drain_and_offload(&name).await;
                drop(permit);
            });
        }

        Ok(())
    }

    async fn drain_and_offload(&self, name: &str) {
        tokio::time::sleep(self.grace_period).await;

        // State might have changed while we slept
        match self.store.get(name).await {
            Ok(Some(CollectionState::Draining)) => {}
            Ok(_) => {
                debug!(collection = %name, "drain aborted: state changed");
                return;
            }
            Err(err) => {
                error!(collection = %name, error = %err, "drain aborted: state check failed");
                return;
            }
        }

        match self
            .store
            .was_recently_accessed(name, self.offload_after)
            .await
        {
            Ok(true) => {
                info!(collection = %name, "offload cancelled: activity resumed, reverting to hot");
                self.revert_to_hot(name).await;
                return;
            }
            Ok(false) => {}
            Err(err) => {
                error!(collection = %name, error = %err, "drain aborted: access check failed");
                return;
            }
        }

        info!(collection = %name, "offloading after drain");
        if let Err(err) = self.manager.offload(name).await {
            warn!(collection = %name, error = %err, "offload failed, reverting to hot");
            self.revert_to_hot(name).await;
        }
    }

    async fn revert_to_hot(&self, name: &str) {
        if let Err(err) = self.store.set(name, CollectionState::Hot).await {
            error!(collection = %name, error = %err, "failed to revert state to hot");
        }
    }

    /// Publishes per-state collection counts after every tick.
    pub async fn publish_state_gauges(&self) {
        match self.store.count_by_state().await {
            Ok(counts) => metrics::update_state_gauges(&counts),
            Err(err) => warn!(error = %err, "failed to publish state gauges"),
        }
    }
}
