//! Shared application state threaded through the router.

use std::sync::Arc;
use std::time::Duration;

use frostgate_core::{LifecycleConfig, ReloadMode};
use frostgate_state::StateStore;
use tokio::sync::watch;
use tracing::error;

use crate::lifecycle::LifecycleManager;
use crate::proxy::Upstream;
use crate::singleflight::ReloadGate;

/// Proxy-facing interception settings, derived from [`LifecycleConfig`].
#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub reload_mode: ReloadMode,
    pub blocking_wait: Duration,
    pub retry_after_secs: u64,
}

impl ProxySettings {
    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self {
            reload_mode: config.reload_mode,
            blocking_wait: config.blocking_wait(),
            retry_after_secs: config.retry_after_secs,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StateStore>,
    pub manager: Arc<LifecycleManager>,
    pub upstream: Arc<Upstream>,
    pub gate: Arc<ReloadGate>,
    pub settings: Arc<ProxySettings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn StateStore>,
        manager: Arc<LifecycleManager>,
        upstream: Arc<Upstream>,
        settings: ProxySettings,
    ) -> Self {
        Self {
            store,
            manager,
            upstream,
            gate: Arc::new(ReloadGate::new()),
            settings: Arc::new(settings),
        }
    }

    /// Single-flight reload trigger.
    ///
    /// Returns a completion signal that resolves once the in-flight reload
    /// for this collection finishes, whether this caller initiated it or
    /// joined one that was already running.
    pub fn spawn_reload(&self, name: &str) -> watch::Receiver<bool> {
        let (rx, leader) = self.gate.join(name);
        if let Some(tx) = leader {
            let manager = Arc::clone(&self.manager);
            let gate = Arc::clone(&self.gate);
            let name = name.to_string();
            tokio::spawn(async move {
                if let Err(err) = manager.reload(&name).await {
                    error!(collection = %name, error = %err, "background reload failed");
                }
                gate.finish(&name, tx);
            });
        }
        rx
    }
}
