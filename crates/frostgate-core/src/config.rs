//! Configuration management for Frostgate.
//!
//! Supports multiple configuration sources with precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file specified by `FROSTGATE_CONFIG`
//! 3. `./config/frostgate.yaml`
//! 4. Hardcoded defaults (lowest priority)

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Reload strategy applied by the proxy when a cold collection is hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadMode {
    /// Hold the client request open while the reload runs, then retry once.
    Blocking,
    /// Answer immediately with a warming-up response and reload out of band.
    Async,
}

/// Root configuration structure for the Frostgate proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FrostgateConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub state: StateConfig,

    #[serde(default)]
    pub snapshot: SnapshotConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Socket address the proxy listens on.
    pub listen_addr: String,
}

/// Search engine endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Base URL of the search engine, e.g. `http://localhost:8108`.
    pub url: String,
    /// API key sent on lifecycle calls against the engine.
    pub api_key: String,
    /// Request timeout for lifecycle calls, in seconds.
    pub timeout_secs: u64,
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// State store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateConfig {
    /// SQLite database URL, e.g. `sqlite://frostgate.db`.
    pub database_url: String,
    /// Max connections in the pool.
    pub max_connections: u32,
}

/// Snapshot storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnapshotConfig {
    /// Directory that holds one subdirectory per hibernated collection.
    pub dir: String,
}

/// Lifecycle manager and proxy interception configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LifecycleConfig {
    /// How the proxy reacts to cold-collection hits.
    pub reload_mode: ReloadMode,
    /// Global bound on concurrently executing reloads.
    pub max_concurrent_reloads: usize,
    /// How long a blocking-mode request waits on a reload, in seconds.
    pub blocking_wait_secs: u64,
    /// `Retry-After` hint sent with warming-up responses, in seconds.
    pub retry_after_secs: u64,
}

impl LifecycleConfig {
    pub fn blocking_wait(&self) -> Duration {
        Duration::from_secs(self.blocking_wait_secs)
    }
}

/// Idle scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Idle threshold after which a hot collection is marked draining.
    pub offload_after_secs: u64,
    /// Grace period between marking draining and actually offloading.
    pub drain_grace_secs: u64,
    /// Interval between scheduler ticks.
    pub tick_interval_secs: u64,
    /// Bound on concurrently running drain-and-offload tasks.
    pub max_concurrent_drains: usize,
}

impl SchedulerConfig {
    pub fn offload_after(&self) -> Duration {
        Duration::from_secs(self.offload_after_secs)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_secs(self.drain_grace_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8108".to_string(),
            api_key: "xyz".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://frostgate.db".to_string(),
            max_connections: 8,
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            dir: "./snapshots".to_string(),
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            reload_mode: ReloadMode::Async,
            max_concurrent_reloads: 2,
            blocking_wait_secs: 3,
            retry_after_secs: 2,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            offload_after_secs: 6 * 60 * 60,
            drain_grace_secs: 30,
            tick_interval_secs: 10 * 60,
            max_concurrent_drains: 8,
        }
    }
}

impl FrostgateConfig {
    /// Load configuration from defaults, optional files, and `FROSTGATE_*`
    /// environment variables (e.g. `FROSTGATE_LIFECYCLE__RELOAD_MODE=blocking`).
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        builder = Self::set_defaults(builder)?;

        if let Ok(config_path) = std::env::var("FROSTGATE_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder
            .add_source(File::with_name("./config/frostgate").required(false))
            .add_source(
                Environment::with_prefix("FROSTGATE")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: FrostgateConfig = builder.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("server.listen_addr", "0.0.0.0:8080")?
            .set_default("engine.url", "http://localhost:8108")?
            .set_default("engine.api_key", "xyz")?
            .set_default("engine.timeout_secs", 30)?
            .set_default("state.database_url", "sqlite://frostgate.db")?
            .set_default("state.max_connections", 8)?
            .set_default("snapshot.dir", "./snapshots")?
            .set_default("lifecycle.reload_mode", "async")?
            .set_default("lifecycle.max_concurrent_reloads", 2)?
            .set_default("lifecycle.blocking_wait_secs", 3)?
            .set_default("lifecycle.retry_after_secs", 2)?
            .set_default("scheduler.offload_after_secs", 6 * 60 * 60)?
            .set_default("scheduler.drain_grace_secs", 30)?
            .set_default("scheduler.tick_interval_secs", 10 * 60)?
            .set_default("scheduler.max_concurrent_drains", 8)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lifecycle.max_concurrent_reloads == 0 {
            return Err(ConfigError::Message(
                "lifecycle.max_concurrent_reloads must be > 0".to_string(),
            ));
        }
        if self.lifecycle.blocking_wait_secs == 0 {
            return Err(ConfigError::Message(
                "lifecycle.blocking_wait_secs must be > 0".to_string(),
            ));
        }
        if self.scheduler.tick_interval_secs == 0 {
            return Err(ConfigError::Message(
                "scheduler.tick_interval_secs must be > 0".to_string(),
            ));
        }
        if self.scheduler.offload_after_secs == 0 {
            return Err(ConfigError::Message(
                "scheduler.offload_after_secs must be > 0".to_string(),
            ));
        }
        if self.scheduler.max_concurrent_drains == 0 {
            return Err(ConfigError::Message(
                "scheduler.max_concurrent_drains must be > 0".to_string(),
            ));
        }
        if self.state.max_connections == 0 {
            return Err(ConfigError::Message(
                "state.max_connections must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Logs the effective lifecycle settings at startup for operability.
    pub fn summary(&self) -> String {
        format!(
            "reload_mode={:?} max_concurrent_reloads={} offload_after={}s drain_grace={}s tick_interval={}s",
            self.lifecycle.reload_mode,
            self.lifecycle.max_concurrent_reloads,
            self.scheduler.offload_after_secs,
            self.scheduler.drain_grace_secs,
            self.scheduler.tick_interval_secs,
        )
    }
}
