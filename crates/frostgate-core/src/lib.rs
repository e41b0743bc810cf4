//! Core types for the Frostgate hibernation proxy: the collection lifecycle
//! state machine, the canonical error type, configuration, and the
//! Prometheus metric registry.

pub mod config;
pub mod error;
pub mod metrics;
pub mod state;

pub use config::{
    EngineConfig, FrostgateConfig, LifecycleConfig, ReloadMode, SchedulerConfig, ServerConfig,
    SnapshotConfig, StateConfig,
};
pub use error::{CoreError, CoreResult};
pub use state::{ensure_transition, CollectionRecord, CollectionState};
