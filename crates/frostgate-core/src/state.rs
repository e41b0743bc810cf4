//! The collection lifecycle state machine.
//!
//! Every collection the system has observed is in exactly one of four
//! states. Transitions follow a fixed graph; the state store rejects
//! anything outside it so drivers never have to re-validate the graph
//! themselves:
//!
//! ```text
//!   Hot ──► Draining ──► Cold ──► Loading ──► Hot
//!              │                     │
//!              └──────► Hot ◄────────┘ (cancellation / reload failure → Cold)
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Lifecycle state of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionState {
    /// Fully loaded in the search engine, serving live traffic.
    Hot,
    /// Scheduler-initiated soft shutdown; writes rejected, offload pending.
    Draining,
    /// Unloaded; only a snapshot exists on disk.
    Cold,
    /// A reload from snapshot is in progress.
    Loading,
}

impl CollectionState {
    /// All states, in gauge-publication order.
    pub const ALL: [CollectionState; 4] = [
        CollectionState::Hot,
        CollectionState::Draining,
        CollectionState::Cold,
        CollectionState::Loading,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionState::Hot => "hot",
            CollectionState::Draining => "draining",
            CollectionState::Cold => "cold",
            CollectionState::Loading => "loading",
        }
    }

    /// Whether the lifecycle graph permits moving from `self` to `next`.
    ///
    /// `Draining -> Hot` is drain cancellation (or the scheduler's safe
    /// fallback after a failed offload); `Loading -> Cold` is the revert
    /// applied when a reload fails partway.
    #[must_use]
    pub fn can_transition(self, next: CollectionState) -> bool {
        use CollectionState::*;
        matches!(
            (self, next),
            (Hot, Draining)
                | (Draining, Cold)
                | (Draining, Hot)
                | (Cold, Loading)
                | (Loading, Hot)
                | (Loading, Cold)
        )
    }
}

impl FromStr for CollectionState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" => Ok(CollectionState::Hot),
            "draining" => Ok(CollectionState::Draining),
            "cold" => Ok(CollectionState::Cold),
            "loading" => Ok(CollectionState::Loading),
            _ => Err(CoreError::internal(format!("invalid state: {s}"))),
        }
    }
}

impl fmt::Display for CollectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted lifecycle record for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRecord {
    /// Unique collection name.
    pub name: String,
    /// Current lifecycle state.
    pub state: CollectionState,
    /// Timestamp of the last successful proxied access, if any.
    pub last_accessed_at: Option<DateTime<Utc>>,
    /// Timestamp of the last state transition.
    pub updated_at: DateTime<Utc>,
}

/// Validates a requested transition at the store choke point.
///
/// An unknown collection (`current == None`) may be inserted in any state:
/// that is how the system first observes a collection. Re-setting the
/// current state is accepted so racing drivers can nudge a transition
/// without erroring.
pub fn ensure_transition(
    name: &str,
    current: Option<CollectionState>,
    next: CollectionState,
) -> CoreResult<()> {
    match current {
        None => Ok(()),
        Some(from) if from == next => Ok(()),
        Some(from) if from.can_transition(next) => Ok(()),
        Some(from) => Err(CoreError::InvalidTransition {
            name: name.to_string(),
            from,
            to: next,
        }),
    }
}
