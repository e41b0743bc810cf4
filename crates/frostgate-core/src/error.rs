use thiserror::Error;

use crate::state::CollectionState;

/// Canonical error type for lifecycle and proxy operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity was not found.
    #[error("{entity} `{id}` was not found")]
    NotFound {
        /// Entity type name (e.g. `"collection"`).
        entity: &'static str,
        /// Identifier of the missing entity.
        id: String,
    },

    /// A state transition outside the lifecycle graph was attempted.
    #[error("collection `{name}` cannot move from {from} to {to}")]
    InvalidTransition {
        /// Collection the transition was attempted on.
        name: String,
        /// Current recorded state.
        from: CollectionState,
        /// Rejected target state.
        to: CollectionState,
    },

    /// The search engine answered with a non-success status.
    #[error("engine returned {status}: {body}")]
    Engine {
        /// Upstream HTTP status code.
        status: u16,
        /// Upstream response body, as far as it could be read.
        body: String,
    },

    /// A snapshot is missing one of its two required artifacts.
    #[error("snapshot for `{collection}` is missing {artifact}")]
    SnapshotIncomplete {
        /// Collection the snapshot belongs to.
        collection: String,
        /// The absent artifact file name.
        artifact: &'static str,
    },

    /// State store backend error.
    #[error("state store error: {0}")]
    StorageError(String),

    /// Invalid configuration detected at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error occurred during snapshot or network operations.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unexpected internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable details for debugging purposes.
        message: String,
    },
}

impl CoreError {
    /// Creates a `NotFound` variant.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates an `Internal` variant.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a `Config` variant.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True when the error carries an upstream 404.
    #[must_use]
    pub fn is_engine_not_found(&self) -> bool {
        matches!(self, Self::Engine { status: 404, .. })
    }
}

/// Convenient result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
