//! Administrative lifecycle endpoints.
//!
//! These bypass the normal state guards at the caller's risk: a forced
//! reload runs even when the collection is not Cold, and a forced offload
//! marks the collection Draining before immediately draining it.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use frostgate_core::{CollectionState, CoreError};
use serde::Serialize;
use tracing::{error, info};

use crate::state::AppState;

/// Error response body shared by the admin endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// API error wrapper mapping [`CoreError`] onto HTTP statuses.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::NotFound { .. } | CoreError::SnapshotIncomplete { .. } => {
                StatusCode::NOT_FOUND
            }
            CoreError::InvalidTransition { .. } => StatusCode::CONFLICT,
            _ => {
                error!(error = %self.0, "admin operation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// `POST /admin/reload/{collection}`: force a reload regardless of state.
pub async fn admin_reload(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!(collection = %collection, "admin reload requested");
    state.manager.force_reload(&collection).await?;
    Ok((StatusCode::OK, "collection reloaded\n"))
}

/// `POST /admin/offload/{collection}`: mark Draining, then offload now.
pub async fn admin_offload(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!(collection = %collection, "admin offload requested");
    state
        .store
        .force_set(&collection, CollectionState::Draining)
        .await?;
    state.manager.offload(&collection).await?;
    Ok((StatusCode::OK, "collection offloaded\n"))
}
