//! Handlers for calculation requests and their items.
//!
//! Every handler maps the bearer token to an [`Actor`] and delegates to the
//! workflow service, which owns authorization and state checks.
//!
//! [`Actor`]: debroglie_core::roles::Actor

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use debroglie_core::types::DbId;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireReviewer;
use crate::query::RequestListParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `PUT /calculation-requests/{id}`.
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// Request body for `PUT /calculation-requests/{id}/review`.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub action: ReviewAction,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

/// Request body for `PUT /calculation-requests/{id}/items/{particle_id}`.
#[derive(Debug, Deserialize)]
pub struct SetVelocityRequest {
    /// Velocity in m/s.
    pub velocity: f64,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /api/v1/calculation-requests/draft
///
/// The caller's draft id and item count, or `null` when there is none.
pub async fn draft_summary(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let summary = state.workflow.draft_summary(&auth.actor()).await?;
    Ok(Json(DataResponse { data: summary }))
}

/// GET /api/v1/calculation-requests
pub async fn list_requests(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<RequestListParams>,
) -> AppResult<impl IntoResponse> {
    let filter = params.into_filter()?;
    let requests = state.workflow.list(filter, &auth.actor()).await?;
    Ok(Json(DataResponse { data: requests }))
}

/// GET /api/v1/calculation-requests/{id}
pub async fn get_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let detail = state.workflow.get(id, &auth.actor()).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// GET /api/v1/calculation-requests/{id}/history
pub async fn get_history(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let history = state.workflow.history(id, &auth.actor()).await?;
    Ok(Json(DataResponse { data: history }))
}

// ---------------------------------------------------------------------------
// Draft editing
// ---------------------------------------------------------------------------

/// PUT /api/v1/calculation-requests/{id}
pub async fn rename_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RenameRequest>,
) -> AppResult<impl IntoResponse> {
    let request = state
        .workflow
        .rename(id, &auth.actor(), &input.name)
        .await?;
    Ok(Json(DataResponse { data: request }))
}

/// POST /api/v1/calculation-requests/{id}/items/{particle_id}
pub async fn add_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, particle_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let item = state
        .workflow
        .add_item(id, &auth.actor(), particle_id)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

/// PUT /api/v1/calculation-requests/{id}/items/{particle_id}
pub async fn set_item_velocity(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, particle_id)): Path<(DbId, DbId)>,
    Json(input): Json<SetVelocityRequest>,
) -> AppResult<impl IntoResponse> {
    let item = state
        .workflow
        .set_item_parameter(id, &auth.actor(), particle_id, input.velocity)
        .await?;
    Ok(Json(DataResponse { data: item }))
}

/// DELETE /api/v1/calculation-requests/{id}/items/{particle_id}
pub async fn remove_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, particle_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    state
        .workflow
        .remove_item(id, &auth.actor(), particle_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

/// PUT /api/v1/calculation-requests/{id}/submit
pub async fn submit_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let request = state.workflow.submit(id, &auth.actor()).await?;
    tracing::info!(
        request_id = id,
        user_id = auth.user_id,
        "Calculation request submitted"
    );
    Ok(Json(DataResponse { data: request }))
}

/// DELETE /api/v1/calculation-requests/{id}
///
/// Only drafts can be deleted. The row is kept with status `deleted`.
pub async fn delete_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.workflow.delete(id, &auth.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/calculation-requests/{id}/review
///
/// Approve (computes every wavelength) or reject a formed request.
pub async fn review_request(
    RequireReviewer(reviewer): RequireReviewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ReviewRequest>,
) -> AppResult<impl IntoResponse> {
    let approve = matches!(input.action, ReviewAction::Approve);
    let detail = state
        .workflow
        .review(id, &reviewer.actor(), approve)
        .await?;

    tracing::info!(
        request_id = id,
        user_id = reviewer.user_id,
        action = ?input.action,
        "Calculation request reviewed"
    );
    Ok(Json(DataResponse { data: detail }))
}
