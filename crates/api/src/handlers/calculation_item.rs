//! Handlers for per-item computation results.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use debroglie_core::types::DbId;
use debroglie_core::workflow::model::ItemResult;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::callback::CallbackSecret;
use crate::middleware::rbac::RequireReviewer;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body for the result endpoints: `{"wavelength": 7.27e-10}` or
/// `{"rejected": true}`.
#[derive(Debug, Deserialize)]
pub struct ItemResultBody {
    /// Wavelength in metres.
    pub wavelength: Option<f64>,
    #[serde(default)]
    pub rejected: bool,
}

impl ItemResultBody {
    fn into_result(self) -> Result<ItemResult, AppError> {
        match (self.wavelength, self.rejected) {
            (Some(wavelength), false) => Ok(ItemResult::Wavelength(wavelength)),
            (None, true) => Ok(ItemResult::Rejected),
            _ => Err(AppError::BadRequest(
                "Provide exactly one of \"wavelength\" or \"rejected\": true".into(),
            )),
        }
    }
}

/// PUT /api/v1/calculation-items/{id}/result
///
/// Callback from the computation service. Authenticated by the
/// `X-Callback-Secret` header only.
pub async fn report_result(
    CallbackSecret(secret): CallbackSecret,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ItemResultBody>,
) -> AppResult<impl IntoResponse> {
    let result = input.into_result()?;
    let outcome = state
        .workflow
        .report_item_result(id, result, &secret)
        .await?;

    tracing::info!(
        item_id = id,
        request_id = outcome.request.id,
        transitioned = outcome.transitioned,
        "Computation result received"
    );
    Ok(Json(DataResponse { data: outcome }))
}

/// PUT /api/v1/calculation-items/{id}/reviewer-result
///
/// Manual result entry by a reviewer.
pub async fn record_result(
    RequireReviewer(reviewer): RequireReviewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ItemResultBody>,
) -> AppResult<impl IntoResponse> {
    let result = input.into_result()?;
    let outcome = state
        .workflow
        .record_item_result(id, &reviewer.actor(), result)
        .await?;

    tracing::info!(
        item_id = id,
        user_id = reviewer.user_id,
        transitioned = outcome.transitioned,
        "Result recorded by reviewer"
    );
    Ok(Json(DataResponse { data: outcome }))
}
