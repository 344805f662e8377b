//! Route definitions for the `/calculation-items` resource.

use axum::routing::put;
use axum::Router;

use crate::handlers::calculation_item;
use crate::state::AppState;

/// Routes mounted at `/calculation-items`.
///
/// ```text
/// PUT /{id}/result           -> report_result (X-Callback-Secret)
/// PUT /{id}/reviewer-result  -> record_result (reviewer)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/result", put(calculation_item::report_result))
        .route(
            "/{id}/reviewer-result",
            put(calculation_item::record_result),
        )
}
