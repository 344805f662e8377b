//! Route definitions for the `/calculation-requests` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::calculation_request as request;
use crate::state::AppState;

/// Routes mounted at `/calculation-requests`.
///
/// ```text
/// GET    /                           -> list_requests (?status=&from=&to=)
/// GET    /draft                      -> draft_summary
/// GET    /{id}                       -> get_request
/// PUT    /{id}                       -> rename_request
/// DELETE /{id}                       -> delete_request
/// PUT    /{id}/submit                -> submit_request
/// PUT    /{id}/review                -> review_request (reviewer)
/// GET    /{id}/history               -> get_history
/// POST   /{id}/items/{particle_id}   -> add_item
/// PUT    /{id}/items/{particle_id}   -> set_item_velocity
/// DELETE /{id}/items/{particle_id}   -> remove_item
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(request::list_requests))
        .route("/draft", get(request::draft_summary))
        .route(
            "/{id}",
            get(request::get_request)
                .put(request::rename_request)
                .delete(request::delete_request),
        )
        .route("/{id}/submit", put(request::submit_request))
        .route("/{id}/review", put(request::review_request))
        .route("/{id}/history", get(request::get_history))
        .route(
            "/{id}/items/{particle_id}",
            post(request::add_item)
                .put(request::set_item_velocity)
                .delete(request::remove_item),
        )
}
