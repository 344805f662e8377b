//! Route definitions for the `/particles` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::particle;
use crate::state::AppState;

/// Routes mounted at `/particles`.
///
/// ```text
/// GET    /                   -> list_particles (?name=)
/// POST   /                   -> create_particle (reviewer)
/// GET    /{id}               -> get_particle
/// PUT    /{id}               -> update_particle (reviewer)
/// DELETE /{id}               -> delete_particle (reviewer)
/// POST   /{id}/add-to-draft  -> add_to_draft
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(particle::list_particles).post(particle::create_particle),
        )
        .route(
            "/{id}",
            get(particle::get_particle)
                .put(particle::update_particle)
                .delete(particle::delete_particle),
        )
        .route("/{id}/add-to-draft", post(particle::add_to_draft))
}
