pub mod auth;
pub mod calculation_item;
pub mod calculation_request;
pub mod health;
pub mod particle;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                                   register (public)
/// /auth/login                                      login (public)
/// /auth/me                                         current user, update own profile (PUT)
///
/// /particles                                       list (public), create (reviewer)
/// /particles/{id}                                  get (public), update, delete (reviewer)
/// /particles/{id}/add-to-draft                     add to caller's draft (POST)
///
/// /calculation-requests                            list (auth)
/// /calculation-requests/draft                      caller's draft summary
/// /calculation-requests/{id}                       get, rename (PUT), delete
/// /calculation-requests/{id}/submit                draft -> formed (PUT)
/// /calculation-requests/{id}/review                approve / reject (PUT, reviewer)
/// /calculation-requests/{id}/history               status changes
/// /calculation-requests/{id}/items/{particle_id}   add (POST), velocity (PUT), remove
///
/// /calculation-items/{id}/result                   computation callback (PUT, shared secret)
/// /calculation-items/{id}/reviewer-result          manual result (PUT, reviewer)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Authentication routes (register, login, own profile).
        .nest("/auth", auth::router())
        // Particle catalog.
        .nest("/particles", particle::router())
        // Calculation requests, their items and status transitions.
        .nest("/calculation-requests", calculation_request::router())
        // Per-item computation results.
        .nest("/calculation-items", calculation_item::router())
}
