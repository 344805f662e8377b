//! Handlers for the particle catalog.
//!
//! Reads are public. Catalog edits need a reviewer. Adding a particle to
//! the caller's draft goes through the workflow.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use debroglie_core::error::CoreError;
use debroglie_core::types::DbId;
use debroglie_db::models::particle::{CreateParticle, UpdateParticle};
use debroglie_db::repositories::ParticleRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireReviewer;
use crate::query::ParticleSearchParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum length of a particle name, in characters.
const MAX_PARTICLE_NAME_LENGTH: usize = 100;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// GET /api/v1/particles
pub async fn list_particles(
    State(state): State<AppState>,
    Query(params): Query<ParticleSearchParams>,
) -> AppResult<impl IntoResponse> {
    let name = params.name.as_deref().filter(|n| !n.is_empty());
    let particles = ParticleRepo::list(&state.pool, name).await?;
    Ok(Json(DataResponse { data: particles }))
}

/// GET /api/v1/particles/{id}
pub async fn get_particle(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let particle = ParticleRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Particle",
            id,
        }))?;
    Ok(Json(DataResponse { data: particle }))
}

/// POST /api/v1/particles
pub async fn create_particle(
    RequireReviewer(reviewer): RequireReviewer,
    State(state): State<AppState>,
    Json(mut input): Json<CreateParticle>,
) -> AppResult<impl IntoResponse> {
    input.name = validate_name(&input.name)?;
    validate_mass(input.mass)?;

    let particle = ParticleRepo::create(&state.pool, &input).await?;
    tracing::info!(
        particle_id = particle.id,
        user_id = reviewer.user_id,
        "Particle created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: particle })))
}

/// PUT /api/v1/particles/{id}
pub async fn update_particle(
    RequireReviewer(reviewer): RequireReviewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateParticle>,
) -> AppResult<impl IntoResponse> {
    if let Some(name) = input.name.as_deref() {
        input.name = Some(validate_name(name)?);
    }
    if let Some(mass) = input.mass {
        validate_mass(mass)?;
    }

    let particle = ParticleRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Particle",
            id,
        }))?;
    tracing::info!(particle_id = id, user_id = reviewer.user_id, "Particle updated");

    Ok(Json(DataResponse { data: particle }))
}

/// DELETE /api/v1/particles/{id}
///
/// Soft delete. Items already referencing the particle keep working.
pub async fn delete_particle(
    RequireReviewer(reviewer): RequireReviewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !ParticleRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Particle",
            id,
        }));
    }
    tracing::info!(particle_id = id, user_id = reviewer.user_id, "Particle deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// POST /api/v1/particles/{id}/add-to-draft
///
/// Add the particle to the caller's draft, creating the draft on first use.
pub async fn add_to_draft(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let detail = state
        .workflow
        .create_draft_with_item(&auth.actor(), id)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_PARTICLE_NAME_LENGTH {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Particle name must be 1 to {MAX_PARTICLE_NAME_LENGTH} characters"
        ))));
    }
    Ok(name.to_string())
}

fn validate_mass(mass: f64) -> Result<(), AppError> {
    if !mass.is_finite() || mass <= 0.0 {
        return Err(AppError::Core(CoreError::Validation(
            "Mass must be a positive finite number".into(),
        )));
    }
    Ok(())
}
