//! Handlers for the `/auth` resource (register, login, own profile).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use debroglie_core::error::CoreError;
use debroglie_core::roles::ROLE_CREATOR;
use debroglie_db::models::user::{CreateUser, UpdateUser, UserResponse};
use debroglie_db::repositories::{RoleRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::auth::jwt::generate_access_token;
use crate::auth::password::{
    hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LENGTH,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for `PUT /auth/me`. Omitted fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Successful authentication response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create a submitter account. New accounts always get the `creator` role;
/// reviewers are provisioned out of band.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let username = validate_username(&input.username)?;
    let email = validate_email(&input.email)?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let role = RoleRepo::find_by_name(&state.pool, ROLE_CREATOR)
        .await?
        .ok_or_else(|| AppError::InternalError("Creator role is not seeded".into()))?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role_id: role.id,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from_user(user, role.name),
        }),
    ))
}

/// POST /api/v1/auth/login
///
/// Authenticate with username + password. Returns an access token.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_username(&state.pool, &input.username)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid username or password".into(),
            ))
        })?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::warn!(user_id = user.id, "Failed login attempt");
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid username or password".into(),
        )));
    }

    UserRepo::record_login(&state.pool, user.id).await?;

    let role_name = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    let access_token = generate_access_token(user.id, &role_name, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    tracing::info!(user_id = user.id, role = %role_name, "User logged in");

    Ok(Json(DataResponse {
        data: AuthResponse {
            access_token,
            expires_in: state.config.jwt.access_token_expiry_mins * 60,
            user: UserResponse::from_user(user, role_name),
        },
    }))
}

/// GET /api/v1/auth/me
pub async fn me(auth: AuthUser, State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;
    let role_name = RoleRepo::resolve_name(&state.pool, user.role_id).await?;

    Ok(Json(DataResponse {
        data: UserResponse::from_user(user, role_name),
    }))
}

/// PUT /api/v1/auth/me
///
/// Change the caller's own username or email. A value already taken by
/// another account is a 409 Conflict.
pub async fn update_me(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateMeRequest>,
) -> AppResult<impl IntoResponse> {
    let update = UpdateUser {
        username: input
            .username
            .as_deref()
            .map(validate_username)
            .transpose()?
            .map(str::to_string),
        email: input
            .email
            .as_deref()
            .map(validate_email)
            .transpose()?
            .map(str::to_string),
    };

    let user = UserRepo::update(&state.pool, auth.user_id, &update)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;
    let role_name = RoleRepo::resolve_name(&state.pool, user.role_id).await?;

    tracing::info!(user_id = user.id, username = %user.username, "User profile updated");

    Ok(Json(DataResponse {
        data: UserResponse::from_user(user, role_name),
    }))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_username(username: &str) -> AppResult<&str> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Username must not be empty".into(),
        )));
    }
    Ok(username)
}

fn validate_email(email: &str) -> AppResult<&str> {
    let email = email.trim();
    if !email.contains('@') {
        return Err(AppError::Core(CoreError::Validation(
            "Email address is invalid".into(),
        )));
    }
    Ok(email)
}
