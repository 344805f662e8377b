//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does not
//! meet the minimum requirement.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use debroglie_core::error::CoreError;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires a reviewer identity (`reviewer` or `service` role). Rejects with
/// 403 Forbidden otherwise.
///
/// ```ignore
/// async fn review(RequireReviewer(user): RequireReviewer) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireReviewer(pub AuthUser);

impl FromRequestParts<AppState> for RequireReviewer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.actor().is_reviewer {
            return Err(AppError::Core(CoreError::Forbidden(
                "Reviewer role required".into(),
            )));
        }
        Ok(RequireReviewer(user))
    }
}
