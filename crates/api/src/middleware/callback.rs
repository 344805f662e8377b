//! Extractor for the computation-service shared secret.
//!
//! The secret is only read here; it is verified by the workflow so the
//! comparison lives next to the operation it guards.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use debroglie_core::error::CoreError;

use crate::error::AppError;

/// Header carrying the pre-shared callback secret.
pub const CALLBACK_SECRET_HEADER: &str = "x-callback-secret";

/// The raw value of the `X-Callback-Secret` header.
pub struct CallbackSecret(pub String);

impl<S: Send + Sync> FromRequestParts<S> for CallbackSecret {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLBACK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| CallbackSecret(v.to_string()))
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing X-Callback-Secret header".into(),
                ))
            })
    }
}
