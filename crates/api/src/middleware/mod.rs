//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireReviewer`] -- Requires the `reviewer` or `service` role.
//! - [`callback::CallbackSecret`] -- Reads the computation-service secret header.

pub mod auth;
pub mod callback;
pub mod rbac;
