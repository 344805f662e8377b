//! Shared-secret check for the computation-service callback.
//!
//! The external computation service presents one static pre-shared secret
//! on every call. It is not a per-request token.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::CoreError;

/// Minimum accepted length for a configured callback secret.
pub const MIN_SECRET_LENGTH: usize = 16;

/// Compare the presented secret with the configured one.
///
/// Both sides are hashed first so the comparison runs over fixed-length
/// digests and takes the same time wherever the inputs differ.
pub fn verify_callback_secret(expected: &str, presented: &str) -> Result<(), CoreError> {
    let expected = Sha256::digest(expected.as_bytes());
    let presented = Sha256::digest(presented.as_bytes());

    if bool::from(expected.as_slice().ct_eq(presented.as_slice())) {
        Ok(())
    } else {
        Err(CoreError::Unauthorized("Invalid callback secret".into()))
    }
}

/// Validate a configured secret at startup.
pub fn validate_secret_strength(secret: &str) -> Result<(), String> {
    if secret.len() < MIN_SECRET_LENGTH {
        return Err(format!(
            "Callback secret must be at least {MIN_SECRET_LENGTH} characters long"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn matching_secret_passes() {
        assert!(verify_callback_secret("s3cret-s3cret-s3cret", "s3cret-s3cret-s3cret").is_ok());
    }

    #[test]
    fn mismatched_secret_is_unauthorized() {
        let err = verify_callback_secret("s3cret-s3cret-s3cret", "guess").unwrap_err();
        assert_matches!(err, CoreError::Unauthorized(_));
    }

    #[test]
    fn secret_differing_in_last_byte_or_length_is_unauthorized() {
        let expected = "s3cret-s3cret-s3cret";
        assert!(verify_callback_secret(expected, "s3cret-s3cret-s3creT").is_err());
        assert!(verify_callback_secret(expected, "s3cret-s3cret-s3cret-").is_err());
        assert!(verify_callback_secret(expected, "s3cret-s3cret-s3cre").is_err());
    }

    #[test]
    fn empty_presented_secret_is_unauthorized() {
        assert!(verify_callback_secret("s3cret-s3cret-s3cret", "").is_err());
    }

    #[test]
    fn short_secret_fails_strength_check() {
        assert!(validate_secret_strength("short").is_err());
        assert!(validate_secret_strength("exactly-16-chars").is_ok());
    }
}
