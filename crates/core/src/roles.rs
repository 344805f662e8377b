//! Well-known role names and the caller identity threaded through the workflow.
//!
//! Role names must match the seed data in `20260301000001_create_users.sql`.

use serde::Serialize;

use crate::types::DbId;

/// Submits calculation requests and owns their drafts.
pub const ROLE_CREATOR: &str = "creator";
/// Approves or rejects formed calculation requests.
pub const ROLE_REVIEWER: &str = "reviewer";
/// Backend computation service; never logs in interactively.
pub const ROLE_SERVICE: &str = "service";

/// The caller of a workflow operation, as supplied by the identity provider.
///
/// The workflow trusts this pair as-is; authentication happens upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub user_id: DbId,
    pub is_reviewer: bool,
}

impl Actor {
    /// A regular submitter.
    pub fn creator(user_id: DbId) -> Self {
        Self {
            user_id,
            is_reviewer: false,
        }
    }

    /// A reviewer (moderator) identity.
    pub fn reviewer(user_id: DbId) -> Self {
        Self {
            user_id,
            is_reviewer: true,
        }
    }

    /// Build an actor from a role name. Service accounts act as reviewers.
    pub fn from_role(user_id: DbId, role: &str) -> Self {
        Self {
            user_id,
            is_reviewer: role == ROLE_REVIEWER || role == ROLE_SERVICE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviewer_role_maps_to_reviewer_actor() {
        assert!(Actor::from_role(7, ROLE_REVIEWER).is_reviewer);
        assert!(Actor::from_role(7, ROLE_SERVICE).is_reviewer);
        assert!(!Actor::from_role(7, ROLE_CREATOR).is_reviewer);
        assert!(!Actor::from_role(7, "unknown").is_reviewer);
    }
}
