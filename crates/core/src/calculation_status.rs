//! Calculation request status and lifecycle state machine.
//!
//! Status IDs match the `calculation_request_statuses` seed data (1-based
//! SMALLINT). The transition table is fixed; there is no configuration.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

// ---------------------------------------------------------------------------
// Status enum
// ---------------------------------------------------------------------------

/// Lifecycle status of a calculation request.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Draft = 1,
    Formed = 2,
    Completed = 3,
    Rejected = 4,
    Deleted = 5,
}

/// All statuses in seed order.
pub const ALL_STATUSES: &[RequestStatus] = &[
    RequestStatus::Draft,
    RequestStatus::Formed,
    RequestStatus::Completed,
    RequestStatus::Rejected,
    RequestStatus::Deleted,
];

impl RequestStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Resolve a database status ID.
    pub fn from_id(id: StatusId) -> Option<Self> {
        ALL_STATUSES.iter().copied().find(|s| s.id() == id)
    }

    /// Stable lowercase name, used in query strings and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Formed => "formed",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Deleted => "deleted",
        }
    }

    /// Parse the lowercase name produced by [`RequestStatus::as_str`].
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        ALL_STATUSES
            .iter()
            .copied()
            .find(|s| s.as_str() == name)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid request status '{name}'. Must be one of: {}",
                    ALL_STATUSES
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }

    /// Terminal statuses have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        valid_transitions(self).is_empty()
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Who may trigger a transition into a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRole {
    /// Only the request owner.
    Owner,
    /// Only a reviewer (or the system reviewer identity).
    Reviewer,
}

/// Returns the statuses reachable from `from`.
///
/// - `draft`  -> `formed`, `deleted`
/// - `formed` -> `completed`, `rejected`
/// - `completed`, `rejected`, `deleted` are terminal
pub fn valid_transitions(from: RequestStatus) -> &'static [RequestStatus] {
    match from {
        RequestStatus::Draft => &[RequestStatus::Formed, RequestStatus::Deleted],
        RequestStatus::Formed => &[RequestStatus::Completed, RequestStatus::Rejected],
        RequestStatus::Completed | RequestStatus::Rejected | RequestStatus::Deleted => &[],
    }
}

/// Check whether a transition from `from` to `to` is in the table.
pub fn can_transition(from: RequestStatus, to: RequestStatus) -> bool {
    valid_transitions(from).contains(&to)
}

/// Role required to move a request into `to`.
///
/// `draft` is never a target; it is reported as owner-only so the table
/// check, not the role check, rejects it.
pub fn required_role(to: RequestStatus) -> TransitionRole {
    match to {
        RequestStatus::Completed | RequestStatus::Rejected => TransitionRole::Reviewer,
        RequestStatus::Draft | RequestStatus::Formed | RequestStatus::Deleted => {
            TransitionRole::Owner
        }
    }
}

/// Validate a transition, naming both states on failure.
pub fn validate_transition(from: RequestStatus, to: RequestStatus) -> Result<(), CoreError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
