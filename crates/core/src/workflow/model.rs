//! Domain records exchanged between the workflow and its stores.
//!
//! Every nullable field uses `Option`; there are no sentinel values.

use serde::Serialize;

use crate::calculation_status::RequestStatus;
use crate::types::{DbId, Timestamp};

/// Particle reference data. Treated as opaque by the workflow except for
/// `mass`, which feeds the wavelength formula.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Particle {
    pub id: DbId,
    pub name: String,
    /// Rest mass in kilograms.
    pub mass: f64,
    pub image: Option<String>,
    pub description: Option<String>,
}

/// One calculation request (the unit of review).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationRequest {
    pub id: DbId,
    /// Required before the request can leave `draft`.
    pub name: Option<String>,
    pub status: RequestStatus,
    pub owner_id: DbId,
    pub reviewer_id: Option<DbId>,
    pub created_at: Timestamp,
    pub formed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

/// One particle-and-velocity line item of a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationItem {
    pub id: DbId,
    pub request_id: DbId,
    pub particle_id: DbId,
    pub particle_name: String,
    pub particle_mass: f64,
    pub particle_image: Option<String>,
    /// Input velocity in m/s. `None` until the owner sets it.
    pub velocity: Option<f64>,
    /// Computed wavelength in metres. `None` until a result arrives.
    pub wavelength: Option<f64>,
}

impl CalculationItem {
    pub fn has_result(&self) -> bool {
        self.wavelength.is_some()
    }
}

/// A request together with its items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: CalculationRequest,
    pub items: Vec<CalculationItem>,
}

/// The caller's current draft, as shown in the "cart" badge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftSummary {
    pub request_id: DbId,
    pub item_count: usize,
}

/// One row of the status-change audit log.
///
/// `from_status` is `None` for the creation record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    pub id: DbId,
    pub request_id: DbId,
    pub from_status: Option<RequestStatus>,
    pub to_status: RequestStatus,
    pub actor_id: DbId,
    pub changed_at: Timestamp,
}

/// Filters for listing requests. Drafts and deleted requests are never listed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    /// Inclusive lower bound on `formed_at`.
    pub formed_from: Option<Timestamp>,
    /// Inclusive upper bound on `formed_at`.
    pub formed_to: Option<Timestamp>,
    /// Restrict to one owner. Set by the service for non-reviewers.
    pub owner_id: Option<DbId>,
}

/// How many items of a request have a computed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemProgress {
    pub total: i64,
    pub computed: i64,
}

impl ItemProgress {
    /// True when the request has items and all of them have results.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.computed >= self.total
    }
}

/// A result reported for a single item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemResult {
    /// Computed wavelength in metres.
    Wavelength(f64),
    /// The computation was rejected; the whole request is rejected.
    Rejected,
}

/// A wavelength to write as part of a status transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComputedResult {
    pub item_id: DbId,
    pub wavelength: f64,
}

/// A status write guarded by the expected current status.
///
/// Stores apply it as one conditional update. Timestamps are only set where
/// they are still empty, so they never move once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub request_id: DbId,
    pub expected: RequestStatus,
    pub target: RequestStatus,
    pub actor_id: DbId,
    pub formed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub reviewer_id: Option<DbId>,
    /// Item results written in the same transaction as the status change.
    pub item_results: Vec<ComputedResult>,
}

impl StatusUpdate {
    /// Whether the store must re-check the submit preconditions against the
    /// items it sees at write time.
    pub fn requires_ready_items(&self) -> bool {
        self.expected == RequestStatus::Draft && self.target == RequestStatus::Formed
    }
}
