//! Calculation request row model.

use debroglie_core::calculation_status::{RequestStatus, StatusId};
use debroglie_core::error::CoreError;
use debroglie_core::types::{DbId, Timestamp};
use debroglie_core::workflow::model as domain;
use sqlx::FromRow;

/// A row from the `calculation_requests` table.
#[derive(Debug, Clone, FromRow)]
pub struct CalculationRequest {
    pub id: DbId,
    pub name: Option<String>,
    pub status_id: StatusId,
    pub owner_id: DbId,
    pub reviewer_id: Option<DbId>,
    pub created_at: Timestamp,
    pub formed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl TryFrom<CalculationRequest> for domain::CalculationRequest {
    type Error = CoreError;

    fn try_from(row: CalculationRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            status: status_from_id(row.status_id)?,
            owner_id: row.owner_id,
            reviewer_id: row.reviewer_id,
            created_at: row.created_at,
            formed_at: row.formed_at,
            completed_at: row.completed_at,
        })
    }
}

/// Map a stored status ID back to [`RequestStatus`].
pub fn status_from_id(id: StatusId) -> Result<RequestStatus, CoreError> {
    RequestStatus::from_id(id)
        .ok_or_else(|| CoreError::Storage(format!("Unknown calculation request status id {id}")))
}

/// Filters for listing submitted requests, as bound into SQL.
#[derive(Debug, Clone, Default)]
pub struct RequestListParams {
    pub status_id: Option<StatusId>,
    pub owner_id: Option<DbId>,
    pub formed_from: Option<Timestamp>,
    pub formed_to: Option<Timestamp>,
}

impl From<&domain::RequestFilter> for RequestListParams {
    fn from(filter: &domain::RequestFilter) -> Self {
        Self {
            status_id: filter.status.map(RequestStatus::id),
            owner_id: filter.owner_id,
            formed_from: filter.formed_from,
            formed_to: filter.formed_to,
        }
    }
}
