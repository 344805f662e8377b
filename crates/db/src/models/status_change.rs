//! Status-change audit row.

use debroglie_core::calculation_status::StatusId;
use debroglie_core::error::CoreError;
use debroglie_core::types::{DbId, Timestamp};
use debroglie_core::workflow::model as domain;
use sqlx::FromRow;

use super::calculation_request::status_from_id;

/// A row from `calculation_request_status_changes`.
#[derive(Debug, Clone, FromRow)]
pub struct StatusChange {
    pub id: DbId,
    pub request_id: DbId,
    pub from_status_id: Option<StatusId>,
    pub to_status_id: StatusId,
    pub actor_id: DbId,
    pub changed_at: Timestamp,
}

impl TryFrom<StatusChange> for domain::StatusChange {
    type Error = CoreError;

    fn try_from(row: StatusChange) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            request_id: row.request_id,
            from_status: row.from_status_id.map(status_from_id).transpose()?,
            to_status: status_from_id(row.to_status_id)?,
            actor_id: row.actor_id,
            changed_at: row.changed_at,
        })
    }
}
