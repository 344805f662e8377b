//! Query parameter types shared by list handlers.

use debroglie_core::calculation_status::RequestStatus;
use debroglie_core::error::CoreError;
use debroglie_core::types::Timestamp;
use debroglie_core::workflow::model::RequestFilter;
use serde::Deserialize;

/// `GET /particles?name=` (case-insensitive substring match).
#[derive(Debug, Deserialize)]
pub struct ParticleSearchParams {
    pub name: Option<String>,
}

/// `GET /calculation-requests?status=&from=&to=`.
///
/// `from` and `to` are RFC 3339 timestamps bounding `formed_at`, inclusive.
#[derive(Debug, Default, Deserialize)]
pub struct RequestListParams {
    pub status: Option<String>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

impl RequestListParams {
    /// Parse into a workflow filter. Unknown status names are a validation error.
    pub fn into_filter(self) -> Result<RequestFilter, CoreError> {
        let status = self
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(RequestStatus::parse)
            .transpose()?;
        Ok(RequestFilter {
            status,
            formed_from: self.from,
            formed_to: self.to,
            owner_id: None,
        })
    }
}
