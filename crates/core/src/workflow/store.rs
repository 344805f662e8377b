//! Persistence contracts consumed by the workflow.
//!
//! Implementations: `debroglie_db::store::PgStore` (PostgreSQL) and
//! [`crate::workflow::memory::MemoryStore`] (tests only). Every method is a
//! single logical write or read; guarded writes return `None` when their
//! guard no longer holds instead of failing.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::types::DbId;
use crate::workflow::model::{
    CalculationItem, CalculationRequest, ItemProgress, Particle, RequestFilter, StatusChange,
    StatusUpdate,
};

#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Find a request by ID. Deleted requests are reported as absent.
    async fn find_request(&self, id: DbId) -> Result<Option<CalculationRequest>, CoreError>;

    /// Find the owner's current draft, if any.
    async fn find_draft(&self, owner_id: DbId) -> Result<Option<CalculationRequest>, CoreError>;

    /// Create a new draft and its creation history record.
    ///
    /// Fails with [`CoreError::Conflict`] if the owner already has a draft.
    async fn create_draft(
        &self,
        owner_id: DbId,
        name: Option<&str>,
    ) -> Result<CalculationRequest, CoreError>;

    /// Rename a request. Guarded on the request still being a draft.
    async fn rename_draft(
        &self,
        id: DbId,
        name: &str,
    ) -> Result<Option<CalculationRequest>, CoreError>;

    /// List non-draft, non-deleted requests matching `filter`, newest first.
    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<CalculationRequest>, CoreError>;

    /// Apply a status transition, its side-effect fields, its item results
    /// and its history record atomically.
    ///
    /// Returns `None` without writing anything when the request is no longer
    /// in `update.expected`, or when [`StatusUpdate::requires_ready_items`]
    /// holds and the request's name and items no longer pass the submit
    /// preconditions.
    async fn apply_transition(
        &self,
        update: &StatusUpdate,
    ) -> Result<Option<CalculationRequest>, CoreError>;

    /// Status-change history of a request, oldest first.
    async fn status_history(&self, request_id: DbId) -> Result<Vec<StatusChange>, CoreError>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn find_item(&self, id: DbId) -> Result<Option<CalculationItem>, CoreError>;

    /// Items of a request ordered by ID.
    async fn list_items(&self, request_id: DbId) -> Result<Vec<CalculationItem>, CoreError>;

    /// Add a particle to a draft. Guarded on the request being a draft.
    ///
    /// Fails with [`CoreError::Conflict`] if the particle is already present.
    async fn add_item(
        &self,
        request_id: DbId,
        particle_id: DbId,
    ) -> Result<Option<CalculationItem>, CoreError>;

    /// Remove a particle from a draft. Returns `false` if nothing was removed.
    async fn remove_item(&self, request_id: DbId, particle_id: DbId) -> Result<bool, CoreError>;

    /// Set the input velocity of an item. Guarded on the request being a draft.
    async fn set_velocity(
        &self,
        request_id: DbId,
        particle_id: DbId,
        velocity: f64,
    ) -> Result<Option<CalculationItem>, CoreError>;

    /// Overwrite an item's result (last write wins). Guarded on the owning
    /// request being formed.
    async fn record_result(
        &self,
        item_id: DbId,
        wavelength: f64,
    ) -> Result<Option<CalculationItem>, CoreError>;

    /// Count items and items with results for a request.
    async fn item_progress(&self, request_id: DbId) -> Result<ItemProgress, CoreError>;
}

#[async_trait]
pub trait ParticleCatalog: Send + Sync {
    /// Find a particle by ID. Soft-deleted particles are reported as absent.
    async fn find_particle(&self, id: DbId) -> Result<Option<Particle>, CoreError>;
}

/// Everything the workflow service needs from persistence.
pub trait WorkflowStore: RequestStore + ItemStore + ParticleCatalog {}

impl<T> WorkflowStore for T where T: RequestStore + ItemStore + ParticleCatalog {}
