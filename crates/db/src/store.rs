//! PostgreSQL implementation of the workflow store traits.

use async_trait::async_trait;
use debroglie_core::error::CoreError;
use debroglie_core::types::DbId;
use debroglie_core::workflow::model::{
    CalculationItem, CalculationRequest, ItemProgress, Particle, RequestFilter, StatusChange,
    StatusUpdate,
};
use debroglie_core::workflow::store::{ItemStore, ParticleCatalog, RequestStore};
use sqlx::PgPool;

use crate::models::calculation_request::RequestListParams;
use crate::repositories::{CalculationItemRepo, CalculationRequestRepo, ParticleRepo};

/// Workflow store backed by the repositories.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a sqlx error into the domain.
///
/// Unique violations on `uq_*` constraints become [`CoreError::Conflict`];
/// everything else is an opaque [`CoreError::Storage`].
pub fn storage_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unknown");
            if constraint.starts_with("uq_") {
                return CoreError::Conflict(format!(
                    "Duplicate value violates unique constraint: {constraint}"
                ));
            }
        }
    }
    CoreError::Storage(err.to_string())
}

#[async_trait]
impl RequestStore for PgStore {
    async fn find_request(&self, id: DbId) -> Result<Option<CalculationRequest>, CoreError> {
        CalculationRequestRepo::find_by_id(&self.pool, id)
            .await
            .map_err(storage_error)?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn find_draft(&self, owner_id: DbId) -> Result<Option<CalculationRequest>, CoreError> {
        CalculationRequestRepo::find_draft(&self.pool, owner_id)
            .await
            .map_err(storage_error)?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn create_draft(
        &self,
        owner_id: DbId,
        name: Option<&str>,
    ) -> Result<CalculationRequest, CoreError> {
        CalculationRequestRepo::create_draft(&self.pool, owner_id, name)
            .await
            .map_err(storage_error)?
            .try_into()
    }

    async fn rename_draft(
        &self,
        id: DbId,
        name: &str,
    ) -> Result<Option<CalculationRequest>, CoreError> {
        CalculationRequestRepo::rename_draft(&self.pool, id, name)
            .await
            .map_err(storage_error)?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<CalculationRequest>, CoreError> {
        CalculationRequestRepo::list(&self.pool, &RequestListParams::from(filter))
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn apply_transition(
        &self,
        update: &StatusUpdate,
    ) -> Result<Option<CalculationRequest>, CoreError> {
        CalculationRequestRepo::apply_transition(&self.pool, update)
            .await
            .map_err(storage_error)?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn status_history(&self, request_id: DbId) -> Result<Vec<StatusChange>, CoreError> {
        CalculationRequestRepo::list_status_changes(&self.pool, request_id)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }
}

#[async_trait]
impl ItemStore for PgStore {
    async fn find_item(&self, id: DbId) -> Result<Option<CalculationItem>, CoreError> {
        Ok(CalculationItemRepo::find_by_id(&self.pool, id)
            .await
            .map_err(storage_error)?
            .map(Into::into))
    }

    async fn list_items(&self, request_id: DbId) -> Result<Vec<CalculationItem>, CoreError> {
        Ok(CalculationItemRepo::list_by_request(&self.pool, request_id)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn add_item(
        &self,
        request_id: DbId,
        particle_id: DbId,
    ) -> Result<Option<CalculationItem>, CoreError> {
        Ok(CalculationItemRepo::add(&self.pool, request_id, particle_id)
            .await
            .map_err(storage_error)?
            .map(Into::into))
    }

    async fn remove_item(&self, request_id: DbId, particle_id: DbId) -> Result<bool, CoreError> {
        CalculationItemRepo::remove(&self.pool, request_id, particle_id)
            .await
            .map_err(storage_error)
    }

    async fn set_velocity(
        &self,
        request_id: DbId,
        particle_id: DbId,
        velocity: f64,
    ) -> Result<Option<CalculationItem>, CoreError> {
        Ok(
            CalculationItemRepo::set_velocity(&self.pool, request_id, particle_id, velocity)
                .await
                .map_err(storage_error)?
                .map(Into::into),
        )
    }

    async fn record_result(
        &self,
        item_id: DbId,
        wavelength: f64,
    ) -> Result<Option<CalculationItem>, CoreError> {
        Ok(
            CalculationItemRepo::record_result(&self.pool, item_id, wavelength)
                .await
                .map_err(storage_error)?
                .map(Into::into),
        )
    }

    async fn item_progress(&self, request_id: DbId) -> Result<ItemProgress, CoreError> {
        let (total, computed) = CalculationItemRepo::progress(&self.pool, request_id)
            .await
            .map_err(storage_error)?;
        Ok(ItemProgress { total, computed })
    }
}

#[async_trait]
impl ParticleCatalog for PgStore {
    async fn find_particle(&self, id: DbId) -> Result<Option<Particle>, CoreError> {
        Ok(ParticleRepo::find_by_id(&self.pool, id)
            .await
            .map_err(storage_error)?
            .map(Into::into))
    }
}
