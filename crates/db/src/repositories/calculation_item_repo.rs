//! Repository for `calculation_items`.
//!
//! Item rows are always read joined with their particle. Writes are guarded
//! on the owning request's status, read under a share lock in the same
//! transaction.

use debroglie_core::calculation_status::RequestStatus;
use debroglie_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::calculation_item::CalculationItem;
use crate::repositories::CalculationRequestRepo;

const SELECT_ITEMS: &str = "SELECT ci.id, ci.request_id, ci.particle_id, \
                                   p.name AS particle_name, p.mass AS particle_mass, \
                                   p.image AS particle_image, ci.velocity, ci.wavelength \
                            FROM calculation_items ci \
                            JOIN particles p ON p.id = ci.particle_id";

pub struct CalculationItemRepo;

impl CalculationItemRepo {
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CalculationItem>, sqlx::Error> {
        let query = format!("{SELECT_ITEMS} WHERE ci.id = $1");
        sqlx::query_as::<_, CalculationItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Items of a request ordered by ID.
    pub async fn list_by_request(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<CalculationItem>, sqlx::Error> {
        let query = format!("{SELECT_ITEMS} WHERE ci.request_id = $1 ORDER BY ci.id ASC");
        sqlx::query_as::<_, CalculationItem>(&query)
            .bind(request_id)
            .fetch_all(pool)
            .await
    }

    /// Add a particle to a draft request.
    ///
    /// Returns `None` if the request is not a draft. A duplicate particle
    /// violates `uq_calculation_items_request_particle`.
    pub async fn add(
        pool: &PgPool,
        request_id: DbId,
        particle_id: DbId,
    ) -> Result<Option<CalculationItem>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        if !is_draft(&mut tx, request_id).await? {
            return Ok(None);
        }

        let id: DbId = sqlx::query_scalar(
            "INSERT INTO calculation_items (request_id, particle_id)
             VALUES ($1, $2)
             RETURNING id",
        )
        .bind(request_id)
        .bind(particle_id)
        .fetch_one(&mut *tx)
        .await?;

        let item = fetch_one(&mut tx, id).await?;
        tx.commit().await?;
        Ok(Some(item))
    }

    /// Remove a particle from a draft request. Returns `true` if a row was removed.
    pub async fn remove(
        pool: &PgPool,
        request_id: DbId,
        particle_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        if !is_draft(&mut tx, request_id).await? {
            return Ok(false);
        }

        let result = sqlx::query(
            "DELETE FROM calculation_items WHERE request_id = $1 AND particle_id = $2",
        )
        .bind(request_id)
        .bind(particle_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set an item's velocity while its request is a draft.
    pub async fn set_velocity(
        pool: &PgPool,
        request_id: DbId,
        particle_id: DbId,
        velocity: f64,
    ) -> Result<Option<CalculationItem>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        if !is_draft(&mut tx, request_id).await? {
            return Ok(None);
        }

        let id: Option<DbId> = sqlx::query_scalar(
            "UPDATE calculation_items SET velocity = $3
             WHERE request_id = $1 AND particle_id = $2
             RETURNING id",
        )
        .bind(request_id)
        .bind(particle_id)
        .bind(velocity)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(id) = id else {
            return Ok(None);
        };
        let item = fetch_one(&mut tx, id).await?;
        tx.commit().await?;
        Ok(Some(item))
    }

    /// Overwrite an item's wavelength while its request is formed.
    pub async fn record_result(
        pool: &PgPool,
        item_id: DbId,
        wavelength: f64,
    ) -> Result<Option<CalculationItem>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let request_id: Option<DbId> =
            sqlx::query_scalar("SELECT request_id FROM calculation_items WHERE id = $1")
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(request_id) = request_id else {
            return Ok(None);
        };
        let status = CalculationRequestRepo::lock_status(&mut tx, request_id).await?;
        if status != Some(RequestStatus::Formed.id()) {
            return Ok(None);
        }

        sqlx::query("UPDATE calculation_items SET wavelength = $2 WHERE id = $1")
            .bind(item_id)
            .bind(wavelength)
            .execute(&mut *tx)
            .await?;

        let item = fetch_one(&mut tx, item_id).await?;
        tx.commit().await?;
        Ok(Some(item))
    }

    /// Count a request's items and how many of them have a wavelength.
    pub async fn progress(pool: &PgPool, request_id: DbId) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COUNT(wavelength) FROM calculation_items WHERE request_id = $1",
        )
        .bind(request_id)
        .fetch_one(pool)
        .await
    }
}

async fn is_draft(conn: &mut PgConnection, request_id: DbId) -> Result<bool, sqlx::Error> {
    let status = CalculationRequestRepo::lock_status(conn, request_id).await?;
    Ok(status == Some(RequestStatus::Draft.id()))
}

async fn fetch_one(conn: &mut PgConnection, id: DbId) -> Result<CalculationItem, sqlx::Error> {
    let query = format!("{SELECT_ITEMS} WHERE ci.id = $1");
    sqlx::query_as::<_, CalculationItem>(&query)
        .bind(id)
        .fetch_one(conn)
        .await
}
