//! Repository for the `particles` table.

use debroglie_core::types::DbId;
use sqlx::PgPool;

use crate::models::particle::{CreateParticle, Particle, UpdateParticle};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, mass, image, description, deleted_at, created_at, updated_at";

/// Provides CRUD operations for the particle catalog. Deletes are soft.
pub struct ParticleRepo;

impl ParticleRepo {
    /// Insert a new particle, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateParticle) -> Result<Particle, sqlx::Error> {
        let query = format!(
            "INSERT INTO particles (name, mass, image, description)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Particle>(&query)
            .bind(&input.name)
            .bind(input.mass)
            .bind(&input.image)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a particle by ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Particle>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM particles WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Particle>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List particles ordered by name, optionally filtered by a
    /// case-insensitive name substring. Excludes soft-deleted rows.
    pub async fn list(pool: &PgPool, name: Option<&str>) -> Result<Vec<Particle>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM particles
             WHERE deleted_at IS NULL
               AND ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
             ORDER BY name ASC"
        );
        sqlx::query_as::<_, Particle>(&query)
            .bind(name)
            .fetch_all(pool)
            .await
    }

    /// Update a particle. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no live row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateParticle,
    ) -> Result<Option<Particle>, sqlx::Error> {
        let query = format!(
            "UPDATE particles SET
                name = COALESCE($2, name),
                mass = COALESCE($3, mass),
                image = COALESCE($4, image),
                description = COALESCE($5, description)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Particle>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.mass)
            .bind(&input.image)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a particle. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE particles SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
