//! Particle catalog model and DTOs.

use debroglie_core::types::{DbId, Timestamp};
use debroglie_core::workflow::model as domain;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `particles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Particle {
    pub id: DbId,
    pub name: String,
    /// Rest mass in kilograms.
    pub mass: f64,
    pub image: Option<String>,
    pub description: Option<String>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Particle> for domain::Particle {
    fn from(row: Particle) -> Self {
        Self {
            id: row.id,
            name: row.name,
            mass: row.mass,
            image: row.image,
            description: row.description,
        }
    }
}

/// DTO for creating a particle.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateParticle {
    pub name: String,
    pub mass: f64,
    pub image: Option<String>,
    pub description: Option<String>,
}

/// DTO for updating a particle. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateParticle {
    pub name: Option<String>,
    pub mass: Option<f64>,
    pub image: Option<String>,
    pub description: Option<String>,
}
