//! Calculation item row model, joined with its particle.

use debroglie_core::types::DbId;
use debroglie_core::workflow::model as domain;
use sqlx::FromRow;

/// A `calculation_items` row joined with `particles`.
#[derive(Debug, Clone, FromRow)]
pub struct CalculationItem {
    pub id: DbId,
    pub request_id: DbId,
    pub particle_id: DbId,
    pub particle_name: String,
    pub particle_mass: f64,
    pub particle_image: Option<String>,
    pub velocity: Option<f64>,
    pub wavelength: Option<f64>,
}

impl From<CalculationItem> for domain::CalculationItem {
    fn from(row: CalculationItem) -> Self {
        Self {
            id: row.id,
            request_id: row.request_id,
            particle_id: row.particle_id,
            particle_name: row.particle_name,
            particle_mass: row.particle_mass,
            particle_image: row.particle_image,
            velocity: row.velocity,
            wavelength: row.wavelength,
        }
    }
}
