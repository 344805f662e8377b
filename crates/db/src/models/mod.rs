//! Database row models and DTOs.

pub mod calculation_item;
pub mod calculation_request;
pub mod particle;
pub mod role;
pub mod status_change;
pub mod user;
