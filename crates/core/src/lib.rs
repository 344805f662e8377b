//! Domain logic for the De Broglie calculation service.
//!
//! This crate has no database or HTTP dependencies. Persistence is reached
//! through the store traits in [`workflow::store`].

pub mod calculation_status;
pub mod callback;
pub mod error;
pub mod roles;
pub mod types;
pub mod wavelength;
pub mod workflow;
