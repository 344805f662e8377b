//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod calculation_item_repo;
pub mod calculation_request_repo;
pub mod particle_repo;
pub mod role_repo;
pub mod user_repo;

pub use calculation_item_repo::CalculationItemRepo;
pub use calculation_request_repo::CalculationRequestRepo;
pub use particle_repo::ParticleRepo;
pub use role_repo::RoleRepo;
pub use user_repo::UserRepo;
