pub mod auth;
pub mod calculation_item;
pub mod calculation_request;
pub mod particle;
