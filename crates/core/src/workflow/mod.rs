//! Calculation request workflow: state machine, result aggregation and the
//! operations exposed to the HTTP layer.

pub mod aggregator;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod model;
pub mod service;
pub mod store;
pub mod transition;

pub use aggregator::{AggregateOutcome, ComputationAggregator};
pub use service::{WorkflowConfig, WorkflowService};
pub use store::{ItemStore, ParticleCatalog, RequestStore, WorkflowStore};
pub use transition::TransitionEngine;
