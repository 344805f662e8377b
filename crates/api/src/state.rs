use std::sync::Arc;

use debroglie_core::workflow::{WorkflowConfig, WorkflowService};
use debroglie_db::store::PgStore;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheaply cloneable; inner data is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: debroglie_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Calculation request workflow over PostgreSQL.
    pub workflow: Arc<WorkflowService<PgStore>>,
}

impl AppState {
    pub fn new(pool: debroglie_db::DbPool, config: ServerConfig) -> Self {
        let workflow = WorkflowService::new(
            Arc::new(PgStore::new(pool.clone())),
            WorkflowConfig {
                callback_secret: config.callback.secret.clone(),
                system_reviewer_id: config.callback.system_reviewer_id,
            },
        );
        Self {
            pool,
            config: Arc::new(config),
            workflow: Arc::new(workflow),
        }
    }
}
