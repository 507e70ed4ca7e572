use std::sync::Arc;

use sqlx::SqlitePool;

use crate::services::RecommendationService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub recommendations: Arc<RecommendationService>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, recommendations: RecommendationService) -> Self {
        Self {
            db_pool,
            recommendations: Arc::new(recommendations),
        }
    }
}
