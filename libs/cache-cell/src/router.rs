use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::get_cache_stats;
use crate::services::ResponseCache;

pub fn create_cache_router(config: Arc<AppConfig>, cache: Arc<dyn ResponseCache>) -> Router {
    Router::new()
        .route("/stats", get(get_cache_stats))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(cache)
}
