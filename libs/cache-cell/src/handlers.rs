use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::CacheStats;
use crate::services::ResponseCache;

#[axum::debug_handler]
pub async fn get_cache_stats(
    State(cache): State<Arc<dyn ResponseCache>>,
    Extension(user): Extension<User>,
) -> Result<Json<CacheStats>, AppError> {
    if !user.is_staff() {
        return Err(AppError::Forbidden("Only staff can view cache statistics".to_string()));
    }

    let stats = cache
        .stats()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(stats))
}
