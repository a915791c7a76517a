use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::{appointment_routes, services::AppointmentStore, AppointmentState};
use cache_cell::{create_cache_router, ResponseCache};
use shared_config::AppConfig;

pub fn create_router(
    config: Arc<AppConfig>,
    store: Arc<dyn AppointmentStore>,
    cache: Arc<dyn ResponseCache>,
) -> Router {
    let appointment_state = AppointmentState::new(config.clone(), store, cache.clone());

    Router::new()
        .route("/", get(|| async { "Appointment API is running!" }))
        .nest("/appointments", appointment_routes(appointment_state))
        .nest("/cache", create_cache_router(config, cache))
}
