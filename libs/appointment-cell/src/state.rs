use std::sync::Arc;

use cache_cell::ResponseCache;
use shared_config::AppConfig;

use crate::services::store::AppointmentStore;

/// Shared handles for the appointment routes.
#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn AppointmentStore>,
    pub cache: Arc<dyn ResponseCache>,
}

impl AppointmentState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn AppointmentStore>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self { config, store, cache }
    }
}
