use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use cache_cell::ResponseCache;
use shared_models::auth::User;

use crate::models::{AppointmentError, AppointmentPage, AppointmentQueryParams};
use crate::services::access::AccessPolicy;
use crate::services::filter::{AppointmentFilter, PageRequest};
use crate::services::store::AppointmentStore;
use crate::state::AppointmentState;

pub const LIST_CACHE_PATTERN: &str = "appointments:*";

/// `appointments:limit={L}&offset={O}`. The key does not include the caller.
pub fn list_cache_key(page: &PageRequest) -> String {
    format!("appointments:limit={}&offset={}", page.limit, page.offset)
}

pub struct AppointmentListingService {
    store: Arc<dyn AppointmentStore>,
    cache: Arc<dyn ResponseCache>,
    ttl: Duration,
    default_limit: u32,
}

impl AppointmentListingService {
    pub fn new(state: &AppointmentState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            cache: Arc::clone(&state.cache),
            ttl: state.config.list_cache_ttl(),
            default_limit: state.config.default_page_limit,
        }
    }

    /// Unfiltered listings are served from the cache keyed on pagination
    /// only; any filter bypasses the cache.
    pub async fn list_appointments(
        &self,
        user: &User,
        params: &AppointmentQueryParams,
    ) -> Result<AppointmentPage, AppointmentError> {
        let filter = AppointmentFilter::from_params(params)?;
        let page = PageRequest::from_params(params, self.default_limit);
        let scope = AccessPolicy::visibility(user)?;

        if !filter.is_empty() {
            debug!("Filtered listing for user {}, skipping cache", user.id);
            return Ok(self.store.list(&scope, &filter, page).await?);
        }

        let cache_key = list_cache_key(&page);
        if let Some(cached) = self.cache.get(&cache_key).await? {
            match serde_json::from_value::<AppointmentPage>(cached) {
                Ok(page) => {
                    debug!("Cache hit for {}", cache_key);
                    return Ok(page);
                }
                Err(e) => warn!("Discarding unreadable cache entry {}: {}", cache_key, e),
            }
        }

        debug!("Cache miss for {}", cache_key);
        let result = self.store.list(&scope, &filter, page).await?;
        self.cache
            .set(&cache_key, serde_json::to_value(&result)?, self.ttl)
            .await?;

        Ok(result)
    }
}
