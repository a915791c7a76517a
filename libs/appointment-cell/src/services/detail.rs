use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use cache_cell::ResponseCache;
use shared_models::auth::User;

use crate::models::{Appointment, AppointmentError, UpdateAppointmentRequest};
use crate::services::access::AccessPolicy;
use crate::services::listing::LIST_CACHE_PATTERN;
use crate::services::store::AppointmentStore;
use crate::state::AppointmentState;

pub struct AppointmentDetailService {
    store: Arc<dyn AppointmentStore>,
    cache: Arc<dyn ResponseCache>,
}

impl AppointmentDetailService {
    pub fn new(state: &AppointmentState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            cache: Arc::clone(&state.cache),
        }
    }

    /// Looks the appointment up before checking permissions, so an unknown
    /// id is a 404 for everyone.
    async fn load_authorized(
        &self,
        user: &User,
        appointment_id: Uuid,
        action: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .store
            .get(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        AccessPolicy::ensure_can_act_on(user, &appointment, action)?;
        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        user: &User,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        self.load_authorized(user, appointment_id, "view").await
    }

    pub async fn update_appointment(
        &self,
        user: &User,
        appointment_id: Uuid,
        changes: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.load_authorized(user, appointment_id, "update").await?;

        if changes.is_empty() {
            return Ok(current);
        }

        self.store
            .update(appointment_id, &changes)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    /// Deletes the appointment, then drops every cached listing page since
    /// any of them may contain it.
    pub async fn delete_appointment(
        &self,
        user: &User,
        appointment_id: Uuid,
    ) -> Result<(), AppointmentError> {
        self.load_authorized(user, appointment_id, "delete").await?;

        if !self.store.delete(appointment_id).await? {
            return Err(AppointmentError::NotFound);
        }

        let invalidated = self.cache.delete_pattern(LIST_CACHE_PATTERN).await?;
        info!(
            "Appointment {} deleted by {}; invalidated {} cached pages",
            appointment_id, user.id, invalidated
        );
        Ok(())
    }
}
