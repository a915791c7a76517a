use std::sync::Arc;

use tracing::{info, warn};

use shared_models::auth::User;

use crate::models::{Appointment, AppointmentError, CreateAppointmentRequest};
use crate::services::access::AccessPolicy;
use crate::services::store::AppointmentStore;
use crate::state::AppointmentState;

pub struct AppointmentCreateService {
    store: Arc<dyn AppointmentStore>,
}

impl AppointmentCreateService {
    pub fn new(state: &AppointmentState) -> Self {
        Self {
            store: Arc::clone(&state.store),
        }
    }

    pub async fn create_appointment(
        &self,
        user: &User,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        AccessPolicy::ensure_staff(user, "create appointments")?;

        let appointment = self.store.insert(&request).await.map_err(|e| {
            warn!(
                "Could not book doctor {} at {}: {}",
                request.doctor_id, request.scheduled_at, e
            );
            AppointmentError::from(e)
        })?;

        info!(
            "Appointment {} created by {} for doctor {} at {}",
            appointment.id, user.id, appointment.doctor_id, appointment.scheduled_at
        );
        Ok(appointment)
    }
}
