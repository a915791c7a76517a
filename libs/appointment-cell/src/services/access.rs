use tracing::debug;
use uuid::Uuid;

use shared_models::auth::User;

use crate::models::{Appointment, AppointmentError};

/// Which appointments an identity may see in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityScope {
    All,
    /// Only appointments where this identity is the doctor or the patient.
    Participant(Uuid),
}

impl VisibilityScope {
    pub fn permits(&self, appointment: &Appointment) -> bool {
        match self {
            VisibilityScope::All => true,
            VisibilityScope::Participant(id) => {
                appointment.doctor_id == *id || appointment.patient_id == *id
            }
        }
    }
}

pub struct AccessPolicy;

impl AccessPolicy {
    pub fn visibility(user: &User) -> Result<VisibilityScope, AppointmentError> {
        if user.is_superuser() {
            return Ok(VisibilityScope::All);
        }

        Uuid::parse_str(&user.id)
            .map(VisibilityScope::Participant)
            .map_err(|_| AppointmentError::InvalidIdentity(user.id.clone()))
    }

    /// Doctor, patient or superuser only.
    pub fn ensure_can_act_on(
        user: &User,
        appointment: &Appointment,
        action: &str,
    ) -> Result<(), AppointmentError> {
        if user.is_superuser() || appointment.involves(&user.id) {
            return Ok(());
        }

        debug!("User {} denied {} on appointment {}", user.id, action, appointment.id);
        Err(AppointmentError::Forbidden(format!(
            "Not authorized to {} this appointment",
            action
        )))
    }

    pub fn ensure_staff(user: &User, action: &str) -> Result<(), AppointmentError> {
        if user.is_staff() {
            return Ok(());
        }

        debug!("User {} denied {}: staff only", user.id, action);
        Err(AppointmentError::Forbidden(format!(
            "Only administrators can {}",
            action
        )))
    }
}
