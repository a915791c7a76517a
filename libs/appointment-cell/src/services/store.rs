use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::DatabaseError;

use crate::models::{
    Appointment, AppointmentPage, CreateAppointmentRequest, Profile, UpdateAppointmentRequest,
};
use crate::services::access::VisibilityScope;
use crate::services::filter::{AppointmentFilter, PageRequest};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Referenced identity does not exist: {0}")]
    InvalidReference(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Malformed row: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected store response: {0}")]
    Unexpected(String),
}

/// Persistent storage of appointments. Implementations enforce the
/// `(doctor_id, scheduled_at)` uniqueness invariant on insert and update.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Visible, filtered rows ordered by `scheduled_at` then `id`.
    async fn list(
        &self,
        scope: &VisibilityScope,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<AppointmentPage, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    async fn insert(&self, request: &CreateAppointmentRequest) -> Result<Appointment, StoreError>;

    /// `Ok(None)` when no appointment has this id.
    async fn update(
        &self,
        id: Uuid,
        changes: &UpdateAppointmentRequest,
    ) -> Result<Option<Appointment>, StoreError>;

    /// `Ok(false)` when no appointment has this id.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Scheduled times of every appointment matching `filter`, unscoped.
    async fn scheduled_times(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<DateTime<Utc>>, StoreError>;
}

#[derive(Debug, Default)]
struct InMemoryState {
    appointments: HashMap<Uuid, Appointment>,
    profiles: HashMap<Uuid, Profile>,
}

impl InMemoryState {
    fn ensure_slot_free(
        &self,
        doctor_id: Uuid,
        scheduled_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<(), StoreError> {
        let taken = self.appointments.values().any(|appt| {
            Some(appt.id) != exclude
                && appt.doctor_id == doctor_id
                && appt.scheduled_at == scheduled_at
        });

        if taken {
            return Err(StoreError::Conflict(format!(
                "doctor {} already booked at {}",
                doctor_id, scheduled_at
            )));
        }
        Ok(())
    }

    fn filtered<'a>(
        &'a self,
        filter: &'a AppointmentFilter,
    ) -> impl Iterator<Item = &'a Appointment> + 'a {
        self.appointments.values().filter(move |appt| {
            let doctor_name = self
                .profiles
                .get(&appt.doctor_id)
                .map(|profile| profile.full_name.as_str());
            filter.matches(appt, doctor_name)
        })
    }
}

/// Process-local store. Backs tests and runs the API when Supabase is not
/// configured. Profiles are only a name directory here; references are not
/// checked against it.
#[derive(Debug, Default)]
pub struct InMemoryAppointmentStore {
    state: RwLock<InMemoryState>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_profile(&self, profile: Profile) {
        self.state.write().await.profiles.insert(profile.id, profile);
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.appointments.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn list(
        &self,
        scope: &VisibilityScope,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<AppointmentPage, StoreError> {
        let state = self.state.read().await;

        let mut rows: Vec<&Appointment> = state
            .filtered(filter)
            .filter(|appt| scope.permits(appt))
            .collect();
        rows.sort_by_key(|appt| (appt.scheduled_at, appt.id));

        let count = rows.len() as u64;
        let results = rows
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();

        Ok(AppointmentPage {
            count,
            limit: page.limit,
            offset: page.offset,
            results,
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.state.read().await.appointments.get(&id).cloned())
    }

    async fn insert(&self, request: &CreateAppointmentRequest) -> Result<Appointment, StoreError> {
        let mut state = self.state.write().await;
        state.ensure_slot_free(request.doctor_id, request.scheduled_at, None)?;

        let appointment = Appointment {
            id: Uuid::new_v4(),
            scheduled_at: request.scheduled_at,
            is_completed: request.is_completed,
            doctor_id: request.doctor_id,
            patient_id: request.patient_id,
        };
        state.appointments.insert(appointment.id, appointment.clone());

        debug!("Stored appointment {}", appointment.id);
        Ok(appointment)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &UpdateAppointmentRequest,
    ) -> Result<Option<Appointment>, StoreError> {
        let mut state = self.state.write().await;

        let mut updated = match state.appointments.get(&id) {
            Some(current) => current.clone(),
            None => return Ok(None),
        };
        changes.apply_to(&mut updated);
        state.ensure_slot_free(updated.doctor_id, updated.scheduled_at, Some(id))?;

        state.appointments.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state.write().await.appointments.remove(&id).is_some())
    }

    async fn scheduled_times(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let state = self.state.read().await;
        Ok(state.filtered(filter).map(|appt| appt.scheduled_at).collect())
    }
}
