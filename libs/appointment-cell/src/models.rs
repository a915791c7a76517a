// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use cache_cell::CacheError;
use shared_models::error::AppError;

use crate::services::store::StoreError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// One row of the `appointments` table. `(doctor_id, scheduled_at)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub is_completed: bool,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
}

impl Appointment {
    /// Calendar date (UTC) the appointment falls on.
    pub fn scheduled_date(&self) -> NaiveDate {
        self.scheduled_at.date_naive()
    }

    /// True when `user_id` is this appointment's doctor or patient.
    pub fn involves(&self, user_id: &str) -> bool {
        self.doctor_id.to_string() == user_id || self.patient_id.to_string() == user_id
    }
}

/// Directory entry for a doctor or patient. Owned by the identity system;
/// only read here for name filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub is_completed: bool,
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub is_completed: Option<bool>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
}

impl UpdateAppointmentRequest {
    pub fn is_empty(&self) -> bool {
        self.scheduled_at.is_none()
            && self.is_completed.is_none()
            && self.doctor_id.is_none()
            && self.patient_id.is_none()
    }

    pub fn apply_to(&self, appointment: &mut Appointment) {
        if let Some(scheduled_at) = self.scheduled_at {
            appointment.scheduled_at = scheduled_at;
        }
        if let Some(is_completed) = self.is_completed {
            appointment.is_completed = is_completed;
        }
        if let Some(doctor_id) = self.doctor_id {
            appointment.doctor_id = doctor_id;
        }
        if let Some(patient_id) = self.patient_id {
            appointment.patient_id = patient_id;
        }
    }
}

/// Raw query string values. Kept as strings so malformed input is reported
/// by the filter layer instead of being rejected by the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentQueryParams {
    pub doctor_name: Option<String>,
    pub date: Option<String>,
    pub is_completed: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentPage {
    /// Visible rows before pagination.
    pub count: u64,
    pub limit: u32,
    pub offset: u32,
    pub results: Vec<Appointment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAppointmentCount {
    pub scheduled_date: NaiveDate,
    pub count: u64,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Invalid user identifier: {0}")]
    InvalidIdentity(String),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => AppointmentError::Conflict(
                "Doctor already has an appointment scheduled at this time".to_string(),
            ),
            StoreError::InvalidReference(msg) => AppointmentError::ValidationError(msg),
            other => AppointmentError::Store(other),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            AppointmentError::Conflict(msg) => AppError::Conflict(msg),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::InvalidIdentity(id) => {
                AppError::BadRequest(format!("Invalid user identifier: {}", id))
            }
            AppointmentError::Store(e) => AppError::Database(e.to_string()),
            AppointmentError::Cache(e) => AppError::Internal(e.to_string()),
            AppointmentError::Serialization(e) => AppError::Internal(e.to_string()),
        }
    }
}
