use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{DatabaseError, SupabaseClient, FOREIGN_KEY_VIOLATION};

use crate::models::{
    Appointment, AppointmentPage, CreateAppointmentRequest, Profile, UpdateAppointmentRequest,
};
use crate::services::access::VisibilityScope;
use crate::services::filter::{AppointmentFilter, PageRequest};
use crate::services::store::{AppointmentStore, StoreError};

const APPOINTMENTS_PATH: &str = "/rest/v1/appointments";
const PROFILES_PATH: &str = "/rest/v1/profiles";
const APPOINTMENT_ORDER: &str = "order=scheduled_at.asc,id.asc";
/// Rows requested per report page. PostgREST may still return fewer
/// (`db-max-rows`), so paging follows what actually came back.
const REPORT_PAGE_SIZE: u64 = 1000;

#[derive(Debug, Deserialize)]
struct ScheduledRow {
    scheduled_at: DateTime<Utc>,
}

/// Appointment store backed by the Supabase PostgREST API.
pub struct SupabaseAppointmentStore {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// PostgREST query parameters for `filter`. `None` means the doctor name
    /// matched no profile, so nothing can match.
    async fn filter_params(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Option<Vec<String>>, StoreError> {
        let mut params = Vec::new();

        if let Some(name) = &filter.doctor_name {
            let path = format!(
                "{}?select=id,full_name&full_name=ilike.*{}*",
                PROFILES_PATH,
                urlencoding::encode(&escape_like(name))
            );
            let doctors: Vec<Profile> = self.supabase.request(Method::GET, &path, None, None).await?;

            if doctors.is_empty() {
                debug!("No doctor profile matches {:?}", name);
                return Ok(None);
            }

            let ids: Vec<String> = doctors.iter().map(|d| d.id.to_string()).collect();
            params.push(format!("doctor_id=in.({})", ids.join(",")));
        }

        if let Some(date) = filter.date {
            params.push(format!("scheduled_at=gte.{}T00:00:00Z", date));
            if let Some(next) = date.succ_opt() {
                params.push(format!("scheduled_at=lt.{}T00:00:00Z", next));
            }
        }

        if let Some(is_completed) = filter.is_completed {
            params.push(format!("is_completed=eq.{}", is_completed));
        }

        Ok(Some(params))
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("prefer", HeaderValue::from_static("return=representation"));
        headers
    }
}

/// Makes `%`, `_` and `\` match literally inside an `ilike` pattern.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn scope_param(scope: &VisibilityScope) -> Option<String> {
    match scope {
        VisibilityScope::All => None,
        VisibilityScope::Participant(id) => {
            Some(format!("or=(doctor_id.eq.{id},patient_id.eq.{id})", id = id))
        }
    }
}

fn map_write_error(err: DatabaseError) -> StoreError {
    match err {
        DatabaseError::Conflict { code, message } if code == FOREIGN_KEY_VIOLATION => {
            StoreError::InvalidReference(message)
        }
        DatabaseError::Conflict { message, .. } => StoreError::Conflict(message),
        other => StoreError::Database(other),
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn list(
        &self,
        scope: &VisibilityScope,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<AppointmentPage, StoreError> {
        let empty_page = AppointmentPage {
            count: 0,
            limit: page.limit,
            offset: page.offset,
            results: Vec::new(),
        };

        let mut params = match self.filter_params(filter).await? {
            Some(params) => params,
            None => return Ok(empty_page),
        };
        params.extend(scope_param(scope));
        params.push(APPOINTMENT_ORDER.to_string());
        params.push(format!("limit={}", page.limit));
        params.push(format!("offset={}", page.offset));

        let path = format!("{}?select=*&{}", APPOINTMENTS_PATH, params.join("&"));
        let (results, total): (Vec<Appointment>, Option<u64>) =
            self.supabase.request_with_count(&path, None).await?;

        Ok(AppointmentPage {
            count: total.unwrap_or(page.offset as u64 + results.len() as u64),
            limit: page.limit,
            offset: page.offset,
            results,
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let path = format!("{}?select=*&id=eq.{}", APPOINTMENTS_PATH, id);
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, request: &CreateAppointmentRequest) -> Result<Appointment, StoreError> {
        let body = json!({
            "doctor_id": request.doctor_id,
            "patient_id": request.patient_id,
            "scheduled_at": request.scheduled_at.to_rfc3339(),
            "is_completed": request.is_completed,
        });

        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::POST,
                APPOINTMENTS_PATH,
                None,
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(map_write_error)?;

        let appointment = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Unexpected("insert returned no rows".to_string()))?;

        info!("Created appointment {} for doctor {}", appointment.id, appointment.doctor_id);
        Ok(appointment)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &UpdateAppointmentRequest,
    ) -> Result<Option<Appointment>, StoreError> {
        if changes.is_empty() {
            return self.get(id).await;
        }

        let mut body = Map::new();
        if let Some(scheduled_at) = changes.scheduled_at {
            body.insert("scheduled_at".to_string(), json!(scheduled_at.to_rfc3339()));
        }
        if let Some(is_completed) = changes.is_completed {
            body.insert("is_completed".to_string(), json!(is_completed));
        }
        if let Some(doctor_id) = changes.doctor_id {
            body.insert("doctor_id".to_string(), json!(doctor_id));
        }
        if let Some(patient_id) = changes.patient_id {
            body.insert("patient_id".to_string(), json!(patient_id));
        }

        let path = format!("{}?id=eq.{}", APPOINTMENTS_PATH, id);
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(Value::Object(body)),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(map_write_error)?;

        Ok(rows.into_iter().next())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS_PATH, id);
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                None,
                Some(Self::representation_headers()),
            )
            .await?;

        Ok(!rows.is_empty())
    }

    async fn scheduled_times(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let params = match self.filter_params(filter).await? {
            Some(params) => params,
            None => return Ok(Vec::new()),
        };

        let mut base = format!("{}?select=scheduled_at", APPOINTMENTS_PATH);
        for param in params {
            base.push('&');
            base.push_str(&param);
        }
        base.push('&');
        base.push_str(APPOINTMENT_ORDER);

        let mut times: Vec<DateTime<Utc>> = Vec::new();
        loop {
            let path = format!(
                "{}&limit={}&offset={}",
                base,
                REPORT_PAGE_SIZE,
                times.len()
            );
            let (rows, total): (Vec<ScheduledRow>, Option<u64>) =
                self.supabase.request_with_count(&path, None).await?;

            let fetched = rows.len() as u64;
            times.extend(rows.into_iter().map(|row| row.scheduled_at));

            let done = match total {
                Some(total) => times.len() as u64 >= total,
                None => fetched < REPORT_PAGE_SIZE,
            };
            if done || fetched == 0 {
                break;
            }
        }

        debug!("Fetched {} scheduled times for report", times.len());
        Ok(times)
    }
}
