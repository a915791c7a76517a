use chrono::NaiveDate;

use crate::models::{Appointment, AppointmentError, AppointmentQueryParams};

pub const MAX_PAGE_LIMIT: u32 = 100;

/// Narrowing applied to listings and reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    /// Case-insensitive substring of the doctor's full name.
    pub doctor_name: Option<String>,
    /// UTC calendar date of `scheduled_at`.
    pub date: Option<NaiveDate>,
    pub is_completed: Option<bool>,
}

impl AppointmentFilter {
    pub fn from_params(params: &AppointmentQueryParams) -> Result<Self, AppointmentError> {
        let doctor_name = non_blank(params.doctor_name.as_deref()).map(str::to_string);

        let date = non_blank(params.date.as_deref())
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    AppointmentError::ValidationError(format!(
                        "Invalid date '{}': expected YYYY-MM-DD",
                        raw
                    ))
                })
            })
            .transpose()?;

        let is_completed = non_blank(params.is_completed.as_deref())
            .map(parse_bool)
            .transpose()?;

        Ok(Self {
            doctor_name,
            date,
            is_completed,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.doctor_name.is_none() && self.date.is_none() && self.is_completed.is_none()
    }

    /// `doctor_name` is the full name of the appointment's doctor, if known.
    pub fn matches(&self, appointment: &Appointment, doctor_name: Option<&str>) -> bool {
        if let Some(needle) = &self.doctor_name {
            let found = doctor_name
                .map(|name| name.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false);
            if !found {
                return false;
            }
        }

        if let Some(date) = self.date {
            if appointment.scheduled_date() != date {
                return false;
            }
        }

        if let Some(is_completed) = self.is_completed {
            if appointment.is_completed != is_completed {
                return false;
            }
        }

        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u32,
}

impl PageRequest {
    /// Unparseable or zero limits fall back to `default_limit`; unparseable
    /// offsets fall back to 0.
    pub fn from_params(params: &AppointmentQueryParams, default_limit: u32) -> Self {
        let limit = params
            .limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(default_limit)
            .min(MAX_PAGE_LIMIT);

        let offset = params
            .offset
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(0);

        Self { limit, offset }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bool(raw: &str) -> Result<bool, AppointmentError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(AppointmentError::ValidationError(format!(
            "Invalid is_completed '{}': expected true or false",
            raw
        ))),
    }
}
