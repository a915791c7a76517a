use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use shared_models::auth::User;

use crate::models::{AppointmentError, AppointmentQueryParams, DailyAppointmentCount};
use crate::services::access::AccessPolicy;
use crate::services::filter::AppointmentFilter;
use crate::services::store::AppointmentStore;
use crate::state::AppointmentState;

/// Counts per UTC calendar date, oldest date first.
pub fn group_by_date<I>(scheduled_times: I) -> Vec<DailyAppointmentCount>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let mut counts: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for scheduled_at in scheduled_times {
        *counts.entry(scheduled_at.date_naive()).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(scheduled_date, count)| DailyAppointmentCount {
            scheduled_date,
            count,
        })
        .collect()
}

pub struct AppointmentReportService {
    store: Arc<dyn AppointmentStore>,
}

impl AppointmentReportService {
    pub fn new(state: &AppointmentState) -> Self {
        Self {
            store: Arc::clone(&state.store),
        }
    }

    pub async fn daily_counts(
        &self,
        user: &User,
        params: &AppointmentQueryParams,
    ) -> Result<Vec<DailyAppointmentCount>, AppointmentError> {
        AccessPolicy::ensure_staff(user, "view appointment reports")?;

        let filter = AppointmentFilter::from_params(params)?;
        let scheduled_times = self.store.scheduled_times(&filter).await?;
        debug!("Grouping {} appointments for report", scheduled_times.len());

        Ok(group_by_date(scheduled_times))
    }
}
