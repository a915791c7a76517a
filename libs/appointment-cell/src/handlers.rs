// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentPage, AppointmentQueryParams, CreateAppointmentRequest,
    DailyAppointmentCount, UpdateAppointmentRequest,
};
use crate::services::{
    AppointmentCreateService, AppointmentDetailService, AppointmentListingService,
    AppointmentReportService,
};
use crate::state::AppointmentState;

// ==============================================================================
// COLLECTION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppointmentState>,
    Query(params): Query<AppointmentQueryParams>,
    Extension(user): Extension<User>,
) -> Result<Json<AppointmentPage>, AppError> {
    let listing_service = AppointmentListingService::new(&state);
    let page = listing_service.list_appointments(&user, &params).await?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let create_service = AppointmentCreateService::new(&state);
    let appointment = create_service.create_appointment(&user, request).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn get_appointment_report(
    State(state): State<AppointmentState>,
    Query(params): Query<AppointmentQueryParams>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<DailyAppointmentCount>>, AppError> {
    let report_service = AppointmentReportService::new(&state);
    let report = report_service.daily_counts(&user, &params).await?;
    Ok(Json(report))
}

// ==============================================================================
// DETAIL HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Appointment>, AppError> {
    let detail_service = AppointmentDetailService::new(&state);
    let appointment = detail_service.get_appointment(&user, appointment_id).await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let detail_service = AppointmentDetailService::new(&state);
    let appointment = detail_service
        .update_appointment(&user, appointment_id, request)
        .await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    let detail_service = AppointmentDetailService::new(&state);
    detail_service.delete_appointment(&user, appointment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
