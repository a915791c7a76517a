use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::*;
use appointment_cell::services::*;
use appointment_cell::AppointmentState;
use cache_cell::{MemoryResponseCache, ResponseCache};
use shared_models::auth::User;
use shared_utils::test_utils::{TestConfig, TestUser};

struct Fixture {
    state: AppointmentState,
    store: Arc<InMemoryAppointmentStore>,
    cache: Arc<MemoryResponseCache>,
    admin: User,
    superuser: User,
}

fn fixture() -> Fixture {
    let store = Arc::new(InMemoryAppointmentStore::new());
    let cache = Arc::new(MemoryResponseCache::new());
    let state = AppointmentState::new(TestConfig::default().to_arc(), store.clone(), cache.clone());

    Fixture {
        state,
        store,
        cache,
        admin: TestUser::admin("admin@example.com").to_user(),
        superuser: TestUser::superuser("root@example.com").to_user(),
    }
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

fn no_params() -> AppointmentQueryParams {
    AppointmentQueryParams::default()
}

async fn book(fx: &Fixture, doctor: &TestUser, patient: &TestUser, when: DateTime<Utc>) -> Appointment {
    AppointmentCreateService::new(&fx.state)
        .create_appointment(
            &fx.admin,
            CreateAppointmentRequest {
                doctor_id: doctor.uuid(),
                patient_id: patient.uuid(),
                scheduled_at: when,
                is_completed: false,
            },
        )
        .await
        .expect("booking should succeed")
}

// ==============================================================================
// LISTING & VISIBILITY
// ==============================================================================

#[tokio::test]
async fn test_non_superuser_only_sees_own_appointments() {
    let fx = fixture();
    let doctor_a = TestUser::doctor("a@example.com");
    let doctor_b = TestUser::doctor("b@example.com");
    let patient = TestUser::patient("p@example.com");
    let stranger = TestUser::patient("s@example.com");

    book(&fx, &doctor_a, &patient, at(1, 9)).await;
    book(&fx, &doctor_b, &patient, at(1, 10)).await;
    book(&fx, &doctor_b, &stranger, at(2, 10)).await;

    // filters bypass the shared cache, so each identity gets a fresh view
    let params = AppointmentQueryParams {
        is_completed: Some("false".into()),
        ..no_params()
    };
    let listing = AppointmentListingService::new(&fx.state);

    let page = listing.list_appointments(&doctor_a.to_user(), &params).await.unwrap();
    assert_eq!(page.count, 1);
    assert!(page.results.iter().all(|a| a.doctor_id == doctor_a.uuid()));

    let page = listing.list_appointments(&patient.to_user(), &params).await.unwrap();
    assert_eq!(page.count, 2);
    assert!(page.results.iter().all(|a| a.patient_id == patient.uuid()));

    let outsider = TestUser::patient("nobody@example.com");
    let page = listing.list_appointments(&outsider.to_user(), &params).await.unwrap();
    assert_eq!(page.count, 0);

    // admins are staff but not superusers
    let page = listing.list_appointments(&fx.admin, &params).await.unwrap();
    assert_eq!(page.count, 0);

    let page = listing.list_appointments(&fx.superuser, &params).await.unwrap();
    assert_eq!(page.count, 3);
}

#[tokio::test]
async fn test_listing_is_ordered_and_paginated() {
    let fx = fixture();
    let doctor = TestUser::doctor("d@example.com");
    let patient = TestUser::patient("p@example.com");

    for hour in [15, 9, 12, 10, 11] {
        book(&fx, &doctor, &patient, at(3, hour)).await;
    }

    let params = AppointmentQueryParams {
        limit: Some("2".into()),
        offset: Some("1".into()),
        ..no_params()
    };
    let page = AppointmentListingService::new(&fx.state)
        .list_appointments(&fx.superuser, &params)
        .await
        .unwrap();

    assert_eq!(page.count, 5);
    assert_eq!(page.limit, 2);
    assert_eq!(page.offset, 1);
    let hours: Vec<DateTime<Utc>> = page.results.iter().map(|a| a.scheduled_at).collect();
    assert_eq!(hours, vec![at(3, 10), at(3, 11)]);
}

#[tokio::test]
async fn test_filters_narrow_listing() {
    let fx = fixture();
    let house = TestUser::doctor("house@example.com");
    let wilson = TestUser::doctor("wilson@example.com");
    let patient = TestUser::patient("p@example.com");
    fx.store.add_profile(Profile { id: house.uuid(), full_name: "Gregory House".into() }).await;
    fx.store.add_profile(Profile { id: wilson.uuid(), full_name: "James Wilson".into() }).await;

    book(&fx, &house, &patient, at(4, 9)).await;
    book(&fx, &house, &patient, at(5, 9)).await;
    book(&fx, &wilson, &patient, at(4, 10)).await;

    let listing = AppointmentListingService::new(&fx.state);

    let by_name = AppointmentQueryParams { doctor_name: Some("HOUSE".into()), ..no_params() };
    let page = listing.list_appointments(&fx.superuser, &by_name).await.unwrap();
    assert_eq!(page.count, 2);

    let by_date = AppointmentQueryParams { date: Some("2024-06-04".into()), ..no_params() };
    let page = listing.list_appointments(&fx.superuser, &by_date).await.unwrap();
    assert_eq!(page.count, 2);

    let both = AppointmentQueryParams {
        doctor_name: Some("wilson".into()),
        date: Some("2024-06-04".into()),
        ..no_params()
    };
    let page = listing.list_appointments(&fx.superuser, &both).await.unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.results[0].doctor_id, wilson.uuid());

    let bad = AppointmentQueryParams { date: Some("June 4".into()), ..no_params() };
    let err = listing.list_appointments(&fx.superuser, &bad).await.unwrap_err();
    assert_matches!(err, AppointmentError::ValidationError(_));
}

// ==============================================================================
// CACHING
// ==============================================================================

#[tokio::test(start_paused = true)]
async fn test_unfiltered_listing_served_from_cache_until_ttl() {
    let fx = fixture();
    let doctor = TestUser::doctor("d@example.com");
    let patient = TestUser::patient("p@example.com");
    book(&fx, &doctor, &patient, at(6, 9)).await;

    let listing = AppointmentListingService::new(&fx.state);
    let first = listing.list_appointments(&fx.superuser, &no_params()).await.unwrap();
    assert_eq!(first.count, 1);
    assert!(fx.cache.get("appointments:limit=10&offset=0").await.unwrap().is_some());

    // a new row does not show up while the cached page is live
    book(&fx, &doctor, &patient, at(6, 10)).await;
    tokio::time::advance(Duration::from_secs(299)).await;
    let cached = listing.list_appointments(&fx.superuser, &no_params()).await.unwrap();
    assert_eq!(cached, first);

    // filtered listings always go to the store
    let fresh_params = AppointmentQueryParams { is_completed: Some("false".into()), ..no_params() };
    let fresh = listing.list_appointments(&fx.superuser, &fresh_params).await.unwrap();
    assert_eq!(fresh.count, 2);

    tokio::time::advance(Duration::from_secs(2)).await;
    let expired = listing.list_appointments(&fx.superuser, &no_params()).await.unwrap();
    assert_eq!(expired.count, 2);
}

#[tokio::test]
async fn test_cache_key_depends_on_pagination_only() {
    let page = PageRequest { limit: 25, offset: 50 };
    assert_eq!(list_cache_key(&page), "appointments:limit=25&offset=50");

    let fx = fixture();
    let listing = AppointmentListingService::new(&fx.state);
    let params = AppointmentQueryParams {
        limit: Some("5".into()),
        offset: Some("10".into()),
        ..no_params()
    };
    listing.list_appointments(&fx.superuser, &params).await.unwrap();
    listing.list_appointments(&fx.superuser, &no_params()).await.unwrap();

    assert!(fx.cache.get("appointments:limit=5&offset=10").await.unwrap().is_some());
    assert!(fx.cache.get("appointments:limit=10&offset=0").await.unwrap().is_some());
    assert_eq!(fx.cache.len().await, 2);
}

#[tokio::test]
async fn test_unfiltered_cache_is_shared_across_identities() {
    let fx = fixture();
    let doctor_a = TestUser::doctor("a@example.com");
    let doctor_b = TestUser::doctor("b@example.com");
    let patient = TestUser::patient("p@example.com");
    book(&fx, &doctor_a, &patient, at(7, 9)).await;

    let listing = AppointmentListingService::new(&fx.state);
    let for_a = listing.list_appointments(&doctor_a.to_user(), &no_params()).await.unwrap();
    assert_eq!(for_a.count, 1);

    // known limitation: the key carries no identity
    let for_b = listing.list_appointments(&doctor_b.to_user(), &no_params()).await.unwrap();
    assert_eq!(for_b, for_a);
}

// ==============================================================================
// DETAIL
// ==============================================================================

#[tokio::test]
async fn test_delete_invalidates_every_cached_page() {
    let fx = fixture();
    let doctor = TestUser::doctor("d@example.com");
    let patient = TestUser::patient("p@example.com");
    let first = book(&fx, &doctor, &patient, at(8, 9)).await;
    book(&fx, &doctor, &patient, at(8, 10)).await;

    let listing = AppointmentListingService::new(&fx.state);
    for offset in ["0", "1"] {
        let params = AppointmentQueryParams {
            limit: Some("1".into()),
            offset: Some(offset.into()),
            ..no_params()
        };
        listing.list_appointments(&fx.superuser, &params).await.unwrap();
    }
    listing.list_appointments(&fx.superuser, &no_params()).await.unwrap();
    assert_eq!(fx.cache.len().await, 3);

    AppointmentDetailService::new(&fx.state)
        .delete_appointment(&patient.to_user(), first.id)
        .await
        .unwrap();

    assert!(fx.cache.is_empty().await);
    let after = listing.list_appointments(&fx.superuser, &no_params()).await.unwrap();
    assert_eq!(after.count, 1);
}

#[tokio::test]
async fn test_unauthorized_delete_has_no_side_effects() {
    let fx = fixture();
    let doctor = TestUser::doctor("d@example.com");
    let patient = TestUser::patient("p@example.com");
    let appt = book(&fx, &doctor, &patient, at(9, 9)).await;

    AppointmentListingService::new(&fx.state)
        .list_appointments(&fx.superuser, &no_params())
        .await
        .unwrap();

    let stranger = TestUser::doctor("other@example.com").to_user();
    let detail = AppointmentDetailService::new(&fx.state);

    // staff without superuser rights are not owners either
    for user in [&stranger, &fx.admin] {
        let err = detail.delete_appointment(user, appt.id).await.unwrap_err();
        assert_matches!(err, AppointmentError::Forbidden(_));
    }

    assert_eq!(fx.store.len().await, 1);
    assert_eq!(fx.cache.len().await, 1);
}

#[tokio::test]
async fn test_detail_permissions_and_not_found() {
    let fx = fixture();
    let doctor = TestUser::doctor("d@example.com");
    let patient = TestUser::patient("p@example.com");
    let appt = book(&fx, &doctor, &patient, at(10, 9)).await;
    let detail = AppointmentDetailService::new(&fx.state);

    assert_eq!(detail.get_appointment(&doctor.to_user(), appt.id).await.unwrap(), appt);
    assert_eq!(detail.get_appointment(&patient.to_user(), appt.id).await.unwrap(), appt);
    assert_eq!(detail.get_appointment(&fx.superuser, appt.id).await.unwrap(), appt);

    let stranger = TestUser::patient("x@example.com").to_user();
    assert_matches!(
        detail.get_appointment(&stranger, appt.id).await,
        Err(AppointmentError::Forbidden(_))
    );

    // missing ids are reported before permissions
    assert_matches!(
        detail.get_appointment(&stranger, Uuid::new_v4()).await,
        Err(AppointmentError::NotFound)
    );
    assert_matches!(
        detail.delete_appointment(&fx.superuser, Uuid::new_v4()).await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn test_partial_update_and_conflict() {
    let fx = fixture();
    let doctor = TestUser::doctor("d@example.com");
    let patient = TestUser::patient("p@example.com");
    let morning = book(&fx, &doctor, &patient, at(11, 9)).await;
    let noon = book(&fx, &doctor, &patient, at(11, 12)).await;
    let detail = AppointmentDetailService::new(&fx.state);

    let updated = detail
        .update_appointment(
            &doctor.to_user(),
            morning.id,
            UpdateAppointmentRequest { is_completed: Some(true), ..Default::default() },
        )
        .await
        .unwrap();
    assert!(updated.is_completed);
    assert_eq!(updated.scheduled_at, morning.scheduled_at);

    let unchanged = detail
        .update_appointment(&patient.to_user(), noon.id, UpdateAppointmentRequest::default())
        .await
        .unwrap();
    assert_eq!(unchanged, noon);

    let err = detail
        .update_appointment(
            &patient.to_user(),
            noon.id,
            UpdateAppointmentRequest { scheduled_at: Some(at(11, 9)), ..Default::default() },
        )
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::Conflict(_));

    let stranger = TestUser::patient("x@example.com").to_user();
    let err = detail
        .update_appointment(
            &stranger,
            noon.id,
            UpdateAppointmentRequest { is_completed: Some(true), ..Default::default() },
        )
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::Forbidden(_));
    assert!(!detail.get_appointment(&fx.superuser, noon.id).await.unwrap().is_completed);
}

// ==============================================================================
// CREATE
// ==============================================================================

#[tokio::test]
async fn test_duplicate_doctor_slot_conflicts() {
    let fx = fixture();
    let doctor = TestUser::doctor("d@example.com");
    let other_doctor = TestUser::doctor("o@example.com");
    let patient = TestUser::patient("p@example.com");
    let create = AppointmentCreateService::new(&fx.state);

    let request = CreateAppointmentRequest {
        doctor_id: doctor.uuid(),
        patient_id: patient.uuid(),
        scheduled_at: at(12, 9),
        is_completed: false,
    };
    create.create_appointment(&fx.admin, request.clone()).await.unwrap();

    let err = create.create_appointment(&fx.superuser, request.clone()).await.unwrap_err();
    assert_matches!(err, AppointmentError::Conflict(_));

    // same instant with another doctor is fine
    let other = CreateAppointmentRequest { doctor_id: other_doctor.uuid(), ..request };
    create.create_appointment(&fx.admin, other).await.unwrap();
    assert_eq!(fx.store.len().await, 2);
}

#[tokio::test]
async fn test_only_staff_can_create() {
    let fx = fixture();
    let doctor = TestUser::doctor("d@example.com");
    let patient = TestUser::patient("p@example.com");
    let create = AppointmentCreateService::new(&fx.state);

    for user in [doctor.to_user(), patient.to_user()] {
        let err = create
            .create_appointment(
                &user,
                CreateAppointmentRequest {
                    doctor_id: doctor.uuid(),
                    patient_id: patient.uuid(),
                    scheduled_at: at(13, 9),
                    is_completed: false,
                },
            )
            .await
            .unwrap_err();
        assert_matches!(err, AppointmentError::Forbidden(_));
    }
    assert!(fx.store.is_empty().await);
}

// ==============================================================================
// REPORT
// ==============================================================================

#[tokio::test]
async fn test_report_counts_sum_to_filtered_total() {
    let fx = fixture();
    let house = TestUser::doctor("house@example.com");
    let wilson = TestUser::doctor("wilson@example.com");
    let patient = TestUser::patient("p@example.com");
    fx.store.add_profile(Profile { id: house.uuid(), full_name: "Gregory House".into() }).await;
    fx.store.add_profile(Profile { id: wilson.uuid(), full_name: "James Wilson".into() }).await;

    book(&fx, &house, &patient, at(14, 9)).await;
    book(&fx, &house, &patient, at(14, 23)).await;
    book(&fx, &house, &patient, at(15, 0)).await;
    book(&fx, &wilson, &patient, at(14, 9)).await;
    book(&fx, &wilson, &patient, at(16, 9)).await;

    let report = AppointmentReportService::new(&fx.state);

    let all = report.daily_counts(&fx.admin, &no_params()).await.unwrap();
    assert_eq!(
        all,
        vec![
            DailyAppointmentCount { scheduled_date: NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(), count: 3 },
            DailyAppointmentCount { scheduled_date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), count: 1 },
            DailyAppointmentCount { scheduled_date: NaiveDate::from_ymd_opt(2024, 6, 16).unwrap(), count: 1 },
        ]
    );
    assert_eq!(all.iter().map(|r| r.count).sum::<u64>(), fx.store.len().await as u64);

    let params = AppointmentQueryParams { doctor_name: Some("house".into()), ..no_params() };
    let house_only = report.daily_counts(&fx.superuser, &params).await.unwrap();
    assert_eq!(house_only.iter().map(|r| r.count).sum::<u64>(), 3);
    assert_eq!(house_only.len(), 2);

    let listed = AppointmentListingService::new(&fx.state)
        .list_appointments(&fx.superuser, &params)
        .await
        .unwrap();
    assert_eq!(listed.count, 3);
}

#[tokio::test]
async fn test_report_is_staff_only() {
    let fx = fixture();
    let doctor = TestUser::doctor("d@example.com").to_user();

    let err = AppointmentReportService::new(&fx.state)
        .daily_counts(&doctor, &no_params())
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::Forbidden(_));
}
