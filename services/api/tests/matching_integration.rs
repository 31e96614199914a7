//! Integration tests for the ride/request matching core
//!
//! These run against a live PostgreSQL instance (configured through
//! `DATABASE_URL`) and apply the workspace migrations on first use.
//! Run with `cargo test -- --ignored`.

use chrono::{Duration, Utc};
use serial_test::serial;
use sqlx::PgPool;
use uuid::Uuid;

use api::error::ApiError;
use api::models::Location;
use api::models::ride::{CreateRideRequest, RideQuery, RideStatus};
use api::models::request::RequestStatus;
use api::repositories::ProfileRepository;
use api::repositories::feedback::FeedbackRepository;
use api::repositories::request::RequestRepository;
use api::repositories::ride::RideRepository;
use api::models::feedback::CreateFeedbackRequest;
use api::models::user::UpdateProfileRequest;

async fn setup_pool() -> PgPool {
    let config = common::database::DatabaseConfig::from_env().expect("database config");
    let pool = common::database::init_pool(&config).await.expect("pool");
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

/// Insert a user directly; `vehicle` controls whether they can offer rides.
async fn create_user(pool: &PgPool, vehicle: Option<&str>) -> Uuid {
    let phone = format!("+91{}", &Uuid::new_v4().simple().to_string()[..10]);
    sqlx::query_scalar(
        "INSERT INTO users (phone, name, vehicle_registration)
         VALUES ($1, 'Test User', $2) RETURNING id",
    )
    .bind(phone)
    .bind(vehicle)
    .fetch_one(pool)
    .await
    .expect("insert user")
}

fn ride_payload() -> CreateRideRequest {
    CreateRideRequest {
        start: Location {
            lat: 12.9757,
            lng: 77.6066,
            address: "MG Road, Bengaluru".to_string(),
        },
        end: Location {
            lat: 12.9352,
            lng: 77.6245,
            address: "Koramangala, Bengaluru".to_string(),
        },
        departure_at: Utc::now() + Duration::hours(3),
        note: None,
    }
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_create_ride_requires_vehicle_registration() {
    let pool = setup_pool().await;
    let rides = RideRepository::new(pool.clone());

    let no_vehicle = create_user(&pool, None).await;
    let err = rides.create(no_vehicle, &ride_payload()).await.unwrap_err();
    assert!(matches!(err, ApiError::PreconditionFailed(_)));

    // No ride row was created for the failed attempt.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rides WHERE rider_id = $1")
        .bind(no_vehicle)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    let with_vehicle = create_user(&pool, Some("KA-01-AB-1234")).await;
    let ride = rides.create(with_vehicle, &ride_payload()).await.unwrap();
    assert_eq!(ride.status, RideStatus::Open);
    assert_eq!(ride.passenger_id, None);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_accept_matches_one_and_rejects_siblings() {
    let pool = setup_pool().await;
    let rides = RideRepository::new(pool.clone());
    let requests = RequestRepository::new(pool.clone());

    let rider = create_user(&pool, Some("KA-01-AB-1234")).await;
    let passenger_a = create_user(&pool, None).await;
    let passenger_b = create_user(&pool, None).await;

    let ride = rides.create(rider, &ride_payload()).await.unwrap();
    let q1 = requests.create(ride.id, passenger_a, None).await.unwrap();
    let q2 = requests.create(ride.id, passenger_b, None).await.unwrap();

    let outcome = requests.accept(q1.id, rider).await.unwrap();
    assert_eq!(outcome.request.status, RequestStatus::Accepted);
    assert_eq!(outcome.ride.status, RideStatus::Matched);
    assert_eq!(outcome.ride.passenger_id, Some(passenger_a));

    // The sibling was bulk-rejected inside the same transaction.
    let all = requests.list_for_ride(ride.id, rider).await.unwrap();
    let sibling = all.iter().find(|r| r.id == q2.id).unwrap();
    assert_eq!(sibling.status, RequestStatus::Rejected);

    // A second accept on the losing request fails cleanly.
    let err = requests.accept(q2.id, rider).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));

    let ride_after = rides.find(ride.id).await.unwrap();
    assert_eq!(ride_after.status, RideStatus::Matched);
    assert_eq!(ride_after.passenger_id, Some(passenger_a));
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_concurrent_accepts_admit_exactly_one() {
    let pool = setup_pool().await;
    let rides = RideRepository::new(pool.clone());
    let requests = RequestRepository::new(pool.clone());

    let rider = create_user(&pool, Some("KA-01-AB-1234")).await;
    let passenger_a = create_user(&pool, None).await;
    let passenger_b = create_user(&pool, None).await;

    let ride = rides.create(rider, &ride_payload()).await.unwrap();
    let q1 = requests.create(ride.id, passenger_a, None).await.unwrap();
    let q2 = requests.create(ride.id, passenger_b, None).await.unwrap();

    let r1 = requests.clone();
    let r2 = requests.clone();
    let (a, b) = tokio::join!(r1.accept(q1.id, rider), r2.accept(q2.id, rider));

    // Exactly one accept wins; the other observes the matched ride.
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser.unwrap_err(), ApiError::InvalidState(_)));

    let accepted: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM ride_requests WHERE ride_id = $1 AND status = 'ACCEPTED'",
    )
    .bind(ride.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(accepted, 1);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_duplicate_request_conflicts_until_cancelled() {
    let pool = setup_pool().await;
    let rides = RideRepository::new(pool.clone());
    let requests = RequestRepository::new(pool.clone());

    let rider = create_user(&pool, Some("KA-01-AB-1234")).await;
    let passenger = create_user(&pool, None).await;

    let ride = rides.create(rider, &ride_payload()).await.unwrap();
    let first = requests.create(ride.id, passenger, None).await.unwrap();

    let err = requests.create(ride.id, passenger, None).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    // Cancelling frees the uniqueness slot.
    requests.cancel(first.id, passenger).await.unwrap();
    let second = requests.create(ride.id, passenger, None).await.unwrap();
    assert_eq!(second.status, RequestStatus::Pending);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_rider_cannot_request_own_ride() {
    let pool = setup_pool().await;
    let rides = RideRepository::new(pool.clone());
    let requests = RequestRepository::new(pool.clone());

    let rider = create_user(&pool, Some("KA-01-AB-1234")).await;
    let ride = rides.create(rider, &ride_payload()).await.unwrap();

    let err = requests.create(ride.id, rider, None).await.unwrap_err();
    assert!(matches!(err, ApiError::SelfReference));
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_state_gated_ride_mutation() {
    let pool = setup_pool().await;
    let rides = RideRepository::new(pool.clone());
    let requests = RequestRepository::new(pool.clone());

    let rider = create_user(&pool, Some("KA-01-AB-1234")).await;
    let passenger = create_user(&pool, None).await;

    let ride = rides.create(rider, &ride_payload()).await.unwrap();

    // Completing an OPEN ride fails.
    let err = rides.complete(ride.id, rider).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));

    let request = requests.create(ride.id, passenger, None).await.unwrap();
    requests.accept(request.id, rider).await.unwrap();

    // Cancelling a MATCHED ride fails and leaves it unmodified.
    let err = rides.cancel(ride.id, rider).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));
    assert_eq!(rides.find(ride.id).await.unwrap().status, RideStatus::Matched);

    // Only the rider may complete.
    let err = rides.complete(ride.id, passenger).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));

    let completed = rides.complete(ride.id, rider).await.unwrap();
    assert_eq!(completed.status, RideStatus::Completed);

    // COMPLETED is absorbing.
    let err = rides.cancel(ride.id, rider).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_reject_request_preconditions() {
    let pool = setup_pool().await;
    let rides = RideRepository::new(pool.clone());
    let requests = RequestRepository::new(pool.clone());

    let rider = create_user(&pool, Some("KA-01-AB-1234")).await;
    let passenger = create_user(&pool, None).await;

    let ride = rides.create(rider, &ride_payload()).await.unwrap();
    let request = requests.create(ride.id, passenger, None).await.unwrap();

    // Only the ride's rider may reject.
    let err = requests.reject(request.id, passenger).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));

    let rejected = requests.reject(request.id, rider).await.unwrap();
    assert_eq!(rejected.status, RequestStatus::Rejected);

    // REJECTED is terminal: a second reject fails, and the ride is untouched.
    let err = requests.reject(request.id, rider).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));
    assert_eq!(rides.find(ride.id).await.unwrap().status, RideStatus::Open);
    assert_eq!(rides.find(ride.id).await.unwrap().passenger_id, None);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_request_on_matched_ride_is_invalid() {
    let pool = setup_pool().await;
    let rides = RideRepository::new(pool.clone());
    let requests = RequestRepository::new(pool.clone());

    let rider = create_user(&pool, Some("KA-01-AB-1234")).await;
    let passenger_a = create_user(&pool, None).await;
    let passenger_b = create_user(&pool, None).await;

    let ride = rides.create(rider, &ride_payload()).await.unwrap();
    let request = requests.create(ride.id, passenger_a, None).await.unwrap();
    requests.accept(request.id, rider).await.unwrap();

    let err = requests.create(ride.id, passenger_b, None).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));

    // No stray PENDING row landed against the matched ride.
    let pending: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM ride_requests WHERE ride_id = $1 AND status = 'PENDING'",
    )
    .bind(ride.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(pending, 0);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_cancel_accepted_request_is_invalid() {
    let pool = setup_pool().await;
    let rides = RideRepository::new(pool.clone());
    let requests = RequestRepository::new(pool.clone());

    let rider = create_user(&pool, Some("KA-01-AB-1234")).await;
    let passenger = create_user(&pool, None).await;

    let ride = rides.create(rider, &ride_payload()).await.unwrap();
    let request = requests.create(ride.id, passenger, None).await.unwrap();
    requests.accept(request.id, rider).await.unwrap();

    let err = requests.cancel(request.id, passenger).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));

    // Request and ride are unchanged.
    let all = requests.list_for_ride(ride.id, rider).await.unwrap();
    assert_eq!(all[0].status, RequestStatus::Accepted);
    assert_eq!(rides.find(ride.id).await.unwrap().status, RideStatus::Matched);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_cancel_ride_cascades_requests() {
    let pool = setup_pool().await;
    let rides = RideRepository::new(pool.clone());
    let requests = RequestRepository::new(pool.clone());

    let rider = create_user(&pool, Some("KA-01-AB-1234")).await;
    let passenger = create_user(&pool, None).await;

    let ride = rides.create(rider, &ride_payload()).await.unwrap();
    requests.create(ride.id, passenger, None).await.unwrap();

    rides.cancel(ride.id, rider).await.unwrap();

    let remaining: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM ride_requests WHERE ride_id = $1")
            .bind(ride.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_listing_annotates_and_excludes() {
    let pool = setup_pool().await;
    let rides = RideRepository::new(pool.clone());
    let requests = RequestRepository::new(pool.clone());

    let rider = create_user(&pool, Some("KA-01-AB-1234")).await;
    let passenger = create_user(&pool, None).await;

    let ride = rides.create(rider, &ride_payload()).await.unwrap();
    requests.create(ride.id, passenger, None).await.unwrap();

    // The passenger sees the ride, annotated.
    let (items, _) = rides.list(&RideQuery::default(), Some(passenger)).await.unwrap();
    let listed = items.iter().find(|s| s.ride.id == ride.id).unwrap();
    assert!(listed.has_requested);

    // The rider never sees their own ride in the browse feed.
    let (items, _) = rides.list(&RideQuery::default(), Some(rider)).await.unwrap();
    assert!(items.iter().all(|s| s.ride.id != ride.id));
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_proximity_filter_and_ordering() {
    let pool = setup_pool().await;
    let rides = RideRepository::new(pool.clone());

    let rider = create_user(&pool, Some("KA-01-AB-1234")).await;
    let viewer = create_user(&pool, None).await;

    // Near: ~1.1 km from the filter point. Far: ~5 km out.
    let mut near = ride_payload();
    near.start = Location {
        lat: 12.9810,
        lng: 77.5969,
        address: "Cubbon Park".to_string(),
    };
    let near = rides.create(rider, &near).await.unwrap();

    let mut far = ride_payload();
    far.start = Location {
        lat: 13.0200,
        lng: 77.6100,
        address: "Hebbal".to_string(),
    };
    let far = rides.create(rider, &far).await.unwrap();

    let query = RideQuery {
        lat: Some(12.9757),
        lng: Some(77.6066),
        ..Default::default()
    };
    let (items, _) = rides.list(&query, Some(viewer)).await.unwrap();

    assert!(items.iter().any(|s| s.ride.id == near.id));
    assert!(items.iter().all(|s| s.ride.id != far.id));
    let listed = items.iter().find(|s| s.ride.id == near.id).unwrap();
    let d = listed.distance_meters.expect("distance annotation");
    assert!((900.0..1_300.0).contains(&d), "got {} m", d);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_sweep_completes_only_overdue_matched_rides() {
    let pool = setup_pool().await;
    let rides = RideRepository::new(pool.clone());
    let requests = RequestRepository::new(pool.clone());

    let rider = create_user(&pool, Some("KA-01-AB-1234")).await;
    let passenger = create_user(&pool, None).await;

    // One matched ride and one open ride, both overdue.
    let mut payload = ride_payload();
    payload.departure_at = Utc::now() - Duration::hours(1);
    let matched = rides.create(rider, &payload).await.unwrap();
    let open = rides.create(rider, &payload).await.unwrap();

    let request = requests.create(matched.id, passenger, None).await.unwrap();
    requests.accept(request.id, rider).await.unwrap();

    let completed = rides.complete_overdue().await.unwrap();
    assert!(completed.iter().any(|r| r.id == matched.id));
    assert!(completed.iter().all(|r| r.id != open.id));

    assert_eq!(rides.find(matched.id).await.unwrap().status, RideStatus::Completed);
    assert_eq!(rides.find(open.id).await.unwrap().status, RideStatus::Open);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_feedback_after_completion_only() {
    let pool = setup_pool().await;
    let rides = RideRepository::new(pool.clone());
    let requests = RequestRepository::new(pool.clone());
    let feedback = FeedbackRepository::new(pool.clone());

    let rider = create_user(&pool, Some("KA-01-AB-1234")).await;
    let passenger = create_user(&pool, None).await;
    let outsider = create_user(&pool, None).await;

    let ride = rides.create(rider, &ride_payload()).await.unwrap();
    let request = requests.create(ride.id, passenger, None).await.unwrap();
    requests.accept(request.id, rider).await.unwrap();

    let payload = CreateFeedbackRequest {
        rating: 5,
        comment: Some("Smooth ride".to_string()),
    };

    // Ride not yet completed.
    let err = feedback.create(ride.id, passenger, &payload).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));

    rides.complete(ride.id, rider).await.unwrap();

    let entry = feedback.create(ride.id, passenger, &payload).await.unwrap();
    assert_eq!(entry.to_user_id, rider);

    // One entry per (ride, author).
    let err = feedback.create(ride.id, passenger, &payload).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    // Non-participants cannot rate.
    let err = feedback.create(ride.id, outsider, &payload).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));

    let summary = feedback.list_for_user(rider).await.unwrap();
    assert!(summary.count >= 1);
    assert!(summary.average.is_some());
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_partial_profile_update_keeps_vehicle() {
    let pool = setup_pool().await;
    let rides = RideRepository::new(pool.clone());
    let profiles = ProfileRepository::new(pool.clone());

    let rider = create_user(&pool, Some("KA-01-AB-1234")).await;

    // Updating only the name must not touch the vehicle registration.
    let user = profiles
        .update(
            rider,
            &UpdateProfileRequest {
                name: Some("Asha".to_string()),
                city: None,
                vehicle_registration: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(user.name.as_deref(), Some("Asha"));
    assert_eq!(user.vehicle_registration.as_deref(), Some("KA-01-AB-1234"));

    // The rider can still offer rides afterwards.
    rides.create(rider, &ride_payload()).await.unwrap();

    // An explicit empty string clears it, demoting to passenger-only.
    let user = profiles
        .update(
            rider,
            &UpdateProfileRequest {
                name: None,
                city: None,
                vehicle_registration: Some("  ".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(user.vehicle_registration, None);

    let err = rides.create(rider, &ride_payload()).await.unwrap_err();
    assert!(matches!(err, ApiError::PreconditionFailed(_)));
}
