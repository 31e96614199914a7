//! Request repository: request lifecycle and the atomic accept operation

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, conflict_on_unique};
use crate::models::request::{AcceptOutcome, RequestStatus, RequestWithRide, RideRequest};
use crate::models::ride::RideStatus;

use super::ride::{RIDE_COLUMNS, ride_from_row};

const REQUEST_COLUMNS: &str =
    "id, ride_id, passenger_id, note, status, created_at, updated_at";

fn request_from_row(row: &PgRow) -> ApiResult<RideRequest> {
    let status: String = row.get("status");
    let status: RequestStatus = status.parse().map_err(|e: String| {
        tracing::error!("Corrupt request status in store: {}", e);
        ApiError::Internal
    })?;

    Ok(RideRequest {
        id: row.get("id"),
        ride_id: row.get("ride_id"),
        passenger_id: row.get("passenger_id"),
        note: row.get("note"),
        status,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Request repository for database operations
#[derive(Clone)]
pub struct RequestRepository {
    pool: PgPool,
}

impl RequestRepository {
    /// Create a new request repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a request row or fail with `NotFound`.
    async fn find(&self, request_id: Uuid) -> ApiResult<RideRequest> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM ride_requests WHERE id = $1"
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ApiError::NotFound("request"))?;

        request_from_row(&row)
    }

    /// Create a pending request against an open ride.
    ///
    /// A rider cannot request their own ride, and each passenger holds at
    /// most one request row per ride (the unique constraint backs this up).
    pub async fn create(
        &self,
        ride_id: Uuid,
        passenger_id: Uuid,
        note: Option<&str>,
    ) -> ApiResult<RideRequest> {
        let ride = sqlx::query("SELECT rider_id, status FROM rides WHERE id = $1")
            .bind(ride_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ApiError::NotFound("ride"))?;

        let rider_id: Uuid = ride.get("rider_id");
        let status: RideStatus = ride
            .get::<String, _>("status")
            .parse()
            .map_err(|_| ApiError::Internal)?;

        if rider_id == passenger_id {
            return Err(ApiError::SelfReference);
        }
        if !status.accepts_requests() {
            return Err(ApiError::InvalidState("ride is not open"));
        }

        // The insert re-checks the ride status in the same statement, so a
        // request racing a concurrent accept cannot land as PENDING against
        // a freshly matched ride.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO ride_requests (ride_id, passenger_id, note, status)
            SELECT id, $2, $3, 'PENDING' FROM rides
            WHERE id = $1 AND status = 'OPEN'
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(ride_id)
        .bind(passenger_id)
        .bind(note)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "request already exists for this ride"))?
        .ok_or(ApiError::InvalidState("ride is not open"))?;

        let request = request_from_row(&row)?;
        info!(
            "Request {} created by passenger {} on ride {}",
            request.id, passenger_id, ride_id
        );
        Ok(request)
    }

    /// List all requests for a ride. Only the owning rider may call.
    pub async fn list_for_ride(&self, ride_id: Uuid, caller: Uuid) -> ApiResult<Vec<RideRequest>> {
        let ride = sqlx::query("SELECT rider_id FROM rides WHERE id = $1")
            .bind(ride_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ApiError::NotFound("ride"))?;

        if ride.get::<Uuid, _>("rider_id") != caller {
            return Err(ApiError::Forbidden);
        }

        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM ride_requests WHERE ride_id = $1 ORDER BY created_at ASC"
        ))
        .bind(ride_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(request_from_row).collect()
    }

    /// List a passenger's requests (any status), each with its parent ride.
    pub async fn list_for_user(&self, passenger_id: Uuid) -> ApiResult<Vec<RequestWithRide>> {
        let rows = sqlx::query(
            r#"
            SELECT q.id, q.ride_id, q.passenger_id, q.note, q.status,
                   q.created_at, q.updated_at,
                   r.id AS r_id, r.rider_id AS r_rider_id, r.passenger_id AS r_passenger_id,
                   r.start_lat, r.start_lng, r.start_address,
                   r.end_lat, r.end_lng, r.end_address,
                   r.departure_at, r.note AS r_note, r.status AS r_status,
                   r.created_at AS r_created_at, r.updated_at AS r_updated_at
            FROM ride_requests q
            JOIN rides r ON r.id = q.ride_id
            WHERE q.passenger_id = $1
            ORDER BY q.created_at DESC
            "#,
        )
        .bind(passenger_id)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let ride_status: RideStatus = row
                .get::<String, _>("r_status")
                .parse()
                .map_err(|_| ApiError::Internal)?;

            out.push(RequestWithRide {
                request: request_from_row(row)?,
                ride: crate::models::ride::Ride {
                    id: row.get("r_id"),
                    rider_id: row.get("r_rider_id"),
                    passenger_id: row.get("r_passenger_id"),
                    start: crate::models::Location {
                        lat: row.get("start_lat"),
                        lng: row.get("start_lng"),
                        address: row.get("start_address"),
                    },
                    end: crate::models::Location {
                        lat: row.get("end_lat"),
                        lng: row.get("end_lng"),
                        address: row.get("end_address"),
                    },
                    departure_at: row.get("departure_at"),
                    note: row.get("r_note"),
                    status: ride_status,
                    created_at: row.get("r_created_at"),
                    updated_at: row.get("r_updated_at"),
                },
            });
        }

        Ok(out)
    }

    /// Accept one pending request: the atomic matching operation.
    ///
    /// Inside a single transaction, with the ride row locked: the target
    /// request becomes ACCEPTED, every other PENDING request for the ride
    /// becomes REJECTED in one statement, and the ride is promoted to
    /// MATCHED with the accepted passenger. The ride and request states are
    /// re-checked under the lock, so a concurrent accept that lost the race
    /// observes the ride already matched and fails with `InvalidState`
    /// without mutating anything.
    pub async fn accept(&self, request_id: Uuid, caller: Uuid) -> ApiResult<AcceptOutcome> {
        // Fail fast before entering the transaction.
        let request = self.find(request_id).await?;
        let ride = sqlx::query("SELECT rider_id, status FROM rides WHERE id = $1")
            .bind(request.ride_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ApiError::NotFound("ride"))?;

        if ride.get::<Uuid, _>("rider_id") != caller {
            return Err(ApiError::Forbidden);
        }

        let mut tx = self.pool.begin().await?;

        // Lock the ride row; sibling accepts serialize here.
        let ride_row = sqlx::query(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides WHERE id = $1 FOR UPDATE"
        ))
        .bind(request.ride_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::NotFound("ride"))?;

        let locked_ride = ride_from_row(&ride_row)?;
        if !locked_ride.status.accepts_requests() {
            return Err(ApiError::InvalidState("ride is not open"));
        }

        let request_row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM ride_requests WHERE id = $1 FOR UPDATE"
        ))
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::NotFound("request"))?;

        let locked_request = request_from_row(&request_row)?;
        if !locked_request.status.is_pending() {
            return Err(ApiError::InvalidState("request is not pending"));
        }

        let accepted_row = sqlx::query(&format!(
            r#"
            UPDATE ride_requests SET status = 'ACCEPTED', updated_at = now()
            WHERE id = $1
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        // Bulk sibling rejection: one statement, no partial application.
        sqlx::query(
            r#"
            UPDATE ride_requests SET status = 'REJECTED', updated_at = now()
            WHERE ride_id = $1 AND id <> $2 AND status = 'PENDING'
            "#,
        )
        .bind(request.ride_id)
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        let matched_row = sqlx::query(&format!(
            r#"
            UPDATE rides SET status = 'MATCHED', passenger_id = $2, updated_at = now()
            WHERE id = $1
            RETURNING {RIDE_COLUMNS}
            "#
        ))
        .bind(request.ride_id)
        .bind(locked_request.passenger_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let outcome = AcceptOutcome {
            request: request_from_row(&accepted_row)?,
            ride: ride_from_row(&matched_row)?,
        };
        info!(
            "Request {} accepted on ride {}: passenger {} matched",
            request_id, outcome.ride.id, outcome.request.passenger_id
        );
        Ok(outcome)
    }

    /// Reject a pending request. Only the ride's rider may call.
    pub async fn reject(&self, request_id: Uuid, caller: Uuid) -> ApiResult<RideRequest> {
        let request = self.find(request_id).await?;
        let ride = sqlx::query("SELECT rider_id FROM rides WHERE id = $1")
            .bind(request.ride_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ApiError::NotFound("ride"))?;

        if ride.get::<Uuid, _>("rider_id") != caller {
            return Err(ApiError::Forbidden);
        }
        if !request.status.is_pending() {
            return Err(ApiError::InvalidState("request is not pending"));
        }

        let row = sqlx::query(&format!(
            r#"
            UPDATE ride_requests SET status = 'REJECTED', updated_at = now()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ApiError::InvalidState("request is not pending"))?;

        let rejected = request_from_row(&row)?;
        info!("Request {} rejected by rider {}", request_id, caller);
        Ok(rejected)
    }

    /// Cancel a pending request: hard delete by its passenger, freeing the
    /// (ride, passenger) uniqueness slot.
    pub async fn cancel(&self, request_id: Uuid, caller: Uuid) -> ApiResult<RideRequest> {
        let request = self.find(request_id).await?;

        if request.passenger_id != caller {
            return Err(ApiError::Forbidden);
        }
        if !request.status.is_pending() {
            return Err(ApiError::InvalidState("request is not pending"));
        }

        let result = sqlx::query(
            "DELETE FROM ride_requests WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(request_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::InvalidState("request is not pending"));
        }

        info!("Request {} cancelled by passenger {}", request_id, caller);
        Ok(request)
    }
}
