//! Ride repository: lifecycle transitions and the browse listing query

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::geo::PROXIMITY_RADIUS_METERS;
use crate::models::Location;
use crate::models::ride::{CreateRideRequest, Ride, RideQuery, RideStatus, RideSummary};

/// Columns selected whenever a full ride row is needed.
pub(crate) const RIDE_COLUMNS: &str = "id, rider_id, passenger_id, start_lat, start_lng, \
     start_address, end_lat, end_lng, end_address, departure_at, note, status, \
     created_at, updated_at";

/// Map a database row onto a [`Ride`].
///
/// Works for any query that selects [`RIDE_COLUMNS`], optionally prefixed.
pub(crate) fn ride_from_row(row: &PgRow) -> ApiResult<Ride> {
    let status: String = row.get("status");
    let status: RideStatus = status.parse().map_err(|e: String| {
        tracing::error!("Corrupt ride status in store: {}", e);
        ApiError::Internal
    })?;

    Ok(Ride {
        id: row.get("id"),
        rider_id: row.get("rider_id"),
        passenger_id: row.get("passenger_id"),
        start: Location {
            lat: row.get("start_lat"),
            lng: row.get("start_lng"),
            address: row.get("start_address"),
        },
        end: Location {
            lat: row.get("end_lat"),
            lng: row.get("end_lng"),
            address: row.get("end_address"),
        },
        departure_at: row.get("departure_at"),
        note: row.get("note"),
        status,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Ride repository for database operations
#[derive(Clone)]
pub struct RideRepository {
    pool: PgPool,
}

impl RideRepository {
    /// Create a new ride repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a ride row or fail with `NotFound`.
    pub async fn find(&self, ride_id: Uuid) -> ApiResult<Ride> {
        let row = sqlx::query(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides WHERE id = $1"
        ))
        .bind(ride_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ApiError::NotFound("ride"))?;

        ride_from_row(&row)
    }

    /// Create a ride offer.
    ///
    /// The rider must exist and carry a vehicle registration; users without
    /// one can only act as passengers.
    pub async fn create(&self, rider_id: Uuid, payload: &CreateRideRequest) -> ApiResult<Ride> {
        let rider = sqlx::query("SELECT vehicle_registration FROM users WHERE id = $1")
            .bind(rider_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ApiError::NotFound("user"))?;

        let vehicle: Option<String> = rider.get("vehicle_registration");
        if vehicle.as_deref().map_or(true, |v| v.trim().is_empty()) {
            return Err(ApiError::PreconditionFailed("vehicle registration required"));
        }

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO rides (rider_id, start_lat, start_lng, start_address,
                               end_lat, end_lng, end_address, departure_at, note, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'OPEN')
            RETURNING {RIDE_COLUMNS}
            "#
        ))
        .bind(rider_id)
        .bind(payload.start.lat)
        .bind(payload.start.lng)
        .bind(&payload.start.address)
        .bind(payload.end.lat)
        .bind(payload.end.lng)
        .bind(&payload.end.address)
        .bind(payload.departure_at)
        .bind(&payload.note)
        .fetch_one(&self.pool)
        .await?;

        let ride = ride_from_row(&row)?;
        info!("Ride {} created by rider {}", ride.id, rider_id);
        Ok(ride)
    }

    /// List rides with filters, distance sort, and the `has_requested`
    /// annotation.
    ///
    /// Ordering: rides the caller has already requested float to the top,
    /// then ascending distance when a proximity point was given, then
    /// recency. Authenticated callers never see their own rides here.
    pub async fn list(
        &self,
        query: &RideQuery,
        caller: Option<Uuid>,
    ) -> ApiResult<(Vec<RideSummary>, i64)> {
        let status = query.status.unwrap_or(RideStatus::Open);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let offset = query.offset.unwrap_or(0);

        let mut qb = QueryBuilder::<Postgres>::new("SELECT r.id, r.rider_id, r.passenger_id, \
             r.start_lat, r.start_lng, r.start_address, r.end_lat, r.end_lng, r.end_address, \
             r.departure_at, r.note, r.status, r.created_at, r.updated_at, ");

        if let Some(caller) = caller {
            qb.push("EXISTS(SELECT 1 FROM ride_requests q WHERE q.ride_id = r.id AND q.passenger_id = ");
            qb.push_bind(caller);
            qb.push(") AS has_requested, ");
        } else {
            qb.push("FALSE AS has_requested, ");
        }

        if let Some((lat, lng)) = query.proximity() {
            push_distance_expr(&mut qb, lat, lng);
            qb.push(" AS distance_meters FROM rides r");
        } else {
            qb.push("NULL::double precision AS distance_meters FROM rides r");
        }

        push_filters(&mut qb, status, query, caller);

        qb.push(" ORDER BY has_requested DESC, distance_meters ASC NULLS LAST, r.created_at DESC");
        qb.push(" LIMIT ");
        qb.push_bind(limit as i64);
        qb.push(" OFFSET ");
        qb.push_bind(offset as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(RideSummary {
                ride: ride_from_row(row)?,
                has_requested: row.get("has_requested"),
                distance_meters: row.get("distance_meters"),
            });
        }

        let mut cb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM rides r");
        push_filters(&mut cb, status, query, caller);
        let total: i64 = cb.build_query_scalar().fetch_one(&self.pool).await?;

        Ok((items, total))
    }

    /// Fetch a ride with the `has_requested` annotation.
    pub async fn get(&self, ride_id: Uuid, caller: Option<Uuid>) -> ApiResult<RideSummary> {
        let row = sqlx::query(
            r#"
            SELECT r.id, r.rider_id, r.passenger_id, r.start_lat, r.start_lng, r.start_address,
                   r.end_lat, r.end_lng, r.end_address, r.departure_at, r.note, r.status,
                   r.created_at, r.updated_at,
                   EXISTS(SELECT 1 FROM ride_requests q
                          WHERE q.ride_id = r.id AND q.passenger_id = $2) AS has_requested
            FROM rides r
            WHERE r.id = $1
            "#,
        )
        .bind(ride_id)
        .bind(caller)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ApiError::NotFound("ride"))?;

        Ok(RideSummary {
            ride: ride_from_row(&row)?,
            has_requested: row.get("has_requested"),
            distance_meters: None,
        })
    }

    /// Mark a matched ride as completed. Rider-only, MATCHED-only.
    pub async fn complete(&self, ride_id: Uuid, rider_id: Uuid) -> ApiResult<Ride> {
        let ride = self.find(ride_id).await?;

        if ride.rider_id != rider_id {
            return Err(ApiError::Forbidden);
        }
        if !ride.status.can_complete() {
            return Err(ApiError::InvalidState("ride is not matched"));
        }

        let row = sqlx::query(&format!(
            r#"
            UPDATE rides SET status = 'COMPLETED', updated_at = now()
            WHERE id = $1 AND status = 'MATCHED'
            RETURNING {RIDE_COLUMNS}
            "#
        ))
        .bind(ride_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ApiError::InvalidState("ride is not matched"))?;

        let ride = ride_from_row(&row)?;
        info!("Ride {} completed by rider {}", ride.id, rider_id);
        Ok(ride)
    }

    /// Cancel an open ride: hard delete, cascading its requests.
    pub async fn cancel(&self, ride_id: Uuid, rider_id: Uuid) -> ApiResult<Ride> {
        let ride = self.find(ride_id).await?;

        if ride.rider_id != rider_id {
            return Err(ApiError::Forbidden);
        }
        if !ride.status.can_cancel() {
            return Err(ApiError::InvalidState("ride is not open"));
        }

        let result = sqlx::query("DELETE FROM rides WHERE id = $1 AND status = 'OPEN'")
            .bind(ride_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::InvalidState("ride is not open"));
        }

        info!("Ride {} cancelled by rider {}", ride.id, rider_id);
        Ok(ride)
    }

    /// Complete every matched ride whose departure time has passed.
    ///
    /// Called by the background sweep. Open rides are left alone: a ride
    /// that never matched stays cancellable rather than silently completing.
    pub async fn complete_overdue(&self) -> ApiResult<Vec<Ride>> {
        let rows = sqlx::query(&format!(
            r#"
            UPDATE rides SET status = 'COMPLETED', updated_at = now()
            WHERE status = 'MATCHED' AND departure_at < now()
            RETURNING {RIDE_COLUMNS}
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(ride_from_row).collect()
    }
}

/// Append the WHERE clause shared by the listing and count queries.
fn push_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    status: RideStatus,
    query: &RideQuery,
    caller: Option<Uuid>,
) {
    qb.push(" WHERE r.status = ");
    qb.push_bind(status.as_str());

    if let Some(from) = query.departure_from {
        qb.push(" AND r.departure_at >= ");
        qb.push_bind(from);
    }
    if let Some(to) = query.departure_to {
        qb.push(" AND r.departure_at <= ");
        qb.push_bind(to);
    }
    if let Some(caller) = caller {
        qb.push(" AND r.rider_id <> ");
        qb.push_bind(caller);
    }
    if let Some((lat, lng)) = query.proximity() {
        qb.push(" AND ");
        push_distance_expr(qb, lat, lng);
        qb.push(" <= ");
        qb.push_bind(PROXIMITY_RADIUS_METERS);
    }
}

/// Append the haversine distance (meters) from the filter point to the
/// ride's start coordinate. Mirrors `geo::haversine_meters`.
fn push_distance_expr(qb: &mut QueryBuilder<'_, Postgres>, lat: f64, lng: f64) {
    qb.push("(2 * 6371000 * asin(sqrt(power(sin(radians((");
    qb.push_bind(lat);
    qb.push(" - r.start_lat)) / 2), 2) + cos(radians(r.start_lat)) * cos(radians(");
    qb.push_bind(lat);
    qb.push(")) * power(sin(radians((");
    qb.push_bind(lng);
    qb.push(" - r.start_lng)) / 2), 2))))");
}
