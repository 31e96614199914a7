//! Feedback repository: post-completion ratings and aggregates

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, conflict_on_unique};
use crate::models::feedback::{CreateFeedbackRequest, Feedback, FeedbackSummary};
use crate::models::ride::RideStatus;

fn feedback_from_row(row: &PgRow) -> Feedback {
    Feedback {
        id: row.get("id"),
        ride_id: row.get("ride_id"),
        from_user_id: row.get("from_user_id"),
        to_user_id: row.get("to_user_id"),
        rating: row.get("rating"),
        comment: row.get("comment"),
        created_at: row.get("created_at"),
    }
}

/// Feedback repository for database operations
#[derive(Clone)]
pub struct FeedbackRepository {
    pool: PgPool,
}

impl FeedbackRepository {
    /// Create a new feedback repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Post feedback on a completed ride.
    ///
    /// The author must be the ride's rider or matched passenger; the
    /// target is inferred as the other participant. One entry per
    /// (ride, author), enforced by the unique constraint.
    pub async fn create(
        &self,
        ride_id: Uuid,
        author_id: Uuid,
        payload: &CreateFeedbackRequest,
    ) -> ApiResult<Feedback> {
        if !(1..=5).contains(&payload.rating) {
            return Err(ApiError::BadRequest(format!(
                "Rating must be between 1 and 5, got {}",
                payload.rating
            )));
        }

        let ride = sqlx::query("SELECT rider_id, passenger_id, status FROM rides WHERE id = $1")
            .bind(ride_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ApiError::NotFound("ride"))?;

        let status: RideStatus = ride
            .get::<String, _>("status")
            .parse()
            .map_err(|_| ApiError::Internal)?;
        if status != RideStatus::Completed {
            return Err(ApiError::InvalidState("ride is not completed"));
        }

        let rider_id: Uuid = ride.get("rider_id");
        let passenger_id: Option<Uuid> = ride.get("passenger_id");

        let to_user_id = if author_id == rider_id {
            passenger_id.ok_or(ApiError::InvalidState("ride has no matched passenger"))?
        } else if passenger_id == Some(author_id) {
            rider_id
        } else {
            return Err(ApiError::Forbidden);
        };

        let row = sqlx::query(
            r#"
            INSERT INTO feedback (ride_id, from_user_id, to_user_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, ride_id, from_user_id, to_user_id, rating, comment, created_at
            "#,
        )
        .bind(ride_id)
        .bind(author_id)
        .bind(to_user_id)
        .bind(payload.rating)
        .bind(&payload.comment)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "feedback already submitted for this ride"))?;

        info!("Feedback posted on ride {} by user {}", ride_id, author_id);
        Ok(feedback_from_row(&row))
    }

    /// List feedback received by a user, with count and average rating.
    pub async fn list_for_user(&self, user_id: Uuid) -> ApiResult<FeedbackSummary> {
        let rows = sqlx::query(
            r#"
            SELECT id, ride_id, from_user_id, to_user_id, rating, comment, created_at
            FROM feedback
            WHERE to_user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let stats = sqlx::query(
            "SELECT COUNT(*) AS count, AVG(rating)::double precision AS average
             FROM feedback WHERE to_user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(FeedbackSummary {
            items: rows.iter().map(feedback_from_row).collect(),
            count: stats.get("count"),
            average: stats.get("average"),
        })
    }
}
