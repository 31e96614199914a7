//! Repositories for database operations

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::Location;
use crate::models::address::{Address, CreateAddressRequest};
use crate::models::user::{UpdateProfileRequest, User};

pub mod feedback;
pub mod request;
pub mod ride;

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        phone: row.get("phone"),
        name: row.get("name"),
        city: row.get("city"),
        vehicle_registration: row.get("vehicle_registration"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Profile repository for database operations
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    /// Create a new profile repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> ApiResult<User> {
        let row = sqlx::query(
            r#"
            SELECT id, phone, name, city, vehicle_registration, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

        Ok(user_from_row(&row))
    }

    /// Update the caller's profile.
    ///
    /// Absent fields are left unchanged. An explicit empty vehicle
    /// registration is normalized to NULL, which demotes the user back to
    /// passenger-only.
    pub async fn update(&self, id: Uuid, payload: &UpdateProfileRequest) -> ApiResult<User> {
        let vehicle = payload.vehicle_registration.as_deref().map(str::trim);

        let row = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                city = COALESCE($3, city),
                vehicle_registration = CASE
                    WHEN $4::text IS NULL THEN vehicle_registration
                    ELSE NULLIF($4, '')
                END,
                updated_at = now()
            WHERE id = $1
            RETURNING id, phone, name, city, vehicle_registration, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&payload.name)
        .bind(&payload.city)
        .bind(vehicle)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

        info!("Profile updated for user {}", id);
        Ok(user_from_row(&row))
    }
}

/// Address book repository for database operations
#[derive(Clone)]
pub struct AddressRepository {
    pool: PgPool,
}

impl AddressRepository {
    /// Create a new address repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn address_from_row(row: &PgRow) -> Address {
        Address {
            id: row.get("id"),
            user_id: row.get("user_id"),
            label: row.get("label"),
            location: Location {
                lat: row.get("lat"),
                lng: row.get("lng"),
                address: row.get("address"),
            },
            created_at: row.get("created_at"),
        }
    }

    /// List the caller's saved addresses
    pub async fn list(&self, user_id: Uuid) -> ApiResult<Vec<Address>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, label, lat, lng, address, created_at
            FROM addresses
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::address_from_row).collect())
    }

    /// Save a new address for the caller
    pub async fn create(&self, user_id: Uuid, payload: &CreateAddressRequest) -> ApiResult<Address> {
        let row = sqlx::query(
            r#"
            INSERT INTO addresses (user_id, label, lat, lng, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, label, lat, lng, address, created_at
            "#,
        )
        .bind(user_id)
        .bind(&payload.label)
        .bind(payload.location.lat)
        .bind(payload.location.lng)
        .bind(&payload.location.address)
        .fetch_one(&self.pool)
        .await?;

        Ok(Self::address_from_row(&row))
    }

    /// Delete one of the caller's addresses
    pub async fn delete(&self, address_id: Uuid, user_id: Uuid) -> ApiResult<()> {
        let row = sqlx::query("SELECT user_id FROM addresses WHERE id = $1")
            .bind(address_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ApiError::NotFound("address"))?;

        if row.get::<Uuid, _>("user_id") != user_id {
            return Err(ApiError::Forbidden);
        }

        sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(address_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
