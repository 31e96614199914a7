//! User repository for database operations

use anyhow::Result;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::User;

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

const USER_COLUMNS: &str =
    "id, phone, name, city, vehicle_registration, created_at, updated_at";

fn user_from_row(row: &sqlx::postgres::PgRow) -> User {
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

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the user for a phone number, creating an empty profile on
    /// first login.
    pub async fn upsert_by_phone(&self, phone: &str) -> Result<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (phone)
            VALUES ($1)
            ON CONFLICT (phone) DO UPDATE SET updated_at = now()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;

        let user = user_from_row(&row);
        info!("User {} resolved for phone login", user.id);
        Ok(user)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }
}
