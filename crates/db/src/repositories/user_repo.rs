//! Repository for the `users` table.

use koi_core::roles::STAFF_POSITIONS;
use koi_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::user::{CreateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, full_name, email, phone, password_hash, role, is_active, \
                        created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (full_name, email, phone, password_hash, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.full_name)
            .bind(input.email.trim().to_lowercase())
            .bind(&input.phone)
            .bind(&input.password_hash)
            .bind(&input.role)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a user by email (emails are stored lower-cased).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(email.trim().to_lowercase())
            .fetch_optional(pool)
            .await
    }

    /// List active staff, optionally restricted to one position.
    pub async fn list_staff(
        pool: &PgPool,
        position: Option<&str>,
    ) -> Result<Vec<User>, sqlx::Error> {
        let positions: Vec<&str> = match position {
            Some(p) => vec![p],
            None => STAFF_POSITIONS.to_vec(),
        };
        let query = format!(
            "SELECT {COLUMNS} FROM users \
             WHERE is_active AND role = ANY($1) \
             ORDER BY full_name"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(positions)
            .fetch_all(pool)
            .await
    }
}
