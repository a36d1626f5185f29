//! Repository for the `promotions` table.

use koi_core::status::PromotionStatus;
use koi_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::promotion::{CreatePromotion, Promotion};

const COLUMNS: &str = "id, name, code, description, discount, start_at, expired_at, status, \
                        is_active, created_at, updated_at";

/// Resolved column values for a promotion update.
#[derive(Debug, Clone)]
pub struct PromotionWrite<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub discount: i32,
    pub start_at: Timestamp,
    pub expired_at: Timestamp,
    pub status: PromotionStatus,
}

pub struct PromotionRepo;

impl PromotionRepo {
    /// Insert a promotion with its derived status.
    pub async fn create(
        pool: &PgPool,
        input: &CreatePromotion,
        status: PromotionStatus,
    ) -> Result<Promotion, sqlx::Error> {
        let query = format!(
            "INSERT INTO promotions (name, code, description, discount, start_at, expired_at, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Promotion>(&query)
            .bind(input.name.trim())
            .bind(input.code.trim().to_uppercase())
            .bind(&input.description)
            .bind(input.discount)
            .bind(input.start_at)
            .bind(input.expired_at)
            .bind(status.as_str())
            .fetch_one(pool)
            .await
    }

    /// Find a non-deleted promotion by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Promotion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM promotions WHERE id = $1 AND is_active");
        sqlx::query_as::<_, Promotion>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a non-deleted promotion by its (case-insensitive) code.
    pub async fn find_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<Promotion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM promotions WHERE code = $1 AND is_active");
        sqlx::query_as::<_, Promotion>(&query)
            .bind(code.trim().to_uppercase())
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Promotion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM promotions WHERE is_active ORDER BY start_at DESC"
        );
        sqlx::query_as::<_, Promotion>(&query).fetch_all(pool).await
    }

    /// Overwrite the editable columns and the derived status.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        write: &PromotionWrite<'_>,
    ) -> Result<Option<Promotion>, sqlx::Error> {
        let query = format!(
            "UPDATE promotions SET \
                name = $2, description = $3, discount = $4, \
                start_at = $5, expired_at = $6, status = $7 \
             WHERE id = $1 AND is_active \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Promotion>(&query)
            .bind(id)
            .bind(write.name)
            .bind(write.description)
            .bind(write.discount)
            .bind(write.start_at)
            .bind(write.expired_at)
            .bind(write.status.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Store a re-evaluated status. Returns `false` when nothing changed.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: PromotionStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE promotions SET status = $2 WHERE id = $1 AND is_active AND status <> $2",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete. Returns `true` if a row was deactivated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE promotions SET is_active = FALSE WHERE id = $1 AND is_active")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
