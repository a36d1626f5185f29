use async_trait::async_trait;
use koi_core::error::CoreError;
use koi_core::otp::{OtpRecord, OtpStore};
use koi_core::types::Timestamp;
use sqlx::PgPool;

use super::internal;

/// [`OtpStore`] backed by the `otp_codes` table.
#[derive(Debug, Clone)]
pub struct PgOtpStore {
    pool: PgPool,
}

impl PgOtpStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpStore for PgOtpStore {
    async fn put(&self, key: &str, record: OtpRecord) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO otp_codes (key, code, expires_at) VALUES ($1, $2, $3) \
             ON CONFLICT (key) DO UPDATE \
             SET code = EXCLUDED.code, expires_at = EXCLUDED.expires_at, created_at = NOW()",
        )
        .bind(key)
        .bind(&record.code)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| internal("otp put", e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<OtpRecord>, CoreError> {
        let row: Option<(String, Timestamp)> =
            sqlx::query_as("SELECT code, expires_at FROM otp_codes WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| internal("otp get", e))?;
        Ok(row.map(|(code, expires_at)| OtpRecord { code, expires_at }))
    }

    async fn delete(&self, key: &str) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM otp_codes WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| internal("otp delete", e))?;
        Ok(result.rows_affected() > 0)
    }
}
