//! Deferred job queue row.

use koi_core::status::DeferredJobStatus;
use koi_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeferredJobRow {
    pub id: DbId,
    pub kind: String,
    pub target: String,
    pub run_at: Timestamp,
    #[sqlx(try_from = "String")]
    pub status: DeferredJobStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Queue counts reported by `/health`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct JobBacklog {
    pub pending: i64,
    /// PENDING jobs due before the cutoff passed to the query.
    pub overdue: i64,
    pub failed: i64,
}
