//! Repository for the `deferred_jobs` queue.
//!
//! Jobs are claimed one at a time with `FOR UPDATE SKIP LOCKED`, so several
//! runners can share the queue without double-dispatch.

use koi_core::status::DeferredJobStatus;
use koi_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::deferred_job::{DeferredJobRow, JobBacklog};

const COLUMNS: &str = "id, kind, target, run_at, status, attempts, last_error, \
                        created_at, updated_at";

pub struct DeferredJobRepo;

impl DeferredJobRepo {
    /// Enqueue a PENDING job due at `run_at`.
    pub async fn enqueue(
        pool: &PgPool,
        kind: &str,
        target: &str,
        run_at: Timestamp,
    ) -> Result<DeferredJobRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO deferred_jobs (kind, target, run_at, status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeferredJobRow>(&query)
            .bind(kind)
            .bind(target)
            .bind(run_at)
            .bind(DeferredJobStatus::Pending.as_str())
            .fetch_one(pool)
            .await
    }

    /// Cancel every PENDING job with this kind and target.
    pub async fn cancel(pool: &PgPool, kind: &str, target: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE deferred_jobs SET status = $3 \
             WHERE kind = $1 AND target = $2 AND status = $4",
        )
        .bind(kind)
        .bind(target)
        .bind(DeferredJobStatus::Cancelled.as_str())
        .bind(DeferredJobStatus::Pending.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Atomically claim the earliest due PENDING job, marking it RUNNING
    /// and counting the attempt.
    pub async fn claim_due(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Option<DeferredJobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE deferred_jobs \
             SET status = $2, attempts = attempts + 1 \
             WHERE id = ( \
                 SELECT id FROM deferred_jobs \
                 WHERE status = $3 AND run_at <= $1 \
                 ORDER BY run_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeferredJobRow>(&query)
            .bind(now)
            .bind(DeferredJobStatus::Running.as_str())
            .bind(DeferredJobStatus::Pending.as_str())
            .fetch_optional(pool)
            .await
    }

    pub async fn complete(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE deferred_jobs SET status = $2, last_error = NULL WHERE id = $1")
            .bind(id)
            .bind(DeferredJobStatus::Done.as_str())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Put a failed job back in the queue, due again at `retry_at`.
    pub async fn reschedule(
        pool: &PgPool,
        id: DbId,
        retry_at: Timestamp,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE deferred_jobs SET status = $2, run_at = $3, last_error = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(DeferredJobStatus::Pending.as_str())
        .bind(retry_at)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Give up on a job after its last attempt.
    pub async fn fail(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE deferred_jobs SET status = $2, last_error = $3 WHERE id = $1")
            .bind(id)
            .bind(DeferredJobStatus::Failed.as_str())
            .bind(error)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Return RUNNING jobs left behind by a crashed runner to the queue.
    pub async fn requeue_stale(pool: &PgPool, older_than: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE deferred_jobs SET status = $1 WHERE status = $2 AND updated_at < $3",
        )
        .bind(DeferredJobStatus::Pending.as_str())
        .bind(DeferredJobStatus::Running.as_str())
        .bind(older_than)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// PENDING jobs for a kind/target pair, earliest first.
    pub async fn list_pending(
        pool: &PgPool,
        kind: &str,
        target: &str,
    ) -> Result<Vec<DeferredJobRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM deferred_jobs \
             WHERE kind = $1 AND target = $2 AND status = $3 \
             ORDER BY run_at"
        );
        sqlx::query_as::<_, DeferredJobRow>(&query)
            .bind(kind)
            .bind(target)
            .bind(DeferredJobStatus::Pending.as_str())
            .fetch_all(pool)
            .await
    }

    /// Queue-wide counts. A PENDING job counts as overdue when its `run_at`
    /// is earlier than `overdue_before`.
    pub async fn backlog(
        pool: &PgPool,
        overdue_before: Timestamp,
    ) -> Result<JobBacklog, sqlx::Error> {
        sqlx::query_as::<_, JobBacklog>(
            "SELECT \
                 COUNT(*) FILTER (WHERE status = $2) AS pending, \
                 COUNT(*) FILTER (WHERE status = $2 AND run_at < $1) AS overdue, \
                 COUNT(*) FILTER (WHERE status = $3) AS failed \
             FROM deferred_jobs",
        )
        .bind(overdue_before)
        .bind(DeferredJobStatus::Pending.as_str())
        .bind(DeferredJobStatus::Failed.as_str())
        .fetch_one(pool)
        .await
    }
}
