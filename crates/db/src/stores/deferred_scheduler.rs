use async_trait::async_trait;
use koi_core::deferred::{DeferredJob, DeferredScheduler};
use koi_core::error::CoreError;
use koi_core::types::Timestamp;
use sqlx::PgPool;

use super::internal;
use crate::repositories::DeferredJobRepo;

/// [`DeferredScheduler`] that persists jobs in the `deferred_jobs` table.
///
/// Jobs are executed by the API's background runner, which claims them via
/// [`DeferredJobRepo::claim_due`].
#[derive(Debug, Clone)]
pub struct PgDeferredScheduler {
    pool: PgPool,
}

impl PgDeferredScheduler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeferredScheduler for PgDeferredScheduler {
    async fn schedule(&self, job: DeferredJob, run_at: Timestamp) -> Result<(), CoreError> {
        let row = DeferredJobRepo::enqueue(&self.pool, job.kind(), &job.target(), run_at)
            .await
            .map_err(|e| internal("schedule deferred job", e))?;
        tracing::debug!(job_id = %row.id, kind = %row.kind, target = %row.target, %run_at, "Deferred job scheduled");
        Ok(())
    }

    async fn cancel(&self, job: &DeferredJob) -> Result<u64, CoreError> {
        let cancelled = DeferredJobRepo::cancel(&self.pool, job.kind(), &job.target())
            .await
            .map_err(|e| internal("cancel deferred job", e))?;
        if cancelled > 0 {
            tracing::debug!(kind = job.kind(), target = %job.target(), cancelled, "Deferred jobs cancelled");
        }
        Ok(cancelled)
    }
}
