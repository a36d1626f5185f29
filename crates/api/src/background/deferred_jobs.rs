//! Deferred job runner.
//!
//! Polls the `deferred_jobs` queue and executes due jobs. Jobs are claimed
//! one at a time via [`DeferredJobRepo::claim_due`] (`FOR UPDATE SKIP
//! LOCKED`), so several API instances can share one queue. Handlers are
//! idempotent: delivery is at-least-once.

use std::time::Duration;

use chrono::Utc;
use koi_core::deferred::{retry_delay_secs, DeferredJob};
use koi_core::otp;
use koi_core::types::Timestamp;
use koi_db::models::deferred_job::DeferredJobRow;
use koi_db::repositories::DeferredJobRepo;
use tokio_util::sync::CancellationToken;

use crate::config::JobConfig;
use crate::services::promotion::refresh_status;
use crate::state::AppState;

/// RUNNING jobs untouched for this long are assumed orphaned by a crash.
const STALE_AFTER_MINS: i64 = 10;

/// Upper bound on jobs executed per poll, so shutdown stays responsive.
const MAX_JOBS_PER_TICK: usize = 100;

pub struct DeferredJobRunner {
    state: AppState,
    config: JobConfig,
}

impl DeferredJobRunner {
    pub fn new(state: AppState, config: JobConfig) -> Self {
        Self { state, config }
    }

    /// Run the polling loop until `cancel` is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let stale_before = Utc::now() - chrono::Duration::minutes(STALE_AFTER_MINS);
        match DeferredJobRepo::requeue_stale(&self.state.pool, stale_before).await {
            Ok(0) => {}
            Ok(requeued) => tracing::warn!(requeued, "Requeued orphaned deferred jobs"),
            Err(e) => tracing::error!(error = %e, "Failed to requeue orphaned deferred jobs"),
        }

        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));
        tracing::info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_attempts = self.config.max_attempts,
            "Deferred job runner started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Deferred job runner shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_due(Utc::now()).await {
                        Ok(0) => {}
                        Ok(executed) => tracing::debug!(executed, "Deferred jobs processed"),
                        Err(e) => tracing::error!(error = %e, "Deferred job poll failed"),
                    }
                }
            }
        }
    }

    /// Claim and execute every job due at `now`. Returns how many ran.
    pub async fn run_due(&self, now: Timestamp) -> Result<usize, sqlx::Error> {
        let mut executed = 0;
        while executed < MAX_JOBS_PER_TICK {
            let Some(row) = DeferredJobRepo::claim_due(&self.state.pool, now).await? else {
                break;
            };
            self.process(&row, now).await?;
            executed += 1;
        }
        Ok(executed)
    }

    async fn process(&self, row: &DeferredJobRow, now: Timestamp) -> Result<(), sqlx::Error> {
        let job = match DeferredJob::from_parts(&row.kind, &row.target) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(job_id = %row.id, kind = %row.kind, error = %e, "Unrunnable deferred job");
                return DeferredJobRepo::fail(&self.state.pool, row.id, &e.to_string()).await;
            }
        };

        match self.execute(&job, now).await {
            Ok(()) => {
                tracing::debug!(job_id = %row.id, kind = %row.kind, target = %row.target, "Deferred job done");
                DeferredJobRepo::complete(&self.state.pool, row.id).await
            }
            Err(e) if row.attempts >= self.config.max_attempts => {
                tracing::error!(
                    job_id = %row.id,
                    kind = %row.kind,
                    attempts = row.attempts,
                    error = %e,
                    "Deferred job failed permanently",
                );
                DeferredJobRepo::fail(&self.state.pool, row.id, &e).await
            }
            Err(e) => {
                let delay = retry_delay_secs(row.attempts - 1);
                tracing::warn!(
                    job_id = %row.id,
                    kind = %row.kind,
                    attempts = row.attempts,
                    retry_in_secs = delay,
                    error = %e,
                    "Deferred job failed, retrying",
                );
                let retry_at = Utc::now() + chrono::Duration::seconds(delay);
                DeferredJobRepo::reschedule(&self.state.pool, row.id, retry_at, &e).await
            }
        }
    }

    async fn execute(&self, job: &DeferredJob, now: Timestamp) -> Result<(), String> {
        match job {
            DeferredJob::ExpireOtp { key } => {
                let removed = otp::purge_expired(self.state.otp_store.as_ref(), key, now)
                    .await
                    .map_err(|e| e.to_string())?;
                if removed {
                    tracing::info!(%key, "Expired confirmation code removed");
                }
                Ok(())
            }
            DeferredJob::ActivatePromotion { promotion_id }
            | DeferredJob::ExpirePromotion { promotion_id } => {
                refresh_status(&self.state.pool, *promotion_id, now)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            }
        }
    }
}
