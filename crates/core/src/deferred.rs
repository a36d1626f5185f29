//! Deferred (run-once, run-later) jobs.
//!
//! Callers describe *what* should happen later as a [`DeferredJob`] and hand
//! it to a [`DeferredScheduler`] together with a due time. The PostgreSQL
//! queue in `koi-db` is the production scheduler; [`InMemoryScheduler`]
//! backs unit tests.
//!
//! Jobs are delivered at least once, so every handler re-checks the current
//! state of its target before mutating anything.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Job kind: delete an OTP once its TTL elapsed.
pub const KIND_EXPIRE_OTP: &str = "expire_otp";

/// Job kind: re-evaluate a promotion at its start time.
pub const KIND_ACTIVATE_PROMOTION: &str = "activate_promotion";

/// Job kind: re-evaluate a promotion at its end time.
pub const KIND_EXPIRE_PROMOTION: &str = "expire_promotion";

/// Default number of attempts before a job is marked failed.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Upper bound on the retry delay.
pub const MAX_RETRY_BACKOFF_SECS: i64 = 600;

/// A unit of deferred work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredJob {
    ExpireOtp { key: String },
    ActivatePromotion { promotion_id: DbId },
    ExpirePromotion { promotion_id: DbId },
}

impl DeferredJob {
    /// Stable kind name persisted in the queue.
    pub fn kind(&self) -> &'static str {
        match self {
            DeferredJob::ExpireOtp { .. } => KIND_EXPIRE_OTP,
            DeferredJob::ActivatePromotion { .. } => KIND_ACTIVATE_PROMOTION,
            DeferredJob::ExpirePromotion { .. } => KIND_EXPIRE_PROMOTION,
        }
    }

    /// Target identifier persisted alongside the kind.
    pub fn target(&self) -> String {
        match self {
            DeferredJob::ExpireOtp { key } => key.clone(),
            DeferredJob::ActivatePromotion { promotion_id }
            | DeferredJob::ExpirePromotion { promotion_id } => promotion_id.to_string(),
        }
    }

    /// Rebuild a job from its persisted `(kind, target)` pair.
    pub fn from_parts(kind: &str, target: &str) -> Result<Self, CoreError> {
        let promotion_id = || {
            target.parse::<DbId>().map_err(|e| {
                CoreError::Internal(format!("Invalid promotion id '{target}' in {kind} job: {e}"))
            })
        };
        match kind {
            KIND_EXPIRE_OTP => Ok(DeferredJob::ExpireOtp {
                key: target.to_string(),
            }),
            KIND_ACTIVATE_PROMOTION => Ok(DeferredJob::ActivatePromotion {
                promotion_id: promotion_id()?,
            }),
            KIND_EXPIRE_PROMOTION => Ok(DeferredJob::ExpirePromotion {
                promotion_id: promotion_id()?,
            }),
            other => Err(CoreError::Internal(format!("Unknown deferred job kind '{other}'"))),
        }
    }
}

/// Enqueue/cancel interface for deferred jobs.
#[async_trait]
pub trait DeferredScheduler: Send + Sync {
    /// Enqueue `job` to run at or after `run_at`.
    async fn schedule(&self, job: DeferredJob, run_at: Timestamp) -> Result<(), CoreError>;

    /// Cancel every pending instance of `job`. Returns how many were cancelled.
    async fn cancel(&self, job: &DeferredJob) -> Result<u64, CoreError>;
}

/// Retry delay after `attempt` failures: 2^attempt * 15 seconds, capped.
pub fn retry_delay_secs(attempt: i32) -> i64 {
    let exp = attempt.clamp(0, 16) as u32;
    (15 * 2i64.pow(exp)).min(MAX_RETRY_BACKOFF_SECS)
}

// ---------------------------------------------------------------------------
// In-memory scheduler
// ---------------------------------------------------------------------------

/// Process-local scheduler that only records jobs.
///
/// Tests drive time explicitly via [`InMemoryScheduler::take_due`].
#[derive(Debug, Default)]
pub struct InMemoryScheduler {
    jobs: Mutex<Vec<(DeferredJob, Timestamp)>>,
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every pending job with its due time.
    pub fn pending(&self) -> Vec<(DeferredJob, Timestamp)> {
        self.lock().clone()
    }

    /// Remove and return the jobs due at `now`, earliest first.
    pub fn take_due(&self, now: Timestamp) -> Vec<DeferredJob> {
        let mut jobs = self.lock();
        let (mut due, rest): (Vec<_>, Vec<_>) =
            jobs.drain(..).partition(|(_, run_at)| *run_at <= now);
        *jobs = rest;
        due.sort_by_key(|(_, run_at)| *run_at);
        due.into_iter().map(|(job, _)| job).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(DeferredJob, Timestamp)>> {
        // A poisoned lock only means a test panicked mid-push; the data is still usable.
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DeferredScheduler for InMemoryScheduler {
    async fn schedule(&self, job: DeferredJob, run_at: Timestamp) -> Result<(), CoreError> {
        self.lock().push((job, run_at));
        Ok(())
    }

    async fn cancel(&self, job: &DeferredJob) -> Result<u64, CoreError> {
        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|(queued, _)| queued != job);
        Ok((before - jobs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn kind_and_target_round_trip() {
        let id = Uuid::new_v4();
        let job = DeferredJob::ExpirePromotion { promotion_id: id };
        let rebuilt = DeferredJob::from_parts(job.kind(), &job.target()).unwrap();
        assert_eq!(rebuilt, job);
    }

    #[test]
    fn unknown_kind_is_internal_error() {
        let err = DeferredJob::from_parts("send_fax", "x").unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }

    #[test]
    fn bad_promotion_target_is_internal_error() {
        assert!(DeferredJob::from_parts(KIND_ACTIVATE_PROMOTION, "not-a-uuid").is_err());
    }

    #[test]
    fn retry_delay_grows_and_caps() {
        assert_eq!(retry_delay_secs(0), 15);
        assert_eq!(retry_delay_secs(1), 30);
        assert_eq!(retry_delay_secs(2), 60);
        assert_eq!(retry_delay_secs(20), MAX_RETRY_BACKOFF_SECS);
    }

    #[tokio::test]
    async fn in_memory_scheduler_releases_due_jobs_in_order() {
        let scheduler = InMemoryScheduler::new();
        let now = Utc::now();
        let late = DeferredJob::ExpireOtp { key: "late".into() };
        let early = DeferredJob::ExpireOtp { key: "early".into() };
        scheduler.schedule(late.clone(), now + Duration::minutes(10)).await.unwrap();
        scheduler.schedule(early.clone(), now + Duration::minutes(5)).await.unwrap();

        assert!(scheduler.take_due(now).is_empty());
        let due = scheduler.take_due(now + Duration::minutes(11));
        assert_eq!(due, vec![early, late]);
        assert!(scheduler.pending().is_empty());
    }

    #[tokio::test]
    async fn cancel_removes_matching_jobs_only() {
        let scheduler = InMemoryScheduler::new();
        let now = Utc::now();
        let id = Uuid::new_v4();
        scheduler
            .schedule(DeferredJob::ActivatePromotion { promotion_id: id }, now)
            .await
            .unwrap();
        scheduler
            .schedule(DeferredJob::ExpirePromotion { promotion_id: id }, now)
            .await
            .unwrap();

        let cancelled = scheduler
            .cancel(&DeferredJob::ActivatePromotion { promotion_id: id })
            .await
            .unwrap();
        assert_eq!(cancelled, 1);
        assert_eq!(scheduler.pending().len(), 1);
    }
}
