//! One-time confirmation codes for contracts and documents.
//!
//! A code is a zero-padded 4-digit number kept in an [`OtpStore`] under a
//! key derived from the entity it confirms. Issuing a code also schedules a
//! [`DeferredJob::ExpireOtp`] so unused codes are removed once the TTL
//! elapses; expiry is enforced on read as well, so the job only cleans up.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Duration;
use rand::Rng;

use crate::deferred::{DeferredJob, DeferredScheduler};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Number of digits in a code.
pub const OTP_DIGITS: usize = 4;

/// Default code lifetime in seconds (5 minutes).
pub const DEFAULT_OTP_TTL_SECS: i64 = 300;

/// The kind of entity a code confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpSubject {
    Contract,
    Doc,
}

impl OtpSubject {
    /// Entity name used in `NotFound` errors.
    pub fn entity(self) -> &'static str {
        match self {
            OtpSubject::Contract => "ContractOtp",
            OtpSubject::Doc => "DocOtp",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            OtpSubject::Contract => "contract",
            OtpSubject::Doc => "doc",
        }
    }

    /// Store key for the code confirming entity `id`.
    pub fn key(self, id: DbId) -> String {
        format!("{}:{id}", self.prefix())
    }
}

/// A stored code and the instant it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    pub code: String,
    pub expires_at: Timestamp,
}

impl OtpRecord {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// Key-value store for OTP records.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Insert or replace the record under `key`.
    async fn put(&self, key: &str, record: OtpRecord) -> Result<(), CoreError>;

    /// Fetch the record under `key`, expired or not.
    async fn get(&self, key: &str) -> Result<Option<OtpRecord>, CoreError>;

    /// Remove the record under `key`. Returns `true` if one existed.
    async fn delete(&self, key: &str) -> Result<bool, CoreError>;
}

/// Generate a fresh zero-padded code.
pub fn generate_code() -> String {
    let max = 10u32.pow(OTP_DIGITS as u32);
    let n = rand::rng().random_range(0..max);
    format!("{n:0width$}", width = OTP_DIGITS)
}

/// Issue a new code for `subject`/`id`, replacing any previous one.
///
/// Returns the plaintext code so the caller can deliver it.
pub async fn issue(
    store: &dyn OtpStore,
    scheduler: &dyn DeferredScheduler,
    subject: OtpSubject,
    id: DbId,
    ttl: Duration,
    now: Timestamp,
) -> Result<String, CoreError> {
    let key = subject.key(id);
    let code = generate_code();
    let expires_at = now + ttl;

    store
        .put(
            &key,
            OtpRecord {
                code: code.clone(),
                expires_at,
            },
        )
        .await?;

    // The previous code's cleanup job would otherwise delete the new code early.
    let job = DeferredJob::ExpireOtp { key };
    scheduler.cancel(&job).await?;
    scheduler.schedule(job, expires_at).await?;

    Ok(code)
}

/// Check `code` for `subject`/`id` without consuming it.
///
/// A missing, expired or mismatching code is reported as `NotFound`. The
/// caller removes the record with [`consume`] once the confirmation it
/// guards has been committed.
pub async fn check(
    store: &dyn OtpStore,
    subject: OtpSubject,
    id: DbId,
    code: &str,
    now: Timestamp,
) -> Result<(), CoreError> {
    let not_found = || CoreError::NotFound {
        entity: subject.entity(),
        id,
    };

    let record = store.get(&subject.key(id)).await?.ok_or_else(not_found)?;
    if record.is_expired(now) || record.code != code.trim() {
        return Err(not_found());
    }
    Ok(())
}

/// Remove the code for `subject`/`id`. Returns `true` if one existed.
pub async fn consume(
    store: &dyn OtpStore,
    subject: OtpSubject,
    id: DbId,
) -> Result<bool, CoreError> {
    store.delete(&subject.key(id)).await
}

/// Deferred-job handler: drop the record under `key` if it has expired.
///
/// Returns `true` when a record was removed.
pub async fn purge_expired(
    store: &dyn OtpStore,
    key: &str,
    now: Timestamp,
) -> Result<bool, CoreError> {
    match store.get(key).await? {
        Some(record) if record.is_expired(now) => store.delete(key).await,
        _ => Ok(false),
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local [`OtpStore`], used in tests and single-node development.
#[derive(Debug, Default)]
pub struct InMemoryOtpStore {
    records: Mutex<HashMap<String, OtpRecord>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, OtpRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn put(&self, key: &str, record: OtpRecord) -> Result<(), CoreError> {
        self.lock().insert(key.to_string(), record);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<OtpRecord>, CoreError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool, CoreError> {
        Ok(self.lock().remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::deferred::InMemoryScheduler;

    fn ttl() -> Duration {
        Duration::seconds(DEFAULT_OTP_TTL_SECS)
    }

    async fn redeem(
        store: &dyn OtpStore,
        subject: OtpSubject,
        id: DbId,
        code: &str,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        check(store, subject, id, code, now).await?;
        consume(store, subject, id).await?;
        Ok(())
    }

    #[test]
    fn codes_are_four_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), OTP_DIGITS);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn keys_are_namespaced_by_subject() {
        let id = Uuid::new_v4();
        assert_eq!(OtpSubject::Contract.key(id), format!("contract:{id}"));
        assert_ne!(OtpSubject::Contract.key(id), OtpSubject::Doc.key(id));
    }

    #[tokio::test]
    async fn issue_stores_code_and_schedules_expiry() {
        let store = InMemoryOtpStore::new();
        let scheduler = InMemoryScheduler::new();
        let id = Uuid::new_v4();
        let now = Utc::now();

        let code = issue(&store, &scheduler, OtpSubject::Contract, id, ttl(), now)
            .await
            .unwrap();

        let record = store.get(&OtpSubject::Contract.key(id)).await.unwrap().unwrap();
        assert_eq!(record.code, code);
        assert_eq!(record.expires_at, now + ttl());
        assert_eq!(
            scheduler.pending(),
            vec![(
                DeferredJob::ExpireOtp {
                    key: OtpSubject::Contract.key(id)
                },
                now + ttl()
            )]
        );
    }

    #[tokio::test]
    async fn reissue_replaces_code_and_cleanup_job() {
        let store = InMemoryOtpStore::new();
        let scheduler = InMemoryScheduler::new();
        let id = Uuid::new_v4();
        let now = Utc::now();

        issue(&store, &scheduler, OtpSubject::Doc, id, ttl(), now).await.unwrap();
        let later = now + Duration::minutes(3);
        let second = issue(&store, &scheduler, OtpSubject::Doc, id, ttl(), later)
            .await
            .unwrap();

        assert_eq!(scheduler.pending().len(), 1);
        assert!(redeem(&store, OtpSubject::Doc, id, &second, later + Duration::minutes(4))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn correct_code_within_ttl_redeems_once() {
        let store = InMemoryOtpStore::new();
        let scheduler = InMemoryScheduler::new();
        let id = Uuid::new_v4();
        let now = Utc::now();
        let code = issue(&store, &scheduler, OtpSubject::Contract, id, ttl(), now)
            .await
            .unwrap();

        let at = now + Duration::minutes(4);
        assert!(redeem(&store, OtpSubject::Contract, id, &code, at).await.is_ok());
        let again = redeem(&store, OtpSubject::Contract, id, &code, at).await;
        assert_matches!(again, Err(CoreError::NotFound { entity: "ContractOtp", .. }));
    }

    #[tokio::test]
    async fn wrong_code_is_not_found_and_keeps_record() {
        let store = InMemoryOtpStore::new();
        let scheduler = InMemoryScheduler::new();
        let id = Uuid::new_v4();
        let now = Utc::now();
        let code = issue(&store, &scheduler, OtpSubject::Contract, id, ttl(), now)
            .await
            .unwrap();
        let wrong = if code == "0000" { "1111" } else { "0000" };

        let result = redeem(&store, OtpSubject::Contract, id, wrong, now).await;
        assert_matches!(result, Err(CoreError::NotFound { .. }));
        assert!(redeem(&store, OtpSubject::Contract, id, &code, now).await.is_ok());
    }

    #[tokio::test]
    async fn check_leaves_the_code_in_place() {
        let store = InMemoryOtpStore::new();
        let scheduler = InMemoryScheduler::new();
        let id = Uuid::new_v4();
        let now = Utc::now();
        let code = issue(&store, &scheduler, OtpSubject::Doc, id, ttl(), now)
            .await
            .unwrap();

        check(&store, OtpSubject::Doc, id, &code, now).await.unwrap();
        check(&store, OtpSubject::Doc, id, &code, now).await.unwrap();
        assert!(store.get(&OtpSubject::Doc.key(id)).await.unwrap().is_some());

        assert!(consume(&store, OtpSubject::Doc, id).await.unwrap());
        let result = check(&store, OtpSubject::Doc, id, &code, now).await;
        assert_matches!(result, Err(CoreError::NotFound { entity: "DocOtp", .. }));
        assert!(!consume(&store, OtpSubject::Doc, id).await.unwrap());
    }

    #[tokio::test]
    async fn expired_code_is_not_found() {
        let store = InMemoryOtpStore::new();
        let scheduler = InMemoryScheduler::new();
        let id = Uuid::new_v4();
        let now = Utc::now();
        let code = issue(&store, &scheduler, OtpSubject::Contract, id, ttl(), now)
            .await
            .unwrap();

        let result = redeem(&store, OtpSubject::Contract, id, &code, now + ttl()).await;
        assert_matches!(result, Err(CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn cleanup_job_removes_only_expired_codes() {
        let store = InMemoryOtpStore::new();
        let scheduler = InMemoryScheduler::new();
        let id = Uuid::new_v4();
        let now = Utc::now();
        issue(&store, &scheduler, OtpSubject::Doc, id, ttl(), now).await.unwrap();
        let key = OtpSubject::Doc.key(id);

        assert!(!purge_expired(&store, &key, now).await.unwrap());
        for job in scheduler.take_due(now + ttl()) {
            if let DeferredJob::ExpireOtp { key } = job {
                assert!(purge_expired(&store, &key, now + ttl()).await.unwrap());
            }
        }
        assert!(store.get(&key).await.unwrap().is_none());
    }
}
