//! Promotion windows and their activation/expiration jobs.
//!
//! A promotion's status is a pure function of its window and the clock.
//! The stored status is refreshed at create/update time and again by two
//! deferred jobs fired at `start_at` and `expired_at`.

use crate::deferred::{DeferredJob, DeferredScheduler};
use crate::error::CoreError;
use crate::payment::percent_of;
use crate::status::PromotionStatus;
use crate::types::{DbId, Timestamp};

/// Smallest accepted discount percentage.
pub const MIN_DISCOUNT_PERCENT: i32 = 1;

/// Largest accepted discount percentage.
pub const MAX_DISCOUNT_PERCENT: i32 = 100;

/// Status of a promotion with window `[start_at, expired_at]` at `now`.
pub fn status_at(start_at: Timestamp, expired_at: Timestamp, now: Timestamp) -> PromotionStatus {
    if now < start_at {
        PromotionStatus::Pending
    } else if now <= expired_at {
        PromotionStatus::Active
    } else {
        PromotionStatus::Expired
    }
}

/// Validate a new or edited window. The window must end in the future.
pub fn validate_window(
    start_at: Timestamp,
    expired_at: Timestamp,
    now: Timestamp,
) -> Result<(), CoreError> {
    if start_at >= expired_at {
        return Err(CoreError::Validation(
            "Promotion must start before it expires".into(),
        ));
    }
    if expired_at <= now {
        return Err(CoreError::Validation(
            "Promotion expiry must be in the future".into(),
        ));
    }
    Ok(())
}

pub fn validate_discount(percent: i32) -> Result<(), CoreError> {
    if !(MIN_DISCOUNT_PERCENT..=MAX_DISCOUNT_PERCENT).contains(&percent) {
        return Err(CoreError::Validation(format!(
            "Discount must be between {MIN_DISCOUNT_PERCENT} and {MAX_DISCOUNT_PERCENT} percent"
        )));
    }
    Ok(())
}

/// Amount taken off `total` by a `percent` discount, rounded down.
pub fn discount_amount(total: i64, percent: i32) -> Result<i64, CoreError> {
    percent_of(total, percent.clamp(0, MAX_DISCOUNT_PERCENT))
}

/// Cancel any pending transition jobs for `promotion_id`.
pub async fn cancel_transitions(
    scheduler: &dyn DeferredScheduler,
    promotion_id: DbId,
) -> Result<(), CoreError> {
    scheduler
        .cancel(&DeferredJob::ActivatePromotion { promotion_id })
        .await?;
    scheduler
        .cancel(&DeferredJob::ExpirePromotion { promotion_id })
        .await?;
    Ok(())
}

/// Replace the transition jobs of `promotion_id` for a (new) window.
///
/// The activation job is only queued when the start lies in the future; the
/// expiration job is always queued since validated windows end in the future.
pub async fn schedule_transitions(
    scheduler: &dyn DeferredScheduler,
    promotion_id: DbId,
    start_at: Timestamp,
    expired_at: Timestamp,
    now: Timestamp,
) -> Result<(), CoreError> {
    cancel_transitions(scheduler, promotion_id).await?;

    if start_at > now {
        scheduler
            .schedule(DeferredJob::ActivatePromotion { promotion_id }, start_at)
            .await?;
    }
    if expired_at > now {
        scheduler
            .schedule(DeferredJob::ExpirePromotion { promotion_id }, expired_at)
            .await?;
    }
    Ok(())
}
