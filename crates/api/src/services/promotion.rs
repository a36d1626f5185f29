//! Promotion lifecycle: validation, derived status, transition jobs.

use chrono::Utc;
use koi_core::promotion::{
    cancel_transitions, schedule_transitions, status_at, validate_discount, validate_window,
};
use koi_core::status::PromotionStatus;
use koi_core::types::{DbId, Timestamp};
use koi_db::models::promotion::{CreatePromotion, Promotion, UpdatePromotion};
use koi_db::repositories::promotion_repo::PromotionWrite;
use koi_db::repositories::PromotionRepo;
use koi_db::DbPool;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub async fn create_promotion(state: &AppState, input: &CreatePromotion) -> AppResult<Promotion> {
    input.validate()?;
    validate_discount(input.discount)?;
    let now = Utc::now();
    validate_window(input.start_at, input.expired_at, now)?;

    let status = status_at(input.start_at, input.expired_at, now);
    let promotion = PromotionRepo::create(&state.pool, input, status).await?;
    schedule_transitions(
        state.scheduler.as_ref(),
        promotion.id,
        promotion.start_at,
        promotion.expired_at,
        now,
    )
    .await?;

    tracing::info!(promotion_id = %promotion.id, code = %promotion.code, %status, "Promotion created");
    Ok(promotion)
}

/// Apply a partial update and replace the pending transition jobs.
pub async fn update_promotion(
    state: &AppState,
    id: DbId,
    patch: &UpdatePromotion,
) -> AppResult<Promotion> {
    let current = PromotionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Promotion", id))?;

    let name = patch.name.as_deref().unwrap_or(&current.name).trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Promotion name must not be empty".into()));
    }
    let discount = patch.discount.unwrap_or(current.discount);
    validate_discount(discount)?;
    let start_at = patch.start_at.unwrap_or(current.start_at);
    let expired_at = patch.expired_at.unwrap_or(current.expired_at);
    let now = Utc::now();
    validate_window(start_at, expired_at, now)?;

    let write = PromotionWrite {
        name,
        description: patch.description.as_deref().or(current.description.as_deref()),
        discount,
        start_at,
        expired_at,
        status: status_at(start_at, expired_at, now),
    };
    let updated = PromotionRepo::update(&state.pool, id, &write)
        .await?
        .ok_or_else(|| AppError::not_found("Promotion", id))?;
    schedule_transitions(state.scheduler.as_ref(), id, start_at, expired_at, now).await?;

    tracing::info!(promotion_id = %id, status = %updated.status, "Promotion updated");
    Ok(updated)
}

/// Soft-delete a promotion and drop its pending transition jobs.
pub async fn delete_promotion(state: &AppState, id: DbId) -> AppResult<()> {
    if !PromotionRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Promotion", id));
    }
    cancel_transitions(state.scheduler.as_ref(), id).await?;
    tracing::info!(promotion_id = %id, "Promotion deleted");
    Ok(())
}

/// Re-derive a promotion's status from its window. Safe to call repeatedly.
///
/// Returns the new status when it changed, `None` when the stored status was
/// already current or the promotion no longer exists.
pub async fn refresh_status(
    pool: &DbPool,
    id: DbId,
    now: Timestamp,
) -> Result<Option<PromotionStatus>, sqlx::Error> {
    let Some(promotion) = PromotionRepo::find_by_id(pool, id).await? else {
        return Ok(None);
    };
    let status = status_at(promotion.start_at, promotion.expired_at, now);
    if PromotionRepo::set_status(pool, id, status).await? {
        tracing::info!(promotion_id = %id, from = %promotion.status, to = %status, "Promotion status changed");
        Ok(Some(status))
    } else {
        Ok(None)
    }
}
