//! Quotation pricing and customer review.

use chrono::Utc;
use koi_core::error::CoreError;
use koi_core::payment::ensure_amount_in_range;
use koi_core::promotion::{discount_amount, status_at};
use koi_core::status::{PromotionStatus, QuotationStatus};
use koi_core::types::DbId;
use koi_core::workflow::{ensure_quotation_reviewable, require_reason};
use koi_db::models::quotation::{CreateQuotationRequest, NewQuotation, Quotation};
use koi_db::repositories::{PromotionRepo, QuotationRepo};
use koi_db::DbPool;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::services::access::{ensure_owner, load_project};

/// Price a new quotation version. A promotion code only discounts while
/// the promotion is active.
pub async fn create_quotation(
    pool: &DbPool,
    project_id: DbId,
    input: &CreateQuotationRequest,
) -> AppResult<Quotation> {
    input.validate()?;
    ensure_amount_in_range(input.total_price, "Total price")?;
    load_project(pool, project_id).await?;

    let (promotion_id, discount_price) = match input.promotion_code.as_deref() {
        Some(code) if !code.trim().is_empty() => {
            let promotion = PromotionRepo::find_by_code(pool, code).await?.ok_or_else(|| {
                CoreError::Validation(format!("Unknown promotion code '{}'", code.trim()))
            })?;
            if status_at(promotion.start_at, promotion.expired_at, Utc::now())
                != PromotionStatus::Active
            {
                return Err(CoreError::Validation(format!(
                    "Promotion '{}' is not active",
                    promotion.code
                ))
                .into());
            }
            (
                Some(promotion.id),
                discount_amount(input.total_price, promotion.discount)?,
            )
        }
        _ => (None, 0),
    };

    let quotation = QuotationRepo::create(
        pool,
        &NewQuotation {
            project_id,
            promotion_id,
            total_price: input.total_price,
            discount_price,
        },
    )
    .await?;

    tracing::info!(
        quotation_id = %quotation.id,
        %project_id,
        version = quotation.version,
        final_price = quotation.final_price,
        "Quotation created"
    );
    Ok(quotation)
}

pub async fn load_quotation(pool: &DbPool, id: DbId) -> AppResult<Quotation> {
    QuotationRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Quotation", id))
}

/// Approve or reject (with a reason) a previewing quotation.
pub async fn review_quotation(
    pool: &DbPool,
    user: &AuthUser,
    id: DbId,
    decision: QuotationStatus,
    reason: Option<&str>,
) -> AppResult<Quotation> {
    let quotation = load_quotation(pool, id).await?;
    let project = load_project(pool, quotation.project_id).await?;
    ensure_owner(user, &project)?;
    ensure_quotation_reviewable(quotation.status)?;

    let reason = match decision {
        QuotationStatus::Rejected => Some(require_reason(reason)?),
        _ => None,
    };

    let reviewed = QuotationRepo::review(pool, id, decision, reason)
        .await?
        .ok_or_else(|| CoreError::Conflict("Quotation was reviewed concurrently".into()))?;

    tracing::info!(quotation_id = %id, status = %reviewed.status, "Quotation reviewed");
    Ok(reviewed)
}
