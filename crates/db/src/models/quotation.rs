//! Quotation entity model and DTOs.

use koi_core::status::QuotationStatus;
use koi_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Quotation {
    pub id: DbId,
    pub project_id: DbId,
    pub promotion_id: Option<DbId>,
    pub version: i32,
    pub total_price: i64,
    pub discount_price: i64,
    pub final_price: i64,
    pub reason: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: QuotationStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Consultant request for a new quotation version.
///
/// The upper bound matches `koi_core::payment::MAX_AMOUNT`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuotationRequest {
    #[validate(range(min = 1, max = 1_000_000_000_000_000_i64))]
    pub total_price: i64,
    pub promotion_code: Option<String>,
}

/// Insert payload with prices already computed.
#[derive(Debug, Clone)]
pub struct NewQuotation {
    pub project_id: DbId,
    pub promotion_id: Option<DbId>,
    pub total_price: i64,
    pub discount_price: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectQuotation {
    pub reason: Option<String>,
}
