//! Promotion entity model and DTOs.

use koi_core::status::PromotionStatus;
use koi_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Promotion {
    pub id: DbId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    /// Discount in percent (1..=100).
    pub discount: i32,
    pub start_at: Timestamp,
    pub expired_at: Timestamp,
    #[sqlx(try_from = "String")]
    pub status: PromotionStatus,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePromotion {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub description: Option<String>,
    pub discount: i32,
    pub start_at: Timestamp,
    pub expired_at: Timestamp,
}

/// DTO for updating a promotion. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePromotion {
    pub name: Option<String>,
    pub description: Option<String>,
    pub discount: Option<i32>,
    pub start_at: Option<Timestamp>,
    pub expired_at: Option<Timestamp>,
}
