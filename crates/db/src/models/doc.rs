//! Project document model and DTOs.

use koi_core::status::DocStatus;
use koi_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Doc {
    pub id: DbId,
    pub project_id: DbId,
    pub name: String,
    pub url: String,
    pub doc_type: String,
    #[sqlx(try_from = "String")]
    pub status: DocStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDoc {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(url)]
    pub url: String,
    #[validate(length(min = 1, max = 50))]
    pub doc_type: String,
}
