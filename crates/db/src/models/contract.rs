//! Contract entity model and DTOs.

use koi_core::status::ContractStatus;
use koi_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Contract {
    pub id: DbId,
    pub project_id: DbId,
    pub quotation_id: DbId,
    pub name: String,
    pub customer_name: String,
    pub contract_value: i64,
    pub url: String,
    pub note: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ContractStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateContract {
    pub quotation_id: DbId,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub customer_name: String,
    #[validate(url)]
    pub url: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelContract {
    pub reason: Option<String>,
}
