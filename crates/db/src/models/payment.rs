//! Payment batches and recorded gateway payments.

use koi_core::status::{PaymentBatchStatus, PaymentPhase};
use koi_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentBatch {
    pub id: DbId,
    pub contract_id: DbId,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub phase: PaymentPhase,
    pub percents: i32,
    pub total_value: i64,
    pub is_paid: bool,
    #[sqlx(try_from = "String")]
    pub status: PaymentBatchStatus,
    pub payment_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: DbId,
    pub batch_id: DbId,
    pub amount: i64,
    pub txn_ref: String,
    pub transaction_no: Option<String>,
    pub bank_code: Option<String>,
    pub paid_at: Timestamp,
}

/// Insert payload for a successful gateway callback.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub batch_id: DbId,
    pub amount: i64,
    pub txn_ref: String,
    pub transaction_no: Option<String>,
    pub bank_code: Option<String>,
}

/// Customer request for a VNPAY redirect.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVnpayPayment {
    pub batch_id: DbId,
}

#[derive(Debug, Clone, Serialize)]
pub struct VnpayRedirect {
    pub payment_url: String,
    pub txn_ref: String,
}
