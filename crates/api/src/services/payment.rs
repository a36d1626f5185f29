//! VNPAY checkout for contract payment batches.

use std::collections::BTreeMap;

use chrono::Utc;
use koi_core::error::CoreError;
use koi_core::status::ContractStatus;
use koi_core::types::DbId;
use koi_core::vnpay::{self, CallbackResult, PaymentRequest};
use koi_db::models::payment::{NewPayment, PaymentBatch, VnpayRedirect};
use koi_db::repositories::{ContractRepo, PaymentRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::services::access::{ensure_owner, load_project};
use crate::state::AppState;

/// Outcome of a gateway callback.
#[derive(Debug, Serialize)]
pub struct CallbackOutcome {
    pub batch_id: DbId,
    pub txn_ref: String,
    pub response_code: String,
    /// `true` once the batch is paid, including when it already was.
    pub paid: bool,
}

/// Build a signed VNPAY redirect for an unpaid batch of an active contract.
pub async fn create_payment_url(
    state: &AppState,
    user: &AuthUser,
    batch_id: DbId,
    ip_addr: &str,
) -> AppResult<VnpayRedirect> {
    let merchant = state
        .config
        .vnpay
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("Online payment is not configured".into()))?;

    let batch = PaymentRepo::find_batch(&state.pool, batch_id)
        .await?
        .ok_or_else(|| AppError::not_found("PaymentBatch", batch_id))?;
    let contract = ContractRepo::find_by_id(&state.pool, batch.contract_id)
        .await?
        .ok_or_else(|| AppError::not_found("Contract", batch.contract_id))?;
    let project = load_project(&state.pool, contract.project_id).await?;
    ensure_owner(user, &project)?;

    if contract.status != ContractStatus::Active {
        return Err(CoreError::Validation(
            "Contract must be confirmed before payment".into(),
        )
        .into());
    }
    if batch.is_paid {
        return Err(CoreError::Validation("Payment batch is already paid".into()).into());
    }

    let now = Utc::now();
    let request = PaymentRequest {
        txn_ref: vnpay::txn_ref_for(batch.id, now),
        amount: batch.total_value,
        order_info: format!("{} - {}", contract.name, batch.name),
        ip_addr: ip_addr.to_string(),
        created_at: now,
    };
    let payment_url = vnpay::build_payment_url(merchant, &request)?;

    tracing::info!(%batch_id, txn_ref = %request.txn_ref, amount = request.amount, "VNPAY payment started");
    Ok(VnpayRedirect {
        payment_url,
        txn_ref: request.txn_ref,
    })
}

/// Verify a gateway callback and settle the batch it refers to.
///
/// Settlement is idempotent: a batch that is already paid is reported as
/// paid without recording a second payment.
pub async fn handle_callback(
    state: &AppState,
    params: &BTreeMap<String, String>,
) -> AppResult<CallbackOutcome> {
    let merchant = state
        .config
        .vnpay
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("Online payment is not configured".into()))?;

    let result = vnpay::verify_callback(&merchant.hash_secret, params)?;
    let batch_id = vnpay::batch_id_from_txn_ref(&result.txn_ref)?;

    let mut tx = state.pool.begin().await?;
    let batch = PaymentRepo::find_batch_for_update(&mut *tx, batch_id)
        .await?
        .ok_or_else(|| AppError::not_found("PaymentBatch", batch_id))?;

    if batch.is_paid {
        tracing::info!(%batch_id, txn_ref = %result.txn_ref, "Callback for already paid batch");
        return Ok(outcome(&batch, &result, true));
    }
    if !result.is_success() {
        tracing::warn!(%batch_id, txn_ref = %result.txn_ref, code = %result.response_code, "VNPAY payment failed");
        return Ok(outcome(&batch, &result, false));
    }
    if result.amount != batch.total_value {
        return Err(CoreError::Validation(format!(
            "Paid amount {} does not match batch value {}",
            result.amount, batch.total_value
        ))
        .into());
    }

    let paid = PaymentRepo::mark_batch_paid(&mut *tx, batch_id).await?;
    PaymentRepo::record_payment(
        &mut *tx,
        &NewPayment {
            batch_id,
            amount: result.amount,
            txn_ref: result.txn_ref.clone(),
            transaction_no: result.transaction_no.clone(),
            bank_code: result.bank_code.clone(),
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(%batch_id, txn_ref = %result.txn_ref, amount = result.amount, "Payment batch paid");
    Ok(outcome(&paid, &result, true))
}

fn outcome(batch: &PaymentBatch, result: &CallbackResult, paid: bool) -> CallbackOutcome {
    CallbackOutcome {
        batch_id: batch.id,
        txn_ref: result.txn_ref.clone(),
        response_code: result.response_code.clone(),
        paid,
    }
}
