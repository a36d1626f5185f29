//! OTP confirmation of contracts and project documents.
//!
//! A customer requests a code, which is stored with a TTL, emailed, and
//! removed by an `ExpireOtp` job once the TTL passes. Verifying the code
//! locks the entity row, checks the code and flips the status to ACTIVE in
//! one transaction. The code is deleted only after that commit; the row lock
//! and the pending check stop a code from confirming its entity twice.

use chrono::Utc;
use koi_core::deferred::DeferredJob;
use koi_core::otp::{self, OtpSubject};
use koi_core::status::{ContractStatus, DocStatus};
use koi_core::types::{DbId, Timestamp};
use koi_core::workflow::{ensure_contract_pending, ensure_doc_pending};
use koi_db::models::contract::Contract;
use koi_db::models::doc::Doc;
use koi_db::repositories::{ContractRepo, DocRepo, UserRepo};
use koi_notify::OtpNotice;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::services::access::{ensure_owner, load_project};
use crate::state::AppState;

/// Returned when a code has been issued. The code itself is only emailed.
#[derive(Debug, Serialize)]
pub struct OtpIssued {
    pub expires_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

pub async fn request_contract_otp(
    state: &AppState,
    user: &AuthUser,
    contract_id: DbId,
) -> AppResult<OtpIssued> {
    let contract = ContractRepo::find_by_id(&state.pool, contract_id)
        .await?
        .ok_or_else(|| AppError::not_found("Contract", contract_id))?;
    let project = load_project(&state.pool, contract.project_id).await?;
    ensure_owner(user, &project)?;
    ensure_contract_pending(contract.status)?;

    send_code(state, OtpSubject::Contract, contract.id, &contract.name, project.customer_id).await
}

pub async fn verify_contract_otp(
    state: &AppState,
    user: &AuthUser,
    contract_id: DbId,
    code: &str,
) -> AppResult<Contract> {
    let mut tx = state.pool.begin().await?;

    let contract = ContractRepo::find_for_update(&mut *tx, contract_id)
        .await?
        .ok_or_else(|| AppError::not_found("Contract", contract_id))?;
    let project = load_project(&state.pool, contract.project_id).await?;
    ensure_owner(user, &project)?;
    ensure_contract_pending(contract.status)?;

    otp::check(
        state.otp_store.as_ref(),
        OtpSubject::Contract,
        contract_id,
        code,
        Utc::now(),
    )
    .await?;
    let confirmed =
        ContractRepo::set_status(&mut *tx, contract_id, ContractStatus::Active, None).await?;
    tx.commit().await?;

    tracing::info!(%contract_id, "Contract confirmed by OTP");
    retire_code(state, OtpSubject::Contract, contract_id).await;
    Ok(confirmed)
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

pub async fn request_doc_otp(
    state: &AppState,
    user: &AuthUser,
    doc_id: DbId,
) -> AppResult<OtpIssued> {
    let doc = DocRepo::find_by_id(&state.pool, doc_id)
        .await?
        .ok_or_else(|| AppError::not_found("Doc", doc_id))?;
    let project = load_project(&state.pool, doc.project_id).await?;
    ensure_owner(user, &project)?;
    ensure_doc_pending(doc.status)?;

    send_code(state, OtpSubject::Doc, doc.id, &doc.name, project.customer_id).await
}

pub async fn verify_doc_otp(
    state: &AppState,
    user: &AuthUser,
    doc_id: DbId,
    code: &str,
) -> AppResult<Doc> {
    let mut tx = state.pool.begin().await?;

    let doc = DocRepo::find_for_update(&mut *tx, doc_id)
        .await?
        .ok_or_else(|| AppError::not_found("Doc", doc_id))?;
    let project = load_project(&state.pool, doc.project_id).await?;
    ensure_owner(user, &project)?;
    ensure_doc_pending(doc.status)?;

    otp::check(state.otp_store.as_ref(), OtpSubject::Doc, doc_id, code, Utc::now()).await?;
    let confirmed = DocRepo::set_status(&mut *tx, doc_id, DocStatus::Active).await?;
    tx.commit().await?;

    tracing::info!(%doc_id, "Document confirmed by OTP");
    retire_code(state, OtpSubject::Doc, doc_id).await;
    Ok(confirmed)
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

async fn send_code(
    state: &AppState,
    subject: OtpSubject,
    id: DbId,
    entity_name: &str,
    customer_id: DbId,
) -> AppResult<OtpIssued> {
    let customer = UserRepo::find_by_id(&state.pool, customer_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", customer_id))?;

    let ttl = state.config.otp_ttl();
    let now = Utc::now();
    let code = otp::issue(
        state.otp_store.as_ref(),
        state.scheduler.as_ref(),
        subject,
        id,
        ttl,
        now,
    )
    .await?;

    let notice = OtpNotice {
        subject,
        entity_name,
        code: &code,
        ttl_minutes: ttl.num_minutes().max(1),
    };
    state
        .notifier
        .send_otp(&customer.email, &notice)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to deliver confirmation code: {e}")))?;

    tracing::info!(entity = subject.entity(), %id, "Confirmation code issued");
    Ok(OtpIssued {
        expires_at: now + ttl,
    })
}

/// Delete a code whose confirmation has committed, along with its cleanup job.
///
/// If the delete fails the expiry job is kept so it can remove the code.
async fn retire_code(state: &AppState, subject: OtpSubject, id: DbId) {
    if let Err(e) = otp::consume(state.otp_store.as_ref(), subject, id).await {
        tracing::warn!(error = %e, %id, "Failed to delete redeemed confirmation code");
        return;
    }
    let job = DeferredJob::ExpireOtp {
        key: subject.key(id),
    };
    if let Err(e) = state.scheduler.cancel(&job).await {
        tracing::warn!(error = %e, %id, "Failed to cancel OTP expiry job");
    }
}
