//! Contract creation and cancellation.

use koi_core::deferred::DeferredJob;
use koi_core::otp::OtpSubject;
use koi_core::payment::plan_batches;
use koi_core::status::ContractStatus;
use koi_core::types::DbId;
use koi_core::workflow::{
    ensure_contract_pending, ensure_no_open_contract, ensure_quotation_approved, require_reason,
};
use koi_db::models::contract::{Contract, CreateContract};
use koi_db::models::payment::PaymentBatch;
use koi_db::repositories::{ContractRepo, PaymentRepo, ProjectRepo, QuotationRepo};
use serde::Serialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::services::access::{ensure_owner, load_project};
use crate::state::AppState;

/// A contract together with its payment milestones.
#[derive(Debug, Serialize)]
pub struct ContractWithBatches {
    #[serde(flatten)]
    pub contract: Contract,
    pub batches: Vec<PaymentBatch>,
}

/// Create a contract from the project's approved quotation, with its
/// payment batches, in one transaction.
pub async fn create_contract(
    state: &AppState,
    project_id: DbId,
    input: &CreateContract,
) -> AppResult<ContractWithBatches> {
    input.validate()?;

    let mut tx = state.pool.begin().await?;

    // Locking the project serializes contract creation per project.
    ProjectRepo::find_for_update(&mut *tx, project_id)
        .await?
        .ok_or_else(|| AppError::not_found("Project", project_id))?;

    let quotation = QuotationRepo::find_by_id(&mut *tx, input.quotation_id)
        .await?
        .filter(|q| q.project_id == project_id)
        .ok_or_else(|| AppError::not_found("Quotation", input.quotation_id))?;
    ensure_quotation_approved(quotation.status)?;

    let existing = ContractRepo::list_by_project(&mut *tx, project_id).await?;
    ensure_no_open_contract(existing.iter().map(|c| c.status))?;

    let plans = plan_batches(quotation.final_price)?;
    let contract = ContractRepo::create(&mut *tx, project_id, quotation.final_price, input).await?;
    let batches = PaymentRepo::create_batches(&mut tx, contract.id, &plans).await?;
    tx.commit().await?;

    tracing::info!(
        contract_id = %contract.id,
        %project_id,
        contract_value = contract.contract_value,
        "Contract created"
    );
    Ok(ContractWithBatches { contract, batches })
}

pub async fn load_contract(state: &AppState, id: DbId) -> AppResult<Contract> {
    ContractRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Contract", id))
}

/// The customer cancels a contract that is still awaiting confirmation.
pub async fn cancel_contract(
    state: &AppState,
    user: &AuthUser,
    contract_id: DbId,
    reason: Option<&str>,
) -> AppResult<Contract> {
    let reason = require_reason(reason)?;

    let mut tx = state.pool.begin().await?;
    let contract = ContractRepo::find_for_update(&mut *tx, contract_id)
        .await?
        .ok_or_else(|| AppError::not_found("Contract", contract_id))?;
    let project = load_project(&state.pool, contract.project_id).await?;
    ensure_owner(user, &project)?;
    ensure_contract_pending(contract.status)?;

    let cancelled =
        ContractRepo::set_status(&mut *tx, contract_id, ContractStatus::Cancelled, Some(reason))
            .await?;
    tx.commit().await?;

    // An outstanding code can no longer confirm anything.
    let key = OtpSubject::Contract.key(contract_id);
    if let Err(e) = state.otp_store.delete(&key).await {
        tracing::warn!(error = %e, %contract_id, "Failed to discard contract OTP");
    }
    if let Err(e) = state.scheduler.cancel(&DeferredJob::ExpireOtp { key }).await {
        tracing::warn!(error = %e, %contract_id, "Failed to cancel OTP expiry job");
    }

    tracing::info!(%contract_id, "Contract cancelled");
    Ok(cancelled)
}
