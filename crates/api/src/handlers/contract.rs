//! Handlers for contracts (`/projects/{project_id}/contracts` and
//! `/contracts`).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use koi_core::types::DbId;
use koi_db::models::contract::{CancelContract, Contract, CreateContract};
use koi_db::models::payment::PaymentBatch;
use koi_db::repositories::{ContractRepo, PaymentRepo};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireConsultant, RequireCustomer};
use crate::response::DataResponse;
use crate::services::access;
use crate::services::confirmation::{self, OtpIssued};
use crate::services::contract::{self as contract_service, ContractWithBatches};
use crate::state::AppState;

/// Request body for the OTP verification endpoints.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub code: String,
}

/// POST /api/v1/projects/{project_id}/contracts
pub async fn create(
    State(state): State<AppState>,
    RequireConsultant(_consultant): RequireConsultant,
    Path(project_id): Path<DbId>,
    Json(input): Json<CreateContract>,
) -> AppResult<(StatusCode, Json<DataResponse<ContractWithBatches>>)> {
    let created = contract_service::create_contract(&state, project_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/projects/{project_id}/contracts
pub async fn list_by_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Contract>>>> {
    access::load_visible_project(&state.pool, &user, project_id).await?;
    let contracts = ContractRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: contracts }))
}

/// GET /api/v1/contracts/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ContractWithBatches>>> {
    let contract = contract_service::load_contract(&state, id).await?;
    access::load_visible_project(&state.pool, &user, contract.project_id).await?;
    let batches = PaymentRepo::list_batches(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: ContractWithBatches { contract, batches },
    }))
}

/// GET /api/v1/contracts/{id}/batches
pub async fn list_batches(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<PaymentBatch>>>> {
    let contract = contract_service::load_contract(&state, id).await?;
    access::load_visible_project(&state.pool, &user, contract.project_id).await?;
    let batches = PaymentRepo::list_batches(&state.pool, id).await?;
    Ok(Json(DataResponse { data: batches }))
}

/// POST /api/v1/contracts/{id}/otp
///
/// Email the customer a confirmation code.
pub async fn request_otp(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<OtpIssued>>)> {
    let issued = confirmation::request_contract_otp(&state, &user, id).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: issued })))
}

/// POST /api/v1/contracts/{id}/verify
pub async fn verify_otp(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<DbId>,
    Json(input): Json<VerifyOtpRequest>,
) -> AppResult<Json<DataResponse<Contract>>> {
    let contract = confirmation::verify_contract_otp(&state, &user, id, &input.code).await?;
    Ok(Json(DataResponse { data: contract }))
}

/// POST /api/v1/contracts/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<DbId>,
    Json(input): Json<CancelContract>,
) -> AppResult<Json<DataResponse<Contract>>> {
    let contract =
        contract_service::cancel_contract(&state, &user, id, input.reason.as_deref()).await?;
    Ok(Json(DataResponse { data: contract }))
}
