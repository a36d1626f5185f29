//! Handlers for quotations (`/projects/{project_id}/quotations` and
//! `/quotations`).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use koi_core::status::QuotationStatus;
use koi_core::types::DbId;
use koi_db::models::quotation::{CreateQuotationRequest, Quotation, RejectQuotation};
use koi_db::repositories::QuotationRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireConsultant, RequireCustomer};
use crate::response::DataResponse;
use crate::services::{access, quotation as quotation_service};
use crate::state::AppState;

/// POST /api/v1/projects/{project_id}/quotations
pub async fn create(
    State(state): State<AppState>,
    RequireConsultant(_consultant): RequireConsultant,
    Path(project_id): Path<DbId>,
    Json(input): Json<CreateQuotationRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Quotation>>)> {
    let quotation = quotation_service::create_quotation(&state.pool, project_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: quotation })))
}

/// GET /api/v1/projects/{project_id}/quotations
pub async fn list_by_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Quotation>>>> {
    access::load_visible_project(&state.pool, &user, project_id).await?;
    let quotations = QuotationRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: quotations }))
}

/// GET /api/v1/quotations/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Quotation>>> {
    let quotation = quotation_service::load_quotation(&state.pool, id).await?;
    access::load_visible_project(&state.pool, &user, quotation.project_id).await?;
    Ok(Json(DataResponse { data: quotation }))
}

/// POST /api/v1/quotations/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Quotation>>> {
    let quotation = quotation_service::review_quotation(
        &state.pool,
        &user,
        id,
        QuotationStatus::Approved,
        None,
    )
    .await?;
    Ok(Json(DataResponse { data: quotation }))
}

/// POST /api/v1/quotations/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<DbId>,
    Json(input): Json<RejectQuotation>,
) -> AppResult<Json<DataResponse<Quotation>>> {
    let quotation = quotation_service::review_quotation(
        &state.pool,
        &user,
        id,
        QuotationStatus::Rejected,
        input.reason.as_deref(),
    )
    .await?;
    Ok(Json(DataResponse { data: quotation }))
}
