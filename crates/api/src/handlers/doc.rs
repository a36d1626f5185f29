//! Handlers for project documents (`/projects/{project_id}/docs` and
//! `/docs`).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use koi_core::types::DbId;
use koi_db::models::doc::{CreateDoc, Doc};
use koi_db::repositories::DocRepo;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::contract::VerifyOtpRequest;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireCustomer, RequireStaff};
use crate::response::DataResponse;
use crate::services::access;
use crate::services::confirmation::{self, OtpIssued};
use crate::state::AppState;

/// POST /api/v1/projects/{project_id}/docs
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(project_id): Path<DbId>,
    Json(input): Json<CreateDoc>,
) -> AppResult<(StatusCode, Json<DataResponse<Doc>>)> {
    input.validate()?;
    access::load_visible_project(&state.pool, &user, project_id).await?;
    let doc = DocRepo::create(&state.pool, project_id, &input).await?;
    tracing::info!(doc_id = %doc.id, %project_id, "Document created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: doc })))
}

/// GET /api/v1/projects/{project_id}/docs
pub async fn list_by_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Doc>>>> {
    access::load_visible_project(&state.pool, &user, project_id).await?;
    let docs = DocRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: docs }))
}

/// GET /api/v1/docs/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Doc>>> {
    let doc = DocRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Doc", id))?;
    access::load_visible_project(&state.pool, &user, doc.project_id).await?;
    Ok(Json(DataResponse { data: doc }))
}

/// POST /api/v1/docs/{id}/otp
pub async fn request_otp(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<OtpIssued>>)> {
    let issued = confirmation::request_doc_otp(&state, &user, id).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: issued })))
}

/// POST /api/v1/docs/{id}/verify
pub async fn verify_otp(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Path(id): Path<DbId>,
    Json(input): Json<VerifyOtpRequest>,
) -> AppResult<Json<DataResponse<Doc>>> {
    let doc = confirmation::verify_doc_otp(&state, &user, id, &input.code).await?;
    Ok(Json(DataResponse { data: doc }))
}
