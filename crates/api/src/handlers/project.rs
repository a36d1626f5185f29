//! Handlers for the `/projects` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use koi_core::types::DbId;
use koi_db::models::project::{
    AssignStaff, CreateProject, Project, ProjectStaffMember, UpdateProject, UpdateProjectStatus,
};
use koi_db::repositories::ProjectRepo;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireCustomer, RequireManager};
use crate::response::DataResponse;
use crate::services::{access, project as project_service};
use crate::state::AppState;

/// POST /api/v1/projects
///
/// A customer requests a new pond project; it starts as REQUESTING.
pub async fn create(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Json(input): Json<CreateProject>,
) -> AppResult<(StatusCode, Json<DataResponse<Project>>)> {
    input.validate()?;
    let project = ProjectRepo::create(&state.pool, user.user_id, &input).await?;
    tracing::info!(project_id = %project.id, customer_id = %user.user_id, "Project requested");
    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/projects
///
/// Managers see every project, customers their own, staff their assignments.
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Project>>>> {
    let projects = if user.is_manager() {
        ProjectRepo::list(&state.pool).await?
    } else if user.is_customer() {
        ProjectRepo::list_by_customer(&state.pool, user.user_id).await?
    } else {
        ProjectRepo::list_by_staff(&state.pool, user.user_id).await?
    };
    Ok(Json(DataResponse { data: projects }))
}

/// GET /api/v1/projects/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = access::load_visible_project(&state.pool, &user, id).await?;
    Ok(Json(DataResponse { data: project }))
}

/// PUT /api/v1/projects/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProject>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = ProjectRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Project", id))?;
    Ok(Json(DataResponse { data: project }))
}

/// PUT /api/v1/projects/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProjectStatus>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = project_service::change_status(&state.pool, id, input.status).await?;
    Ok(Json(DataResponse { data: project }))
}

/// POST /api/v1/projects/{id}/staff
pub async fn assign_staff(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    Path(id): Path<DbId>,
    Json(input): Json<AssignStaff>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = project_service::assign_staff(&state.pool, id, input.staff_id).await?;
    Ok(Json(DataResponse { data: project }))
}

/// GET /api/v1/projects/{id}/staff
pub async fn list_staff(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ProjectStaffMember>>>> {
    access::load_visible_project(&state.pool, &user, id).await?;
    let staff = ProjectRepo::list_staff(&state.pool, id).await?;
    Ok(Json(DataResponse { data: staff }))
}
