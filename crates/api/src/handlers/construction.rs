//! Handlers for construction items and tasks.
//!
//! Managers plan the tree and confirm finished tasks; assigned constructors
//! upload progress images.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use koi_core::error::CoreError;
use koi_core::roles::ROLE_CONSTRUCTOR;
use koi_core::types::DbId;
use koi_db::models::construction::{
    ConstructionItem, ConstructionItemNode, ConstructionTask, CreateChildItem,
    CreateConstructionItem, CreateConstructionTask, UpdateConstructionTask,
};
use koi_db::repositories::ConstructionTaskRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireManager, RequireStaff};
use crate::response::DataResponse;
use crate::services::access;
use crate::services::construction as construction_service;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// GET /api/v1/projects/{project_id}/construction-items
pub async fn list_tree(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ConstructionItemNode>>>> {
    access::load_visible_project(&state.pool, &user, project_id).await?;
    let tree = construction_service::list_tree(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: tree }))
}

/// POST /api/v1/projects/{project_id}/construction-items
pub async fn create_items(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    Path(project_id): Path<DbId>,
    Json(input): Json<Vec<CreateConstructionItem>>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<ConstructionItemNode>>>)> {
    let nodes = construction_service::create_items(&state.pool, project_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: nodes })))
}

/// GET /api/v1/construction-items/{id}
pub async fn get_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ConstructionItem>>> {
    let item = construction_service::load_item(&state.pool, id).await?;
    access::load_visible_project(&state.pool, &user, item.project_id).await?;
    Ok(Json(DataResponse { data: item }))
}

/// POST /api/v1/construction-items/{id}/children
pub async fn add_children(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    Path(id): Path<DbId>,
    Json(input): Json<Vec<CreateChildItem>>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<ConstructionItem>>>)> {
    let children = construction_service::add_children(&state.pool, id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: children })))
}

/// DELETE /api/v1/construction-items/{id}
pub async fn delete_item(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    construction_service::delete_item(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// GET /api/v1/construction-items/{id}/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ConstructionTask>>>> {
    let item = construction_service::load_item(&state.pool, id).await?;
    access::load_visible_project(&state.pool, &user, item.project_id).await?;
    let tasks = ConstructionTaskRepo::list_by_item(&state.pool, id).await?;
    Ok(Json(DataResponse { data: tasks }))
}

/// POST /api/v1/construction-items/{id}/tasks
pub async fn create_tasks(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    Path(id): Path<DbId>,
    Json(input): Json<Vec<CreateConstructionTask>>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<ConstructionTask>>>)> {
    let tasks = construction_service::create_tasks(&state.pool, id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: tasks })))
}

/// GET /api/v1/construction-tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ConstructionTask>>> {
    let task = construction_service::load_task(&state.pool, id).await?;
    let project_id = construction_service::project_of_task(&state.pool, &task).await?;
    access::load_visible_project(&state.pool, &user, project_id).await?;
    Ok(Json(DataResponse { data: task }))
}

/// PATCH /api/v1/construction-tasks/{id}
///
/// Managers may change any field; constructors may only attach an image to
/// their own task.
pub async fn update_task(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateConstructionTask>,
) -> AppResult<Json<DataResponse<ConstructionTask>>> {
    if !user.is_manager() && user.role != ROLE_CONSTRUCTOR {
        return Err(CoreError::Forbidden("Manager or Constructor role required".into()).into());
    }
    let task = construction_service::update_task(&state.pool, &user, id, &input).await?;
    Ok(Json(DataResponse { data: task }))
}

/// POST /api/v1/construction-tasks/{id}/confirm
pub async fn confirm_task(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ConstructionTask>>> {
    let task = construction_service::confirm_task(&state.pool, id).await?;
    Ok(Json(DataResponse { data: task }))
}

/// DELETE /api/v1/construction-tasks/{id}
pub async fn delete_task(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    construction_service::delete_task(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
