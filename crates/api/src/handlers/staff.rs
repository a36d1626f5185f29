//! Handlers for the `/staff` resource.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use koi_core::error::CoreError;
use koi_core::roles::{is_staff_position, STAFF_POSITIONS};
use koi_db::models::construction::ConstructionTask;
use koi_db::models::user::{CreateStaffRequest, CreateUser, UserResponse};
use koi_db::repositories::{ConstructionTaskRepo, UserRepo};
use serde::Deserialize;
use validator::Validate;

use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireManager, RequireStaff};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StaffQuery {
    /// Filter by position, e.g. `CONSTRUCTOR`.
    pub position: Option<String>,
}

/// POST /api/v1/staff
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CreateStaffRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    input.validate()?;
    let position = input.position.trim().to_uppercase();
    if !is_staff_position(&position) {
        return Err(CoreError::Validation(format!(
            "Position must be one of {}",
            STAFF_POSITIONS.join(", ")
        ))
        .into());
    }
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            full_name: input.full_name.trim().to_string(),
            email: input.email,
            phone: input.phone,
            password_hash,
            role: position,
        },
    )
    .await?;
    tracing::info!(user_id = %user.id, role = %user.role, "Staff account created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: user.into() })))
}

/// GET /api/v1/staff?position=
pub async fn list(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    Query(query): Query<StaffQuery>,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    let position = query.position.map(|p| p.trim().to_uppercase());
    if let Some(p) = &position {
        if !is_staff_position(p) {
            return Err(CoreError::Validation(format!("Unknown position '{p}'")).into());
        }
    }
    let staff = UserRepo::list_staff(&state.pool, position.as_deref()).await?;
    Ok(Json(DataResponse {
        data: staff.into_iter().map(UserResponse::from).collect(),
    }))
}

/// GET /api/v1/staff/me/tasks
pub async fn my_tasks(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
) -> AppResult<Json<DataResponse<Vec<ConstructionTask>>>> {
    let tasks = ConstructionTaskRepo::list_by_staff(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse { data: tasks }))
}
