//! Handlers for the `/promotions` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use koi_core::types::DbId;
use koi_db::models::promotion::{CreatePromotion, Promotion, UpdatePromotion};
use koi_db::repositories::PromotionRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireManager;
use crate::response::DataResponse;
use crate::services::promotion as promotion_service;
use crate::state::AppState;

/// POST /api/v1/promotions
pub async fn create(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    Json(input): Json<CreatePromotion>,
) -> AppResult<(StatusCode, Json<DataResponse<Promotion>>)> {
    let promotion = promotion_service::create_promotion(&state, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: promotion })))
}

/// GET /api/v1/promotions
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Promotion>>>> {
    let promotions = PromotionRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: promotions }))
}

/// GET /api/v1/promotions/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Promotion>>> {
    let promotion = PromotionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Promotion", id))?;
    Ok(Json(DataResponse { data: promotion }))
}

/// PUT /api/v1/promotions/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePromotion>,
) -> AppResult<Json<DataResponse<Promotion>>> {
    let promotion = promotion_service::update_promotion(&state, id, &input).await?;
    Ok(Json(DataResponse { data: promotion }))
}

/// DELETE /api/v1/promotions/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    promotion_service::delete_promotion(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
