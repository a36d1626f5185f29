//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role is not
//! in its allow-list with 403 Forbidden.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use koi_core::error::CoreError;
use koi_core::roles::{
    ROLE_ADMINISTRATOR, ROLE_CONSTRUCTOR, ROLE_CONSULTANT, ROLE_CUSTOMER, ROLE_DESIGNER,
    ROLE_MANAGER,
};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    allowed: &[&str],
    message: &str,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    if !allowed.contains(&user.role.as_str()) {
        return Err(AppError::Core(CoreError::Forbidden(message.into())));
    }
    Ok(user)
}

/// Requires the `ADMINISTRATOR` role.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(user): RequireAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, &[ROLE_ADMINISTRATOR], "Administrator role required")
            .await
            .map(RequireAdmin)
    }
}

/// Requires `MANAGER` or `ADMINISTRATOR`.
pub struct RequireManager(pub AuthUser);

impl FromRequestParts<AppState> for RequireManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(
            parts,
            state,
            &[ROLE_MANAGER, ROLE_ADMINISTRATOR],
            "Manager role required",
        )
        .await
        .map(RequireManager)
    }
}

/// Requires `CONSULTANT`, `MANAGER` or `ADMINISTRATOR`.
pub struct RequireConsultant(pub AuthUser);

impl FromRequestParts<AppState> for RequireConsultant {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(
            parts,
            state,
            &[ROLE_CONSULTANT, ROLE_MANAGER, ROLE_ADMINISTRATOR],
            "Consultant or Manager role required",
        )
        .await
        .map(RequireConsultant)
    }
}

/// Requires any staff position or `ADMINISTRATOR`.
pub struct RequireStaff(pub AuthUser);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(
            parts,
            state,
            &[
                ROLE_ADMINISTRATOR,
                ROLE_MANAGER,
                ROLE_CONSULTANT,
                ROLE_DESIGNER,
                ROLE_CONSTRUCTOR,
            ],
            "Staff role required",
        )
        .await
        .map(RequireStaff)
    }
}

/// Requires the `CUSTOMER` role.
pub struct RequireCustomer(pub AuthUser);

impl FromRequestParts<AppState> for RequireCustomer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, &[ROLE_CUSTOMER], "Customer role required")
            .await
            .map(RequireCustomer)
    }
}
