//! HTTP error mapping. Every failure leaves the API as
//! `{"error": <message>, "code": <CODE>}` with the matching status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use koi_core::error::CoreError;
use koi_core::types::DbId;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A request DTO failed its `Validate` rules.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No route matched; carries `METHOD /path`.
    #[error("No route for {0}")]
    UnknownRoute(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        AppError::Core(CoreError::NotFound { entity, id })
    }
}

type ErrorParts = (StatusCode, &'static str, String);

fn internal() -> ErrorParts {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn core_parts(err: &CoreError) -> ErrorParts {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => core_parts(core),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::InvalidInput(errors) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                errors.to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::UnknownRoute(route) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("No route for {route}"),
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        (status, axum::Json(json!({ "error": message, "code": code }))).into_response()
    }
}

/// Message for a unique constraint the schema declares. Unnamed or unknown
/// constraints fall back to a generic conflict message.
fn unique_violation_message(constraint: &str) -> String {
    match constraint {
        "uq_users_email" => "Email is already registered".to_string(),
        "uq_project_staffs_pair" => "Staff is already assigned to this project".to_string(),
        "uq_promotions_code" => "Promotion code already exists".to_string(),
        "uq_quotations_project_version" => {
            "Another quotation version was created concurrently".to_string()
        }
        "uq_payment_batches_phase" => "Contract already has a batch for this phase".to_string(),
        "uq_payments_txn_ref" => "Payment is already recorded".to_string(),
        other => format!("Duplicate value violates unique constraint: {other}"),
    }
}

/// Map Postgres error classes onto API errors:
///
/// - `23505` on a `uq_` constraint is 409 with a domain message;
/// - `23503` and `23514` (`chk_` rules) are 400;
/// - `40001` and `40P01` are 409 so the client can retry;
/// - anything else is logged and reported as 500.
fn classify_sqlx_error(err: &sqlx::Error) -> ErrorParts {
    let sqlx::Error::Database(db_err) = err else {
        if matches!(err, sqlx::Error::RowNotFound) {
            return (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Resource not found".to_string(),
            );
        }
        tracing::error!(error = %err, "Database error");
        return internal();
    };

    let constraint = db_err.constraint().unwrap_or("unknown");
    match db_err.code().as_deref() {
        Some("23505") if constraint.starts_with("uq_") => (
            StatusCode::CONFLICT,
            "CONFLICT",
            unique_violation_message(constraint),
        ),
        Some("23503") => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            format!("Referenced entity does not exist ({constraint})"),
        ),
        Some("23514") => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            format!("Value rejected by {constraint}"),
        ),
        Some("40001") | Some("40P01") => (
            StatusCode::CONFLICT,
            "CONFLICT",
            "Concurrent update, please retry".to_string(),
        ),
        _ => {
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use uuid::Uuid;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn core_errors_keep_their_message() {
        let (status, body) = render(CoreError::Validation("Reason is required".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"], "Reason is required");

        let id = Uuid::new_v4();
        let (status, body) = render(AppError::not_found("Contract", id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], format!("Contract with id {id} not found"));
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let (status, body) = render(AppError::InternalError("smtp: 535 auth".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An internal error occurred");

        let (status, _) = render(sqlx::Error::PoolTimedOut.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn known_unique_constraints_read_as_domain_messages() {
        assert_eq!(
            unique_violation_message("uq_users_email"),
            "Email is already registered"
        );
        assert_eq!(
            unique_violation_message("uq_payments_txn_ref"),
            "Payment is already recorded"
        );
        assert!(unique_violation_message("uq_other").contains("uq_other"));
    }
}
