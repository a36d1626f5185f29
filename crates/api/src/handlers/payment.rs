//! Handlers for VNPAY payments.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use koi_core::types::DbId;
use koi_db::models::payment::{CreateVnpayPayment, Payment, VnpayRedirect};
use koi_db::repositories::{ContractRepo, PaymentRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireCustomer;
use crate::response::DataResponse;
use crate::services::access;
use crate::services::payment::{self as payment_service, CallbackOutcome};
use crate::state::AppState;

/// Client address reported to the gateway, taken from the proxy header.
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("127.0.0.1")
        .to_string()
}

/// POST /api/v1/payments/vnpay
pub async fn create_vnpay(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    headers: HeaderMap,
    Json(input): Json<CreateVnpayPayment>,
) -> AppResult<Json<DataResponse<VnpayRedirect>>> {
    let redirect =
        payment_service::create_payment_url(&state, &user, input.batch_id, &client_ip(&headers))
            .await?;
    Ok(Json(DataResponse { data: redirect }))
}

/// GET /api/v1/payments/vnpay/callback
///
/// Called by the gateway (or the browser return redirect). Authenticated by
/// the `vnp_SecureHash` signature, not a bearer token.
pub async fn vnpay_callback(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> AppResult<Json<DataResponse<CallbackOutcome>>> {
    let outcome = payment_service::handle_callback(&state, &params).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// GET /api/v1/payments/batches/{id}
///
/// Recorded gateway payments for a batch.
pub async fn list_for_batch(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Payment>>>> {
    let batch = PaymentRepo::find_batch(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("PaymentBatch", id))?;
    let project_id = ContractRepo::project_id_of(&state.pool, batch.contract_id)
        .await?
        .ok_or_else(|| AppError::not_found("Contract", batch.contract_id))?;
    access::load_visible_project(&state.pool, &user, project_id).await?;

    let payments = PaymentRepo::list_payments(&state.pool, id).await?;
    Ok(Json(DataResponse { data: payments }))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn client_ip_uses_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn client_ip_defaults_to_loopback() {
        assert_eq!(client_ip(&HeaderMap::new()), "127.0.0.1");
    }
}
