//! Route definitions for the `/contracts` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::contract;
use crate::state::AppState;

/// Routes mounted at `/contracts`.
///
/// ```text
/// GET    /{id}            -> get_by_id (with payment batches)
/// GET    /{id}/batches    -> list_batches
/// POST   /{id}/otp        -> request_otp (project customer)
/// POST   /{id}/verify     -> verify_otp (project customer)
/// POST   /{id}/cancel     -> cancel (project customer, reason required)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(contract::get_by_id))
        .route("/{id}/batches", get(contract::list_batches))
        .route("/{id}/otp", post(contract::request_otp))
        .route("/{id}/verify", post(contract::verify_otp))
        .route("/{id}/cancel", post(contract::cancel))
}
