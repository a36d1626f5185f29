//! Route definitions for the `/docs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::doc;
use crate::state::AppState;

/// Routes mounted at `/docs`.
///
/// ```text
/// GET    /{id}            -> get_by_id
/// POST   /{id}/otp        -> request_otp (project customer)
/// POST   /{id}/verify     -> verify_otp (project customer)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(doc::get_by_id))
        .route("/{id}/otp", post(doc::request_otp))
        .route("/{id}/verify", post(doc::verify_otp))
}
