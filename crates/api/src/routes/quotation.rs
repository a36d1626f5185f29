//! Route definitions for the `/quotations` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::quotation;
use crate::state::AppState;

/// Routes mounted at `/quotations`.
///
/// ```text
/// GET    /{id}            -> get_by_id
/// POST   /{id}/approve    -> approve (project customer)
/// POST   /{id}/reject     -> reject (project customer, reason required)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(quotation::get_by_id))
        .route("/{id}/approve", post(quotation::approve))
        .route("/{id}/reject", post(quotation::reject))
}
