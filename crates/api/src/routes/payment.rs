//! Route definitions for the `/payments` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::payment;
use crate::state::AppState;

/// Routes mounted at `/payments`.
///
/// ```text
/// POST   /vnpay              -> create_vnpay (project customer)
/// GET    /vnpay/callback     -> vnpay_callback (signed by the gateway)
/// GET    /batches/{id}       -> list_for_batch
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/vnpay", post(payment::create_vnpay))
        .route("/vnpay/callback", get(payment::vnpay_callback))
        .route("/batches/{id}", get(payment::list_for_batch))
}
