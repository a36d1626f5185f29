//! Route definitions for the `/promotions` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::promotion;
use crate::state::AppState;

/// Routes mounted at `/promotions`.
///
/// ```text
/// GET    /        -> list
/// POST   /        -> create (manager)
/// GET    /{id}    -> get_by_id
/// PUT    /{id}    -> update (manager)
/// DELETE /{id}    -> delete (manager, soft)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(promotion::list).post(promotion::create))
        .route(
            "/{id}",
            get(promotion::get_by_id)
                .put(promotion::update)
                .delete(promotion::delete),
        )
}
