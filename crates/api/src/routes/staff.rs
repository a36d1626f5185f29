//! Route definitions for the `/staff` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::staff;
use crate::state::AppState;

/// Routes mounted at `/staff`.
///
/// ```text
/// GET    /              -> list (?position=)
/// POST   /              -> create (admin)
/// GET    /me/tasks      -> my_tasks
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(staff::list).post(staff::create))
        .route("/me/tasks", get(staff::my_tasks))
}
