//! Route definitions for `/construction-items` and `/construction-tasks`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::construction;
use crate::state::AppState;

/// Routes mounted at `/construction-items`.
///
/// ```text
/// GET    /{id}             -> get_item
/// DELETE /{id}             -> delete_item (OPENING, no children or tasks)
/// POST   /{id}/children    -> add_children (level-1 only)
/// GET    /{id}/tasks       -> list_tasks
/// POST   /{id}/tasks       -> create_tasks (level-2 only)
/// ```
pub fn item_router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(construction::get_item).delete(construction::delete_item),
        )
        .route("/{id}/children", post(construction::add_children))
        .route(
            "/{id}/tasks",
            get(construction::list_tasks).post(construction::create_tasks),
        )
}

/// Routes mounted at `/construction-tasks`.
///
/// ```text
/// GET    /{id}             -> get_task
/// PATCH  /{id}             -> update_task
/// DELETE /{id}             -> delete_task (OPENING only)
/// POST   /{id}/confirm     -> confirm_task
/// ```
pub fn task_router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(construction::get_task)
                .patch(construction::update_task)
                .delete(construction::delete_task),
        )
        .route("/{id}/confirm", post(construction::confirm_task))
}
