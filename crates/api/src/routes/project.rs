//! Route definitions for the `/projects` resource.
//!
//! Also nests the project-scoped quotation, contract, document and
//! construction item collections under `/projects/{id}/...`.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::{construction, contract, doc, project, quotation};
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /                                        -> list
/// POST   /                                        -> create
/// GET    /{id}                                    -> get_by_id
/// PUT    /{id}                                    -> update
/// PUT    /{id}/status                             -> update_status
/// GET    /{id}/staff                              -> list_staff
/// POST   /{id}/staff                              -> assign_staff
///
/// GET    /{id}/quotations                 -> quotation::list_by_project
/// POST   /{id}/quotations                 -> quotation::create
/// GET    /{id}/contracts                  -> contract::list_by_project
/// POST   /{id}/contracts                  -> contract::create
/// GET    /{id}/docs                       -> doc::list_by_project
/// POST   /{id}/docs                       -> doc::create
/// GET    /{id}/construction-items         -> construction::list_tree
/// POST   /{id}/construction-items         -> construction::create_items
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list).post(project::create))
        .route("/{id}", get(project::get_by_id).put(project::update))
        .route("/{id}/status", put(project::update_status))
        .route(
            "/{id}/staff",
            get(project::list_staff).post(project::assign_staff),
        )
        .route(
            "/{id}/quotations",
            get(quotation::list_by_project).post(quotation::create),
        )
        .route(
            "/{id}/contracts",
            get(contract::list_by_project).post(contract::create),
        )
        .route("/{id}/docs", get(doc::list_by_project).post(doc::create))
        .route(
            "/{id}/construction-items",
            get(construction::list_tree).post(construction::create_items),
        )
}
