pub mod auth;
pub mod construction;
pub mod contract;
pub mod doc;
pub mod health;
pub mod payment;
pub mod project;
pub mod promotion;
pub mod quotation;
pub mod staff;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                                   register customer (public)
/// /auth/login                                      login (public)
/// /auth/me                                         current user
///
/// /staff                                           list (?position=), create (admin)
/// /staff/me/tasks                                  tasks assigned to the caller
///
/// /projects                                        list, create (customer)
/// /projects/{id}                                   get, update
/// /projects/{id}/status                            advance status (manager)
/// /projects/{id}/staff                             list, assign (manager)
/// /projects/{id}/quotations                        list, create (consultant)
/// /projects/{id}/contracts                         list, create (consultant)
/// /projects/{id}/docs                              list, create (staff)
/// /projects/{id}/construction-items                tree, create (manager)
///
/// /quotations/{id}                                 get
/// /quotations/{id}/approve                         approve (customer)
/// /quotations/{id}/reject                          reject (customer)
///
/// /contracts/{id}                                  get with batches
/// /contracts/{id}/batches                          payment batches
/// /contracts/{id}/otp                              request code (customer)
/// /contracts/{id}/verify                           verify code (customer)
/// /contracts/{id}/cancel                           cancel (customer)
///
/// /docs/{id}                                       get
/// /docs/{id}/otp                                   request code (customer)
/// /docs/{id}/verify                                verify code (customer)
///
/// /construction-items/{id}                         get, delete (manager)
/// /construction-items/{id}/children                add children (manager)
/// /construction-items/{id}/tasks                   list, create (manager)
/// /construction-tasks/{id}                         get, patch, delete (manager)
/// /construction-tasks/{id}/confirm                 confirm (manager)
///
/// /promotions                                      list, create (manager)
/// /promotions/{id}                                 get, update, delete (manager)
///
/// /payments/vnpay                                  start VNPAY checkout (customer)
/// /payments/vnpay/callback                         gateway callback (signed)
/// /payments/batches/{id}                           recorded payments
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/staff", staff::router())
        .nest("/projects", project::router())
        .nest("/quotations", quotation::router())
        .nest("/contracts", contract::router())
        .nest("/docs", doc::router())
        .nest("/construction-items", construction::item_router())
        .nest("/construction-tasks", construction::task_router())
        .nest("/promotions", promotion::router())
        .nest("/payments", payment::router())
}
