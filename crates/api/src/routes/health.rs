//! `GET /health`, mounted at the root next to `/api/v1`.
//!
//! Reports database reachability and the deferred job queue that drives
//! promotion windows and OTP cleanup. A queue with overdue or failed jobs
//! marks the service `degraded`; an unreachable database answers 503.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use chrono::{Duration, Utc};
use koi_db::models::deferred_job::JobBacklog;
use koi_db::repositories::DeferredJobRepo;
use serde::Serialize;

use crate::state::AppState;

/// How late a PENDING job may run before it counts as overdue.
const OVERDUE_GRACE_MINS: i64 = 1;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// `None` when the queue could not be read.
    pub deferred_jobs: Option<JobBacklog>,
}

/// `ok`, `degraded` or `unavailable`.
fn overall_status(db_healthy: bool, backlog: Option<&JobBacklog>) -> &'static str {
    match backlog {
        _ if !db_healthy => "unavailable",
        Some(b) if b.overdue == 0 && b.failed == 0 => "ok",
        _ => "degraded",
    }
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_healthy = koi_db::health_check(&state.pool).await.is_ok();

    let deferred_jobs = if db_healthy {
        let cutoff = Utc::now() - Duration::minutes(OVERDUE_GRACE_MINS);
        match DeferredJobRepo::backlog(&state.pool, cutoff).await {
            Ok(backlog) => Some(backlog),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read deferred job backlog");
                None
            }
        }
    } else {
        None
    };

    let status = overall_status(db_healthy, deferred_jobs.as_ref());
    let code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            db_healthy,
            deferred_jobs,
        }),
    )
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_database_then_queue() {
        let clean = JobBacklog {
            pending: 3,
            ..Default::default()
        };
        let lagging = JobBacklog {
            pending: 3,
            overdue: 1,
            failed: 0,
        };
        let failing = JobBacklog {
            failed: 2,
            ..Default::default()
        };

        assert_eq!(overall_status(true, Some(&clean)), "ok");
        assert_eq!(overall_status(true, Some(&lagging)), "degraded");
        assert_eq!(overall_status(true, Some(&failing)), "degraded");
        assert_eq!(overall_status(true, None), "degraded");
        assert_eq!(overall_status(false, Some(&clean)), "unavailable");
    }
}
