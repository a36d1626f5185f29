//! Deferred job runner and `/health` against the PostgreSQL queue.
//! Requires a PostgreSQL `DATABASE_URL`.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use koi_api::background::DeferredJobRunner;
use koi_api::config::JobConfig;
use koi_api::services::promotion::create_promotion;
use koi_api::state::AppState;
use koi_core::otp::{self, OtpStore, OtpSubject};
use koi_core::status::PromotionStatus;
use koi_db::models::promotion::CreatePromotion;
use koi_db::repositories::{DeferredJobRepo, PromotionRepo};
use sqlx::PgPool;
use uuid::Uuid;

fn state(pool: PgPool) -> AppState {
    AppState::new(
        pool,
        common::test_config(),
        Arc::new(common::CapturingNotifier::default()),
    )
}

#[sqlx::test(migrations = "../db/migrations")]
async fn promotion_moves_through_its_window(pool: PgPool) {
    let state = state(pool.clone());
    let now = Utc::now();

    let promotion = create_promotion(
        &state,
        &CreatePromotion {
            name: "Summer koi".into(),
            code: "SUMMERKOI".into(),
            description: None,
            discount: 15,
            start_at: now + Duration::hours(1),
            expired_at: now + Duration::hours(2),
        },
    )
    .await
    .unwrap();
    assert_eq!(promotion.status, PromotionStatus::Pending);

    let runner = DeferredJobRunner::new(state.clone(), JobConfig::default());

    assert_eq!(runner.run_due(now).await.unwrap(), 0);

    assert_eq!(runner.run_due(now + Duration::minutes(90)).await.unwrap(), 1);
    let row = PromotionRepo::find_by_id(&pool, promotion.id).await.unwrap().unwrap();
    assert_eq!(row.status, PromotionStatus::Active);

    assert_eq!(runner.run_due(now + Duration::hours(3)).await.unwrap(), 1);
    let row = PromotionRepo::find_by_id(&pool, promotion.id).await.unwrap().unwrap();
    assert_eq!(row.status, PromotionStatus::Expired);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn expired_codes_are_purged(pool: PgPool) {
    let state = state(pool);
    let now = Utc::now();
    let contract_id = Uuid::new_v4();

    let code = otp::issue(
        state.otp_store.as_ref(),
        state.scheduler.as_ref(),
        OtpSubject::Contract,
        contract_id,
        Duration::minutes(5),
        now,
    )
    .await
    .unwrap();
    assert_eq!(code.len(), otp::OTP_DIGITS);

    let runner = DeferredJobRunner::new(state.clone(), JobConfig::default());
    assert_eq!(runner.run_due(now + Duration::minutes(6)).await.unwrap(), 1);

    let key = OtpSubject::Contract.key(contract_id);
    assert!(state.otp_store.get(&key).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn health_reports_the_job_backlog(pool: PgPool) {
    let app = common::build_test_app(pool.clone(), Arc::new(common::CapturingNotifier::default()));

    let response = common::get(&app, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = common::body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["db_healthy"], true);
    assert_eq!(json["deferred_jobs"]["pending"], 0);

    DeferredJobRepo::enqueue(&pool, "expire_otp", "doc:stuck", Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    let json = common::body_json(common::get(&app, "/health", None).await).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["deferred_jobs"]["overdue"], 1);
}
