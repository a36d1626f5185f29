//! Request rejections that happen before any database work: missing or
//! malformed tokens, role checks, unknown routes, body validation and
//! unsigned gateway callbacks.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_offline_app, get, post_json, send, token_for};
use koi_core::roles::{ROLE_CONSTRUCTOR, ROLE_CUSTOMER, ROLE_DESIGNER};
use uuid::Uuid;

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = build_offline_app();

    let response = get(&app, "/api/v1/projects", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
    assert_eq!(json["error"], "Missing Authorization header");
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let app = build_offline_app();

    let response = get(&app, "/api/v1/auth/me", Some("not-a-jwt")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid or expired token");
}

#[tokio::test]
async fn customer_cannot_create_promotions() {
    let app = build_offline_app();
    let token = token_for(Uuid::new_v4(), ROLE_CUSTOMER);

    let response = post_json(
        &app,
        "/api/v1/promotions",
        Some(&token),
        serde_json::json!({ "name": "Spring", "code": "SPRING", "discount": 10 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");
}

#[tokio::test]
async fn designer_cannot_confirm_tasks() {
    let app = build_offline_app();
    let token = token_for(Uuid::new_v4(), ROLE_DESIGNER);

    let uri = format!("/api/v1/construction-tasks/{}/confirm", Uuid::new_v4());
    let response = send(&app, "POST", &uri, Some(&token), None).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn constructor_cannot_create_construction_items() {
    let app = build_offline_app();
    let token = token_for(Uuid::new_v4(), ROLE_CONSTRUCTOR);

    let uri = format!("/api/v1/projects/{}/construction-items", Uuid::new_v4());
    let response = post_json(&app, &uri, Some(&token), serde_json::json!([])).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = build_offline_app();

    let response = get(&app, "/api/v1/ponds", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "No route for GET /api/v1/ponds");
}

#[tokio::test]
async fn request_id_from_the_client_is_echoed() {
    let app = build_offline_app();
    let request = axum::http::Request::builder()
        .uri("/api/v1/ponds")
        .header("x-request-id", "vnpay-return-42")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "vnpay-return-42");
}

#[tokio::test]
async fn register_rejects_invalid_email() {
    let app = build_offline_app();

    let response = post_json(
        &app,
        "/api/v1/auth/register",
        None,
        serde_json::json!({
            "full_name": "Lan Tran",
            "email": "not-an-email",
            "password": "pond-password-1",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn callback_without_signature_is_rejected() {
    let app = build_offline_app();

    let response = get(
        &app,
        "/api/v1/payments/vnpay/callback?vnp_TxnRef=abc&vnp_Amount=100&vnp_ResponseCode=00",
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Missing vnp_SecureHash");
}

#[tokio::test]
async fn callback_with_forged_signature_is_forbidden() {
    let app = build_offline_app();

    let response = get(
        &app,
        "/api/v1/payments/vnpay/callback?vnp_TxnRef=abc&vnp_Amount=100&vnp_ResponseCode=00&vnp_SecureHash=deadbeef",
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "Invalid VNPAY signature");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = build_offline_app();

    let response = get(&app, "/api/v1/ponds", None).await;

    assert!(response.headers().contains_key("x-request-id"));
}
