//! End-to-end project workflow over HTTP: quotation review, contract
//! confirmation by OTP, construction completion cascade and VNPAY callbacks.
//!
//! Requires a PostgreSQL `DATABASE_URL`.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::Router;
use chrono::Utc;
use common::{body_json, build_test_app, get, post_json, seed_user, send, CapturingNotifier};
use koi_core::roles::{ROLE_CONSTRUCTOR, ROLE_CONSULTANT, ROLE_CUSTOMER, ROLE_MANAGER};
use koi_core::vnpay::{canonical_query, sign, txn_ref_for};
use koi_db::models::user::User;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

struct Pond {
    app: Router,
    notifier: Arc<CapturingNotifier>,
    customer: User,
    customer_token: String,
    manager_token: String,
    consultant: User,
    consultant_token: String,
    constructor: User,
    constructor_token: String,
    project_id: String,
}

fn id_of(json: &Value) -> String {
    json["data"]["id"].as_str().expect("id").to_string()
}

/// A project in CONSTRUCTING with a consultant and a constructor assigned.
async fn constructing_project(pool: PgPool) -> Pond {
    let notifier = Arc::new(CapturingNotifier::default());
    let app = build_test_app(pool.clone(), Arc::clone(&notifier));

    let (customer, customer_token) = seed_user(&pool, "Lan Tran", ROLE_CUSTOMER).await;
    let (_, manager_token) = seed_user(&pool, "Minh Manager", ROLE_MANAGER).await;
    let (consultant, consultant_token) = seed_user(&pool, "Hoa Consultant", ROLE_CONSULTANT).await;
    let (constructor, constructor_token) = seed_user(&pool, "Bao Builder", ROLE_CONSTRUCTOR).await;

    let response = post_json(
        &app,
        "/api/v1/projects",
        Some(&customer_token),
        json!({ "name": "Backyard koi pond", "address": "12 Lotus Lane", "area": 24.5 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let project = body_json(response).await;
    assert_eq!(project["data"]["status"], "REQUESTING");
    let project_id = id_of(&project);

    let staff_uri = format!("/api/v1/projects/{project_id}/staff");
    let response = post_json(
        &app,
        &staff_uri,
        Some(&manager_token),
        json!({ "staff_id": consultant.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "PROCESSING");

    let response = post_json(
        &app,
        &staff_uri,
        Some(&manager_token),
        json!({ "staff_id": constructor.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let status_uri = format!("/api/v1/projects/{project_id}/status");
    for next in ["DESIGNING", "CONSTRUCTING"] {
        let response = send(
            &app,
            "PUT",
            &status_uri,
            Some(&manager_token),
            Some(json!({ "status": next })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["status"], next);
    }

    Pond {
        app,
        notifier,
        customer,
        customer_token,
        manager_token,
        consultant,
        consultant_token,
        constructor,
        constructor_token,
        project_id,
    }
}

/// Approve a quotation and open a contract for it. Returns the contract JSON.
async fn open_contract(pond: &Pond, total_price: i64) -> Value {
    let response = post_json(
        &pond.app,
        &format!("/api/v1/projects/{}/quotations", pond.project_id),
        Some(&pond.consultant_token),
        json!({ "total_price": total_price }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let quotation = body_json(response).await;
    assert_eq!(quotation["data"]["status"], "PREVIEWING");
    let quotation_id = id_of(&quotation);

    let response = send(
        &pond.app,
        "POST",
        &format!("/api/v1/quotations/{quotation_id}/approve"),
        Some(&pond.customer_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "APPROVED");

    let response = post_json(
        &pond.app,
        &format!("/api/v1/projects/{}/contracts", pond.project_id),
        Some(&pond.consultant_token),
        json!({
            "quotation_id": quotation_id,
            "name": "Koi pond construction",
            "customer_name": "Lan Tran",
            "url": "https://docs.koi.test/contracts/pond.pdf",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn confirm_contract(pond: &Pond, contract_id: &str) {
    let response = send(
        &pond.app,
        "POST",
        &format!("/api/v1/contracts/{contract_id}/otp"),
        Some(&pond.customer_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let code = pond
        .notifier
        .last_code_for(&pond.customer.email)
        .expect("code delivered to the customer");
    let response = post_json(
        &pond.app,
        &format!("/api/v1/contracts/{contract_id}/verify"),
        Some(&pond.customer_token),
        json!({ "code": code }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "ACTIVE");
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn contract_is_confirmed_once_by_otp(pool: PgPool) {
    let pond = constructing_project(pool).await;

    let contract = open_contract(&pond, 100_000_000).await;
    assert_eq!(contract["data"]["status"], "PROCESSING");
    assert_eq!(contract["data"]["batches"].as_array().unwrap().len(), 4);
    let contract_id = id_of(&contract);

    let response = post_json(
        &pond.app,
        &format!("/api/v1/contracts/{contract_id}/verify"),
        Some(&pond.customer_token),
        json!({ "code": "0000" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND, "no code was issued yet");

    confirm_contract(&pond, &contract_id).await;

    let response = send(
        &pond.app,
        "POST",
        &format!("/api/v1/contracts/{contract_id}/otp"),
        Some(&pond.customer_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Contract is already confirmed"
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn oversized_quotation_price_is_rejected(pool: PgPool) {
    let pond = constructing_project(pool).await;

    let response = post_json(
        &pond.app,
        &format!("/api/v1/projects/{}/quotations", pond.project_id),
        Some(&pond.consultant_token),
        json!({ "total_price": i64::MAX / 10 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn project_holds_one_open_contract(pool: PgPool) {
    let pond = constructing_project(pool).await;
    open_contract(&pond, 80_000_000).await;

    let response = post_json(
        &pond.app,
        &format!("/api/v1/projects/{}/quotations", pond.project_id),
        Some(&pond.consultant_token),
        json!({ "total_price": 90_000_000 }),
    )
    .await;
    let quotation_id = id_of(&body_json(response).await);
    send(
        &pond.app,
        "POST",
        &format!("/api/v1/quotations/{quotation_id}/approve"),
        Some(&pond.customer_token),
        None,
    )
    .await;

    let response = post_json(
        &pond.app,
        &format!("/api/v1/projects/{}/contracts", pond.project_id),
        Some(&pond.consultant_token),
        json!({
            "quotation_id": quotation_id,
            "name": "Second contract",
            "customer_name": "Lan Tran",
            "url": "https://docs.koi.test/contracts/second.pdf",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn cancelling_requires_a_reason(pool: PgPool) {
    let pond = constructing_project(pool).await;
    let contract_id = id_of(&open_contract(&pond, 50_000_000).await);
    let uri = format!("/api/v1/contracts/{contract_id}/cancel");

    let response = post_json(&pond.app, &uri, Some(&pond.customer_token), json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &pond.app,
        &uri,
        Some(&pond.customer_token),
        json!({ "reason": "Budget moved to next year" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "CANCELLED");
    assert_eq!(json["data"]["note"], "Budget moved to next year");
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn confirming_the_last_task_completes_the_tree(pool: PgPool) {
    let pond = constructing_project(pool).await;

    let response = post_json(
        &pond.app,
        &format!("/api/v1/projects/{}/construction-items", pond.project_id),
        Some(&pond.manager_token),
        json!([{ "name": "Excavation", "children": [{ "name": "Dig basin" }] }]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let tree = body_json(response).await;
    let child_id = tree["data"][0]["children"][0]["id"].as_str().unwrap().to_string();

    let response = post_json(
        &pond.app,
        &format!("/api/v1/construction-items/{child_id}/tasks"),
        Some(&pond.manager_token),
        json!([{ "name": "Dig to 1.2 m" }]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let task_id = body_json(response).await["data"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let task_uri = format!("/api/v1/construction-tasks/{task_id}");

    let response = send(
        &pond.app,
        "PATCH",
        &task_uri,
        Some(&pond.manager_token),
        Some(json!({ "staff_id": pond.constructor.id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "PROCESSING");

    let response = send(
        &pond.app,
        "PATCH",
        &task_uri,
        Some(&pond.constructor_token),
        Some(json!({ "image_url": "https://img.koi.test/basin.jpg" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "PREVIEWING");

    let response = send(
        &pond.app,
        "POST",
        &format!("{task_uri}/confirm"),
        Some(&pond.manager_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "DONE");

    let response = get(
        &pond.app,
        &format!("/api/v1/projects/{}/construction-items", pond.project_id),
        Some(&pond.manager_token),
    )
    .await;
    let tree = body_json(response).await;
    assert_eq!(tree["data"][0]["status"], "DONE");
    assert_eq!(tree["data"][0]["children"][0]["status"], "DONE");

    let response = post_json(
        &pond.app,
        &format!("/api/v1/construction-items/{child_id}/tasks"),
        Some(&pond.manager_token),
        json!([{ "name": "Late addition" }]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn constructor_cannot_reassign_tasks(pool: PgPool) {
    let pond = constructing_project(pool).await;

    let response = post_json(
        &pond.app,
        &format!("/api/v1/projects/{}/construction-items", pond.project_id),
        Some(&pond.manager_token),
        json!([{ "name": "Filtration", "children": [{ "name": "Pump bay" }] }]),
    )
    .await;
    let tree = body_json(response).await;
    let child_id = tree["data"][0]["children"][0]["id"].as_str().unwrap().to_string();

    let response = post_json(
        &pond.app,
        &format!("/api/v1/construction-items/{child_id}/tasks"),
        Some(&pond.manager_token),
        json!([{ "name": "Install pump" }]),
    )
    .await;
    let task_id = body_json(response).await["data"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = send(
        &pond.app,
        "PATCH",
        &format!("/api/v1/construction-tasks/{task_id}"),
        Some(&pond.constructor_token),
        Some(json!({ "staff_id": pond.constructor.id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Create a level-1 item with one level-2 child. Returns the child id.
async fn new_child_item(pond: &Pond, root: &str, child: &str) -> String {
    let response = post_json(
        &pond.app,
        &format!("/api/v1/projects/{}/construction-items", pond.project_id),
        Some(&pond.manager_token),
        json!([{ "name": root, "children": [{ "name": child }] }]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let tree = body_json(response).await;
    assert_eq!(tree["data"][0]["status"], "OPENING");
    assert_eq!(tree["data"][0]["children"][0]["status"], "OPENING");
    tree["data"][0]["children"][0]["id"].as_str().unwrap().to_string()
}

async fn add_tasks(pond: &Pond, child_id: &str, names: &[&str]) -> Vec<String> {
    let body: Vec<Value> = names.iter().map(|n| json!({ "name": n })).collect();
    let response = post_json(
        &pond.app,
        &format!("/api/v1/construction-items/{child_id}/tasks"),
        Some(&pond.manager_token),
        Value::Array(body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect()
}

/// Statuses of the level-1 item named `root` and its first child.
async fn item_statuses(pond: &Pond, root: &str) -> (String, String) {
    let response = get(
        &pond.app,
        &format!("/api/v1/projects/{}/construction-items", pond.project_id),
        Some(&pond.manager_token),
    )
    .await;
    let tree = body_json(response).await;
    let node = tree["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["name"] == root)
        .expect("root item")
        .clone();
    (
        node["status"].as_str().unwrap().to_string(),
        node["children"][0]["status"].as_str().unwrap().to_string(),
    )
}

async fn patch_task(pond: &Pond, task_id: &str, token: &str, body: Value) -> StatusCode {
    send(
        &pond.app,
        "PATCH",
        &format!("/api/v1/construction-tasks/{task_id}"),
        Some(token),
        Some(body),
    )
    .await
    .status()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn adding_tasks_opens_the_item_and_its_parent(pool: PgPool) {
    let pond = constructing_project(pool).await;
    let child_id = new_child_item(&pond, "Finishing", "Walls").await;

    add_tasks(&pond, &child_id, &["Paint"]).await;
    let statuses = item_statuses(&pond, "Finishing").await;
    assert_eq!(statuses, ("PROCESSING".to_string(), "PROCESSING".to_string()));

    add_tasks(&pond, &child_id, &["Seal"]).await;
    assert_eq!(item_statuses(&pond, "Finishing").await, statuses);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn confirming_one_of_two_tasks_keeps_items_open(pool: PgPool) {
    let pond = constructing_project(pool).await;
    let child_id = new_child_item(&pond, "Planting", "Lotus shelf").await;
    let tasks = add_tasks(&pond, &child_id, &["Plant lotus", "Plant reeds"]).await;
    let first = &tasks[0];

    let status = patch_task(
        &pond,
        first,
        &pond.manager_token,
        json!({ "staff_id": pond.constructor.id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let status = patch_task(
        &pond,
        first,
        &pond.constructor_token,
        json!({ "image_url": "https://img.koi.test/lotus.jpg" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response = send(
        &pond.app,
        "POST",
        &format!("/api/v1/construction-tasks/{first}/confirm"),
        Some(&pond.manager_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "DONE");

    let (root, child) = item_statuses(&pond, "Planting").await;
    assert_ne!(root, "DONE");
    assert_ne!(child, "DONE");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn task_patches_are_validated(pool: PgPool) {
    let (outsider, _) = seed_user(&pool, "Vy Outsider", ROLE_CONSTRUCTOR).await;
    let pond = constructing_project(pool).await;
    let child_id = new_child_item(&pond, "Edging", "Stone rim").await;
    let task_id = add_tasks(&pond, &child_id, &["Lay stones"]).await.remove(0);
    let manager = pond.manager_token.clone();

    let status = patch_task(&pond, &task_id, &manager, json!({ "reason": "Uneven" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "reason without an image");

    let status = patch_task(&pond, &task_id, &manager, json!({ "staff_id": outsider.id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "staff outside the project");

    let status = patch_task(
        &pond,
        &task_id,
        &manager,
        json!({ "staff_id": pond.consultant.id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "member without the constructor role");

    let response = get(
        &pond.app,
        &format!("/api/v1/construction-tasks/{task_id}"),
        Some(&manager),
    )
    .await;
    let task = body_json(response).await;
    assert_eq!(task["data"]["status"], "OPENING");
    assert!(task["data"]["staff_id"].is_null());
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

fn signed_callback(batch_id: Uuid, amount: i64, response_code: &str) -> String {
    let mut params = BTreeMap::new();
    params.insert("vnp_Amount".to_string(), (amount * 100).to_string());
    params.insert("vnp_ResponseCode".to_string(), response_code.to_string());
    params.insert("vnp_TxnRef".to_string(), txn_ref_for(batch_id, Utc::now()));
    params.insert("vnp_TransactionNo".to_string(), "14012345".to_string());
    params.insert("vnp_BankCode".to_string(), "NCB".to_string());

    let query = canonical_query(&params);
    let hash = sign(common::TEST_VNPAY_SECRET, &query);
    format!("/api/v1/payments/vnpay/callback?{query}&vnp_SecureHash={hash}")
}

#[sqlx::test(migrations = "../db/migrations")]
async fn signed_callback_pays_the_batch_once(pool: PgPool) {
    let pond = constructing_project(pool).await;
    let contract_id = id_of(&open_contract(&pond, 120_000_000).await);
    confirm_contract(&pond, &contract_id).await;

    let response = get(
        &pond.app,
        &format!("/api/v1/contracts/{contract_id}/batches"),
        Some(&pond.customer_token),
    )
    .await;
    let batches = body_json(response).await;
    let batch = &batches["data"][0];
    let batch_id: Uuid = batch["id"].as_str().unwrap().parse().unwrap();
    let total = batch["total_value"].as_i64().unwrap();

    let response = post_json(
        &pond.app,
        "/api/v1/payments/vnpay",
        Some(&pond.customer_token),
        json!({ "batch_id": batch_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let redirect = body_json(response).await;
    assert!(redirect["data"]["payment_url"]
        .as_str()
        .unwrap()
        .contains("vnp_SecureHash="));

    let response = get(&pond.app, &signed_callback(batch_id, total + 1, "00"), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST, "amount mismatch");

    let response = get(&pond.app, &signed_callback(batch_id, total, "24"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["paid"], false);

    for _ in 0..2 {
        let response = get(&pond.app, &signed_callback(batch_id, total, "00"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["paid"], true);
    }

    let response = get(
        &pond.app,
        &format!("/api/v1/payments/batches/{batch_id}"),
        Some(&pond.customer_token),
    )
    .await;
    let payments = body_json(response).await;
    assert_eq!(payments["data"].as_array().unwrap().len(), 1);
}
