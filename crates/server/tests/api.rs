use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;

const MANAGER: [(&str, &str); 4] = [
    ("x-actor-id", "m-ana"),
    ("x-actor-name", "Ana"),
    ("x-actor-role", "manager"),
    ("x-company-id", "acme"),
];

const OPS: [(&str, &str); 4] = [
    ("x-actor-id", "ops-1"),
    ("x-actor-name", "Operations"),
    ("x-actor-role", "super_admin"),
    ("x-company-id", "central"),
];

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    server::router(Arc::new(engine))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn transition(app: &Router, headers: &[(&str, &str)], id: &str, body: Value) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        &format!("/budgets/{id}/transitions"),
        headers,
        Some(body),
    )
    .await
}

/// Cost center with 10_000 allocated and a manager budget worth 3 x 1_000
/// waiting for approval. Returns (cost center id, budget id).
async fn awaiting_approval(app: &Router) -> (String, String) {
    let (status, cc) = call(
        app,
        Method::POST,
        "/cost-centers",
        &OPS,
        Some(json!({
            "company_id": "acme",
            "name": "Marketing",
            "code": "MKT",
            "opening_allocation": 10_000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let cc_id = cc["id"].as_str().unwrap().to_string();

    let (status, budget) = call(
        app,
        Method::POST,
        "/budgets",
        &MANAGER,
        Some(json!({
            "title": "Welcome kits",
            "cost_center_id": cc_id,
            "items": [{ "base_product_id": "mug", "qty": 3, "unit_price": 1_000 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(budget["status"], "draft");
    assert_eq!(budget["total_cash"], 3_000);
    let id = budget["id"].as_str().unwrap().to_string();

    let (status, _) = transition(app, &MANAGER, &id, json!({ "operation": "submit" })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, opened) = call(app, Method::POST, &format!("/budgets/{id}/open"), &OPS, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(opened["status"], "reviewed");
    let (status, _) = transition(app, &OPS, &id, json!({ "operation": "send_final_values" })).await;
    assert_eq!(status, StatusCode::OK);

    (cc_id, id)
}

#[tokio::test]
async fn requests_without_actor_headers_are_unauthorized() {
    let app = app().await;

    let (status, _) = call(&app, Method::GET, "/budgets", &[], None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut bad_role = MANAGER;
    bad_role[2] = ("x-actor-role", "intern");
    let (status, _) = call(&app, Method::GET, "/budgets", &bad_role, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, Method::GET, "/budgets", &MANAGER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn approval_books_the_expense() {
    let app = app().await;
    let (cc_id, id) = awaiting_approval(&app).await;

    let (status, outcome) =
        transition(&app, &MANAGER, &id, json!({ "operation": "approve_values" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["budget"]["status"], "approved");
    assert_eq!(outcome["ledger_entry"]["kind"], "expense");
    assert_eq!(outcome["ledger_entry"]["amount_minor"], 3_000);

    let (_, cc) = call(&app, Method::GET, &format!("/cost-centers/{cc_id}"), &MANAGER, None).await;
    assert_eq!(cc["used_budget"], 3_000);
    assert_eq!(cc["available_budget"], 7_000);

    let (status, body) =
        transition(&app, &MANAGER, &id, json!({ "operation": "approve_values" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("approve_values"));

    let (_, log) = call(
        &app,
        Method::GET,
        &format!("/cost-centers/{cc_id}/transactions"),
        &OPS,
        None,
    )
    .await;
    assert_eq!(log.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_operations_and_missing_reasons_are_unprocessable() {
    let app = app().await;
    let (_, id) = awaiting_approval(&app).await;

    let (status, _) = transition(&app, &OPS, &id, json!({ "operation": "approve" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = transition(&app, &OPS, &id, json!({ "operation": "reject" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, outcome) = transition(
        &app,
        &OPS,
        &id,
        json!({ "operation": "reject", "reason": "supplier closed" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["budget"]["status"], "rejected");
}

#[tokio::test]
async fn ledger_writes_are_forbidden_to_managers() {
    let app = app().await;
    let (cc_id, _) = awaiting_approval(&app).await;

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/cost-centers/{cc_id}/allocations"),
        &MANAGER,
        Some(json!({ "amount_minor": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, entry) = call(
        &app,
        Method::POST,
        &format!("/cost-centers/{cc_id}/adjustments"),
        &OPS,
        Some(json!({ "kind": "increase_used", "amount_minor": 250, "description": "Courier" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["adjustment"], "increase_used");

    let (status, balances) = call(
        &app,
        Method::POST,
        &format!("/cost-centers/{cc_id}/recompute"),
        &OPS,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balances["used"], 250);
    assert_eq!(balances["available"], 9_750);
}

#[tokio::test]
async fn missing_and_foreign_budgets_are_not_found() {
    let app = app().await;
    let (_, id) = awaiting_approval(&app).await;

    let missing = uuid::Uuid::new_v4();
    let (status, _) = call(&app, Method::GET, &format!("/budgets/{missing}"), &MANAGER, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut outsider = MANAGER;
    outsider[3] = ("x-company-id", "globex");
    let (status, _) = call(&app, Method::GET, &format!("/budgets/{id}"), &outsider, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn message_thread_tracks_unread_per_role() {
    let app = app().await;
    let (_, id) = awaiting_approval(&app).await;
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/budgets/{id}/messages"),
        &OPS,
        Some(json!({ "message": "Final prices are in." })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let unread = format!("/budgets/{id}/messages/unread?role=manager");
    let (_, count) = call(&app, Method::GET, &unread, &MANAGER, None).await;
    assert_eq!(count["unread"], 1);

    let (status, marked) = call(
        &app,
        Method::POST,
        &format!("/budgets/{id}/messages/read"),
        &MANAGER,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["marked"], 1);
    let (_, count) = call(&app, Method::GET, &unread, &MANAGER, None).await;
    assert_eq!(count["unread"], 0);

    let (_, thread) = call(&app, Method::GET, &format!("/budgets/{id}/messages"), &OPS, None).await;
    assert_eq!(thread[0]["sender_role"], "super_admin");
}
