//! Router-level tests against an in-memory database.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use http_body_util::BodyExt;
use sea_orm::{ConnectionTrait, Database, Statement};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use crate::server::{ServerState, router};
use ledger::Ledger;
use migration::MigratorTrait;

const ADMIN: (&str, &str) = ("direttrice", "chiave");
const PARENT: (&str, &str) = ("carla", "password");

async fn test_state() -> ServerState {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for (username, password, role) in [
        (ADMIN.0, ADMIN.1, "admin"),
        (PARENT.0, PARENT.1, "parent"),
    ] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password, role) VALUES (?, ?, ?)",
            vec![username.into(), password.into(), role.into()],
        ))
        .await
        .unwrap();
    }

    let ledger = Ledger::builder().database(db.clone()).build();
    ledger.create_parent(PARENT.0).await.unwrap();

    ServerState {
        ledger: Arc::new(ledger),
        db,
    }
}

fn basic(credentials: (&str, &str)) -> String {
    format!(
        "Basic {}",
        BASE64.encode(format!("{}:{}", credentials.0, credentials.1))
    )
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    credentials: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(credentials) = credentials {
        builder = builder.header(header::AUTHORIZATION, basic(credentials));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
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
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn seed_student(app: &Router) -> String {
    let (status, student) = send(
        app,
        "POST",
        "/students",
        Some(ADMIN),
        Some(json!({
            "name": "Giulia",
            "grade": "3B",
            "dietary_notes": "no peanuts",
            "parent_id": PARENT.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    student["id"].as_str().unwrap().to_string()
}

async fn seed_menu_item(app: &Router, name: &str, price_minor: i64) -> String {
    let (status, item) = send(
        app,
        "POST",
        "/menu",
        Some(ADMIN),
        Some(json!({
            "name": name,
            "price_minor": price_minor,
            "category": "main",
            "stock": null,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    item["id"].as_str().unwrap().to_string()
}

async fn fund_parent(app: &Router, amount_minor: i64) {
    let (status, topup) = send(
        app,
        "POST",
        "/topups",
        Some(PARENT),
        Some(json!({ "amount_minor": amount_minor, "method": "cash", "reference": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = topup["id"].as_str().unwrap();
    let (status, applied) = send(
        app,
        "POST",
        &format!("/topups/{id}/approve"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(applied["status"], "completed");
}

#[tokio::test]
async fn requests_without_credentials_are_rejected() {
    let app = router(test_state().await);

    let (status, _) = send(&app, "GET", "/menu", None, None).await;
    assert!(status.is_client_error());

    let (status, _) = send(&app, "GET", "/menu", Some(("carla", "wrong")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn parents_cannot_touch_the_menu() {
    let app = router(test_state().await);

    let (status, _) = send(
        &app,
        "POST",
        "/menu",
        Some(PARENT),
        Some(json!({ "name": "Pasta", "price_minor": 450, "category": "main", "stock": null })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn parents_only_see_available_items() {
    let app = router(test_state().await);
    let id = seed_menu_item(&app, "Lasagne", 4500).await;
    seed_menu_item(&app, "Minestrone", 380).await;

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/menu/{id}"),
        Some(ADMIN),
        Some(json!({ "available": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, menu) = send(&app, "GET", "/menu", Some(PARENT), None).await;
    let items = menu["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Minestrone");

    let (_, menu) = send(&app, "GET", "/menu", Some(ADMIN), None).await;
    assert_eq!(menu["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn topup_approval_credits_the_wallet_once() {
    let app = router(test_state().await);

    let (status, topup) = send(
        &app,
        "POST",
        "/topups",
        Some(PARENT),
        Some(json!({ "amount_minor": 25_000, "method": "bank_transfer", "reference": "july" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(topup["status"], "pending");
    let id = topup["id"].as_str().unwrap().to_string();

    let (status, applied) = send(
        &app,
        "POST",
        &format!("/topups/{id}/approve"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(applied["status"], "completed");

    let (status, wallet) = send(&app, "GET", "/wallet", Some(PARENT), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(wallet["balance_minor"], 25_000);

    // A second approval of the same request must not credit again.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/topups/{id}/approve"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (_, wallet) = send(&app, "GET", "/wallet", Some(PARENT), None).await;
    assert_eq!(wallet["balance_minor"], 25_000);
}

#[tokio::test]
async fn order_flow_debits_wallet_and_shows_in_history() {
    let app = router(test_state().await);
    let student_id = seed_student(&app).await;
    let item_id = seed_menu_item(&app, "Lasagne", 4500).await;
    fund_parent(&app, 50_000).await;

    let (status, order) = send(
        &app,
        "POST",
        "/orders",
        Some(PARENT),
        Some(json!({
            "student_id": student_id,
            "lines": [{ "menu_item_id": item_id, "quantity": 2 }],
            "instructions": "no cheese",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["total_minor"], 9000);
    assert_eq!(order["status"], "pending");

    let (_, wallet) = send(&app, "GET", "/wallet", Some(PARENT), None).await;
    assert_eq!(wallet["balance_minor"], 41_000);

    let (status, history) = send(&app, "GET", "/wallet/transactions", Some(PARENT), None).await;
    assert_eq!(status, StatusCode::OK);
    let transactions = history["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0]["class"], "deduction");
    assert_eq!(transactions[0]["amount_minor"], -9000);
    assert_eq!(transactions[1]["class"], "topup");

    let (status, audit) = send(
        &app,
        "GET",
        &format!("/wallet/audit?parent_id={}", PARENT.0),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audit["consistent"], true);
}

#[tokio::test]
async fn insufficient_funds_surface_as_unprocessable() {
    let app = router(test_state().await);
    let student_id = seed_student(&app).await;
    let item_id = seed_menu_item(&app, "Lasagne", 4500).await;

    let (status, body) = send(
        &app,
        "POST",
        "/orders",
        Some(PARENT),
        Some(json!({
            "student_id": student_id,
            "lines": [{ "menu_item_id": item_id, "quantity": 1 }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Insufficient"));
}

#[tokio::test]
async fn deferred_orders_leave_the_balance_alone() {
    let app = router(test_state().await);
    let student_id = seed_student(&app).await;
    let item_id = seed_menu_item(&app, "Pasta al forno", 7500).await;
    fund_parent(&app, 20_000).await;

    let (status, _) = send(
        &app,
        "POST",
        "/orders",
        Some(PARENT),
        Some(json!({
            "student_id": student_id,
            "lines": [{ "menu_item_id": item_id, "quantity": 1 }],
            "deferred": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, wallet) = send(&app, "GET", "/wallet", Some(PARENT), None).await;
    assert_eq!(wallet["balance_minor"], 20_000);

    let (_, history) = send(&app, "GET", "/wallet/transactions", Some(PARENT), None).await;
    let transactions = history["transactions"].as_array().unwrap();
    assert_eq!(transactions[0]["class"], "pending_deferred");
    assert_eq!(transactions[0]["amount_minor"], 0);
}

#[tokio::test]
async fn wallets_are_private_to_their_parent() {
    let app = router(test_state().await);

    let (status, _) = send(
        &app,
        "GET",
        "/wallet?parent_id=somebody_else",
        Some(PARENT),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/wallet/audit", Some(PARENT), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admins_drive_the_order_status_machine() {
    let app = router(test_state().await);
    let student_id = seed_student(&app).await;
    let item_id = seed_menu_item(&app, "Minestrone", 380).await;
    fund_parent(&app, 1_000).await;

    let (_, order) = send(
        &app,
        "POST",
        "/orders",
        Some(PARENT),
        Some(json!({
            "student_id": student_id,
            "lines": [{ "menu_item_id": item_id, "quantity": 1 }],
        })),
    )
    .await;
    let order_id = order["id"].as_str().unwrap().to_string();

    // Parents may not move orders through the kitchen.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/status"),
        Some(PARENT),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Skipping ahead is rejected.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/status"),
        Some(ADMIN),
        Some(json!({ "status": "ready" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, updated) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/status"),
        Some(ADMIN),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "confirmed");
}
