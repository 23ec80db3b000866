use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use orderly_api::{app, AppState};
use orderly_catalog::{InMemoryCatalog, Product};
use orderly_core::{ClientError, NoopPublisher};
use orderly_order::{
    InMemoryOrderRepository, MockPaymentGateway, OrderManager, OrderManagerConfig,
    PaymentOrchestrator,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    repo: Arc<InMemoryOrderRepository>,
    catalog: Arc<InMemoryCatalog>,
    gateway: Arc<MockPaymentGateway>,
}

fn test_app() -> TestApp {
    let repo = Arc::new(InMemoryOrderRepository::new());
    let catalog = Arc::new(InMemoryCatalog::with_products([
        Product::new("A", "Keyboard", Decimal::from(10)),
        Product::new("B", "Monitor", Decimal::from(20)),
    ]));
    let gateway = Arc::new(MockPaymentGateway::new());

    let orders = Arc::new(OrderManager::new(
        repo.clone(),
        catalog.clone(),
        Arc::new(NoopPublisher),
        OrderManagerConfig::default(),
    ));
    let payments = Arc::new(PaymentOrchestrator::new(
        gateway.clone(),
        "usd",
        Duration::from_secs(1),
    ));

    TestApp {
        router: app(AppState::new(orders, payments)),
        repo,
        catalog,
        gateway,
    }
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

async fn create_sample_order(router: &Router) -> Value {
    let (status, body) = send(
        router,
        "POST",
        "/orders",
        Some(json!({ "items": [
            { "product_id": "A", "quantity": 2 },
            { "product_id": "B", "quantity": 1 }
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = send(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_order_lifecycle_end_to_end() {
    let app = test_app();

    let body = create_sample_order(&app.router).await;
    let order = &body["order"];
    assert_eq!(decimal(&order["total_amount"]), Decimal::from(40));
    assert_eq!(order["total_items"], 3);
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["lines"][0]["name"], "Keyboard");
    assert!(body["payment_session"]["url"].is_string());

    let id = order["id"].as_str().unwrap().to_string();
    assert_eq!(app.gateway.requests().await.len(), 1);

    let (status, paid) = send(
        &app.router,
        "POST",
        "/webhooks/payments",
        Some(json!({
            "orderId": id,
            "stripePaymentId": "ch_123",
            "receiptUrl": "https://pay.example/receipts/1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["duplicate"], false);
    assert_eq!(paid["order"]["status"], "PAID");
    assert_eq!(paid["order"]["paid"], true);
    assert_eq!(paid["order"]["payment_reference"], "ch_123");
    assert_eq!(paid["order"]["receipt"]["receipt_url"], "https://pay.example/receipts/1");

    let (status, fetched) = send(&app.router, "GET", &format!("/orders/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "PAID");
    assert!(fetched["paid_at"].is_string());
}

#[tokio::test]
async fn test_duplicate_payment_webhook_is_ignored() {
    let app = test_app();
    let id = create_sample_order(&app.router).await["order"]["id"].clone();

    let completion = json!({ "orderId": id, "stripePaymentId": "ch_1", "receiptUrl": "https://r/1" });
    send(&app.router, "POST", "/webhooks/payments", Some(completion)).await;
    let writes = app.repo.write_count();

    let retry = json!({ "orderId": id, "stripePaymentId": "ch_2", "receiptUrl": "https://r/2" });
    let (status, body) = send(&app.router, "POST", "/webhooks/payments", Some(retry)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["duplicate"], true);
    assert_eq!(body["order"]["payment_reference"], "ch_1");
    assert_eq!(app.repo.write_count(), writes);
}

#[tokio::test]
async fn test_unknown_product_is_bad_request() {
    let app = test_app();
    let (status, body) = send(
        &app.router,
        "POST",
        "/orders",
        Some(json!({ "items": [{ "product_id": "Z", "quantity": 1 }] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
    assert!(body["error"].as_str().unwrap().contains("Z"));
    assert!(app.repo.is_empty().await);
}

#[tokio::test]
async fn test_invalid_payloads_never_reach_the_store() {
    let app = test_app();

    let (status, _) = send(&app.router, "POST", "/orders", Some(json!({ "items": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        "POST",
        "/orders",
        Some(json!({ "items": [{ "product_id": "A", "quantity": 0 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app.router, "POST", "/orders", Some(json!({ "nope": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    assert_eq!(app.catalog.call_count(), 0);
    assert_eq!(app.repo.write_count(), 0);
}

#[tokio::test]
async fn test_missing_order_is_not_found() {
    let app = test_app();
    let id = uuid::Uuid::new_v4();
    let (status, body) = send(&app.router, "GET", &format!("/orders/{}", id), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("Order with id: {} not found", id));

    let (status, _) = send(&app.router, "GET", "/orders/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lookup_uses_current_names_and_frozen_prices() {
    let app = test_app();
    let id = create_sample_order(&app.router).await["order"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    app.catalog.rename("A", "Mechanical Keyboard").await;
    app.catalog.set_price("A", Decimal::from(99)).await;

    let (_, order) = send(&app.router, "GET", &format!("/orders/{}", id), None).await;
    assert_eq!(order["lines"][0]["name"], "Mechanical Keyboard");
    assert_eq!(decimal(&order["lines"][0]["price"]), Decimal::from(10));
    assert_eq!(decimal(&order["total_amount"]), Decimal::from(40));
}

#[tokio::test]
async fn test_status_changes() {
    let app = test_app();
    let id = create_sample_order(&app.router).await["order"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let uri = format!("/orders/{}/status", id);

    let writes = app.repo.write_count();
    let (status, body) = send(&app.router, "PATCH", &uri, Some(json!({ "status": "PENDING" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PENDING");
    assert_eq!(app.repo.write_count(), writes);

    let (status, body) = send(&app.router, "PATCH", &uri, Some(json!({ "status": "CANCELLED" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");

    let (status, body) = send(&app.router, "PATCH", &uri, Some(json!({ "status": "PENDING" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let (status, _) = send(&app.router, "PATCH", &uri, Some(json!({ "status": "SHIPPED" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_listing_pages_and_filters() {
    let app = test_app();
    for _ in 0..25 {
        create_sample_order(&app.router).await;
    }

    let (status, page) = send(&app.router, "GET", "/orders?page=2&limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["data"].as_array().unwrap().len(), 10);
    assert_eq!(page["meta"]["total"], 25);
    assert_eq!(page["meta"]["page"], 2);
    assert_eq!(page["meta"]["last_page"], 3);

    let (_, page) = send(&app.router, "GET", "/orders", None).await;
    assert_eq!(page["meta"]["page"], 1);
    assert_eq!(page["data"].as_array().unwrap().len(), 10);

    let (_, page) = send(&app.router, "GET", "/orders?status=DELIVERED", None).await;
    assert_eq!(page["meta"]["total"], 0);
    assert_eq!(page["meta"]["last_page"], 0);

    let (status, _) = send(&app.router, "GET", "/orders?page=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app.router, "GET", "/orders?limit=500", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_payment_gateway_failure_keeps_order_pending() {
    let app = test_app();
    app.gateway
        .fail_with(Some(ClientError::Transport {
            service: "payment",
            message: "connection refused".to_string(),
        }))
        .await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/orders",
        Some(json!({ "items": [{ "product_id": "A", "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "payment");

    let (_, page) = send(&app.router, "GET", "/orders", None).await;
    assert_eq!(page["meta"]["total"], 1);
    let id = page["data"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(page["data"][0]["status"], "PENDING");

    app.gateway.fail_with(None).await;
    let (status, session) = send(
        &app.router,
        "POST",
        &format!("/orders/{}/payment-session", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["orderId"], id.as_str());
}

#[tokio::test]
async fn test_paid_order_gets_no_new_session() {
    let app = test_app();
    let id = create_sample_order(&app.router).await["order"]["id"].clone();
    send(
        &app.router,
        "POST",
        "/webhooks/payments",
        Some(json!({ "orderId": id, "externalChargeId": "ch_9", "receiptUrl": "https://r/9" })),
    )
    .await;

    let uri = format!("/orders/{}/payment-session", id.as_str().unwrap());
    let (status, body) = send(&app.router, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn test_quantity_overflow_is_bad_request() {
    let app = test_app();
    let (status, body) = send(
        &app.router,
        "POST",
        "/orders",
        Some(json!({ "items": [
            { "product_id": "A", "quantity": 4294967295u64 },
            { "product_id": "A", "quantity": 2 }
        ]})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
    assert!(app.repo.is_empty().await);
}

#[tokio::test]
async fn test_cancelled_order_cannot_be_paid() {
    let app = test_app();
    let id = create_sample_order(&app.router).await["order"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let (status, _) = send(
        &app.router,
        "PATCH",
        &format!("/orders/{}/status", id),
        Some(json!({ "status": "CANCELLED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app.router,
        "POST",
        &format!("/orders/{}/payment-session", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
    assert_eq!(app.gateway.requests().await.len(), 1);

    let (status, body) = send(
        &app.router,
        "POST",
        "/webhooks/payments",
        Some(json!({ "orderId": id, "stripePaymentId": "ch_late", "receiptUrl": "https://r/late" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let (_, order) = send(&app.router, "GET", &format!("/orders/{}", id), None).await;
    assert_eq!(order["status"], "CANCELLED");
    assert_eq!(order["paid"], false);
}
