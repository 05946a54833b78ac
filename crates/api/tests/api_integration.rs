//! Integration tests for the API server.

use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use checkout::CheckoutConfig;
use domain::{AddressId, BuyerId, Money, NewAddress, NewProduct, ProductId, StoreId};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::{InMemoryStore, LockingStore, Session, StoreConfig, UnitOfWork};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    store: InMemoryStore,
    buyer: BuyerId,
    address: AddressId,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_store(InMemoryStore::new()).await
    }

    async fn with_store(store: InMemoryStore) -> Self {
        let buyer = BuyerId::new(1);
        let address = store.insert_address(NewAddress::new(buyer, "Home")).await.id;
        let state = api::create_state(store.clone(), CheckoutConfig::default());
        let app = api::create_app(state, get_metrics_handle());
        Self {
            app,
            store,
            buyer,
            address,
        }
    }

    async fn product(&self, name: &str, price_minor: i64, stock: u32) -> ProductId {
        self.store
            .insert_product(NewProduct::new(
                StoreId::new(1),
                name,
                Money::from_minor_units(price_minor),
                stock,
            ))
            .await
            .id
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    async fn checkout(&self, buyer: BuyerId, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .header("x-buyer-id", buyer.to_string())
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn get(&self, uri: &str, buyer: BuyerId) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .uri(uri)
                .header("x-buyer-id", buyer.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    fn cart(&self, items: Value) -> Value {
        json!({
            "address_id": self.address,
            "payment_method": "BANK_TRANSFER",
            "items": items,
        })
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let (status, json) = app
        .send(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_checkout_creates_order() {
    let app = TestApp::new().await;
    let product = app.product("Kopi Susu", 1_500_050, 5).await;

    let (status, json) = app
        .checkout(
            app.buyer,
            app.cart(json!([{ "product_id": product, "quantity": 2 }])),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["meta"]["status"], "success");
    assert_eq!(json["meta"]["code"], 201);
    assert_eq!(json["data"]["total"], 3_000_100);
    assert_eq!(json["data"]["buyer_id"], 1);
    assert_eq!(json["data"]["payment_method"], "BANK_TRANSFER");
    assert!(
        json["data"]["invoice_code"]
            .as_str()
            .unwrap()
            .starts_with("INV/1/")
    );
    assert_eq!(json["data"]["lines"][0]["quantity"], 2);
    assert_eq!(json["data"]["lines"][0]["snapshot"]["name"], "Kopi Susu");
    assert_eq!(app.store.stock_of(product).await, Some(3));
}

#[tokio::test]
async fn test_missing_buyer_header_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, json) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .body(Body::from(app.cart(json!([])).to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["meta"]["status"], "error");
    assert!(json["data"].is_null());
}

#[tokio::test]
async fn test_malformed_buyer_header_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send(
            Request::builder()
                .uri("/orders")
                .header("x-buyer-id", "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::new().await;

    let (status, json) = app
        .checkout(app.buyer, json!({ "address_id": "home" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["meta"]["code"], 400);
}

#[tokio::test]
async fn test_empty_cart_is_bad_request() {
    let app = TestApp::new().await;

    let (status, json) = app.checkout(app.buyer, app.cart(json!([]))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["meta"]["message"], "Invalid cart: cart is empty");
}

#[tokio::test]
async fn test_insufficient_stock_is_bad_request() {
    let app = TestApp::new().await;
    let product = app.product("productA", 1_000, 5).await;

    let (status, json) = app
        .checkout(
            app.buyer,
            app.cart(json!([{ "product_id": product, "quantity": 6 }])),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["meta"]["message"],
        "Stock for product 'productA' is not enough (remaining: 5)"
    );
    assert_eq!(app.store.stock_of(product).await, Some(5));
}

#[tokio::test]
async fn test_foreign_address_is_forbidden() {
    let app = TestApp::new().await;
    let product = app.product("productA", 1_000, 5).await;

    let (status, _) = app
        .checkout(
            BuyerId::new(2),
            app.cart(json!([{ "product_id": product, "quantity": 1 }])),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let app = TestApp::new().await;

    let (status, _) = app
        .checkout(
            app.buyer,
            app.cart(json!([{ "product_id": 4242, "quantity": 1 }])),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lock_timeout_is_retryable_service_unavailable() {
    let store =
        InMemoryStore::with_config(StoreConfig::with_lock_timeout(Duration::from_millis(50)));
    let app = TestApp::with_store(store).await;
    let product = app.product("productA", 1_000, 5).await;

    let mut holder = app.store.begin().await.unwrap();
    holder.lock_and_read(product).await.unwrap();

    let (status, json) = app
        .checkout(
            app.buyer,
            app.cart(json!([{ "product_id": product, "quantity": 1 }])),
        )
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["meta"]["retryable"], true);

    holder.abort().await.unwrap();
    assert_eq!(app.store.stock_of(product).await, Some(5));
}

#[tokio::test]
async fn test_commit_failure_is_server_error() {
    let app = TestApp::new().await;
    let product = app.product("productA", 1_000, 5).await;
    app.store.set_fail_on_commit(true);

    let (status, json) = app
        .checkout(
            app.buyer,
            app.cart(json!([{ "product_id": product, "quantity": 1 }])),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["meta"]["retryable"], true);
    assert_eq!(app.store.stock_of(product).await, Some(5));
}

#[tokio::test]
async fn test_list_and_get_orders() {
    let app = TestApp::new().await;
    let product = app.product("productA", 1_000, 10).await;

    let mut ids = Vec::new();
    for quantity in [1, 2] {
        let (status, json) = app
            .checkout(
                app.buyer,
                app.cart(json!([{ "product_id": product, "quantity": quantity }])),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(json["data"]["id"].as_i64().unwrap());
    }

    let (status, json) = app.get("/orders", app.buyer).await;
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_i64().unwrap())
        .collect();
    assert_eq!(listed, vec![ids[1], ids[0]]);

    let (status, json) = app.get(&format!("/orders/{}", ids[0]), app.buyer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total"], 1_000);
    assert_eq!(json["data"]["lines"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .get(&format!("/orders/{}", ids[0]), BuyerId::new(2))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = app.get("/orders", BuyerId::new(2)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_order_id_is_bad_request() {
    let app = TestApp::new().await;

    let (status, json) = app.get("/orders/latest", app.buyer).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["meta"]["message"], "invalid order id");
}

#[tokio::test]
async fn test_metrics_endpoint_reports_checkouts() {
    let app = TestApp::new().await;
    let product = app.product("productA", 1_000, 5).await;
    app.checkout(
        app.buyer,
        app.cart(json!([{ "product_id": product, "quantity": 1 }])),
    )
    .await;

    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("checkout_attempts_total"));
    assert!(text.contains("checkout_committed_total"));
}
