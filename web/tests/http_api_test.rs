//! HTTP API tests against the in-memory store and mock provider.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use atelier_core::{Coordinator, Currency, Item, ProviderError, SessionId};
use atelier_testing::{InMemoryContentStore, MockPaymentProvider, test_clock};
use atelier_web::{AppState, build_router};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

// ============================================================================
// Test Fixtures
// ============================================================================

struct TestApp {
    router: Router,
    store: InMemoryContentStore,
    provider: MockPaymentProvider,
}

fn app() -> TestApp {
    let store = InMemoryContentStore::with_items([
        Item::new("p1", "Blue Frog", 45_000, Currency::default())
            .with_medium("Acrylic on Canvas")
            .with_dimensions("24x36"),
        Item::new("p2", "Yellow Frog", 45_000, Currency::default())
            .with_medium("Acrylic on Canvas")
            .sold_elsewhere(),
        Item::new("p3", "Comfort In Change", 120_000, Currency::default()).with_medium("Oil"),
    ]);
    let provider = MockPaymentProvider::new();
    let coordinator = Coordinator::new(
        Arc::new(store.clone()),
        Arc::new(provider.clone()),
        Arc::new(test_clock()),
    );

    TestApp {
        router: build_router(AppState::new(coordinator), &[]),
        store,
        provider,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_checkout(router: &Router, body: &Value) -> (StatusCode, Value) {
    send(
        router,
        Request::post("/checkout")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

fn cart(ids: &[&str]) -> Value {
    json!({
        "lineItems": [{"title": "Blue Frog", "unitAmount": 1, "currency": "cad", "quantity": 1}],
        "buyerEmail": "a@b.com",
        "buyerName": "Ada",
        "itemIds": ids,
    })
}

// ============================================================================
// POST /checkout
// ============================================================================

#[tokio::test]
async fn test_checkout_returns_client_secret() {
    let app = app();

    let (status, body) = post_checkout(&app.router, &cart(&["p1"])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clientSecret"], "cs_test_1_secret_1");

    // Client line items are ignored; the catalog price is charged.
    let sent = app.provider.created_requests();
    assert_eq!(sent[0].line_items[0].unit_amount, 45_000);
    assert!(!app.store.item("p1").unwrap().sold);
}

#[tokio::test]
async fn test_checkout_invalid_email_is_422() {
    let app = app();
    let mut body = cart(&["p1"]);
    body["buyerEmail"] = json!("not-an-email");

    let (status, body) = post_checkout(&app.router, &body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"]["field"], "buyerEmail");
    assert_eq!(app.provider.create_calls(), 0);
}

#[tokio::test]
async fn test_checkout_missing_items_is_422() {
    let app = app();

    let (status, body) = post_checkout(&app.router, &json!({"buyerEmail": "a@b.com"})).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"]["field"], "itemIds");
}

#[tokio::test]
async fn test_checkout_sold_item_is_409() {
    let app = app();

    let (status, body) = post_checkout(&app.router, &cart(&["p1", "p2"])).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_SOLD");
    assert_eq!(body["details"]["itemId"], "p2");
    assert!(body["error"].as_str().unwrap().contains("Yellow Frog"));
    assert_eq!(app.provider.create_calls(), 0);
}

#[tokio::test]
async fn test_checkout_unknown_item_is_404() {
    let app = app();

    let (status, body) = post_checkout(&app.router, &cart(&["nope"])).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_checkout_provider_failure_is_502() {
    let app = app();
    app.provider
        .fail_creates(ProviderError::RequestFailed("connection reset".to_string()));

    let (status, body) = post_checkout(&app.router, &cart(&["p1"])).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "PAYMENT_PROVIDER_ERROR");
    assert!(!body["error"].as_str().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_checkout_store_outage_is_503() {
    let app = app();
    app.store.fail_reads(true);

    let (status, _) = post_checkout(&app.router, &cart(&["p1"])).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ============================================================================
// GET /session-status
// ============================================================================

#[tokio::test]
async fn test_session_status_requires_session_id() {
    let app = app();

    let (status, body) = get(&app.router, "/session-status").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing session_id parameter");

    let (status, _) = get(&app.router, "/session-status?session_id=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_status_unpaid_does_not_mark() {
    let app = app();
    post_checkout(&app.router, &cart(&["p1"])).await;

    let (status, body) = get(&app.router, "/session-status?session_id=cs_test_1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], false);
    assert_eq!(body["state"], "UNVERIFIED");
    assert_eq!(body["status"], "open");
    assert_eq!(body["paymentStatus"], "unpaid");
    assert!(!app.store.item("p1").unwrap().sold);
}

#[tokio::test]
async fn test_session_status_paid_marks_sold_once() {
    let app = app();
    post_checkout(&app.router, &cart(&["p1", "p3"])).await;
    app.provider.settle(&SessionId::new("cs_test_1"));

    let (status, body) = get(&app.router, "/session-status?session_id=cs_test_1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);
    assert_eq!(body["state"], "VERIFIED_MARKED");
    assert_eq!(body["paymentIntentStatus"], "succeeded");
    assert_eq!(body["buyerEmail"], "a@b.com");
    assert_eq!(body["buyerName"], "Ada");
    assert_eq!(body["itemIds"], json!(["p1", "p3"]));
    assert_eq!(body["markedItemIds"], json!(["p1", "p3"]));
    assert_eq!(body["markingFailures"], json!([]));
    assert!(app.store.item("p1").unwrap().sold);
    assert!(app.store.item("p3").unwrap().sold);

    // The success page may poll again.
    let (status, body) = get(&app.router, "/session-status?session_id=cs_test_1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["markedItemIds"], json!([]));
    assert_eq!(body["alreadyMarked"], json!(["p1", "p3"]));
    assert_eq!(app.store.cas_applied(), 2);
}

#[tokio::test]
async fn test_session_status_reports_lost_race() {
    let app = app();
    post_checkout(&app.router, &cart(&["p1"])).await;
    post_checkout(&app.router, &cart(&["p1"])).await;
    app.provider.settle(&SessionId::new("cs_test_1"));
    app.provider.settle(&SessionId::new("cs_test_2"));

    let (_, first) = get(&app.router, "/session-status?session_id=cs_test_1").await;
    let (status, second) = get(&app.router, "/session-status?session_id=cs_test_2").await;

    assert_eq!(first["markedItemIds"], json!(["p1"]));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["verified"], true);
    assert_eq!(second["markingFailures"][0]["item_id"], "p1");
    assert_eq!(second["markingFailures"][0]["reason"], "sold_to_another_buyer");
}

#[tokio::test]
async fn test_session_status_unknown_session_is_502() {
    let app = app();

    let (status, body) = get(&app.router, "/session-status?session_id=cs_missing").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "PAYMENT_PROVIDER_ERROR");
}

#[tokio::test]
async fn test_session_status_provider_timeout_is_502() {
    let app = app();
    post_checkout(&app.router, &cart(&["p1"])).await;
    app.provider.settle(&SessionId::new("cs_test_1"));
    app.provider
        .fail_retrieves(ProviderError::RequestFailed("operation timed out".to_string()));

    let (status, body) = get(&app.router, "/session-status?session_id=cs_test_1").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "PAYMENT_PROVIDER_ERROR");
    assert!(!body["error"].as_str().unwrap().contains("timed out"));
    assert!(!app.store.item("p1").unwrap().sold);
}

#[tokio::test]
async fn test_session_status_rejects_malformed_session_id() {
    let app = app();

    for uri in [
        "/session-status?session_id=cs_x%2F..%2F..%2Fcustomers%2Fcus_victim",
        "/session-status?session_id=cs_1%3Fexpand%5B%5D%3Dcustomer",
        "/session-status?session_id=cs_1%23frag",
        "/session-status?session_id=..",
    ] {
        let (status, body) = get(&app.router, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "Invalid session_id parameter");
    }

    assert_eq!(app.provider.retrieve_calls(), 0);
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_list_artworks_ordered_by_title() {
    let app = app();

    let (status, body) = get(&app.router, "/artworks").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    let titles: Vec<&str> = body["artworks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Blue Frog", "Comfort In Change", "Yellow Frog"]);
}

#[tokio::test]
async fn test_list_artworks_filters() {
    let app = app();

    let (_, body) = get(
        &app.router,
        "/artworks?medium=acrylic%20on%20canvas&availability=available",
    )
    .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["artworks"][0]["id"], "p1");

    let (_, body) = get(&app.router, "/artworks?availability=sold&size=").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["artworks"][0]["id"], "p2");

    let (status, _) = get(&app.router, "/artworks?availability=reserved").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_artwork_hides_buyer_details() {
    let app = app();
    post_checkout(&app.router, &cart(&["p1"])).await;
    app.provider.settle(&SessionId::new("cs_test_1"));
    get(&app.router, "/session-status?session_id=cs_test_1").await;

    let (status, body) = get(&app.router, "/artworks/p1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sold"], true);
    assert_eq!(body["priceMinorUnits"], 45_000);
    assert!(body.get("soldToEmail").is_none());
    assert!(!body.to_string().contains("a@b.com"));
}

#[tokio::test]
async fn test_get_unknown_artwork_is_404() {
    let app = app();

    let (status, body) = get(&app.router, "/artworks/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Artwork with id nope not found");
}

// ============================================================================
// Health and request ids
// ============================================================================

#[tokio::test]
async fn test_health_and_readiness() {
    let app = app();

    let (status, body) = get(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let (status, body) = get(&app.router, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);

    app.store.fail_reads(true);
    let (status, body) = get(&app.router, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);
}

#[tokio::test]
async fn test_request_id_is_generated_and_propagated() {
    let app = app();

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let generated = response.headers().get("x-request-id").unwrap();
    assert!(!generated.is_empty());

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
}
