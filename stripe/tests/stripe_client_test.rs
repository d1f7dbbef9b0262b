//! `StripeClient` against a mock Stripe API.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use atelier_core::error::ProviderError;
use atelier_core::payment::{PaymentProvider, RetrieveOptions};
use atelier_core::types::{
    CreateSessionRequest, Currency, Item, LineItem, PaymentIntentStatus, SessionId,
};
use atelier_stripe::{StripeClient, StripeConfig};
use serde_json::json;
use std::collections::BTreeMap;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> StripeClient {
    StripeClient::new(
        StripeConfig::new("sk_test_abc")
            .with_api_url(format!("{}/v1", server.uri()))
            .with_return_url("https://shop.example/success?session_id={CHECKOUT_SESSION_ID}"),
    )
    .unwrap()
}

fn request() -> CreateSessionRequest {
    let item = Item::new("p1", "Blue Frog", 45_000, Currency::default());
    CreateSessionRequest {
        line_items: vec![LineItem::for_item(&item)],
        customer_email: "a@b.com".to_string(),
        metadata: BTreeMap::from([("artwork_ids".to_string(), r#"["p1"]"#.to_string())]),
    }
}

#[tokio::test]
async fn test_create_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(header("authorization", "Bearer sk_test_abc"))
        .and(body_string_contains("ui_mode=embedded"))
        .and(body_string_contains("mode=payment"))
        .and(body_string_contains("unit_amount%5D=45000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_123",
            "object": "checkout.session",
            "client_secret": "cs_test_123_secret_abc",
            "status": "open",
            "payment_status": "unpaid",
            "payment_intent": null,
            "metadata": {"artwork_ids": "[\"p1\"]"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server).create_session(request()).await.unwrap();

    assert_eq!(created.session_id, SessionId::new("cs_test_123"));
    assert_eq!(created.client_secret, "cs_test_123_secret_abc");
}

#[tokio::test]
async fn test_retrieve_expands_payment_intent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_test_123"))
        .and(query_param("expand[]", "payment_intent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_123",
            "status": "complete",
            "payment_status": "paid",
            "payment_intent": {"id": "pi_1", "status": "succeeded"},
            "customer_details": {"email": "a@b.com"},
            "metadata": {"artwork_ids": "[\"p1\"]", "customer_name": "A"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = client(&server)
        .retrieve_session(
            &SessionId::new("cs_test_123"),
            &RetrieveOptions::with_payment_intent(),
        )
        .await
        .unwrap();

    assert!(session.is_verified_success());
    assert_eq!(
        session.payment_intent_status,
        Some(PaymentIntentStatus::Succeeded)
    );
    assert_eq!(session.customer_email.as_deref(), Some("a@b.com"));
    assert_eq!(session.metadata["customer_name"], "A");
}

#[tokio::test]
async fn test_api_error_message_is_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "type": "invalid_request_error",
                "message": "No such checkout.session: 'cs_missing'"
            }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .retrieve_session(&SessionId::new("cs_missing"), &RetrieveOptions::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ProviderError::Api {
            status: 404,
            message: "No such checkout.session: 'cs_missing'".to_string(),
        }
    );
}

#[tokio::test]
async fn test_unauthorized_and_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let stripe = client(&server);
    let create = stripe.create_session(request()).await.unwrap_err();
    assert!(matches!(create, ProviderError::Api { status: 401, .. }));

    let retrieve = stripe
        .retrieve_session(&SessionId::new("cs_1"), &RetrieveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(retrieve, ProviderError::Api { status: 429, .. }));
}

#[tokio::test]
async fn test_missing_client_secret_is_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "cs_1"})))
        .mount(&server)
        .await;

    let err = client(&server).create_session(request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::ResponseParseFailed(_)));
}

#[tokio::test]
async fn test_unreachable_provider() {
    let stripe = StripeClient::new(StripeConfig::new("sk_test_abc").with_api_url("http://127.0.0.1:9/v1"))
        .unwrap();

    let err = stripe.create_session(request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::RequestFailed(_)));
}

#[tokio::test]
async fn test_session_id_cannot_leave_sessions_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"type": "invalid_request_error", "message": "No such checkout.session"}
        })))
        .mount(&server)
        .await;

    let stripe = client(&server);
    let err = stripe
        .retrieve_session(
            &SessionId::new("cs_x/../../customers/cus_victim"),
            &RetrieveOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Api { status: 404, .. }));

    let dot_dot = stripe
        .retrieve_session(&SessionId::new(".."), &RetrieveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(dot_dot, ProviderError::Api { status: 404, .. }));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "the '..' id must not reach the API");
    let segments: Vec<&str> = requests[0].url.path_segments().unwrap().collect();
    assert_eq!(
        segments,
        ["v1", "checkout", "sessions", "cs_x%2F..%2F..%2Fcustomers%2Fcus_victim"]
    );
}
