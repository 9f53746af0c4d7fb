//! Router behavior that is decided before any query runs.
//!
//! The app is built on a lazy pool pointed at a closed port, so these tests
//! need no database. Anything that does reach the pool fails fast.
//!
//! Run with: cargo test -p hoby-loop-integration-tests

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use hoby_loop_integration_tests::offline_app;

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = offline_app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_ping_envelope() {
    let (status, body) = send(get("/ping")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": 200, "data": {"message": "pong", "status": "ok"}})
    );
}

#[tokio::test]
async fn test_health() {
    let response = offline_app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_readiness_without_database() {
    let response = offline_app().oneshot(get("/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_route() {
    let response = offline_app().oneshot(get("/carts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Identity
// ============================================================================

#[tokio::test]
async fn test_malformed_user_id_is_unauthorized() {
    let request = Request::get("/baskets/1")
        .header("X-User-ID", "ana")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
    assert_eq!(body["message"], "Unauthorized");
}

#[tokio::test]
async fn test_admin_routes_require_identity() {
    for uri in ["/admin/users", "/admin/baskets", "/admin/subscriptions"] {
        let (status, body) = send(get(uri)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["status"], 401, "{uri}");
    }
}

#[tokio::test]
async fn test_cors_preflight_allows_user_id_header() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/orders")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(
            header::ACCESS_CONTROL_REQUEST_HEADERS,
            "x-user-id,content-type",
        )
        .body(Body::empty())
        .unwrap();

    let response = offline_app().oneshot(request).await.unwrap();

    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("x-user-id"), "{allowed}");
}

// ============================================================================
// Request Validation
// ============================================================================

#[tokio::test]
async fn test_malformed_json_body() {
    let request = Request::post("/baskets")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert_eq!(body["message"], "Invalid request body");
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn test_non_positive_price_rejected() {
    let request = json_request(
        Method::POST,
        "/baskets",
        &json!({"name": "Cesta", "description": "Frutas", "price": -10, "seller_id": 1}),
    );

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request body");
}

#[tokio::test]
async fn test_blank_basket_name_rejected() {
    let request = json_request(
        Method::POST,
        "/baskets",
        &json!({"name": "  ", "description": "Frutas", "price": 49.9, "seller_id": 1}),
    );

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Invalid basket data: name and description are required"
    );
}

#[tokio::test]
async fn test_invalid_path_parameter() {
    let (status, body) = send(get("/orders/primeiro")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid path parameter");
}

#[tokio::test]
async fn test_login_requires_valid_email() {
    let request = json_request(Method::POST, "/login", &json!({"email": "not-an-email"}));

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Valid email is required");
}

#[tokio::test]
async fn test_register_rejects_admin_role() {
    let request = json_request(
        Method::POST,
        "/register",
        &json!({
            "email": "root@hoby.com.br",
            "password": "segredo",
            "role": "admin",
            "name": "Root"
        }),
    );

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_register_seller_needs_valid_cnpj() {
    let request = json_request(
        Method::POST,
        "/register",
        &json!({
            "email": "horta@hoby.com.br",
            "password": "segredo",
            "role": "seller",
            "name": "Horta",
            "cnpj": "11.222.333/0001-00"
        }),
    );

    let (status, _) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_cannot_start_preparing() {
    let request = json_request(
        Method::POST,
        "/orders",
        &json!({"subscription_id": 1, "status": "preparing"}),
    );

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid order data");
    assert!(body["details"].as_str().unwrap().contains("preparing"));
}

#[tokio::test]
async fn test_order_status_must_advance() {
    let request = json_request(
        Method::PUT,
        "/orders/1/status",
        &json!({"status": "processing"}),
    );

    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid status data");
}
