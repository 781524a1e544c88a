//! HTTP API Tests
//!
//! Drives the axum router in-process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use docgate::http_server::{HttpServer, HttpServerConfig};
use docgate::storage::MemoryDriver;
use docgate::{Gateway, GatewayConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

// =============================================================================
// Helper Functions
// =============================================================================

fn app() -> (Arc<MemoryDriver>, Router) {
    let driver = Arc::new(MemoryDriver::new());
    let gateway = Arc::new(Gateway::new(driver.clone(), GatewayConfig::default()));
    let router = HttpServer::new(gateway, HttpServerConfig::default()).router();
    (driver, router)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn header<'a>(response: &'a Response, name: &str) -> &'a str {
    response.headers().get(name).unwrap().to_str().unwrap()
}

// =============================================================================
// Liveness Tests
// =============================================================================

#[tokio::test]
async fn test_ping() {
    let (_, app) = app();
    let response = send(&app, Method::GET, "/ping", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"message": "pong"}));
}

#[tokio::test]
async fn test_info_lists_endpoints() {
    let (_, app) = app();
    let response = send(&app, Method::GET, "/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "docgate");
    assert!(body["endpoints"].as_array().unwrap().len() >= 9);
}

/// Every route is also served under /api/v1.
#[tokio::test]
async fn test_versioned_alias() {
    let (_, app) = app();
    let response = send(&app, Method::GET, "/api/v1/ping", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, Method::POST, "/api/v1/allocate", Some(json!({"name": "shop"}))).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&app, Method::GET, "/collections/shop", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Allocation Tests
// =============================================================================

#[tokio::test]
async fn test_allocate_status_codes() {
    let (_, app) = app();

    let response = send(&app, Method::POST, "/allocate", Some(json!({"name": "shop"}))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["created"], true);
    assert_eq!(body["database"]["name"], "shop");
    assert_eq!(body["database"]["state"], "connected");

    let response = send(&app, Method::POST, "/allocate", Some(json!({"name": "shop"}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["created"], false);

    let response = send(&app, Method::POST, "/allocate", None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert!(body["database"]["name"].as_str().unwrap().starts_with("db_"));
}

#[tokio::test]
async fn test_allocate_invalid_name() {
    let (_, app) = app();
    let response = send(&app, Method::POST, "/allocate", Some(json!({"name": "a/b"}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "InvalidName");
}

// =============================================================================
// Scenario Tests
// =============================================================================

/// allocate, detect empty, create, detect, create partial, detect again.
#[tokio::test]
async fn test_schema_on_write_scenario() {
    let (_, app) = app();

    send(&app, Method::POST, "/allocate", Some(json!({"name": "shop"}))).await;

    let response = send(&app, Method::GET, "/detect-schema/shop/orders", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-schema-status"), "sample-empty");
    assert_eq!(header(&response, "x-schema-sample-size"), "100");
    assert_eq!(json_body(response).await, json!({}));

    let response = send(
        &app,
        Method::POST,
        "/entry/shop/orders",
        Some(json!({"item": "pen", "qty": 3})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["id"], "1");

    let response = send(&app, Method::GET, "/detect-schema/shop/orders", None).await;
    assert_eq!(header(&response, "x-schema-status"), "detected");
    assert_eq!(header(&response, "x-schema-documents-sampled"), "1");
    assert_eq!(
        json_body(response).await,
        json!({
            "item": {"type": "string", "optional": false},
            "qty": {"type": "integer", "optional": false}
        })
    );

    let response = send(&app, Method::GET, "/detect-schema/shop/orders", None).await;
    assert_eq!(header(&response, "x-schema-status"), "cached");

    let response = send(
        &app,
        Method::POST,
        "/entry/shop/orders",
        Some(json!({"item": "pen"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&app, Method::GET, "/detect-schema/shop/orders", None).await;
    assert_eq!(json_body(response).await["qty"]["optional"], true);
}

// =============================================================================
// CRUD Tests
// =============================================================================

#[tokio::test]
async fn test_crud_over_http() {
    let (_, app) = app();
    send(&app, Method::POST, "/allocate", Some(json!({"name": "shop"}))).await;
    send(&app, Method::POST, "/entry/shop/orders", Some(json!({"item": "pen", "qty": 3}))).await;
    send(&app, Method::POST, "/entry/shop/orders", Some(json!({"item": "ink", "qty": 1}))).await;

    let response = send(&app, Method::GET, "/entry/shop/orders/1", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["item"], "pen");

    let response = send(&app, Method::PUT, "/entry/shop/orders/1", Some(json!({"qty": 4}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["qty"], 4);
    assert_eq!(body["item"], "pen");

    let response = send(&app, Method::GET, "/entries/shop/orders?qty=lt.4&select=id,item", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0], json!({"id": "2", "item": "ink"}));
    assert!(body["next_offset"].is_null());

    let response = send(&app, Method::DELETE, "/entry/shop/orders/1", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["deleted"], true);

    let response = send(&app, Method::DELETE, "/entry/shop/orders/1", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "NotFound");
}

#[tokio::test]
async fn test_schema_violation_is_422() {
    let (_, app) = app();
    send(&app, Method::POST, "/allocate", Some(json!({"name": "shop"}))).await;
    send(&app, Method::POST, "/entry/shop/orders", Some(json!({"qty": 3}))).await;

    let response = send(&app, Method::POST, "/entry/shop/orders", Some(json!({"qty": "many"}))).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"], "SchemaViolation");
    assert!(body["message"].as_str().unwrap().contains("qty"));
}

/// `strict=true` reports a missing collection even after a lenient
/// detection cached its empty shape.
#[tokio::test]
async fn test_strict_detect_after_lenient() {
    let (_, app) = app();
    send(&app, Method::POST, "/allocate", Some(json!({"name": "shop"}))).await;

    let response = send(&app, Method::GET, "/detect-schema/shop/ghost", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-schema-status"), "sample-empty");

    let response = send(&app, Method::GET, "/detect-schema/shop/ghost?strict=true", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "CollectionNotFound");
}

// =============================================================================
// Error Mapping Tests
// =============================================================================

#[tokio::test]
async fn test_error_mapping() {
    let (driver, app) = app();

    let response = send(&app, Method::GET, "/collections/ghost", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "DatabaseNotFound");

    let response = send(&app, Method::GET, "/entries/shop/orders?limit=0", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    send(&app, Method::POST, "/allocate", Some(json!({"name": "shop"}))).await;
    let response = send(&app, Method::POST, "/entry/shop/orders", Some(json!([1, 2]))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "InvalidRequest");

    driver.set_available(false);
    let response = send(&app, Method::GET, "/entry/shop/orders/1", None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["error"], "StorageUnavailable");
    assert_eq!(body["message"], "storage is unavailable");
}

#[tokio::test]
async fn test_request_timeout_header() {
    let (driver, app) = app();
    send(&app, Method::POST, "/allocate", Some(json!({"name": "shop"}))).await;
    driver.set_latency(std::time::Duration::from_millis(200));

    let request = Request::builder()
        .uri("/entries/shop/orders")
        .header("x-request-timeout-ms", "20")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

    let request = Request::builder()
        .uri("/entries/shop/orders")
        .header("x-request-timeout-ms", "soon")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
