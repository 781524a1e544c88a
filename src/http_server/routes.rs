//! Gateway HTTP Routes
//!
//! | Method | Path                                  |
//! |--------|---------------------------------------|
//! | GET    | `/`                                   |
//! | GET    | `/ping`                               |
//! | POST   | `/allocate`                           |
//! | GET    | `/collections/:db`                    |
//! | GET    | `/detect-schema/:db/:collection`      |
//! | GET    | `/entries/:db/:collection`            |
//! | POST   | `/entry/:db/:collection`              |
//! | GET    | `/entry/:db/:collection/:id`          |
//! | PUT    | `/entry/:db/:collection/:id`          |
//! | DELETE | `/entry/:db/:collection/:id`          |

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::RequestContext;
use crate::dispatch::{CollectionsResponse, DeleteResponse, ListParams, ListResponse};
use crate::errors::{GatewayError, GatewayResult};
use crate::gateway::Gateway;
use crate::observability::Logger;
use crate::schema::DetectOptions;

/// Header carrying the caller's deadline in milliseconds
pub const TIMEOUT_HEADER: &str = "x-request-timeout-ms";

pub const SAMPLE_SIZE_HEADER: &str = "x-schema-sample-size";
pub const DOCUMENTS_SAMPLED_HEADER: &str = "x-schema-documents-sampled";
pub const SCHEMA_STATUS_HEADER: &str = "x-schema-status";

const ENDPOINTS: &[&str] = &[
    "GET /ping",
    "POST /allocate",
    "GET /collections/:db",
    "GET /detect-schema/:db/:collection",
    "GET /entries/:db/:collection",
    "POST /entry/:db/:collection",
    "GET /entry/:db/:collection/:id",
    "PUT /entry/:db/:collection/:id",
    "DELETE /entry/:db/:collection/:id",
];

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: &'static [&'static str],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AllocateRequest {
    #[serde(default, alias = "database")]
    pub name: Option<String>,
}

type HandlerResult<T> = Result<T, GatewayError>;

// ==================
// Routes
// ==================

/// Create gateway routes
pub fn gateway_routes(state: Arc<Gateway>) -> Router {
    Router::new()
        .route("/", get(info_handler))
        .route("/ping", get(ping_handler))
        .route("/allocate", post(allocate_handler))
        .route("/collections/:db", get(collections_handler))
        .route("/detect-schema/:db/:collection", get(detect_schema_handler))
        .route("/entries/:db/:collection", get(list_entries_handler))
        .route("/entry/:db/:collection", post(create_entry_handler))
        .route(
            "/entry/:db/:collection/:id",
            get(read_entry_handler)
                .put(update_entry_handler)
                .delete(delete_entry_handler),
        )
        .with_state(state)
}

// ==================
// Helper Functions
// ==================

/// Build the request context from the deadline header or the configured default
fn request_context(gateway: &Gateway, headers: &HeaderMap) -> GatewayResult<RequestContext> {
    let Some(raw) = headers.get(TIMEOUT_HEADER) else {
        return Ok(gateway.context());
    };
    let millis = raw
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .ok_or_else(|| {
            GatewayError::invalid_request(format!("{} must be a positive integer", TIMEOUT_HEADER))
        })?;
    Ok(RequestContext::new(Duration::from_millis(millis)))
}

/// Log a failed request and hand the error back for rendering
fn failed(ctx: &RequestContext, operation: &str, err: GatewayError) -> GatewayError {
    let request_id = ctx.request_id.to_string();
    let elapsed = ctx.elapsed_ms().to_string();
    let fields = [
        ("duration_ms", elapsed.as_str()),
        ("kind", err.kind().as_str()),
        ("operation", operation),
        ("request_id", request_id.as_str()),
    ];
    if err.status_code().is_server_error() {
        Logger::warn("REQUEST_FAILED", &fields);
    } else {
        Logger::info("REQUEST_REJECTED", &fields);
    }
    err
}

/// Parse an optional JSON body; an empty body is `None`
fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> GatewayResult<Option<T>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| GatewayError::invalid_request(format!("invalid JSON body: {}", e)))
}

fn require_body(body: &Bytes) -> GatewayResult<Value> {
    parse_body(body)?.ok_or_else(|| GatewayError::invalid_request("request body is required"))
}

fn detect_options(query: &HashMap<String, String>) -> GatewayResult<DetectOptions> {
    let sample_size = query
        .get("sample_size")
        .map(|raw| {
            raw.parse::<usize>()
                .map_err(|_| GatewayError::invalid_request(format!("invalid sample_size: {}", raw)))
        })
        .transpose()?;
    Ok(DetectOptions {
        sample_size,
        force_refresh: flag(query, "refresh")?,
        require_existing: flag(query, "strict")?,
    })
}

fn flag(query: &HashMap<String, String>, name: &str) -> GatewayResult<bool> {
    match query.get(name).map(String::as_str) {
        None | Some("false") | Some("0") => Ok(false),
        Some("true") | Some("1") | Some("") => Ok(true),
        Some(other) => Err(GatewayError::invalid_request(format!(
            "invalid {}: {}",
            name, other
        ))),
    }
}

// ==================
// Handlers
// ==================

async fn info_handler() -> Json<InfoResponse> {
    Json(InfoResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS,
    })
}

async fn ping_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "pong".to_string(),
    })
}

async fn allocate_handler(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
    body: Bytes,
) -> HandlerResult<Response> {
    let ctx = request_context(&gateway, &headers)?;
    let request: AllocateRequest = parse_body(&body)
        .map_err(|e| failed(&ctx, "allocate", e))?
        .unwrap_or_default();

    let allocation = gateway
        .allocator()
        .allocate(request.name.as_deref(), &ctx)
        .await
        .map_err(|e| failed(&ctx, "allocate", e))?;

    let status = if allocation.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(allocation)).into_response())
}

async fn collections_handler(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
    Path(db): Path<String>,
) -> HandlerResult<Json<CollectionsResponse>> {
    let ctx = request_context(&gateway, &headers)?;
    let collections = gateway
        .engine()
        .list_collections(&db, &ctx)
        .await
        .map_err(|e| failed(&ctx, "list_collections", e))?;
    Ok(Json(CollectionsResponse {
        database: db,
        collections,
    }))
}

async fn detect_schema_handler(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
    Path((db, collection)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> HandlerResult<Response> {
    let ctx = request_context(&gateway, &headers)?;
    let options = detect_options(&query).map_err(|e| failed(&ctx, "detect_schema", e))?;
    let detection = gateway
        .engine()
        .detect(&db, &collection, options, &ctx)
        .await
        .map_err(|e| failed(&ctx, "detect_schema", e))?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(SAMPLE_SIZE_HEADER, HeaderValue::from(detection.sample_size));
    response_headers.insert(
        DOCUMENTS_SAMPLED_HEADER,
        HeaderValue::from(detection.documents_sampled),
    );
    response_headers.insert(
        SCHEMA_STATUS_HEADER,
        HeaderValue::from_static(detection.status.as_str()),
    );
    Ok((response_headers, Json(detection.shape)).into_response())
}

async fn list_entries_handler(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
    Path((db, collection)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> HandlerResult<Json<ListResponse>> {
    let ctx = request_context(&gateway, &headers)?;
    let params = ListParams::parse(&query).map_err(|e| failed(&ctx, "list", e))?;
    let page = gateway
        .dispatcher()
        .list(&db, &collection, &params, &ctx)
        .await
        .map_err(|e| failed(&ctx, "list", e))?;
    Ok(Json(ListResponse::from(page)))
}

async fn create_entry_handler(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
    Path((db, collection)): Path<(String, String)>,
    body: Bytes,
) -> HandlerResult<Response> {
    let ctx = request_context(&gateway, &headers)?;
    let document = require_body(&body).map_err(|e| failed(&ctx, "create", e))?;
    let created = gateway
        .dispatcher()
        .create(&db, &collection, document, &ctx)
        .await
        .map_err(|e| failed(&ctx, "create", e))?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

async fn read_entry_handler(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
    Path((db, collection, id)): Path<(String, String, String)>,
) -> HandlerResult<Json<Value>> {
    let ctx = request_context(&gateway, &headers)?;
    let document = gateway
        .dispatcher()
        .read(&db, &collection, &id, &ctx)
        .await
        .map_err(|e| failed(&ctx, "read", e))?;
    Ok(Json(Value::Object(document)))
}

async fn update_entry_handler(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
    Path((db, collection, id)): Path<(String, String, String)>,
    body: Bytes,
) -> HandlerResult<Json<Value>> {
    let ctx = request_context(&gateway, &headers)?;
    let patch = require_body(&body).map_err(|e| failed(&ctx, "update", e))?;
    let document = gateway
        .dispatcher()
        .update(&db, &collection, &id, patch, &ctx)
        .await
        .map_err(|e| failed(&ctx, "update", e))?;
    Ok(Json(Value::Object(document)))
}

async fn delete_entry_handler(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
    Path((db, collection, id)): Path<(String, String, String)>,
) -> HandlerResult<Json<DeleteResponse>> {
    let ctx = request_context(&gateway, &headers)?;
    gateway
        .dispatcher()
        .delete(&db, &collection, &id, &ctx)
        .await
        .map_err(|e| failed(&ctx, "delete", e))?;
    Ok(Json(DeleteResponse::success(id)))
}
