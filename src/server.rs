//! HTTP tool server.
//!
//! Exposes the two retrieval entry points as JSON tools for agents.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/tools/search` | Hybrid search with filters and work context |
//! | `POST` | `/tools/get_related_info` | Related items for a file path or ticket ID |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Successful calls return `{ "result": ... }`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `timeout` (408),
//! `upstream` (502), `git` (500), `cancelled` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use context_scout_core::ScoutError;

use crate::config::Config;
use crate::retriever::SearchRequest;
use crate::Services;

/// Starts the HTTP server on `[server].bind` and serves until terminated.
pub async fn run_server(config: &Config, services: Services) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "tool server listening");
    axum::serve(listener, router(services)).await?;
    Ok(())
}

/// Route table with CORS applied.
pub fn router(services: Services) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tools/search", post(handle_search))
        .route("/tools/get_related_info", post(handle_related))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(services)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ScoutError> for AppError {
    fn from(err: ScoutError) -> Self {
        let status = match &err {
            ScoutError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ScoutError::RepositoryNotFound(_) => StatusCode::NOT_FOUND,
            ScoutError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            ScoutError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ScoutError::Git { .. } | ScoutError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "tool call failed");
        }
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /tools/search ============

async fn handle_search(
    State(services): State<Services>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let response = services.retriever.search(&request).await?;
    Ok(Json(serde_json::json!({ "result": response })))
}

// ============ POST /tools/get_related_info ============

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RelatedParams {
    file_path: Option<String>,
    ticket_id: Option<String>,
}

async fn handle_related(
    State(services): State<Services>,
    Json(params): Json<RelatedParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let info = services
        .related
        .get_related_info(params.file_path.as_deref(), params.ticket_id.as_deref())
        .await?;
    Ok(Json(serde_json::json!({ "result": info })))
}
