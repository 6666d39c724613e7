//! HTTP hook server for dispatchd.
//!
//! Local-only API: the host posts its transform event and gets the rewritten
//! record list back. A failed rewrite is still a 200 carrying the original
//! records and a `failed` outcome.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use dispatch_core::{Config, Record, RewriteOutcome, SelectionResult, TransformEvent};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::catalog::discover_candidates;
use crate::Dispatcher;

/// Shared state for HTTP handlers.
#[derive(Debug)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<Config>,
    pub auth_token: Option<String>,
}

/// Create the HTTP router. `/select` is only mounted when `enable_tool` is set.
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router: Router<Arc<AppState>> = Router::new()
        .route("/health", get(health_check))
        .route("/hooks/transform", post(transform));
    if state.config.enable_tool {
        router = router.route("/select", post(select));
    }
    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Serve until `cancel` fires.
pub async fn start_server(
    state: Arc<AppState>,
    port: u16,
    cancel: CancellationToken,
) -> Result<(), std::io::Error> {
    let router = create_router(state);

    // Local-only.
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("HTTP server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}

/// Validate auth token if configured.
fn check_auth(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    let Some(expected) = &state.auth_token else {
        return Ok(());
    };
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.strip_prefix("Bearer ").unwrap_or(s));

    match provided {
        Some(token) if token == expected => Ok(()),
        Some(_) => Err(error_response(StatusCode::UNAUTHORIZED, "invalid auth token")),
        None => Err(error_response(StatusCode::UNAUTHORIZED, "missing auth token")),
    }
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

// --- Request/Response types ---

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response for POST /hooks/transform.
#[derive(Debug, Serialize)]
pub struct TransformResponse {
    pub records: Vec<Record>,
    pub outcome: RewriteOutcome,
}

/// Request payload for POST /select.
#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub query: String,
    /// Overrides the configured skills directories.
    #[serde(default)]
    pub skills_dirs: Option<Vec<PathBuf>>,
}

/// Response for POST /select.
#[derive(Debug, Serialize)]
pub struct SelectResponse {
    /// Every discovered candidate, in scan order.
    pub candidates: Vec<String>,
    pub selection: SelectionResult,
}

// --- Handlers ---

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /hooks/transform - Rewrite the event's record list.
async fn transform(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(mut event): Json<TransformEvent>,
) -> Result<Json<TransformResponse>, (StatusCode, Json<ErrorResponse>)> {
    check_auth(&state, &headers)?;

    let outcome = state.dispatcher.transform(&mut event).await;
    Ok(Json(TransformResponse {
        records: event.records,
        outcome,
    }))
}

/// POST /select - Score skills found on disk against a query.
async fn select(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SelectRequest>,
) -> Result<Json<SelectResponse>, (StatusCode, Json<ErrorResponse>)> {
    check_auth(&state, &headers)?;

    if req.query.trim().is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "query must not be empty"));
    }

    let dirs = req
        .skills_dirs
        .unwrap_or_else(|| state.config.skills_dirs.clone());
    let candidates = discover_candidates(&dirs);
    let selection = state.dispatcher.select(&req.query, &candidates).await;

    Ok(Json(SelectResponse {
        candidates: candidates.into_iter().map(|c| c.name).collect(),
        selection,
    }))
}
