//! Session Notes HTTP API
//!
//! Axum server exposing summary generation and note persistence.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function. The inner functions are directly testable without axum dispatch
//! machinery.
//!
//! Endpoints:
//! - GET  /              : liveness
//! - GET  /health        : liveness plus SQLite status
//! - POST /generate-notes: clinical summary from raw notes
//! - POST /save-notes    : persist a note, unique per (name, date)
//! - GET  /get-notes     : every stored note

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use notes_core::{GenerateRequest, Note, NotesConfig, NotesError, SummaryGenerator};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::subsystems::notes::{NoteStore, StoreError};

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub store: NoteStore,
    pub generator: SummaryGenerator,
    pub config: NotesConfig,
    allowed_origin: HeaderValue,
}

impl HttpState {
    /// Fails if the configured CORS origin is not a valid header value.
    pub fn new(
        store: NoteStore,
        generator: SummaryGenerator,
        config: NotesConfig,
    ) -> Result<Self, NotesError> {
        let allowed_origin = HeaderValue::from_str(&config.http.allowed_origin).map_err(|e| {
            NotesError::Other(format!(
                "invalid http.allowed_origin {:?}: {}",
                config.http.allowed_origin, e
            ))
        })?;

        Ok(Self {
            store,
            generator,
            config,
            allowed_origin,
        })
    }
}

/// CORS for the single configured front-end origin, credentials allowed.
pub fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    let cors = cors_layer(state.allowed_origin.clone());

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/generate-notes", post(generate_handler))
        .route("/save-notes", post(save_handler))
        .route("/get-notes", get(list_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: HttpState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = state.config.http_addr();
    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Session notes API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SaveNoteRequest {
    pub name: String,
    pub date: String,
    pub notes: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteResponse {
    pub name: String,
    pub date: String,
    pub notes: String,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            name: note.name,
            date: note.date,
            notes: note.notes,
        }
    }
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            detail: msg.into(),
            status: "error".to_string(),
        }
    }
}

fn error_body(msg: impl Into<String>) -> serde_json::Value {
    serde_json::json!(ErrorResponse::new(msg))
}

/// Unreadable request bodies use the same error shape as every other failure.
pub fn rejection_inner(rejection: JsonRejection) -> (StatusCode, serde_json::Value) {
    tracing::debug!(error = %rejection, "Rejected request body");
    (rejection.status(), error_body(rejection.body_text()))
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner liveness: pure, no IO.
pub fn root_inner() -> serde_json::Value {
    serde_json::json!({ "status": "healthy" })
}

/// Inner health check: queries SQLite and returns (status_code, json_body).
pub async fn health_inner(pool: &SqlitePool) -> (StatusCode, serde_json::Value) {
    match notes_core::db::health_check(pool).await {
        Ok(version) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "sqlite": version,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner generate: one call to the summary backend, never persists.
pub async fn generate_inner(
    generator: &SummaryGenerator,
    req: GenerateRequest,
) -> (StatusCode, serde_json::Value) {
    match generator.generate(&req).await {
        Ok(result) => (StatusCode::OK, serde_json::json!({ "result": result })),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_body(format!("OpenAI API error: {}", e)),
        ),
    }
}

/// Inner save: duplicate (name, date) is a client error.
pub async fn save_inner(store: &NoteStore, req: SaveNoteRequest) -> (StatusCode, serde_json::Value) {
    match store.save(&req.name, &req.date, &req.notes).await {
        Ok(note) => (StatusCode::OK, serde_json::json!(NoteResponse::from(note))),
        Err(e @ StoreError::DuplicateKey { .. }) => (StatusCode::BAD_REQUEST, error_body(e.to_string())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to save note");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(e.to_string()))
        }
    }
}

/// Inner list: every note in storage order.
pub async fn list_inner(store: &NoteStore) -> (StatusCode, serde_json::Value) {
    match store.list().await {
        Ok(notes) => {
            let body: Vec<NoteResponse> = notes.into_iter().map(NoteResponse::from).collect();
            (StatusCode::OK, serde_json::json!(body))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list notes");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(e.to_string()))
        }
    }
}

// ============================================================================
// Axum handler wrappers (thin: delegate to inner functions)
// ============================================================================

pub async fn root_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(root_inner()))
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(state.store.pool()).await;
    (status, Json(body))
}

pub async fn generate_handler(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match payload {
        Ok(Json(req)) => generate_inner(&state.generator, req).await,
        Err(rejection) => rejection_inner(rejection),
    };
    (status, Json(body))
}

pub async fn save_handler(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<SaveNoteRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match payload {
        Ok(Json(req)) => save_inner(&state.store, req).await,
        Err(rejection) => rejection_inner(rejection),
    };
    (status, Json(body))
}

pub async fn list_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = list_inner(&state.store).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================
