//! Inference service — `POST /ner` over a shared token classifier.
//!
//! Thin axum router. Handlers hold no mutable state; the classifier is shared
//! read-only and invoked once per request on a blocking worker.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::entity::{EntityAnnotation, NerRequest};
use crate::pipeline::TokenClassifier;

/// Largest request body accepted by the service.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// AppState
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    classifier: Arc<dyn TokenClassifier>,
    start_time: Instant,
}

impl AppState {
    pub fn new(classifier: Arc<dyn TokenClassifier>) -> Self {
        Self {
            classifier,
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// Error type
// ============================================================================

/// Any failure past request validation. The client only ever sees a generic
/// message; the detail goes to the log.
struct AppError(String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(detail = %self.0, "NER request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "Internal Server Error"})),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

// POST /ner
async fn ner_handler(
    State(state): State<AppState>,
    Json(req): Json<NerRequest>,
) -> Result<Json<Vec<EntityAnnotation>>, AppError> {
    let classifier = state.classifier.clone();
    let query_chars = req.query.chars().count();

    let entities = tokio::task::spawn_blocking(move || classifier.classify(&req.query))
        .await
        .map_err(|e| AppError(format!("classifier task aborted: {}", e)))?
        .map_err(|e| AppError(e.to_string()))?;

    let annotations: Vec<EntityAnnotation> =
        entities.into_iter().map(EntityAnnotation::from).collect();

    tracing::info!(
        chars = query_chars,
        entities = annotations.len(),
        "[POST /ner] classified"
    );

    Ok(Json(annotations))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    model: String,
    uptime_secs: u64,
}

// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.classifier.model_id().to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// GET /docs
async fn docs_handler() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>NER API</title></head><body>\
         <h1>NER API</h1>\
         <p><code>POST /ner</code> with body <code>{\"query\": \"...\"}</code> returns a JSON array of \
         <code>{entity, score, index, word, start, end}</code>.</p>\
         <p><code>GET /health</code> reports service status.</p>\
         </body></html>",
    )
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ner", post(ner_handler))
        .route("/health", get(health_handler))
        .route("/docs", get(docs_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve an in-process instance on an ephemeral port for tests.
#[cfg(test)]
pub(crate) async fn spawn_test_server(classifier: Arc<dyn TokenClassifier>) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(AppState::new(classifier));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
