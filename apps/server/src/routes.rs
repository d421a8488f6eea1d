//! HTTP routes and application state wiring.

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt, wrappers::UnboundedReceiverStream};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use mermagen_core::{PipelineDeps, RunEvent, Validator, run, run_streaming};
use mermagen_llm::{OpenAiClient, PromptTemplates, TextGenerator};
use mermagen_shared::{AppConfig, ExecutionMode, MermagenError, Result};
use mermagen_storage::Storage;

use crate::schemas::{DiagramRequest, DiagramResponse};

/// Shared application state: the pipeline dependency bundle.
#[derive(Clone)]
pub(crate) struct AppState {
    pub deps: Arc<PipelineDeps>,
}

impl AppState {
    /// Wire pipeline dependencies from configuration. The execution mode is
    /// resolved once here; every run sees the same mode.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let mode = config.execution_mode();

        let generator: Option<Arc<dyn TextGenerator>> = match mode {
            ExecutionMode::Mock => None,
            ExecutionMode::Live => {
                let api_key = config
                    .api_key()
                    .ok_or_else(|| MermagenError::config("API key env var is not set"))?;
                Some(Arc::new(OpenAiClient::new(
                    &config.openai.base_url,
                    &api_key,
                    &config.openai.model,
                )?))
            }
        };

        // Mock runs are never persisted, so the database is only opened for
        // live mode.
        let storage = match mode {
            ExecutionMode::Mock => None,
            ExecutionMode::Live => {
                let path = expand_home(&config.database.path);
                Some(Arc::new(Storage::open(&path).await?))
            }
        };

        let model_name = match mode {
            ExecutionMode::Mock => "mock".to_string(),
            ExecutionMode::Live => config.openai.model.clone(),
        };

        Ok(Self {
            deps: Arc::new(PipelineDeps {
                mode,
                generator,
                templates: PromptTemplates::new(),
                validator: Validator::new(),
                model_name,
                storage,
            }),
        })
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Build the application router with CORS and request tracing.
pub(crate) fn router(state: AppState, config: &AppConfig) -> axum::Router {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    axum::Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/diagram", post(generate_diagram))
        .route("/api/diagram/stream", post(stream_diagram))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn root() -> Json<serde_json::Value> {
    Json(json!({"message": "mermagen API"}))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({"status": "ok", "mode": state.deps.mode.as_str()}))
}

/// `POST /api/diagram` — run the pipeline to completion.
///
/// Always a 200-shaped payload with `errors` populated when the pipeline
/// could not produce valid markup; only malformed input is a 4xx.
async fn generate_diagram(
    State(state): State<AppState>,
    Json(request): Json<DiagramRequest>,
) -> std::result::Result<Json<DiagramResponse>, ApiError> {
    check_prompt(&request)?;
    let summary = run(&state.deps, request.into()).await;
    Ok(Json(summary.into()))
}

/// `POST /api/diagram/stream` — run the pipeline with SSE progress events.
async fn stream_diagram(
    State(state): State<AppState>,
    Json(request): Json<DiagramRequest>,
) -> std::result::Result<
    Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>,
    ApiError,
> {
    check_prompt(&request)?;

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_streaming(Arc::clone(&state.deps), request.into(), tx));

    // Event ids are `<trace_id>:<n>`, counting from 1 across the stream.
    // The trace id is learned from the leading meta event.
    let mut trace_id = String::new();
    let mut event_id = 0u64;
    let stream = UnboundedReceiverStream::new(rx).map(move |event| {
        event_id += 1;
        if let RunEvent::Meta(meta) = &event {
            trace_id = meta.trace_id.clone();
        }
        let id = format!("{trace_id}:{event_id}");
        Ok(match event {
            RunEvent::Meta(meta) => sse_event("meta", &id, &meta),
            RunEvent::Chunk(chunk) => {
                sse_event("chunk", &id, &json!({"text": chunk.mermaid_code}))
            }
            RunEvent::Done(summary) => {
                sse_event("done", &id, &DiagramResponse::from(summary))
            }
            RunEvent::Error(error) => sse_event("error", &id, &error),
        })
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Build a named SSE event with a JSON payload.
fn sse_event(name: &str, id: &str, payload: &impl serde::Serialize) -> Event {
    match Event::default().event(name).id(id).json_data(payload) {
        Ok(event) => event,
        Err(err) => {
            warn!(event = name, error = %err, "failed to serialize SSE payload");
            Event::default().event("error").id(id).data("{}")
        }
    }
}

// Minimum-length check only; whitespace prompts are accepted and run the
// pipeline.
fn check_prompt(request: &DiagramRequest) -> std::result::Result<(), ApiError> {
    if request.prompt.is_empty() {
        return Err(ApiError {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "prompt must not be empty".into(),
        });
    }
    Ok(())
}

/// A transport-level request error. Pipeline failures never take this path;
/// they surface inside the response payload.
pub(crate) struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}
