//! HTTP gateway for ThreadClaw.
//!
//! Exposes the run engine over REST and SSE: streaming chat, batch chat,
//! thread history, and health. Built on axum.
//!
//! Payloads map one-to-one onto SSE events named by their payload type
//! (`response`, `tool`, `end`), with the tagged payload JSON as data. A
//! run that fails after the stream opened emits a final `error` event.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use threadclaw_agent::{
    ChannelObserver, CollectingObserver, QueueWorker, QueuedContinuation, RunOptions, Runner,
    TaskQueue,
};
use threadclaw_config::AppConfig;
use threadclaw_core::backend::ChatBackend;
use threadclaw_core::error::Error;
use threadclaw_core::message::{Message, ThreadId};
use threadclaw_core::store::ThreadStore;
use threadclaw_providers::OpenAiCompatBackend;
use threadclaw_store::{FileThreadStore, MemoryThreadStore};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub runner: Arc<Runner>,
    pub store: Arc<dyn ThreadStore>,
    pub default_agent: String,
}

type SharedState = Arc<GatewayState>;

/// Build the axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/chat", post(chat_handler))
        .route("/v1/chat/stream", post(chat_stream_handler))
        .route("/v1/threads/{id}", get(thread_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Composes the backend, store, catalog, and runner from config, wires
/// the work queue for detached continuations, and serves until shutdown.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let backend: Arc<dyn ChatBackend> =
        Arc::new(OpenAiCompatBackend::from_config(&config.backend)?);
    let store: Arc<dyn ThreadStore> = match config.store.backend.as_str() {
        "memory" => Arc::new(MemoryThreadStore::new()),
        _ => Arc::new(FileThreadStore::new(config.store_dir())),
    };
    let catalog = Arc::new(threadclaw_tools::default_catalog());

    let (queue, queue_rx) = TaskQueue::new();
    let runner = Arc::new(
        Runner::new(backend, catalog, store.clone(), config.clone())
            .with_continuation(Arc::new(QueuedContinuation::new(Arc::new(queue)))),
    );
    QueueWorker::spawn(runner.clone(), queue_rx);

    let state = Arc::new(GatewayState {
        runner,
        store,
        default_agent: config.agent.default_agent.clone(),
    });
    let app = build_router(state);

    info!(addr = %addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Request / response bodies ---

#[derive(Debug, Deserialize)]
struct ChatBody {
    message: String,

    #[serde(default)]
    thread_id: Option<String>,

    #[serde(default)]
    agent: Option<String>,
}

impl ChatBody {
    /// Existing thread, or a fresh one when the caller names none.
    fn thread_id(&self) -> ThreadId {
        self.thread_id
            .clone()
            .map(ThreadId)
            .unwrap_or_else(ThreadId::new)
    }
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    thread_id: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ThreadResponse {
    thread_id: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn run_error(e: Error) -> ApiError {
    let status = match &e {
        Error::UnknownAgent(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}

fn validate(body: &ChatBody) -> Result<(), ApiError> {
    if body.message.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "message must not be empty",
        ));
    }
    Ok(())
}

// --- Handlers ---

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /v1/chat` — run to completion, reply with the assembled text.
async fn chat_handler(
    State(state): State<SharedState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatResponse>, ApiError> {
    validate(&body)?;
    let thread_id = body.thread_id();
    let agent = body
        .agent
        .clone()
        .unwrap_or_else(|| state.default_agent.clone());
    info!(agent = %agent, thread = %thread_id, "v1/chat request");

    let collector = Arc::new(CollectingObserver::new());
    state
        .runner
        .start(
            &agent,
            thread_id.clone(),
            &body.message,
            // Batch callers need the full run before the reply goes out.
            RunOptions::new()
                .with_observer(collector.clone())
                .with_detached(false),
        )
        .await
        .map_err(run_error)?;

    Ok(Json(ChatResponse {
        thread_id: thread_id.to_string(),
        content: collector.response_text().await,
    }))
}

/// `POST /v1/chat/stream` — run in the background, stream payloads as
/// SSE events.
async fn chat_stream_handler(
    State(state): State<SharedState>,
    Json(body): Json<ChatBody>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    validate(&body)?;
    let thread_id = body.thread_id();
    let agent = body
        .agent
        .clone()
        .unwrap_or_else(|| state.default_agent.clone());
    info!(agent = %agent, thread = %thread_id, "v1/chat/stream request");

    let (observer, rx) = ChannelObserver::channel(64);
    let (err_tx, err_rx) = tokio::sync::oneshot::channel::<Error>();
    let runner = state.runner.clone();
    let message = body.message.clone();
    tokio::spawn(async move {
        if let Err(e) = runner
            .start(
                &agent,
                thread_id,
                &message,
                RunOptions::new().with_observer(Arc::new(observer)),
            )
            .await
        {
            error!(error = %e, "Streamed run failed");
            let _ = err_tx.send(e);
        }
    });

    let payloads = ReceiverStream::new(rx).map(|payload| {
        let data = serde_json::to_string(&payload).unwrap_or_default();
        Ok(SseEvent::default().event(payload.payload_type()).data(data))
    });
    // Polled only after the payload channel closes, so a failure always
    // lands after the payloads that preceded it.
    let trailer = stream::once(err_rx).filter_map(|res| async move {
        let e = res.ok()?;
        let data = serde_json::to_string(&ErrorResponse {
            error: e.to_string(),
        })
        .unwrap_or_default();
        Some(Ok(SseEvent::default().event("error").data(data)))
    });

    Ok(Sse::new(payloads.chain(trailer)).keep_alive(KeepAlive::default()))
}

/// `GET /v1/threads/{id}` — full message history; empty for unknown ids.
async fn thread_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ThreadResponse>, ApiError> {
    let thread_id = ThreadId(id);
    let messages = state
        .store
        .get(&thread_id)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(ThreadResponse {
        thread_id: thread_id.to_string(),
        messages,
    }))
}
