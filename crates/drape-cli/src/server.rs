use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::ALLOW;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use drape_engine::acquisition::validate_prompt;
use drape_engine::{AcquisitionError, PromptSource};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub const SERVICE_PATH: &str = "/api/v1/dalle";
const BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    source: Arc<dyn PromptSource>,
}

pub fn build_router(source: Arc<dyn PromptSource>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route(
            SERVICE_PATH,
            get(hello)
                .post(generate)
                .options(allowed_methods)
                .fallback(not_found),
        )
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .with_state(AppState { source })
}

pub async fn serve(addr: SocketAddr, source: Arc<dyn PromptSource>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local_addr = listener.local_addr()?;
    tracing::info!("drape server listening on http://{local_addr}{SERVICE_PATH}");
    axum::serve(listener, build_router(source))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("drape server exited")?;
    tracing::info!("drape server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(err) => {
            tracing::warn!("ctrl-c handler unavailable, serving until killed: {err}");
            std::future::pending::<()>().await;
        }
    }
}

async fn root() -> Response {
    message(StatusCode::OK, "Hello from DALL-E!")
}

async fn hello() -> Response {
    message(StatusCode::OK, "Hello from DALL-E! Routes")
}

async fn allowed_methods() -> Response {
    (StatusCode::OK, [(ALLOW, "GET,HEAD,POST")], "GET,HEAD,POST").into_response()
}

async fn not_found() -> Response {
    message(StatusCode::NOT_FOUND, "Not found")
}

async fn generate(State(state): State<AppState>, body: Bytes) -> Response {
    let prompt = match prompt_from_body(&body) {
        Ok(prompt) => prompt,
        Err(response) => return response,
    };

    let source = Arc::clone(&state.source);
    let outcome = tokio::task::spawn_blocking(move || source.acquire(&prompt)).await;
    match outcome {
        Ok(Ok(image)) => (StatusCode::OK, Json(json!({ "photo": image.base64 }))).into_response(),
        Ok(Err(AcquisitionError::InvalidPrompt)) => prompt_required(),
        Ok(Err(err)) => {
            tracing::error!("error generating image: {err}");
            server_error(&err.to_string())
        }
        Err(err) => {
            tracing::error!("image generation task failed: {err}");
            server_error(&err.to_string())
        }
    }
}

fn prompt_from_body(body: &[u8]) -> Result<String, Response> {
    let Ok(Value::Object(payload)) = serde_json::from_slice::<Value>(body) else {
        return Err(message(StatusCode::BAD_REQUEST, "Invalid JSON body"));
    };
    let Some(Value::String(raw)) = payload.get("prompt") else {
        return Err(prompt_required());
    };
    validate_prompt(raw)
        .map(str::to_string)
        .map_err(|_| prompt_required())
}

fn prompt_required() -> Response {
    message(StatusCode::BAD_REQUEST, "Prompt is required")
}

fn server_error(detail: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Something went wrong", "error": detail })),
    )
        .into_response()
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}
