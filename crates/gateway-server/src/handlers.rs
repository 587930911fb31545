use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use gateway_harness::{Message, ProviderInfo, RunBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::sse::sse_response;

const LAST_EVENT_ID: &str = "last-event-id";

/// Body accepted by both completion routes.
///
/// Exactly one of `prompt` / `messages` must be set; the harness enforces it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub prompt: Option<String>,
    pub messages: Option<Vec<Message>>,
    pub provider: Option<String>,
    pub stream: Option<bool>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_providers(State(state): State<AppState>) -> Json<Vec<ProviderInfo>> {
    Json(state.harness.providers())
}

/// `POST /api/completions`: buffered unless `stream` is true.
pub async fn completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CompletionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    if body.stream.unwrap_or(false) {
        stream_completion(&state, &headers, body).await
    } else {
        buffered_completion(&state, body).await
    }
}

/// `POST /api/completions/stream`: always streams.
pub async fn completions_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CompletionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    stream_completion(&state, &headers, body).await
}

async fn buffered_completion(
    state: &AppState,
    body: CompletionRequest,
) -> Result<Response, ApiError> {
    info!(provider = ?body.provider, "buffered completion requested");
    let response = build_run(state, body, None).generate().await?;
    Ok(Json(response).into_response())
}

async fn stream_completion(
    state: &AppState,
    headers: &HeaderMap,
    body: CompletionRequest,
) -> Result<Response, ApiError> {
    let last_event_id = headers
        .get(LAST_EVENT_ID)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned);
    info!(
        provider = ?body.provider,
        last_event_id = ?last_event_id,
        "streaming completion requested"
    );
    // Request errors surface here as a JSON response, before any event.
    let run = build_run(state, body, last_event_id).start_stream().await?;
    Ok(sse_response(run, &state.config.cors_origin))
}

fn build_run(
    state: &AppState,
    body: CompletionRequest,
    last_event_id: Option<String>,
) -> RunBuilder {
    let mut run = state.harness.run().timeout(state.config.request_timeout);
    if let Some(provider) = body.provider {
        run = run.provider(provider);
    }
    if let Some(prompt) = body.prompt {
        run = run.prompt(prompt);
    }
    if let Some(messages) = body.messages {
        run = run.messages(messages);
    }
    if let Some(model) = body.model {
        run = run.model(model);
    }
    if let Some(temperature) = body.temperature {
        run = run.temperature(temperature);
    }
    if let Some(max_tokens) = body.max_tokens {
        run = run.max_tokens(max_tokens);
    }
    if let Some(last_event_id) = last_event_id {
        run = run.last_event_id(last_event_id);
    }
    run
}
