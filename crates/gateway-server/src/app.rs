use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use axum::routing::{get, post};
use gateway_harness::vendors::echo::{EchoConfig, EchoProvider};
use gateway_harness::vendors::openrouter::{OpenRouterConfig, OpenRouterProvider};
use gateway_harness::{Harness, HarnessError};
use tracing::info;

use crate::config::ServerConfig;
use crate::handlers;

/// Shared per-process state. Cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub harness: Harness,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(harness: Harness, config: ServerConfig) -> Self {
        Self {
            harness,
            config: Arc::new(config),
        }
    }
}

/// Registers the echo and OpenRouter providers with the configured default.
pub fn build_harness(config: &ServerConfig) -> Result<Harness, HarnessError> {
    let echo = EchoProvider::new(EchoConfig::default().word_delay(config.stream_word_delay));
    let openrouter = OpenRouterProvider::new(
        OpenRouterConfig::from_env()
            .base_url(&config.openrouter_base_url)
            .default_model(&config.default_model)
            .timeout(config.request_timeout),
    )?;
    Harness::builder()
        .register_provider(Arc::new(echo))
        .register_provider(Arc::new(openrouter))
        .default_provider(config.default_provider.as_str())
        .build()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/providers", get(handlers::list_providers))
        .route("/api/completions", post(handlers::completions))
        .route("/api/completions/stream", post(handlers::completions_stream))
        .with_state(state)
}

/// Binds, serves until Ctrl-C, then drains in-flight requests.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let harness = build_harness(&config).context("failed to build provider registry")?;
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        addr = %addr,
        default_provider = %harness.default_provider(),
        "gateway listening"
    );

    axum::serve(listener, router(AppState::new(harness, config)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use gateway_harness::vendors::openrouter::Credentials;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt as _;

    fn test_app() -> Router {
        let config = ServerConfig {
            stream_word_delay: Duration::from_millis(1),
            request_timeout: Duration::from_secs(5),
            ..ServerConfig::default()
        };
        let openrouter = OpenRouterProvider::new(OpenRouterConfig {
            credentials: Credentials::Env("GATEWAY_TEST_UNSET_OPENROUTER_KEY".into()),
            base_url: "http://127.0.0.1:1".into(),
            ..OpenRouterConfig::default()
        })
        .expect("openrouter");
        let harness = Harness::builder()
            .register_provider(Arc::new(EchoProvider::new(
                EchoConfig::default().word_delay(config.stream_word_delay),
            )))
            .register_provider(Arc::new(openrouter))
            .default_provider("echo")
            .build()
            .expect("harness");
        router(AppState::new(harness, config))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn send(request: Request<Body>) -> Response {
        test_app().oneshot(request).await.expect("response")
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).expect("json")
    }

    #[derive(Debug)]
    struct Record {
        id: String,
        event: String,
        data: String,
    }

    fn parse_records(text: &str) -> Vec<Record> {
        text.split("\n\n")
            .filter(|block| !block.is_empty())
            .map(|block| {
                let field = |name: &str| {
                    block
                        .lines()
                        .find_map(|l| l.strip_prefix(name))
                        .expect("field present")
                        .to_string()
                };
                Record {
                    id: field("id: "),
                    event: field("event: "),
                    data: field("data: "),
                }
            })
            .collect()
    }

    fn deltas(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .filter(|r| r.event == "content")
            .map(|r| {
                let data: Value = serde_json::from_str(&r.data).expect("json");
                data["delta"].as_str().expect("delta").to_string()
            })
            .collect()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = send(Request::get("/health").body(Body::empty()).expect("req")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn providers_report_availability() {
        let response =
            send(Request::get("/api/providers").body(Body::empty()).expect("req")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!([
                {"name": "echo", "available": true, "streaming": true, "default": true},
                {"name": "openrouter", "available": false, "streaming": true, "default": false}
            ])
        );
    }

    #[tokio::test]
    async fn buffered_hello_world_is_exact() {
        let response = send(post_json("/api/completions", json!({"prompt": "Hello world"}))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "content": "Echo: Hello world",
                "model": "echo-1.0",
                "usage": {"promptTokens": 3, "completionTokens": 5, "totalTokens": 8}
            })
        );
    }

    #[tokio::test]
    async fn streamed_hello_world_writes_sse_records() {
        let response = send(post_json(
            "/api/completions",
            json!({"prompt": "Hello world", "stream": true}),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let records = parse_records(&body_text(response).await);
        let events: Vec<&str> = records.iter().map(|r| r.event.as_str()).collect();
        assert_eq!(events, vec!["content", "content", "content", "usage", "done"]);
        assert_eq!(deltas(&records), vec!["Echo: ", "Hello ", "world "]);

        let usage: Value = serde_json::from_str(&records[3].data).expect("usage json");
        assert_eq!(
            usage,
            json!({"promptTokens": 3, "completionTokens": 5, "totalTokens": 8, "model": "echo-1.0"})
        );
        assert_eq!(records[4].data, "[DONE]");

        let mut ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), records.len());
    }

    #[tokio::test]
    async fn stream_route_always_streams_and_ignores_system_messages() {
        let response = send(post_json(
            "/api/completions/stream",
            json!({"messages": [
                {"role": "system", "content": "hidden"},
                {"role": "user", "content": "hi"}
            ]}),
        ))
        .await;
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        let records = parse_records(&body_text(response).await);
        assert_eq!(deltas(&records), vec!["Echo: ", "hi "]);
    }

    #[tokio::test]
    async fn unknown_provider_fails_before_streaming() {
        let response = send(post_json(
            "/api/completions",
            json!({"prompt": "hi", "provider": "nope", "stream": true}),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "PROVIDER_NOT_FOUND");
    }

    #[tokio::test]
    async fn prompt_and_messages_together_is_a_validation_error() {
        let response = send(post_json(
            "/api/completions",
            json!({"prompt": "a", "messages": [{"role": "user", "content": "b"}], "stream": true}),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/completions")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"prompt\": "))
            .expect("request");
        let response = send(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");

        let bad_role = send(post_json(
            "/api/completions",
            json!({"messages": [{"role": "tool", "content": "x"}]}),
        ))
        .await;
        assert_eq!(bad_role.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unconfigured_provider_buffered_maps_to_503() {
        let response = send(post_json(
            "/api/completions",
            json!({"prompt": "hi", "provider": "openrouter"}),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "PROVIDER_NOT_CONFIGURED");
        assert_eq!(body["error"]["details"]["provider"], "openrouter");
    }

    #[tokio::test]
    async fn unconfigured_provider_streamed_ends_with_error_event() {
        let response = send(post_json(
            "/api/completions",
            json!({"prompt": "hi", "provider": "openrouter", "stream": true}),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let records = parse_records(&body_text(response).await);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event, "error");
        let data: Value = serde_json::from_str(&records[0].data).expect("json");
        assert_eq!(data["code"], "PROVIDER_NOT_CONFIGURED");
        assert_eq!(data["retryable"], false);
    }

    #[tokio::test]
    async fn last_event_id_is_accepted_without_replay() {
        let mut request = post_json("/api/completions/stream", json!({"prompt": "Hello world"}));
        request
            .headers_mut()
            .insert("last-event-id", header::HeaderValue::from_static("abc-2"));
        let records = parse_records(&body_text(send(request).await).await);
        assert_eq!(deltas(&records), vec!["Echo: ", "Hello ", "world "]);
    }

    #[tokio::test]
    async fn concurrent_streams_do_not_interfere() {
        let (left, right) = tokio::join!(
            send(post_json("/api/completions/stream", json!({"prompt": "alpha beta"}))),
            send(post_json("/api/completions/stream", json!({"prompt": "one two"}))),
        );
        let (left, right) = tokio::join!(body_text(left), body_text(right));
        assert_eq!(deltas(&parse_records(&left)), vec!["Echo: ", "alpha ", "beta "]);
        assert_eq!(deltas(&parse_records(&right)), vec!["Echo: ", "one ", "two "]);
    }
}
