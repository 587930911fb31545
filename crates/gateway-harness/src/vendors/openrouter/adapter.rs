use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream;
use serde_json::Value;
use tracing::debug;

use crate::content::{CompletionResponse, Usage};
use crate::errors::{HarnessError, ProviderError};
use crate::model::ProviderId;
use crate::provider::{
    ProviderAdapter, ProviderRequest, ProviderResponseMeta, ProviderStreamHandle,
};
use crate::redact::scrub_secrets;
use crate::stream::StreamEvent;

use super::config::OpenRouterConfig;
use super::transport::{SseDecoder, StreamNormalizer, parse_usage, upstream_error};

pub const OPENROUTER_PROVIDER: &str = "openrouter";

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// Provider adapter for OpenRouter's OpenAI-compatible chat completions API.
pub struct OpenRouterProvider {
    client: reqwest::Client,
    config: OpenRouterConfig,
}

impl OpenRouterProvider {
    /// Creates a provider from explicit client configuration.
    ///
    /// A missing key is not an error here; the provider reports itself
    /// unavailable until one is set.
    pub fn new(config: OpenRouterConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| HarnessError::Config(format!("failed to build OpenRouter client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a provider configured from `OPENROUTER_*` variables.
    pub fn from_env() -> Result<Self, HarnessError> {
        Self::new(OpenRouterConfig::from_env())
    }

    fn provider_id() -> ProviderId {
        ProviderId::new(OPENROUTER_PROVIDER)
    }

    fn model_for(&self, req: &ProviderRequest) -> String {
        req.params
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.config.default_model.as_str())
            .to_string()
    }

    async fn send(
        &self,
        req: &ProviderRequest,
        model: &str,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let provider_id = Self::provider_id();
        let api_key = self.config.credentials.resolve().ok_or_else(|| {
            ProviderError::not_configured(
                provider_id.clone(),
                format!("{} is not set", self.config.credentials.describe()),
            )
        })?;
        let body = build_request_body(req, model, stream);
        debug!(request_id = %req.request_id, model = %model, stream, "sending OpenRouter request");

        let mut http_req = self
            .client
            .post(self.config.chat_completions_url())
            .bearer_auth(api_key)
            .json(&body);
        if let Some(timeout) = req.params.timeout {
            http_req = http_req.timeout(timeout);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(provider_id.clone(), "OpenRouter request failed", &e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::provider(
                provider_id,
                format!(
                    "OpenRouter request failed with status {status}: {}",
                    error_body_message(&body)
                ),
                Some(status.as_u16()),
            ));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenRouterProvider {
    fn id(&self) -> ProviderId {
        Self::provider_id()
    }

    fn is_available(&self) -> bool {
        self.config.credentials.resolve().is_some()
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn default_model(&self) -> String {
        self.config.default_model.clone()
    }

    async fn generate(&self, req: ProviderRequest) -> Result<CompletionResponse, ProviderError> {
        let provider_id = Self::provider_id();
        let model = self.model_for(&req);
        let response = self.send(&req, &model, false).await?;
        let value: Value = response.json().await.map_err(|e| {
            ProviderError::from_reqwest(provider_id.clone(), "failed to read OpenRouter response", &e)
        })?;
        if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
            return Err(upstream_error(&provider_id, error));
        }

        let content = value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ProviderError::protocol(
                    provider_id.clone(),
                    "OpenRouter response has no choices[0].message.content",
                )
            })?
            .to_string();
        let usage = value.get("usage").and_then(parse_usage).unwrap_or_else(|| {
            Usage::estimate(&req.input.conversation_text(), &content)
        });
        let model = value
            .get("model")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or(model);
        Ok(CompletionResponse {
            content,
            model,
            usage,
        })
    }

    async fn start_stream(
        &self,
        req: ProviderRequest,
    ) -> Result<ProviderStreamHandle, ProviderError> {
        let model = self.model_for(&req);
        let response = self.send(&req, &model, true).await?;
        let bytes_stream: ByteStream = Box::pin(response.bytes_stream());
        let stream = openrouter_event_stream(
            StreamNormalizer::new(Self::provider_id(), model.clone()),
            bytes_stream,
        );
        Ok(ProviderStreamHandle {
            stream: Box::pin(stream),
            metadata: ProviderResponseMeta { model: Some(model) },
        })
    }
}

/// Chat-completions body: `{model, messages, stream, temperature?, max_tokens?}`.
pub(crate) fn build_request_body(req: &ProviderRequest, model: &str, stream: bool) -> Value {
    let messages: Vec<Value> = req
        .input
        .to_messages()
        .into_iter()
        .map(|m| serde_json::json!({ "role": m.role.as_str(), "content": m.content }))
        .collect();
    let mut body = serde_json::json!({
        "model": model,
        "messages": messages,
        "stream": stream,
    });
    if let Some(temperature) = req.params.temperature {
        body["temperature"] = serde_json::json!(temperature);
    }
    if let Some(max_tokens) = req.params.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    body
}

fn error_body_message(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| body.chars().take(512).collect());
    scrub_secrets(&message)
}

fn openrouter_event_stream(
    normalizer: StreamNormalizer,
    bytes_stream: ByteStream,
) -> impl futures::Stream<Item = Result<StreamEvent, ProviderError>> + Send {
    struct State {
        bytes_stream: ByteStream,
        decoder: SseDecoder,
        normalizer: StreamNormalizer,
        pending: VecDeque<StreamEvent>,
        failure: Option<ProviderError>,
        done: bool,
    }

    impl State {
        fn push_frames(&mut self, frames: Vec<String>) {
            for frame in frames {
                if self.normalizer.is_finished() || self.failure.is_some() {
                    break;
                }
                match self.normalizer.normalize(&frame) {
                    Ok(events) => self.pending.extend(events),
                    Err(err) => self.failure = Some(err),
                }
            }
            if self.normalizer.is_finished() || self.failure.is_some() {
                self.done = true;
            }
        }
    }

    stream::try_unfold(
        State {
            bytes_stream,
            decoder: SseDecoder::new(),
            normalizer,
            pending: VecDeque::new(),
            failure: None,
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if let Some(err) = state.failure.take() {
                    return Err(err);
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        let frames = state.decoder.feed(&chunk);
                        state.push_frames(frames);
                    }
                    Some(Err(e)) => {
                        return Err(ProviderError::from_reqwest(
                            OPENROUTER_PROVIDER,
                            "OpenRouter stream read failed",
                            &e,
                        ));
                    }
                    None => {
                        let frames = state.decoder.flush();
                        state.push_frames(frames);
                        if !state.normalizer.is_finished() && state.failure.is_none() {
                            debug!("upstream ended without [DONE]; closing stream");
                            let done = state.normalizer.done();
                            state.pending.push_back(done);
                        }
                        state.done = true;
                    }
                }
            }
        },
    )
}
