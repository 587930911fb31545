//! Deterministic provider that needs no configuration.
//!
//! Replies `"Echo: " + text`, where `text` is the prompt or every non-system
//! message joined by single spaces. Token counts are `ceil(chars / 4)`.
mod config;

pub use config::EchoConfig;

use std::time::Duration;

use futures::Stream;
use tokio::time::Instant;
use tracing::debug;

use crate::cancel::AbortSignal;
use crate::content::{CompletionResponse, Usage};
use crate::errors::{ProviderError, StreamError};
use crate::model::{EventIdGenerator, ProviderId};
use crate::provider::{
    ProviderAdapter, ProviderRequest, ProviderResponseMeta, ProviderStreamHandle,
};
use crate::stream::StreamEvent;

pub const ECHO_PROVIDER: &str = "echo";

/// Always-available reference provider.
#[derive(Clone, Debug, Default)]
pub struct EchoProvider {
    config: EchoConfig,
}

impl EchoProvider {
    pub fn new(config: EchoConfig) -> Self {
        Self { config }
    }

    fn model_for(&self, req: &ProviderRequest) -> String {
        req.params
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.config.model.clone())
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for EchoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(ECHO_PROVIDER)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn always_available(&self) -> bool {
        true
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn default_model(&self) -> String {
        self.config.model.clone()
    }

    async fn generate(&self, req: ProviderRequest) -> Result<CompletionResponse, ProviderError> {
        let text = req.input.conversation_text();
        let content = format!("Echo: {text}");
        Ok(CompletionResponse {
            usage: Usage::estimate(&text, &content),
            content,
            model: self.model_for(&req),
        })
    }

    async fn start_stream(
        &self,
        req: ProviderRequest,
    ) -> Result<ProviderStreamHandle, ProviderError> {
        let model = self.model_for(&req);
        let timeout = req.params.timeout.or(self.config.timeout);
        debug!(
            request_id = %req.request_id,
            model = %model,
            word_delay_ms = self.config.word_delay.as_millis() as u64,
            "starting echo stream"
        );
        let stream = echo_stream(
            model.clone(),
            req.input.conversation_text(),
            self.config.word_delay,
            timeout,
            req.abort,
        );
        Ok(ProviderStreamHandle {
            stream: Box::pin(stream),
            metadata: ProviderResponseMeta { model: Some(model) },
        })
    }
}

fn echo_stream(
    model: String,
    text: String,
    word_delay: Duration,
    timeout: Option<Duration>,
    abort: AbortSignal,
) -> impl Stream<Item = Result<StreamEvent, ProviderError>> + Send + 'static {
    async_stream::stream! {
        let mut ids = EventIdGenerator::new();
        let content = format!("Echo: {text}");
        let deadline = timeout.map(|t| Instant::now() + t);

        for word in content.split(' ').filter(|w| !w.is_empty()) {
            let interrupted = tokio::select! {
                biased;
                _ = abort.cancelled() => Some(StreamError::cancelled()),
                _ = deadline_elapsed(deadline) => {
                    Some(StreamError::timed_out(timeout.unwrap_or_default()))
                }
                _ = tokio::time::sleep(word_delay) => None,
            };
            if let Some(error) = interrupted {
                yield Ok(StreamEvent::Error { event_id: ids.next_id(), error });
                return;
            }
            yield Ok(StreamEvent::Content {
                event_id: ids.next_id(),
                delta: format!("{word} "),
                model: model.clone(),
            });
        }

        yield Ok(StreamEvent::Usage {
            event_id: ids.next_id(),
            usage: Usage::estimate(&text, &content),
            model: model.clone(),
        });
        yield Ok(StreamEvent::Done { event_id: ids.next_id() });
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
