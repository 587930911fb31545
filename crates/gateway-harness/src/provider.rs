use std::pin::Pin;

use crate::cancel::AbortSignal;
use crate::content::{CompletionResponse, PromptInput};
use crate::errors::ProviderError;
use crate::model::{GenerationParams, ProviderId};
use crate::stream::StreamEvent;

/// Ordered provider event stream. Providers may either yield an `Error`
/// event or fail the stream with `Err`; the orchestrator classifies the latter.
pub type ProviderEventStream =
    Pin<Box<dyn futures::Stream<Item = Result<StreamEvent, ProviderError>> + Send + 'static>>;

/// Request handed to a provider adapter after validation.
#[derive(Clone, Debug)]
pub struct ProviderRequest {
    pub request_id: uuid::Uuid,
    pub input: PromptInput,
    pub params: GenerationParams,
    /// Inbound `Last-Event-ID`, passed through for observability only.
    pub last_event_id: Option<String>,
    pub abort: AbortSignal,
}

impl ProviderRequest {
    /// Creates a request with default params and a signal that never fires.
    pub fn new(input: PromptInput) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4(),
            input,
            params: GenerationParams::default(),
            last_event_id: None,
            abort: AbortSignal::never(),
        }
    }
}

/// Metadata known when a provider stream starts.
#[derive(Clone, Debug, Default)]
pub struct ProviderResponseMeta {
    /// Model that serves the stream, when known up front.
    pub model: Option<String>,
}

/// A started provider stream.
pub struct ProviderStreamHandle {
    pub stream: ProviderEventStream,
    pub metadata: ProviderResponseMeta,
}

/// Capability contract every backend implements.
///
/// Implementations are stateless configuration plus pure functions, so one
/// instance serves concurrent requests without shared mutable state.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Registry key (for example `echo`).
    fn id(&self) -> ProviderId;

    /// Whether the provider is usable with the current configuration.
    ///
    /// Evaluated on every call and free of side effects.
    fn is_available(&self) -> bool;

    /// True for providers that need no configuration at all.
    fn always_available(&self) -> bool {
        false
    }

    /// Whether [`ProviderAdapter::start_stream`] is implemented.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Model used when the request does not name one.
    fn default_model(&self) -> String;

    /// Buffered completion.
    async fn generate(&self, req: ProviderRequest) -> Result<CompletionResponse, ProviderError>;

    /// Incremental completion.
    async fn start_stream(
        &self,
        _req: ProviderRequest,
    ) -> Result<ProviderStreamHandle, ProviderError> {
        Err(ProviderError::unsupported(
            self.id(),
            "provider does not support streaming",
        ))
    }
}
