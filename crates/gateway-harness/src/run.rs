use std::sync::Arc;

use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::cancel::AbortHandle;
use crate::content::{CompletionResponse, Message, PromptInput, Usage};
use crate::errors::{HarnessError, ProviderError, StreamError};
use crate::harness::HarnessInner;
use crate::model::{EventIdGenerator, GenerationParams, ProviderId};
use crate::persist::{InteractionRecord, InteractionSink, spawn_record};
use crate::provider::{ProviderAdapter, ProviderRequest};
use crate::stream::StreamEvent;
use crate::taxonomy::classify_and_log;

/// One item read from a [`RunStream`].
///
/// `Err` means the provider failed instead of yielding an `error` event; the
/// error is already mapped through the taxonomy and nothing follows it.
pub type RunItem = Result<StreamEvent, HarnessError>;

/// Builder for configuring and starting a single completion.
///
/// Validation happens when [`RunBuilder::generate`] or
/// [`RunBuilder::start_stream`] is called, before any provider is touched.
pub struct RunBuilder {
    harness: Arc<HarnessInner>,
    provider: Option<String>,
    prompt: Option<String>,
    messages: Option<Vec<Message>>,
    params: GenerationParams,
    last_event_id: Option<String>,
}

impl RunBuilder {
    pub(crate) fn new(harness: Arc<HarnessInner>) -> Self {
        Self {
            harness,
            provider: None,
            prompt: None,
            messages: None,
            params: GenerationParams::default(),
            last_event_id: None,
        }
    }

    /// Names the provider. Omitted or blank uses the registry default.
    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.provider = Some(name.into());
        self
    }

    /// Sets a plain prompt.
    pub fn prompt(mut self, text: impl Into<String>) -> Self {
        self.prompt = Some(text.into());
        self
    }

    /// Sets the full message list.
    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Appends one message.
    pub fn message(mut self, message: Message) -> Self {
        self.messages.get_or_insert_with(Vec::new).push(message);
        self
    }

    /// Replaces prompt and messages with an already validated input.
    pub fn input(mut self, input: PromptInput) -> Self {
        match input {
            PromptInput::Prompt(prompt) => {
                self.prompt = Some(prompt);
                self.messages = None;
            }
            PromptInput::Messages(messages) => {
                self.prompt = None;
                self.messages = Some(messages);
            }
        }
        self
    }

    /// Replaces every generation parameter at once.
    pub fn params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.params.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.params.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.params.max_tokens = Some(max_tokens);
        self
    }

    /// Server-side deadline for the whole request or stream.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.params.timeout = Some(timeout);
        self
    }

    /// Sets the bounded stream buffer size used between the run task and
    /// the consumer.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.params.stream_buffer_capacity = capacity;
        self
    }

    /// Records the client's `Last-Event-ID`. Logged only; streams are never
    /// replayed.
    pub fn last_event_id(mut self, id: impl Into<String>) -> Self {
        self.last_event_id = Some(id.into());
        self
    }

    /// Runs a buffered completion.
    ///
    /// Provider failures come back as [`HarnessError::Provider`] carrying the
    /// taxonomy code.
    pub async fn generate(self) -> Result<CompletionResponse, HarnessError> {
        let ValidatedRun {
            harness,
            provider,
            request,
        } = self.validate()?;
        let provider_id = provider.id();
        let request_id = request.request_id;
        let input = request.input.clone();
        let timeout = request.params.timeout;
        info!(request_id = %request_id, provider = %provider_id, "buffered completion started");

        let call = provider.generate(request);
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::timeout(
                    provider_id.clone(),
                    format!("request timed out after {} ms", limit.as_millis()),
                )),
            },
            None => call.await,
        };
        let response = result.map_err(|err| HarnessError::Provider(classify_and_log(&err)))?;

        info!(
            request_id = %request_id,
            provider = %provider_id,
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            "buffered completion finished"
        );
        spawn_record(
            &harness.sink,
            InteractionRecord {
                request_id,
                provider: provider_id,
                model: response.model.clone(),
                input,
                content: response.content.clone(),
                usage: Some(response.usage),
                streamed: false,
            },
        );
        Ok(response)
    }

    /// Validates the request and starts a streaming run.
    ///
    /// Validation failures, unknown providers and buffered-only providers are
    /// returned here, before any event exists.
    pub async fn start_stream(self) -> Result<RunStream, HarnessError> {
        let ValidatedRun {
            harness,
            provider,
            mut request,
        } = self.validate()?;
        let provider_id = provider.id();
        if !provider.supports_streaming() {
            return Err(HarnessError::StreamingUnsupported {
                provider: provider_id,
            });
        }

        let abort_handle = AbortHandle::new();
        request.abort = abort_handle.signal();
        let request_id = request.request_id;
        if let Some(last_event_id) = &request.last_event_id {
            info!(
                request_id = %request_id,
                provider = %provider_id,
                last_event_id = %last_event_id,
                "client sent Last-Event-ID; starting a fresh stream"
            );
        }
        info!(request_id = %request_id, provider = %provider_id, "stream started");

        let (tx, rx) = mpsc::channel(request.params.stream_buffer_capacity);
        let (final_tx, final_rx) = oneshot::channel();
        tokio::spawn(run_task(
            provider,
            harness.sink.clone(),
            request,
            abort_handle.clone(),
            tx,
            final_tx,
        ));

        Ok(RunStream {
            request_id,
            provider: provider_id,
            rx,
            final_rx,
            abort_handle,
            saw_terminal: false,
        })
    }

    /// Streams to completion and returns the aggregated summary.
    pub async fn collect(self) -> Result<StreamSummary, HarnessError> {
        self.start_stream().await?.finish().await
    }

    fn validate(self) -> Result<ValidatedRun, HarnessError> {
        if self.params.stream_buffer_capacity == 0 {
            return Err(HarnessError::Validation(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        if let Some(temperature) = self.params.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(HarnessError::Validation(
                "temperature must be between 0 and 2".into(),
            ));
        }
        if self.params.max_tokens == Some(0) {
            return Err(HarnessError::Validation(
                "maxTokens must be greater than 0".into(),
            ));
        }
        let input = PromptInput::from_parts(self.prompt, self.messages)?;
        let provider = self.harness.resolve(self.provider.as_deref())?;

        let mut request = ProviderRequest::new(input);
        request.params = self.params;
        request.last_event_id = self.last_event_id;
        Ok(ValidatedRun {
            harness: self.harness,
            provider,
            request,
        })
    }
}

struct ValidatedRun {
    harness: Arc<HarnessInner>,
    provider: Arc<dyn ProviderAdapter>,
    request: ProviderRequest,
}

/// What a finished stream produced.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamSummary {
    pub request_id: uuid::Uuid,
    pub provider: ProviderId,
    /// Model reported by the last content or usage event.
    pub model: Option<String>,
    /// Concatenated content deltas.
    pub content: String,
    pub usage: Option<Usage>,
    /// Non-terminal decode errors seen along the way.
    pub decode_errors: Vec<StreamError>,
    /// Id of the terminal `done` event.
    pub last_event_id: Option<String>,
}

impl StreamSummary {
    fn new(request_id: uuid::Uuid, provider: ProviderId) -> Self {
        Self {
            request_id,
            provider,
            model: None,
            content: String::new(),
            usage: None,
            decode_errors: Vec::new(),
            last_event_id: None,
        }
    }

    fn observe(&mut self, event: &StreamEvent) {
        self.last_event_id = Some(event.event_id().to_string());
        match event {
            StreamEvent::Content { delta, model, .. } => {
                self.content.push_str(delta);
                self.model = Some(model.clone());
            }
            StreamEvent::Usage { usage, model, .. } => {
                self.usage = Some(*usage);
                self.model = Some(model.clone());
            }
            StreamEvent::Error { error, .. } if !error.code.is_terminal() => {
                self.decode_errors.push(error.clone());
            }
            StreamEvent::Done { .. } | StreamEvent::Error { .. } => {}
        }
    }
}

/// Streaming handle returned by [`RunBuilder::start_stream`].
///
/// Use `next_event()` to consume items as they arrive and `finish()` to drain
/// and obtain the summary. Dropping the handle stops the provider.
pub struct RunStream {
    request_id: uuid::Uuid,
    provider: ProviderId,
    rx: mpsc::Receiver<RunItem>,
    final_rx: oneshot::Receiver<Result<StreamSummary, HarnessError>>,
    abort_handle: AbortHandle,
    saw_terminal: bool,
}

impl RunStream {
    pub fn request_id(&self) -> uuid::Uuid {
        self.request_id
    }

    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    /// Returns a handle that can cancel the run.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for the next item. Returns `None` once the run task is gone.
    pub async fn next_event(&mut self) -> Option<RunItem> {
        let item = self.rx.recv().await;
        match &item {
            Some(Ok(event)) if event.is_terminal() => self.saw_terminal = true,
            Some(Err(_)) => self.saw_terminal = true,
            _ => {}
        }
        item
    }

    /// Drains the stream (if needed) and returns the summary, or the terminal
    /// error.
    pub async fn finish(mut self) -> Result<StreamSummary, HarnessError> {
        while !self.saw_terminal {
            if self.next_event().await.is_none() {
                break;
            }
        }
        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(HarnessError::Provider(classify_and_log(
                &ProviderError::protocol(
                    self.provider.clone(),
                    "run task ended without a final result",
                ),
            ))),
        }
    }
}

async fn run_task(
    provider: Arc<dyn ProviderAdapter>,
    sink: Arc<dyn InteractionSink>,
    request: ProviderRequest,
    abort: AbortHandle,
    tx: mpsc::Sender<RunItem>,
    final_tx: oneshot::Sender<Result<StreamSummary, HarnessError>>,
) {
    let request_id = request.request_id;
    let provider_id = provider.id();
    let input = request.input.clone();
    let signal = abort.signal();
    let mut ids = EventIdGenerator::new();
    let mut summary = StreamSummary::new(request_id, provider_id.clone());

    let started = tokio::select! {
        biased;
        _ = signal.cancelled() => {
            send_cancelled(&tx, final_tx, ids.next_id()).await;
            return;
        }
        _ = tx.closed() => {
            debug!(request_id = %request_id, provider = %provider_id, "consumer dropped before stream start");
            return;
        }
        started = provider.start_stream(request) => started,
    };
    let mut handle = match started {
        Ok(handle) => handle,
        Err(err) => {
            send_failure(&tx, final_tx, classify_and_log(&err)).await;
            return;
        }
    };
    if let Some(model) = handle.metadata.model.take() {
        summary.model = Some(model);
    }

    loop {
        tokio::select! {
            biased;
            _ = signal.cancelled() => {
                info!(request_id = %request_id, provider = %provider_id, "stream cancelled");
                send_cancelled(&tx, final_tx, ids.next_id()).await;
                return;
            }
            _ = tx.closed() => {
                debug!(request_id = %request_id, provider = %provider_id, "consumer dropped; stopping provider");
                return;
            }
            next = handle.stream.next() => {
                match next {
                    Some(Ok(event)) => {
                        debug!(
                            request_id = %request_id,
                            provider = %provider_id,
                            event_id = %event.event_id(),
                            kind = event.kind(),
                            "stream event"
                        );
                        summary.observe(&event);
                        let outcome = match &event {
                            StreamEvent::Done { .. } => Some(Ok(())),
                            StreamEvent::Error { error, .. } if error.code.is_terminal() => {
                                Some(Err(HarnessError::Provider(error.clone())))
                            }
                            _ => None,
                        };
                        if !send_item(&tx, Ok(event)).await {
                            debug!(request_id = %request_id, provider = %provider_id, "consumer dropped during output");
                            return;
                        }
                        match outcome {
                            Some(Ok(())) => {
                                info!(
                                    request_id = %request_id,
                                    provider = %provider_id,
                                    content_chars = summary.content.chars().count(),
                                    "stream finished"
                                );
                                spawn_record(&sink, InteractionRecord {
                                    request_id,
                                    provider: provider_id.clone(),
                                    model: summary.model.clone().unwrap_or_default(),
                                    input,
                                    content: summary.content.clone(),
                                    usage: summary.usage,
                                    streamed: true,
                                });
                                let _ = final_tx.send(Ok(summary));
                                return;
                            }
                            Some(Err(err)) => {
                                let _ = final_tx.send(Err(err));
                                return;
                            }
                            None => {}
                        }
                    }
                    Some(Err(err)) => {
                        send_failure(&tx, final_tx, classify_and_log(&err)).await;
                        return;
                    }
                    None => {
                        let err = ProviderError::protocol(
                            provider_id.clone(),
                            "provider stream ended without a terminal event",
                        );
                        send_failure(&tx, final_tx, classify_and_log(&err)).await;
                        return;
                    }
                }
            }
        }
    }
}

async fn send_cancelled(
    tx: &mpsc::Sender<RunItem>,
    final_tx: oneshot::Sender<Result<StreamSummary, HarnessError>>,
    event_id: String,
) {
    let error = StreamError::cancelled();
    let _ = send_item(
        tx,
        Ok(StreamEvent::Error {
            event_id,
            error: error.clone(),
        }),
    )
    .await;
    let _ = final_tx.send(Err(HarnessError::Provider(error)));
}

async fn send_failure(
    tx: &mpsc::Sender<RunItem>,
    final_tx: oneshot::Sender<Result<StreamSummary, HarnessError>>,
    error: StreamError,
) {
    let _ = send_item(tx, Err(HarnessError::Provider(error.clone()))).await;
    let _ = final_tx.send(Err(HarnessError::Provider(error)));
}

async fn send_item(tx: &mpsc::Sender<RunItem>, item: RunItem) -> bool {
    tx.send(item).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Harness;
    use crate::errors::ErrorCode;
    use crate::provider::{ProviderResponseMeta, ProviderStreamHandle};
    use crate::vendors::echo::{EchoConfig, EchoProvider};
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    enum Behavior {
        StartError(ProviderError),
        Events(Vec<Result<StreamEvent, ProviderError>>),
        Pending,
    }

    struct FakeProvider {
        streaming: bool,
        calls: Arc<AtomicUsize>,
        behavior: Behavior,
    }

    impl FakeProvider {
        fn new(behavior: Behavior) -> Self {
            Self {
                streaming: true,
                calls: Arc::new(AtomicUsize::new(0)),
                behavior,
            }
        }
    }

    #[async_trait::async_trait]
    impl ProviderAdapter for FakeProvider {
        fn id(&self) -> ProviderId {
            ProviderId::new("fake")
        }

        fn is_available(&self) -> bool {
            true
        }

        fn always_available(&self) -> bool {
            true
        }

        fn supports_streaming(&self) -> bool {
            self.streaming
        }

        fn default_model(&self) -> String {
            "fake-1".into()
        }

        async fn generate(&self, _req: ProviderRequest) -> Result<CompletionResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(CompletionResponse {
                content: "late".into(),
                model: "fake-1".into(),
                usage: Usage::default(),
            })
        }

        async fn start_stream(
            &self,
            _req: ProviderRequest,
        ) -> Result<ProviderStreamHandle, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let stream: crate::provider::ProviderEventStream = match &self.behavior {
                Behavior::StartError(err) => return Err(err.clone()),
                Behavior::Events(events) => Box::pin(stream::iter(events.clone())),
                Behavior::Pending => Box::pin(stream::pending()),
            };
            Ok(ProviderStreamHandle {
                stream,
                metadata: ProviderResponseMeta::default(),
            })
        }
    }

    struct RecordingSink(mpsc::UnboundedSender<InteractionRecord>);

    #[async_trait::async_trait]
    impl InteractionSink for RecordingSink {
        async fn record(&self, record: InteractionRecord) {
            let _ = self.0.send(record);
        }
    }

    fn fake_harness(provider: FakeProvider) -> Harness {
        Harness::builder()
            .register_provider(Arc::new(provider))
            .build()
            .expect("harness")
    }

    fn echo_harness() -> (Harness, mpsc::UnboundedReceiver<InteractionRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let harness = Harness::builder()
            .register_provider(Arc::new(EchoProvider::new(
                EchoConfig::default().word_delay(Duration::from_millis(1)),
            )))
            .interaction_sink(Arc::new(RecordingSink(tx)))
            .build()
            .expect("harness");
        (harness, rx)
    }

    fn content(id: &str, delta: &str) -> Result<StreamEvent, ProviderError> {
        Ok(StreamEvent::Content {
            event_id: id.into(),
            delta: delta.into(),
            model: "fake-1".into(),
        })
    }

    fn done(id: &str) -> Result<StreamEvent, ProviderError> {
        Ok(StreamEvent::Done {
            event_id: id.into(),
        })
    }

    async fn start_err(builder: RunBuilder) -> HarnessError {
        match builder.start_stream().await {
            Ok(_) => panic!("start should fail"),
            Err(err) => err,
        }
    }

    #[tokio::test]
    async fn validation_fails_before_the_provider_is_called() {
        let provider = FakeProvider::new(Behavior::Events(vec![]));
        let calls = provider.calls.clone();
        let harness = fake_harness(provider);

        let neither = start_err(harness.run()).await;
        assert!(matches!(neither, HarnessError::Validation(msg) if msg.contains("required")));

        let both = start_err(harness.run().prompt("a").message(Message::user("b"))).await;
        assert!(matches!(both, HarnessError::Validation(msg) if msg.contains("not both")));

        let empty = start_err(harness.run().messages(vec![])).await;
        assert!(matches!(empty, HarnessError::Validation(msg) if msg.contains("at least one")));

        let temperature = start_err(harness.run().prompt("a").temperature(3.5)).await;
        assert!(matches!(temperature, HarnessError::Validation(_)));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_provider_is_a_start_time_client_error() {
        let harness = fake_harness(FakeProvider::new(Behavior::Events(vec![])));
        let err = start_err(harness.run().provider("missing").prompt("hi")).await;
        assert!(err.is_client_error());
        assert_eq!(err.code(), "PROVIDER_NOT_FOUND");
        assert_eq!(err.http_status(), 404);
    }

    #[tokio::test]
    async fn buffered_only_provider_rejects_streaming() {
        let mut provider = FakeProvider::new(Behavior::Events(vec![]));
        provider.streaming = false;
        let calls = provider.calls.clone();
        let harness = fake_harness(provider);
        let err = start_err(harness.run().prompt("hi")).await;
        assert!(
            matches!(&err, HarnessError::StreamingUnsupported { provider } if provider.as_str() == "fake")
        );
        assert_eq!(err.to_string(), "provider does not support streaming: fake");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn events_pass_through_unchanged_and_summary_aggregates() {
        let decode_error = StreamEvent::Error {
            event_id: "e-2".into(),
            error: StreamError::malformed_json("{oops", "expected value"),
        };
        let harness = fake_harness(FakeProvider::new(Behavior::Events(vec![
            content("e-0", "Hel"),
            content("e-1", "lo"),
            Ok(decode_error.clone()),
            Ok(StreamEvent::Usage {
                event_id: "e-3".into(),
                usage: Usage::new(1, 2),
                model: "fake-1".into(),
            }),
            done("e-1"),
        ])));
        let mut stream = harness.run().prompt("hi").start_stream().await.expect("start");

        let mut events = Vec::new();
        while let Some(item) = stream.next_event().await {
            let event = item.expect("no failure");
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        assert_eq!(events.len(), 5);
        assert_eq!(events[2], decode_error);
        assert_eq!(events[4].event_id(), "e-1");

        let summary = stream.finish().await.expect("summary");
        assert_eq!(summary.content, "Hello");
        assert_eq!(summary.usage, Some(Usage::new(1, 2)));
        assert_eq!(summary.model.as_deref(), Some("fake-1"));
        assert_eq!(summary.decode_errors.len(), 1);
        assert_eq!(summary.last_event_id.as_deref(), Some("e-1"));
    }

    #[tokio::test]
    async fn provider_failure_is_mapped_once_and_ends_the_stream() {
        let harness = fake_harness(FakeProvider::new(Behavior::Events(vec![
            content("e-0", "partial"),
            Err(ProviderError::provider("fake", "slow down", Some(429))),
            content("e-1", "never seen"),
        ])));
        let mut stream = harness.run().prompt("hi").start_stream().await.expect("start");

        let first = stream.next_event().await.expect("item").expect("content");
        assert!(matches!(first, StreamEvent::Content { .. }));
        let second = stream.next_event().await.expect("item");
        let err = second.expect_err("mapped failure");
        assert_eq!(err.code(), "PROVIDER_RATE_LIMITED");
        assert!(matches!(&err, HarnessError::Provider(e) if e.retryable));
        assert!(stream.next_event().await.is_none());
    }

    #[tokio::test]
    async fn start_failure_surfaces_as_mapped_item() {
        let harness = fake_harness(FakeProvider::new(Behavior::StartError(
            ProviderError::not_configured("fake", "OPENROUTER_API_KEY is not set"),
        )));
        let stream = harness.run().prompt("hi").start_stream().await.expect("start");
        let err = stream.finish().await.expect_err("not configured");
        assert_eq!(err.code(), "PROVIDER_NOT_CONFIGURED");
        assert_eq!(err.http_status(), 503);
    }

    #[tokio::test]
    async fn stream_without_terminal_event_is_a_provider_error() {
        let harness = fake_harness(FakeProvider::new(Behavior::Events(vec![content(
            "e-0", "half",
        )])));
        let err = harness.run().prompt("hi").collect().await.expect_err("truncated");
        assert_eq!(err.code(), "PROVIDER_API_ERROR");
    }

    #[tokio::test]
    async fn abort_emits_one_cancellation_event() {
        let harness = fake_harness(FakeProvider::new(Behavior::Pending));
        let mut stream = harness.run().prompt("hi").start_stream().await.expect("start");
        stream.abort_handle().abort();

        let item = stream.next_event().await.expect("item").expect("event");
        assert!(matches!(
            &item,
            StreamEvent::Error { error, .. } if error.code == ErrorCode::RequestCancelled
        ));
        assert!(stream.next_event().await.is_none());
    }

    #[tokio::test]
    async fn echo_stream_records_interaction_after_done() {
        let (harness, mut records) = echo_harness();
        let summary = harness.run().prompt("Hello world").collect().await.expect("summary");
        assert_eq!(summary.content, "Echo: Hello world ");
        assert_eq!(summary.usage, Some(Usage::new(3, 5)));

        let record = records.recv().await.expect("record");
        assert!(record.streamed);
        assert_eq!(record.request_id, summary.request_id);
        assert_eq!(record.model, "echo-1.0");
    }

    #[tokio::test]
    async fn echo_generate_is_exact_and_recorded() {
        let (harness, mut records) = echo_harness();
        let response = harness.run().prompt("Hello world").generate().await.expect("generate");
        assert_eq!(response.content, "Echo: Hello world");
        assert_eq!(response.model, "echo-1.0");
        assert_eq!(response.usage, Usage::new(3, 5));

        let record = records.recv().await.expect("record");
        assert!(!record.streamed);
        assert_eq!(record.content, "Echo: Hello world");
    }

    #[tokio::test]
    async fn buffered_timeout_maps_to_connection_timeout() {
        let harness = fake_harness(FakeProvider::new(Behavior::Events(vec![])));
        let err = harness
            .run()
            .prompt("hi")
            .timeout(Duration::from_millis(10))
            .generate()
            .await
            .expect_err("timeout");
        assert_eq!(err.code(), "CONNECTION_TIMEOUT");
        assert_eq!(err.http_status(), 504);
    }

    #[tokio::test]
    async fn last_event_id_does_not_change_the_stream() {
        let (harness, _records) = echo_harness();
        let summary = harness
            .run()
            .prompt("Hello world")
            .last_event_id("abc-7")
            .collect()
            .await
            .expect("summary");
        assert_eq!(summary.content, "Echo: Hello world ");
    }
}
