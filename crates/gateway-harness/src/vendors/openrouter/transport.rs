//! Byte-level SSE decoding and OpenAI-style chunk normalization.
use serde_json::Value;
use tracing::{debug, warn};

use crate::content::Usage;
use crate::errors::{ProviderError, StreamError};
use crate::model::{EventIdGenerator, ProviderId};
use crate::redact::scrub_secrets;
use crate::stream::StreamEvent;

/// Splits an SSE byte stream into `data:` payloads.
///
/// One decoder per stream. Bytes are buffered until a full line is available,
/// so payloads and multi-byte characters split across reads come out whole.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one network read and returns every complete data frame.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let scan_from = self.buf.len();
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        let mut start = 0;
        for idx in scan_from..self.buf.len() {
            if self.buf[idx] == b'\n' {
                if let Some(frame) = parse_line(&self.buf[start..idx]) {
                    frames.push(frame);
                }
                start = idx + 1;
            }
        }
        self.buf.drain(..start);
        frames
    }

    /// Processes whatever is left once the upstream has ended.
    pub fn flush(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.buf);
        parse_line(&rest).into_iter().collect()
    }
}

fn parse_line(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let line = text.trim_end_matches('\r');
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let data = line.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data).to_string())
}

/// Turns chat-completion chunk payloads into canonical events.
#[derive(Debug)]
pub struct StreamNormalizer {
    provider: ProviderId,
    model: String,
    ids: EventIdGenerator,
    last_content_id: Option<String>,
    usage_emitted: bool,
    finished: bool,
}

impl StreamNormalizer {
    pub fn new(provider: ProviderId, model: impl Into<String>) -> Self {
        Self::with_ids(provider, model, EventIdGenerator::new())
    }

    pub fn with_ids(provider: ProviderId, model: impl Into<String>, ids: EventIdGenerator) -> Self {
        Self {
            provider,
            model: model.into(),
            ids,
            last_content_id: None,
            usage_emitted: false,
            finished: false,
        }
    }

    /// True once a `done` event has been produced.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Normalizes one data frame.
    ///
    /// Unparseable JSON becomes a non-terminal `MALFORMED_JSON` event. An
    /// upstream `error` object fails with a [`ProviderError`] for the taxonomy.
    pub fn normalize(&mut self, frame: &str) -> Result<Vec<StreamEvent>, ProviderError> {
        if self.finished {
            return Ok(Vec::new());
        }
        let payload = frame.trim();
        if payload == "[DONE]" {
            return Ok(vec![self.done()]);
        }
        if payload.is_empty() {
            return Ok(Vec::new());
        }

        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(err) => {
                warn!(provider = %self.provider, error = %err, "malformed stream frame");
                return Ok(vec![StreamEvent::Error {
                    event_id: self.ids.next_id(),
                    error: StreamError::malformed_json(payload, err),
                }]);
            }
        };
        if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
            return Err(upstream_error(&self.provider, error));
        }
        if let Some(model) = value.get("model").and_then(Value::as_str)
            && !model.is_empty()
        {
            self.model = model.to_string();
        }

        let mut events = Vec::new();
        if let Some(delta) = value.pointer("/choices/0/delta/content").and_then(Value::as_str)
            && !delta.is_empty()
        {
            let event_id = self.ids.next_id();
            debug!(provider = %self.provider, event_id = %event_id, "content delta");
            self.last_content_id = Some(event_id.clone());
            events.push(StreamEvent::Content {
                event_id,
                delta: delta.to_string(),
                model: self.model.clone(),
            });
        }
        if !self.usage_emitted
            && let Some(usage) = value.get("usage").and_then(parse_usage)
        {
            self.usage_emitted = true;
            events.push(StreamEvent::Usage {
                event_id: self.ids.next_id(),
                usage,
                model: self.model.clone(),
            });
        }
        Ok(events)
    }

    /// Terminal `done`, reusing the most recent content id when there is one.
    pub fn done(&mut self) -> StreamEvent {
        self.finished = true;
        let event_id = self
            .last_content_id
            .clone()
            .unwrap_or_else(|| self.ids.next_id());
        StreamEvent::Done { event_id }
    }
}

/// Reads an OpenAI-style `usage` object.
pub(crate) fn parse_usage(value: &Value) -> Option<Usage> {
    let prompt = value.get("prompt_tokens")?.as_u64()?;
    let completion = value.get("completion_tokens")?.as_u64()?;
    let prompt = u32::try_from(prompt).unwrap_or(u32::MAX);
    let completion = u32::try_from(completion).unwrap_or(u32::MAX);
    let mut usage = Usage::new(prompt, completion);
    if let Some(total) = value
        .get("total_tokens")
        .and_then(Value::as_u64)
        .and_then(|t| u32::try_from(t).ok())
    {
        usage.total_tokens = total;
    }
    Some(usage)
}

/// Maps an upstream `{"error": {...}}` object to a provider error.
///
/// A numeric `code` is treated as the HTTP status it mirrors.
pub(crate) fn upstream_error(provider: &ProviderId, error: &Value) -> ProviderError {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .or_else(|| error.as_str().map(ToOwned::to_owned))
        .unwrap_or_else(|| error.to_string());
    let status = error
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
        .filter(|code| (100..600).contains(code));
    ProviderError::provider(provider.clone(), scrub_secrets(&message), status)
}
