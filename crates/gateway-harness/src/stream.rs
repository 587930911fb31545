use crate::content::Usage;
use crate::errors::StreamError;

/// Canonical stream event. Every provider's native stream is normalized into
/// this union, so consumers never branch on provider identity.
///
/// A stream ends with exactly one `Done` or one terminal `Error`.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// Incremental text fragment.
    Content {
        event_id: String,
        delta: String,
        model: String,
    },
    /// Token accounting. At most once per stream.
    Usage {
        event_id: String,
        usage: Usage,
        model: String,
    },
    /// Successful end of stream.
    Done { event_id: String },
    /// Failure. Terminal unless the code is a decode error.
    Error { event_id: String, error: StreamError },
}

impl StreamEvent {
    /// Opaque per-event id, used by clients for continuity hints.
    pub fn event_id(&self) -> &str {
        match self {
            Self::Content { event_id, .. }
            | Self::Usage { event_id, .. }
            | Self::Done { event_id }
            | Self::Error { event_id, .. } => event_id,
        }
    }

    /// Wire name of the event type (`content`, `usage`, `done`, `error`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Content { .. } => "content",
            Self::Usage { .. } => "usage",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    /// True for the event that ends the stream.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Done { .. } => true,
            Self::Error { error, .. } => error.code.is_terminal(),
            Self::Content { .. } | Self::Usage { .. } => false,
        }
    }

    /// JSON payload for the `data:` line. `None` for `done`, which is written
    /// as the literal `[DONE]`.
    pub fn data(&self) -> Option<serde_json::Value> {
        match self {
            Self::Content { delta, model, .. } => {
                Some(serde_json::json!({ "delta": delta, "model": model }))
            }
            Self::Usage { usage, model, .. } => Some(serde_json::json!({
                "promptTokens": usage.prompt_tokens,
                "completionTokens": usage.completion_tokens,
                "totalTokens": usage.total_tokens,
                "model": model,
            })),
            Self::Done { .. } => None,
            Self::Error { error, .. } => serde_json::to_value(error).ok(),
        }
    }
}
