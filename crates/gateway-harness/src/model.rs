use std::fmt;
use std::time::Duration;

/// Stable identifier for a provider implementation (for example `echo`).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, serde::Serialize, serde::Deserialize)]
pub struct ProviderId(pub String);

impl ProviderId {
    /// Creates a provider id from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the provider id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Per-request generation parameters.
///
/// Providers read only the fields they understand; the echo provider ignores
/// everything but `timeout`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GenerationParams {
    /// Provider-specific model override. `None` uses the provider default.
    pub model: Option<String>,
    /// Sampling temperature forwarded to HTTP backends.
    pub temperature: Option<f32>,
    /// Upper bound on completion tokens forwarded to HTTP backends.
    pub max_tokens: Option<u32>,
    /// Server-side deadline for the whole request or stream.
    pub timeout: Option<Duration>,
    /// Bounded event buffer size between the run task and the consumer.
    pub stream_buffer_capacity: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: None,
            temperature: None,
            max_tokens: None,
            timeout: None,
            stream_buffer_capacity: 16,
        }
    }
}

/// Stamps events with ids that are unique and ordered within one stream.
///
/// Ids look like `3f2a9c1e-7`: a short per-stream prefix and a sequence number.
#[derive(Debug, Clone)]
pub struct EventIdGenerator {
    prefix: String,
    next: u64,
}

impl EventIdGenerator {
    /// Creates a generator with a random prefix.
    pub fn new() -> Self {
        let simple = uuid::Uuid::new_v4().simple().to_string();
        Self::with_prefix(&simple[..8])
    }

    /// Creates a generator with an explicit prefix (useful in tests).
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }

    /// Returns the next id in sequence.
    pub fn next_id(&mut self) -> String {
        let id = format!("{}-{}", self.prefix, self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

impl Default for EventIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
