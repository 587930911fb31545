use std::time::Duration;

/// Configuration for the echo provider.
#[derive(Clone, Debug)]
pub struct EchoConfig {
    /// Model name reported in responses and events.
    pub model: String,
    /// Artificial delay before each streamed word.
    pub word_delay: Duration,
    /// Default stream deadline; a request timeout takes precedence.
    pub timeout: Option<Duration>,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            model: "echo-1.0".to_string(),
            word_delay: Duration::from_millis(50),
            timeout: None,
        }
    }
}

impl EchoConfig {
    /// Overrides the per-word delay.
    pub fn word_delay(mut self, delay: Duration) -> Self {
        self.word_delay = delay;
        self
    }

    /// Sets the default stream deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the reported model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}
