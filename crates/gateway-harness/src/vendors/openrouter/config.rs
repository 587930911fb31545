use std::time::Duration;

use crate::errors::HarnessError;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const BASE_URL_ENV: &str = "OPENROUTER_BASE_URL";

/// Where the API key comes from.
#[derive(Clone, Debug)]
pub enum Credentials {
    /// Read from this environment variable on every use.
    Env(String),
    /// Fixed key (tests, embedding applications).
    Static(String),
}

impl Credentials {
    /// Current key, or `None` when unset or blank.
    pub fn resolve(&self) -> Option<String> {
        let key = match self {
            Self::Env(var) => std::env::var(var).ok()?,
            Self::Static(key) => key.clone(),
        };
        let key = key.trim();
        (!key.is_empty()).then(|| key.to_string())
    }

    /// Human-readable source, used in "not configured" messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Env(var) => var.clone(),
            Self::Static(_) => "configured api key".to_string(),
        }
    }
}

/// Configuration for the OpenRouter provider client.
#[derive(Clone, Debug)]
pub struct OpenRouterConfig {
    pub credentials: Credentials,
    /// Base URL for the OpenAI-compatible endpoint.
    ///
    /// Useful for proxies or local test servers.
    pub base_url: String,
    /// Model used when a request names none.
    pub default_model: String,
    /// Default HTTP timeout; a per-request timeout takes precedence.
    pub timeout: Duration,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::Env(API_KEY_ENV.to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl OpenRouterConfig {
    /// Reads the key from `OPENROUTER_API_KEY` on demand and the base URL
    /// from `OPENROUTER_BASE_URL` once.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var(BASE_URL_ENV)
            && !base_url.trim().is_empty()
        {
            config.base_url = base_url.trim().to_string();
        }
        config
    }

    /// Uses a fixed API key instead of the environment.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.credentials = Credentials::Static(key.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), HarnessError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(HarnessError::Config(format!(
                "OpenRouter base url must be http(s): {}",
                self.base_url
            )));
        }
        if self.default_model.trim().is_empty() {
            return Err(HarnessError::Config(
                "OpenRouter default model must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_credentials_are_trimmed_and_blank_is_none() {
        assert_eq!(
            Credentials::Static(" sk-abc ".into()).resolve().as_deref(),
            Some("sk-abc")
        );
        assert_eq!(Credentials::Static("   ".into()).resolve(), None);
        assert_eq!(
            Credentials::Env("GATEWAY_TEST_DEFINITELY_UNSET_KEY".into()).resolve(),
            None
        );
    }

    #[test]
    fn url_joins_without_double_slash() {
        let config = OpenRouterConfig::default().base_url("http://127.0.0.1:9000/v1/");
        assert_eq!(
            config.chat_completions_url(),
            "http://127.0.0.1:9000/v1/chat/completions"
        );
    }

    #[test]
    fn validate_rejects_non_http_base_url() {
        let err = OpenRouterConfig::default()
            .base_url("ftp://example.com")
            .validate()
            .expect_err("invalid");
        assert!(matches!(err, HarnessError::Config(msg) if msg.contains("http(s)")));
    }
}
