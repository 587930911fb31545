use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Loads `.env` from the crate directory, then from the working directory.
pub fn init() {
    let _ = dotenvy::from_path(Path::new(
        format!("{}/.env", env!("CARGO_MANIFEST_DIR")).as_str(),
    ));
    dotenvy::dotenv().ok();
}

/// Parses `raw`, logging and falling back to `default` when it is missing,
/// blank or unparseable.
fn parse_value<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::error!(key, value, "error parsing environment variable; using default");
                default
            }
        },
        None => default,
    }
}

/// Gateway settings read once at startup.
///
/// Provider credentials are not part of this struct; providers read them on
/// demand.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub default_provider: String,
    /// Default model of the HTTP provider.
    pub default_model: String,
    pub request_timeout: Duration,
    /// Per-word delay of the echo provider.
    pub stream_word_delay: Duration,
    /// `Access-Control-Allow-Origin` for streaming responses.
    pub cors_origin: String,
    pub openrouter_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            default_provider: "echo".to_string(),
            default_model: gateway_harness::vendors::openrouter::DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_millis(120_000),
            stream_word_delay: Duration::from_millis(50),
            cors_origin: "*".to_string(),
            openrouter_base_url: gateway_harness::vendors::openrouter::DEFAULT_BASE_URL
                .to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads `GATEWAY_*` and `OPENROUTER_BASE_URL` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, default: String| parse_value(key, lookup(key), default);
        let millis = |key: &str, default: Duration| {
            Duration::from_millis(parse_value(key, lookup(key), default.as_millis() as u64))
        };
        Self {
            host: text("GATEWAY_HOST", defaults.host),
            port: parse_value("GATEWAY_PORT", lookup("GATEWAY_PORT"), defaults.port),
            default_provider: text("GATEWAY_DEFAULT_PROVIDER", defaults.default_provider),
            default_model: text("GATEWAY_DEFAULT_MODEL", defaults.default_model),
            request_timeout: millis("GATEWAY_REQUEST_TIMEOUT_MS", defaults.request_timeout),
            stream_word_delay: millis("GATEWAY_STREAM_WORD_DELAY_MS", defaults.stream_word_delay),
            cors_origin: text("GATEWAY_CORS_ORIGIN", defaults.cors_origin),
            openrouter_base_url: text("OPENROUTER_BASE_URL", defaults.openrouter_base_url),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
