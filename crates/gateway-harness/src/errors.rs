use std::fmt;

use crate::model::ProviderId;

/// Errors returned by a provider adapter before they are classified by the
/// taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Credentials or other required configuration are missing.
    #[error("provider not configured ({provider}): {message}")]
    NotConfigured {
        provider: ProviderId,
        message: String,
    },
    /// Upstream answered with a failure (HTTP status and/or error payload).
    #[error("provider error ({provider}): {message}")]
    Provider {
        provider: ProviderId,
        message: String,
        status_code: Option<u16>,
    },
    /// Transport or stream I/O failed.
    #[error("transport error ({provider}): {message}")]
    Transport {
        provider: ProviderId,
        message: String,
    },
    /// A deadline elapsed or the upstream request was aborted.
    #[error("timeout ({provider}): {message}")]
    Timeout {
        provider: ProviderId,
        message: String,
    },
    /// Provider response shape or event sequencing was invalid.
    #[error("protocol error ({provider}): {message}")]
    Protocol {
        provider: ProviderId,
        message: String,
    },
    /// The adapter does not implement the requested capability.
    #[error("unsupported ({provider}): {message}")]
    Unsupported {
        provider: ProviderId,
        message: String,
    },
}

impl ProviderError {
    /// Creates a not-configured error.
    pub fn not_configured(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::NotConfigured {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a provider-level error.
    pub fn provider(
        provider: impl Into<ProviderId>,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            status_code,
        }
    }

    /// Creates a transport-level error.
    pub fn transport(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Timeout {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a protocol-level error.
    pub fn protocol(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Protocol {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported-capability error.
    pub fn unsupported(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Unsupported {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Classifies a `reqwest` failure into timeout or transport.
    pub fn from_reqwest(provider: impl Into<ProviderId>, context: &str, err: &reqwest::Error) -> Self {
        let message = format!("{context}: {err}");
        if err.is_timeout() {
            Self::timeout(provider, message)
        } else if let Some(status) = err.status() {
            Self::provider(provider, message, Some(status.as_u16()))
        } else {
            Self::transport(provider, message)
        }
    }

    /// Returns the provider associated with this error.
    pub fn provider_id(&self) -> &ProviderId {
        match self {
            Self::NotConfigured { provider, .. }
            | Self::Provider { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Protocol { provider, .. }
            | Self::Unsupported { provider, .. } => provider,
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::NotConfigured { message, .. }
            | Self::Provider { message, .. }
            | Self::Transport { message, .. }
            | Self::Timeout { message, .. }
            | Self::Protocol { message, .. }
            | Self::Unsupported { message, .. } => message,
        }
    }

    /// Returns the upstream HTTP status, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Provider { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Closed set of codes every provider failure is reduced to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ProviderNotConfigured,
    InvalidApiKey,
    AuthenticationFailed,
    ModelNotFound,
    ProviderRateLimited,
    ProviderQuotaExceeded,
    ConnectionTimeout,
    NetworkError,
    ProviderApiError,
    ProviderUnavailable,
    /// A single frame in an otherwise healthy stream could not be parsed.
    MalformedJson,
    /// The caller cancelled the stream.
    RequestCancelled,
}

impl ErrorCode {
    /// Whether a client may retry the same request unmodified. Fixed per code.
    pub fn retryable(self) -> bool {
        match self {
            Self::ProviderRateLimited
            | Self::ConnectionTimeout
            | Self::NetworkError
            | Self::ProviderApiError
            | Self::ProviderUnavailable
            | Self::RequestCancelled => true,
            Self::ProviderNotConfigured
            | Self::InvalidApiKey
            | Self::AuthenticationFailed
            | Self::ModelNotFound
            | Self::ProviderQuotaExceeded
            | Self::MalformedJson => false,
        }
    }

    /// HTTP status used when the error is returned from a buffered request.
    pub fn http_status(self) -> u16 {
        match self {
            Self::ProviderNotConfigured => 503,
            Self::InvalidApiKey | Self::AuthenticationFailed => 401,
            Self::ModelNotFound => 404,
            Self::ProviderRateLimited | Self::ProviderQuotaExceeded => 429,
            Self::ConnectionTimeout => 504,
            Self::NetworkError | Self::ProviderApiError | Self::MalformedJson => 502,
            Self::ProviderUnavailable => 503,
            Self::RequestCancelled => 499,
        }
    }

    /// Ends the stream when emitted as an error event.
    ///
    /// Only decode errors are non-fatal.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::MalformedJson)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProviderNotConfigured => "PROVIDER_NOT_CONFIGURED",
            Self::InvalidApiKey => "INVALID_API_KEY",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::ModelNotFound => "MODEL_NOT_FOUND",
            Self::ProviderRateLimited => "PROVIDER_RATE_LIMITED",
            Self::ProviderQuotaExceeded => "PROVIDER_QUOTA_EXCEEDED",
            Self::ConnectionTimeout => "CONNECTION_TIMEOUT",
            Self::NetworkError => "NETWORK_ERROR",
            Self::ProviderApiError => "PROVIDER_API_ERROR",
            Self::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            Self::MalformedJson => "MALFORMED_JSON",
            Self::RequestCancelled => "REQUEST_CANCELLED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified failure carried by a terminal `error` event or a buffered error
/// response.
#[derive(Debug, Clone, PartialEq, thiserror::Error, serde::Serialize, serde::Deserialize)]
#[error("{code}: {message}")]
pub struct StreamError {
    pub message: String,
    pub code: ErrorCode,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl StreamError {
    /// Creates an error whose `retryable` flag comes from the code.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            retryable: code.retryable(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Decode failure for a single frame; carries the offending text.
    pub fn malformed_json(raw: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::MalformedJson,
            format!("failed to parse stream frame: {reason}"),
        )
        .with_details(serde_json::json!({ "raw": raw }))
    }

    /// Caller-initiated cancellation.
    pub fn cancelled() -> Self {
        Self::new(ErrorCode::RequestCancelled, "stream cancelled by caller")
    }

    /// Server-side deadline elapsed.
    pub fn timed_out(after: std::time::Duration) -> Self {
        Self::new(
            ErrorCode::ConnectionTimeout,
            format!("stream timed out after {} ms", after.as_millis()),
        )
    }
}

/// Top-level error type for the public harness API.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HarnessError {
    /// Invalid harness/provider configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid request shape (prompt/messages, params).
    #[error("validation error: {0}")]
    Validation(String),
    /// Requested provider is not registered.
    #[error("provider not found: {provider}")]
    ProviderNotFound { provider: ProviderId },
    /// Streaming was requested from a provider that only buffers.
    #[error("provider does not support streaming: {provider}")]
    StreamingUnsupported { provider: ProviderId },
    /// Provider failure after classification by the taxonomy.
    #[error(transparent)]
    Provider(StreamError),
}

impl HarnessError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ProviderNotFound { .. } => "PROVIDER_NOT_FOUND",
            Self::StreamingUnsupported { .. } => "STREAMING_NOT_SUPPORTED",
            Self::Provider(err) => err.code.as_str(),
        }
    }

    /// HTTP status for API responses.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Validation(_) | Self::StreamingUnsupported { .. } => 400,
            Self::ProviderNotFound { .. } => 404,
            Self::Provider(err) => err.code.http_status(),
        }
    }

    /// True for failures caused by the request itself; these never reach the
    /// taxonomy mapper.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::ProviderNotFound { .. } | Self::StreamingUnsupported { .. }
        )
    }
}

impl From<StreamError> for HarnessError {
    fn from(value: StreamError) -> Self {
        HarnessError::Provider(value)
    }
}
