//! Reduces any provider failure to one code of the closed [`ErrorCode`] set.
//!
//! Rules are checked in priority order; the first match wins. Messages are
//! scrubbed of credentials whichever rule matched.

use tracing::warn;

use crate::errors::{ErrorCode, ProviderError, StreamError};
use crate::redact::scrub_secrets;

/// Classifies a provider failure.
pub fn classify(err: &ProviderError) -> StreamError {
    let code = classify_code(err);
    let mut details = serde_json::json!({ "provider": err.provider_id().as_str() });
    if let Some(status) = err.status_code() {
        details["status"] = serde_json::json!(status);
    }
    StreamError::new(code, scrub_secrets(err.message())).with_details(details)
}

/// Classifies and logs a provider failure.
pub fn classify_and_log(err: &ProviderError) -> StreamError {
    let mapped = classify(err);
    warn!(
        provider = %err.provider_id(),
        code = %mapped.code,
        retryable = mapped.retryable,
        message = %mapped.message,
        "provider failure"
    );
    mapped
}

fn classify_code(err: &ProviderError) -> ErrorCode {
    let status = err.status_code();
    let message = err.message().to_ascii_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|n| message.contains(n));

    if matches!(err, ProviderError::NotConfigured { .. })
        || mentions(&["not configured", "missing api key", "api key is not set"])
    {
        return ErrorCode::ProviderNotConfigured;
    }
    if status == Some(401) || mentions(&["invalid api key", "invalid_api_key", "incorrect api key"]) {
        return ErrorCode::InvalidApiKey;
    }
    if status == Some(403) || mentions(&["unauthorized", "authentication", "forbidden"]) {
        return ErrorCode::AuthenticationFailed;
    }
    if status == Some(404) || mentions(&["model not found", "model_not_found", "does not exist"]) {
        return ErrorCode::ModelNotFound;
    }
    if status == Some(429) || mentions(&["rate limit", "rate_limit", "too many requests"]) {
        return ErrorCode::ProviderRateLimited;
    }
    if mentions(&["quota", "insufficient_quota"]) {
        return ErrorCode::ProviderQuotaExceeded;
    }
    if matches!(err, ProviderError::Timeout { .. }) || mentions(&["timed out", "timeout", "aborted"]) {
        return ErrorCode::ConnectionTimeout;
    }
    if matches!(err, ProviderError::Transport { .. })
        || mentions(&[
            "network",
            "connection refused",
            "connection reset",
            "econnrefused",
            "econnreset",
            "dns error",
        ])
    {
        return ErrorCode::NetworkError;
    }
    if matches!(status, Some(502..=504)) || mentions(&["unavailable", "overloaded"]) {
        return ErrorCode::ProviderUnavailable;
    }
    ErrorCode::ProviderApiError
}
