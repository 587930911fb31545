use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gateway_harness::HarnessError;
use serde_json::{Value, json};

/// Error returned by JSON endpoints and by streaming endpoints before the
/// first event.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Harness(#[from] HarnessError),
    /// The body could not be decoded into a completion request.
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Harness(err) => StatusCode::from_u16(err.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// `{"error": {"code", "message", "details"?}}`
    pub fn body(&self) -> Value {
        let (code, message, details) = match self {
            Self::Harness(HarnessError::Provider(err)) => {
                (err.code.as_str(), err.message.clone(), err.details.clone())
            }
            Self::Harness(err) => (err.code(), err.to_string(), None),
            Self::InvalidBody(_) => ("VALIDATION_ERROR", self.to_string(), None),
        };
        let mut error = json!({ "code": code, "message": message });
        if let Some(details) = details {
            error["details"] = details;
        }
        json!({ "error": error })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::info!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
