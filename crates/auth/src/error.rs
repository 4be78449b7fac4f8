//! Authentication errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failure talking to, or reported by, the identity provider.
///
/// These are ordinary errors, distinct from access-control signals: the
/// middleware does not retry them and callers decide how to surface them.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Auth provider request failed: {0}")]
    Request(String),

    #[error("Auth provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Malformed auth provider response: {0}")]
    Response(String),

    #[error("Stored session is unreadable: {0}")]
    CorruptSession(String),

    #[error("No PKCE code verifier stored for this browser")]
    MissingCodeVerifier,

    #[error("Missing query parameter `{0}`")]
    MissingParameter(&'static str),

    #[error("Unsupported OTP type `{0}`")]
    InvalidOtpType(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Auth provider misconfigured: {0}")]
    Configuration(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Request(_) | AuthError::Provider { .. } | AuthError::Response(_) => {
                StatusCode::BAD_GATEWAY
            }
            AuthError::CorruptSession(_)
            | AuthError::MissingCodeVerifier
            | AuthError::MissingParameter(_)
            | AuthError::InvalidOtpType(_) => StatusCode::BAD_REQUEST,
            AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Request(_) => "AUTH_PROVIDER_UNREACHABLE",
            AuthError::Provider { .. } => "AUTH_PROVIDER_ERROR",
            AuthError::Response(_) => "AUTH_PROVIDER_BAD_RESPONSE",
            AuthError::CorruptSession(_) => "CORRUPT_SESSION",
            AuthError::MissingCodeVerifier => "MISSING_CODE_VERIFIER",
            AuthError::MissingParameter(_) => "MISSING_PARAMETER",
            AuthError::InvalidOtpType(_) => "INVALID_OTP_TYPE",
            AuthError::Unauthenticated => "UNAUTHENTICATED",
            AuthError::Configuration(_) => "AUTH_CONFIGURATION_ERROR",
        }
    }
}

impl From<AuthError> for supaguard_common::Error {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Unauthenticated => Self::Authentication("Authentication required".to_string()),
            AuthError::Configuration(message) => Self::Configuration(message),
            other if other.status_code() == StatusCode::BAD_REQUEST => {
                Self::BadRequest(other.to_string())
            }
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Auth provider failure");
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
