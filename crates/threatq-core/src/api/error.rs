use reqwest::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::error::ErrorObject;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unable to connect to ThreatQ server: {0}")]
    ConnectionError(#[source] reqwest::Error),

    #[error("User credentials are not valid (status {status})")]
    AuthenticationFailed { status: StatusCode, body: String },

    #[error("Attempted to authenticate {attempts} times but failed authentication")]
    RetriesExhausted { attempts: u32 },

    #[error("ThreatQ request failed with status {status}: {}", truncate_body(.body))]
    UnexpectedStatus { status: StatusCode, body: String },

    #[error("Could not find access token in login response")]
    MalformedLoginResponse { body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid logging excessive data
pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

impl ApiError {
    /// Classify a failed login response
    pub fn from_login_status(status: StatusCode, body: String) -> Self {
        ApiError::AuthenticationFailed { status, body }
    }

    /// HTTP status reported to the host alongside the error
    pub fn status(&self) -> u16 {
        match self {
            ApiError::AuthenticationFailed { status, .. }
            | ApiError::UnexpectedStatus { status, .. } => status.as_u16(),
            ApiError::RetriesExhausted { .. } => StatusCode::UNAUTHORIZED.as_u16(),
            ApiError::MalformedLoginResponse { .. } => StatusCode::OK.as_u16(),
            ApiError::ConnectionError(_) | ApiError::InvalidResponse(_) => {
                StatusCode::INTERNAL_SERVER_ERROR.as_u16()
            }
        }
    }

    /// Short error code understood by the overlay component
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::ConnectionError(_)
            | ApiError::UnexpectedStatus { .. }
            | ApiError::InvalidResponse(_) => "TQ_2A",
            ApiError::AuthenticationFailed { status, .. } if *status == StatusCode::BAD_REQUEST => {
                "TQ_2B"
            }
            ApiError::AuthenticationFailed { .. } => "TQ_2C",
            ApiError::MalformedLoginResponse { .. } => "TQ_2D",
            ApiError::RetriesExhausted { .. } => "TQ_2E",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ApiError::AuthenticationFailed { .. } | ApiError::MalformedLoginResponse { .. } => {
                "Login Request Failed"
            }
            _ => "ThreatQ HTTP Request Failed",
        }
    }

    /// Build the host-facing error object, keeping the status and (truncated) body as metadata
    pub fn to_error_object(&self) -> ErrorObject {
        let meta = match self {
            ApiError::AuthenticationFailed { body, .. }
            | ApiError::UnexpectedStatus { body, .. }
            | ApiError::MalformedLoginResponse { body } => {
                Some(json!({ "body": truncate_body(body) }))
            }
            ApiError::ConnectionError(err) => Some(json!({ "err": err.to_string() })),
            ApiError::RetriesExhausted { attempts } => Some(json!({ "attempts": attempts })),
            ApiError::InvalidResponse(_) => None,
        };

        ErrorObject {
            detail: self.to_string(),
            status: self.status().to_string(),
            title: self.title().to_string(),
            code: self.code().to_string(),
            meta,
        }
    }
}
