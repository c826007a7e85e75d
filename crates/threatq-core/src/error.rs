//! Integration-level errors and the error payload returned to the host.

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Missing ThreatQ indicator types in your ThreatQ config file")]
    MissingIndicatorTypes,

    #[error("UPDATE_INDICATOR must update `score` or `status`, not `{0}`")]
    UnsupportedField(String),

    #[error("{0} is disabled for this integration")]
    ActionDisabled(&'static str),

    #[error("Invalid message payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    #[error("Failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Host-facing error envelope: `{ "errors": [ ... ] }`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub errors: Vec<ErrorObject>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorObject {
    pub detail: String,
    pub status: String,
    pub title: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl IntegrationError {
    fn to_error_object(&self) -> ErrorObject {
        let (status, title, meta) = match self {
            IntegrationError::Api(err) => return err.to_error_object(),
            IntegrationError::MissingIndicatorTypes => (
                "500",
                "Integration Misconfigured",
                Some(json!({
                    "toFix": "Provide `indicator_types` ids for each supported entity kind in the integration config file"
                })),
            ),
            IntegrationError::UnsupportedField(_) | IntegrationError::InvalidPayload(_) => {
                ("400", "Invalid Message", None)
            }
            IntegrationError::ActionDisabled(_) => ("403", "Action Disabled", None),
            IntegrationError::Serialization(_) => ("500", "Internal Error", None),
        };

        ErrorObject {
            detail: self.to_string(),
            status: status.to_string(),
            title: title.to_string(),
            code: "TQ_3A".to_string(),
            meta,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            errors: vec![self.to_error_object()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_api_error_payload_passthrough() {
        let err = IntegrationError::from(ApiError::UnexpectedStatus {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        });
        let payload = serde_json::to_value(err.to_payload()).expect("serializable");
        assert_eq!(payload["errors"][0]["status"], "500");
        assert_eq!(payload["errors"][0]["code"], "TQ_2A");
        assert_eq!(payload["errors"][0]["meta"]["body"], "boom");
    }

    #[test]
    fn test_missing_types_payload() {
        let payload = IntegrationError::MissingIndicatorTypes.to_payload();
        let obj = &payload.errors[0];
        assert_eq!(obj.code, "TQ_3A");
        assert!(obj.detail.contains("indicator types"));
        assert!(obj.meta.is_some());
    }

    #[test]
    fn test_disabled_action_message() {
        let err = IntegrationError::ActionDisabled("Adding tags");
        assert_eq!(err.to_string(), "Adding tags is disabled for this integration");
        assert_eq!(err.to_payload().errors[0].status, "403");
    }
}
