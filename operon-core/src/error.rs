use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A structured error status returned by the API.
///
/// Carries the HTTP code so callers can branch on well-known conditions
/// (most importantly `409 Conflict`) without string matching.
#[derive(Error, Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
#[error("{message}: {reason}")]
pub struct ErrorResponse {
    /// The status
    #[serde(default)]
    pub status: String,
    /// A message about the error
    #[serde(default)]
    pub message: String,
    /// The reason for the error
    #[serde(default)]
    pub reason: String,
    /// The http error code
    pub code: u16,
}

impl ErrorResponse {
    /// True when the error is an optimistic concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        self.code == 409
    }

    /// Shorthand for building a conflict response in tests and mocks.
    pub fn conflict(message: &str) -> Self {
        Self {
            status: "Failure".to_string(),
            message: message.to_string(),
            reason: "Conflict".to_string(),
            code: 409,
        }
    }
}

#[cfg(test)]
mod test {
    use super::ErrorResponse;

    #[test]
    fn decodes_status_object() {
        let err: ErrorResponse = serde_json::from_value(serde_json::json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "message": "Operation cannot be fulfilled",
            "reason": "Conflict",
            "code": 409,
        }))
        .unwrap();
        assert!(err.is_conflict());
        assert_eq!(err.reason, "Conflict");
    }
}
