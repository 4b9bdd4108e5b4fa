//! Acknowledgment payloads and client-side request errors.
//!
//! Every outbound frame is acknowledged exactly once by the backend. The ack
//! carries a `status` plus either a `result` (success) or a `message`
//! (error). Malformed acks (neither field) are treated as a protocol-level
//! error with a generic message, never as success.

use serde::{Deserialize, Serialize};

// =============================================================================
// Acknowledgment
// =============================================================================

/// Status field of an acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Ok,
    Error,
}

/// The reply payload attached to one emitted frame.
///
/// All fields are optional on purpose: the backend is not fully trusted to
/// shape its acks correctly, and [`AckPayload::into_result`] is the single
/// place that interprets the combinations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AckStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AckPayload {
    /// Create a success ack carrying a result.
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            status: Some(AckStatus::Ok),
            result: Some(result.into()),
            message: None,
        }
    }

    /// Create a success ack without a result (best-effort acks).
    pub fn ok_empty() -> Self {
        Self {
            status: Some(AckStatus::Ok),
            result: None,
            message: None,
        }
    }

    /// Create an error ack.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Some(AckStatus::Error),
            result: None,
            message: Some(message.into()),
        }
    }

    /// The error message, if this ack reports an error status.
    pub fn error_message(&self) -> Option<&str> {
        match self.status {
            Some(AckStatus::Error) => {
                Some(self.message.as_deref().unwrap_or("remote reported an error"))
            }
            _ => None,
        }
    }

    /// Interpret the ack as the outcome of a request.
    ///
    /// - error status rejects with the remote-supplied message
    /// - a usable `result` resolves with it
    /// - anything else rejects with a generic no-response error
    pub fn into_result(self) -> Result<String, RequestError> {
        if let Some(AckStatus::Error) = self.status {
            return Err(RequestError::Remote(
                self.message
                    .unwrap_or_else(|| "remote reported an error".to_string()),
            ));
        }
        match self.result {
            Some(result) => Ok(result),
            None => Err(RequestError::NoResponse),
        }
    }
}

// =============================================================================
// Request Error (Client-Side)
// =============================================================================

/// Client-side request errors.
///
/// These are errors surfaced to a caller of the dispatcher, distinct from the
/// backend's own error acks (which arrive as [`RequestError::Remote`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The connection never became ready (reconnect attempts exhausted or
    /// the connection was closed); carries the underlying reason.
    ConnectionFailed(String),
    /// The backend acknowledged with an error status.
    Remote(String),
    /// The acknowledgment carried neither a result nor an error.
    NoResponse,
    /// The frame could not be handed to the transport.
    SendFailed(String),
    /// The connection dropped before the acknowledgment arrived.
    Cancelled,
    /// The request timed out waiting for the acknowledgment.
    Timeout,
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::ConnectionFailed(reason) => {
                write!(f, "Connection failed: {}", reason)
            }
            RequestError::Remote(message) => write!(f, "Remote error: {}", message),
            RequestError::NoResponse => write!(f, "No response from server"),
            RequestError::SendFailed(reason) => write!(f, "Failed to send request: {}", reason),
            RequestError::Cancelled => write!(f, "Request was cancelled"),
            RequestError::Timeout => write!(f, "Request timed out"),
        }
    }
}

impl std::error::Error for RequestError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_ack_resolves_with_result() {
        let ack: AckPayload =
            serde_json::from_value(json!({"status": "ok", "result": "Go to Alice"})).unwrap();
        assert_eq!(ack.into_result().unwrap(), "Go to Alice");
    }

    #[test]
    fn error_ack_rejects_with_message() {
        let ack: AckPayload =
            serde_json::from_value(json!({"status": "error", "message": "nope"})).unwrap();
        assert_eq!(
            ack.into_result().unwrap_err(),
            RequestError::Remote("nope".to_string())
        );
    }

    #[test]
    fn error_ack_without_message_gets_generic_text() {
        let ack: AckPayload = serde_json::from_value(json!({"status": "error"})).unwrap();
        assert!(matches!(ack.into_result(), Err(RequestError::Remote(m)) if m.contains("error")));
    }

    #[test]
    fn empty_ack_rejects_generically() {
        let ack: AckPayload = serde_json::from_value(json!({})).unwrap();
        assert_eq!(ack.into_result().unwrap_err(), RequestError::NoResponse);
    }

    #[test]
    fn ok_status_without_result_is_no_response() {
        let ack: AckPayload = serde_json::from_value(json!({"status": "ok"})).unwrap();
        assert_eq!(ack.into_result().unwrap_err(), RequestError::NoResponse);
    }

    #[test]
    fn error_message_only_set_for_error_status() {
        assert_eq!(AckPayload::ok("x").error_message(), None);
        assert_eq!(AckPayload::error("boom").error_message(), Some("boom"));
        assert_eq!(
            AckPayload {
                status: Some(AckStatus::Error),
                result: None,
                message: None,
            }
            .error_message(),
            Some("remote reported an error")
        );
    }
}
