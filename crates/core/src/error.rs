//! Session error types and the normalizer that turns engine faults into one
//! printable diagnostic.

use crate::engine::Operation;
use convai_types::Fault;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

const UNKNOWN_ERROR: &str = "unknown error";

/// Classification of everything that can put a session into the error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoCredentialsAvailable,
    CapabilityMissing,
    /// A start or stop call on the engine failed.
    EngineRejected,
    /// The engine reported an error through its event stream.
    EngineReportedError,
    EngineCloseEvent,
    ConnectTimeout,
}

/// What the session remembers about its last failure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostic {
    kind: ErrorKind,
    message: String,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Why the backend could not supply a session token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenUnavailable {
    #[error("token request failed: {0}")]
    Request(String),
    #[error("token endpoint returned HTTP {0}")]
    Status(u16),
    #[error("malformed token response: {0}")]
    Malformed(String),
    #[error("token response carried no token")]
    Missing,
}

/// Failures detected locally, before or around engine calls.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(
        "no credentials available: {token}, and no static agent id is configured (set ELEVENLABS_AGENT_ID)"
    )]
    NoCredentialsAvailable { token: TokenUnavailable },
    #[error("engine exposes no {operation} capability (tried {tried})")]
    CapabilityMissing { operation: Operation, tried: String },
    #[error("session did not connect within {0:?}")]
    ConnectTimeout(Duration),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NoCredentialsAvailable { .. } => ErrorKind::NoCredentialsAvailable,
            SessionError::CapabilityMissing { .. } => ErrorKind::CapabilityMissing,
            SessionError::ConnectTimeout(_) => ErrorKind::ConnectTimeout,
        }
    }

    pub fn diagnostic(&self) -> Diagnostic {
        Diagnostic::new(self.kind(), &self.to_string())
    }
}

/// Renders any fault as a single line.
///
/// Close-shaped values win, then a non-empty message, then a best-effort
/// serialization. Never fails and never returns an empty string.
pub fn describe(fault: &Fault) -> String {
    match fault {
        Fault::Close(close) => close.to_string(),
        Fault::Message(message) if !message.is_empty() => message.clone(),
        Fault::Message(_) => UNKNOWN_ERROR.to_string(),
        Fault::Value(value) => describe_value(value),
        Fault::Error { message, debug } => {
            if !message.is_empty() {
                message.clone()
            } else if !debug.is_empty() {
                debug.clone()
            } else {
                UNKNOWN_ERROR.to_string()
            }
        }
    }
}

/// Describes and classifies a fault. Close-shaped faults are always
/// [`ErrorKind::EngineCloseEvent`]; everything else takes `fallback`.
pub fn normalize(fault: &Fault, fallback: ErrorKind) -> Diagnostic {
    let kind = if is_close_shaped(fault) {
        ErrorKind::EngineCloseEvent
    } else {
        fallback
    };
    Diagnostic {
        kind,
        message: describe(fault),
    }
}

fn is_close_shaped(fault: &Fault) -> bool {
    match fault {
        Fault::Close(_) => true,
        Fault::Value(value) => close_code(value).is_some(),
        _ => false,
    }
}

fn close_code(value: &Value) -> Option<&serde_json::Number> {
    match value.get("code") {
        Some(Value::Number(code)) => Some(code),
        _ => None,
    }
}

fn describe_value(value: &Value) -> String {
    if let Some(code) = close_code(value) {
        let reason = value
            .get("reason")
            .and_then(Value::as_str)
            .filter(|reason| !reason.is_empty())
            .unwrap_or("(no reason)");
        return format!("CloseEvent code={} reason={}", code, reason);
    }

    if let Some(message) = value
        .get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
    {
        return message.to_string();
    }

    match value {
        Value::Null => UNKNOWN_ERROR.to_string(),
        Value::String(text) if !text.is_empty() => text.clone(),
        Value::String(_) => UNKNOWN_ERROR.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convai_types::CloseEvent;
    use serde_json::json;

    #[test]
    fn close_event_without_reason() {
        let fault = Fault::Close(CloseEvent::new(1006, ""));
        assert_eq!(describe(&fault), "CloseEvent code=1006 reason=(no reason)");
    }

    #[test]
    fn close_shaped_json_wins_over_message() {
        let fault = Fault::Value(json!({"code": 4001, "reason": "quota", "message": "ignored"}));
        let diagnostic = normalize(&fault, ErrorKind::EngineReportedError);
        assert_eq!(diagnostic.message(), "CloseEvent code=4001 reason=quota");
        assert_eq!(diagnostic.kind(), ErrorKind::EngineCloseEvent);
    }

    #[test]
    fn string_code_is_not_close_shaped() {
        let fault = Fault::Value(json!({"code": "E42", "message": "agent not found"}));
        let diagnostic = normalize(&fault, ErrorKind::EngineReportedError);
        assert_eq!(diagnostic.message(), "agent not found");
        assert_eq!(diagnostic.kind(), ErrorKind::EngineReportedError);
    }

    #[test]
    fn plain_objects_are_serialized() {
        let fault = Fault::Value(json!({"detail": "nope"}));
        assert_eq!(describe(&fault), r#"{"detail":"nope"}"#);
    }

    #[test]
    fn empty_error_message_falls_back_to_debug() {
        let fault = Fault::Error {
            message: String::new(),
            debug: "Custom { kind: Other }".to_string(),
        };
        assert_eq!(describe(&fault), "Custom { kind: Other }");
    }

    #[test]
    fn never_returns_empty() {
        for fault in [
            Fault::Message(String::new()),
            Fault::Value(Value::Null),
            Fault::Value(json!("")),
            Fault::Error {
                message: String::new(),
                debug: String::new(),
            },
        ] {
            assert_eq!(describe(&fault), UNKNOWN_ERROR);
        }
    }

    #[test]
    fn missing_agent_id_is_named_in_message() {
        let err = SessionError::NoCredentialsAvailable {
            token: TokenUnavailable::Status(500),
        };
        let diagnostic = err.diagnostic();
        assert_eq!(diagnostic.kind(), ErrorKind::NoCredentialsAvailable);
        assert!(diagnostic.message().contains("HTTP 500"));
        assert!(diagnostic.message().contains("no static agent id is configured"));
    }
}
