use std::fmt;

/// A close notification: numeric code plus a textual reason, as carried by a
/// websocket close frame.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CloseEvent {
    code: u16,
    #[serde(default)]
    reason: String,
}

impl CloseEvent {
    pub fn new(code: u16, reason: &str) -> Self {
        Self {
            code,
            reason: reason.to_string(),
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for CloseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = if self.reason.is_empty() {
            "(no reason)"
        } else {
            self.reason.as_str()
        };
        write!(f, "CloseEvent code={} reason={}", self.code, reason)
    }
}

impl std::error::Error for CloseEvent {}
