use crate::events::close::CloseEvent;

/// Whatever an engine handed back when something went wrong.
///
/// Engines are inconsistent about the shape of their failures: a close frame, a
/// plain message, a JSON payload, or an error object whose `Display` may be empty.
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    Close(CloseEvent),
    Message(String),
    Value(serde_json::Value),
    Error { message: String, debug: String },
}

impl From<CloseEvent> for Fault {
    fn from(close: CloseEvent) -> Self {
        Fault::Close(close)
    }
}

impl From<serde_json::Value> for Fault {
    fn from(value: serde_json::Value) -> Self {
        Fault::Value(value)
    }
}

impl From<anyhow::Error> for Fault {
    fn from(err: anyhow::Error) -> Self {
        if let Some(close) = err.downcast_ref::<CloseEvent>() {
            return Fault::Close(close.clone());
        }
        Fault::Error {
            message: format!("{:#}", err),
            debug: format!("{:?}", err),
        }
    }
}
