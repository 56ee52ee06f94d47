//! Messages the client sends over the conversation websocket.

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Reply to a server `ping`; the server drops sessions that stop answering.
    Pong { event_id: u64 },
}

impl ClientMessage {
    pub fn pong(event_id: u64) -> Self {
        ClientMessage::Pong { event_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pong_wire_shape() {
        let json = serde_json::to_value(ClientMessage::pong(7)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "pong", "event_id": 7}));
    }
}
