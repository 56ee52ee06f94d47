pub mod client;
pub mod close;
pub mod fault;
pub mod server;

use close::CloseEvent;
use fault::Fault;
use std::fmt;

/// The fixed callback set an engine delivers while a session is open.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Connect,
    Disconnect(Option<CloseEvent>),
    Error(Fault),
    Message(serde_json::Value),
    UserSpeechStart,
    UserSpeechEnd,
    AgentSpeechStart,
    AgentSpeechEnd,
    AgentInterrupt,
    ConversationUpdate(serde_json::Value),
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::Connect => EventKind::Connect,
            EngineEvent::Disconnect(_) => EventKind::Disconnect,
            EngineEvent::Error(_) => EventKind::Error,
            EngineEvent::Message(_) => EventKind::Message,
            EngineEvent::UserSpeechStart => EventKind::UserSpeechStart,
            EngineEvent::UserSpeechEnd => EventKind::UserSpeechEnd,
            EngineEvent::AgentSpeechStart => EventKind::AgentSpeechStart,
            EngineEvent::AgentSpeechEnd => EventKind::AgentSpeechEnd,
            EngineEvent::AgentInterrupt => EventKind::AgentInterrupt,
            EngineEvent::ConversationUpdate(_) => EventKind::ConversationUpdate,
        }
    }
}

/// Payload-free tag of an [`EngineEvent`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Disconnect,
    Error,
    Message,
    UserSpeechStart,
    UserSpeechEnd,
    AgentSpeechStart,
    AgentSpeechEnd,
    AgentInterrupt,
    ConversationUpdate,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Connect => "connect",
            EventKind::Disconnect => "disconnect",
            EventKind::Error => "error",
            EventKind::Message => "message",
            EventKind::UserSpeechStart => "user_speech_start",
            EventKind::UserSpeechEnd => "user_speech_end",
            EventKind::AgentSpeechStart => "agent_speech_start",
            EventKind::AgentSpeechEnd => "agent_speech_end",
            EventKind::AgentInterrupt => "agent_interrupt",
            EventKind::ConversationUpdate => "conversation_update",
        };
        f.write_str(name)
    }
}
