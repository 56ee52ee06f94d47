use convai_types::EngineEvent;
use convai_types::events::client::ClientMessage;
use convai_types::events::server::ServerMessage;
use serde_json::{Value, json};

/// Outcome of one server message: events for the session, plus an optional reply.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Translation {
    pub events: Vec<EngineEvent>,
    pub reply: Option<ClientMessage>,
}

/// Maps server messages onto the engine event set.
///
/// The server never says when someone stops talking, so speech boundaries are
/// inferred: the agent speaks from its first audio chunk until it is interrupted or
/// the user's transcript arrives, the user speaks while the VAD score is above the
/// threshold.
pub(crate) struct Translator {
    vad_threshold: f32,
    user_speaking: bool,
    agent_speaking: bool,
}

impl Translator {
    pub fn new(vad_threshold: f32) -> Self {
        Self {
            vad_threshold,
            user_speaking: false,
            agent_speaking: false,
        }
    }

    pub fn translate(&mut self, text: &str) -> Translation {
        let value = match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("ignoring unparseable server message: {}", e);
                return Translation::default();
            }
        };

        let message = match serde_json::from_value::<ServerMessage>(value.clone()) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("forwarding unrecognized server message: {}", e);
                return self.emit(vec![EngineEvent::Message(value)]);
            }
        };

        match message {
            ServerMessage::ConversationInitiationMetadata {
                conversation_initiation_metadata_event: meta,
            } => {
                tracing::info!("conversation {} started", meta.conversation_id());
                self.emit(vec![EngineEvent::Connect])
            }
            ServerMessage::Ping { ping_event } => Translation {
                events: vec![],
                reply: Some(ClientMessage::pong(ping_event.event_id())),
            },
            ServerMessage::Audio { audio_event } => {
                tracing::trace!(
                    "agent audio chunk {} ({} bytes encoded)",
                    audio_event.event_id(),
                    audio_event.len()
                );
                if self.agent_speaking {
                    return Translation::default();
                }
                self.agent_speaking = true;
                self.emit(vec![EngineEvent::AgentSpeechStart])
            }
            ServerMessage::UserTranscript {
                user_transcription_event,
            } => {
                let mut events = self.end_agent_speech();
                let update = json!({"role": "user", "text": user_transcription_event.transcript()});
                events.push(EngineEvent::Message(value));
                events.push(EngineEvent::ConversationUpdate(update));
                self.emit(events)
            }
            ServerMessage::AgentResponse {
                agent_response_event,
            } => {
                let update = json!({"role": "agent", "text": agent_response_event.response()});
                self.emit(vec![
                    EngineEvent::Message(value),
                    EngineEvent::ConversationUpdate(update),
                ])
            }
            ServerMessage::Interruption { .. } => {
                let mut events = vec![EngineEvent::AgentInterrupt];
                events.extend(self.end_agent_speech());
                self.emit(events)
            }
            ServerMessage::VadScore { vad_score_event } => {
                let speaking = vad_score_event.score() >= self.vad_threshold;
                if speaking == self.user_speaking {
                    return Translation::default();
                }
                self.user_speaking = speaking;
                let event = if speaking {
                    EngineEvent::UserSpeechStart
                } else {
                    EngineEvent::UserSpeechEnd
                };
                self.emit(vec![event])
            }
            ServerMessage::Unknown => self.emit(vec![EngineEvent::Message(value)]),
        }
    }

    /// Closes any speech turn still open when the connection goes away.
    pub fn finish(&mut self) -> Vec<EngineEvent> {
        let mut events = self.end_agent_speech();
        if self.user_speaking {
            self.user_speaking = false;
            events.push(EngineEvent::UserSpeechEnd);
        }
        events
    }

    fn end_agent_speech(&mut self) -> Vec<EngineEvent> {
        if !self.agent_speaking {
            return vec![];
        }
        self.agent_speaking = false;
        vec![EngineEvent::AgentSpeechEnd]
    }

    fn emit(&self, events: Vec<EngineEvent>) -> Translation {
        Translation {
            events,
            reply: None,
        }
    }
}
