//! Messages the conversation websocket sends to the client.

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConversationInitiationMetadata {
        conversation_initiation_metadata_event: InitiationMetadata,
    },
    Ping {
        ping_event: PingEvent,
    },
    Audio {
        audio_event: AudioEvent,
    },
    UserTranscript {
        user_transcription_event: UserTranscription,
    },
    AgentResponse {
        agent_response_event: AgentResponse,
    },
    Interruption {
        interruption_event: Interruption,
    },
    VadScore {
        vad_score_event: VadScore,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InitiationMetadata {
    conversation_id: String,
    #[serde(default)]
    agent_output_audio_format: Option<String>,
}

impl InitiationMetadata {
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn agent_output_audio_format(&self) -> Option<&str> {
        self.agent_output_audio_format.as_deref()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PingEvent {
    event_id: u64,
    #[serde(default)]
    ping_ms: Option<u64>,
}

impl PingEvent {
    pub fn event_id(&self) -> u64 {
        self.event_id
    }

    pub fn ping_ms(&self) -> Option<u64> {
        self.ping_ms
    }
}

/// Agent audio chunk. The payload stays encoded; playback is not handled here.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AudioEvent {
    audio_base_64: String,
    event_id: u64,
}

impl AudioEvent {
    pub fn event_id(&self) -> u64 {
        self.event_id
    }

    pub fn len(&self) -> usize {
        self.audio_base_64.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audio_base_64.is_empty()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UserTranscription {
    user_transcript: String,
}

impl UserTranscription {
    pub fn transcript(&self) -> &str {
        &self.user_transcript
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AgentResponse {
    agent_response: String,
}

impl AgentResponse {
    pub fn response(&self) -> &str {
        &self.agent_response
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Interruption {
    event_id: u64,
}

impl Interruption {
    pub fn event_id(&self) -> u64 {
        self.event_id
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VadScore {
    vad_score: f32,
}

impl VadScore {
    pub fn score(&self) -> f32 {
        self.vad_score
    }
}
