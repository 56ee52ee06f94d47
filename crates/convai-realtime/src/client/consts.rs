use std::time::Duration;

pub const ELEVENLABS_WS_URL: &str = "ELEVENLABS_WS_URL";

pub const BASE_URL: &str = "wss://api.elevenlabs.io/v1/convai/conversation";
pub const DEFAULT_CAPACITY: usize = 1024;
pub const DEFAULT_VAD_THRESHOLD: f32 = 0.5;
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

pub const AGENT_ID_PARAM: &str = "agent_id";
pub const TOKEN_PARAM: &str = "conversation_token";
