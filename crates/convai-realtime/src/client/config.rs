use crate::client::consts::{
    BASE_URL, DEFAULT_CAPACITY, DEFAULT_CLOSE_TIMEOUT, DEFAULT_VAD_THRESHOLD, ELEVENLABS_WS_URL,
};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    base_url: String,
    capacity: usize,
    vad_threshold: f32,
    close_timeout: Duration,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    /// Buffer size of the outbound message channel.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity.max(1);
        self
    }

    /// VAD score at or above which the user counts as speaking.
    pub fn with_vad_threshold(mut self, threshold: f32) -> Self {
        self.config.vad_threshold = threshold;
        self
    }

    /// How long `end_session` waits for the server to answer a close frame before
    /// dropping the connection.
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.config.close_timeout = timeout;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            // The websocket endpoint can be pointed elsewhere, e.g. a regional host.
            base_url: std::env::var(ELEVENLABS_WS_URL)
                .ok()
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| BASE_URL.to_string()),
            capacity: DEFAULT_CAPACITY,
            vad_threshold: DEFAULT_VAD_THRESHOLD,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn vad_threshold(&self) -> f32 {
        self.vad_threshold
    }

    pub fn close_timeout(&self) -> Duration {
        self.close_timeout
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
