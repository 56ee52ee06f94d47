//! Session configuration.
//!
//! Values come from the environment (a `.env` file is honored for local
//! development). Everything has a default except the static agent id, which is only
//! needed when the token endpoint is unavailable.

use std::time::Duration;
use tracing::Level;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    backend_base_url: String,
    static_agent_id: Option<String>,
    connect_timeout: Option<Duration>,
    log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_base_url: DEFAULT_BACKEND_URL.to_string(),
            static_agent_id: None,
            connect_timeout: Some(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
            log_level: Level::INFO,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// *   `BACKEND_URL`: (Optional) Base URL of the token backend. Defaults to `http://localhost:8000`.
    /// *   `ELEVENLABS_AGENT_ID`: (Optional) Static agent id used when no token can be fetched.
    /// *   `GLOVEBOX_CONNECT_TIMEOUT_SECS`: (Optional) Seconds a start attempt may stay connecting. `0` disables. Defaults to 30.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let backend_base_url = lookup("BACKEND_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.backend_base_url);

        let static_agent_id = lookup("ELEVENLABS_AGENT_ID").filter(|id| !id.trim().is_empty());

        let connect_timeout = match lookup("GLOVEBOX_CONNECT_TIMEOUT_SECS") {
            None => defaults.connect_timeout,
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| {
                    ConfigError::InvalidValue("GLOVEBOX_CONNECT_TIMEOUT_SECS".to_string(), e.to_string())
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            backend_base_url,
            static_agent_id,
            connect_timeout,
            log_level,
        })
    }

    pub fn with_backend_base_url(mut self, url: &str) -> Self {
        self.backend_base_url = url.to_string();
        self
    }

    pub fn with_static_agent_id(mut self, agent_id: &str) -> Self {
        self.static_agent_id = Some(agent_id.to_string()).filter(|id| !id.is_empty());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn backend_base_url(&self) -> &str {
        &self.backend_base_url
    }

    pub fn static_agent_id(&self) -> Option<&str> {
        self.static_agent_id.as_deref()
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn log_level(&self) -> Level {
        self.log_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend_base_url(), "http://localhost:8000");
        assert_eq!(config.static_agent_id(), None);
        assert_eq!(config.connect_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.log_level(), Level::INFO);
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("BACKEND_URL", "https://backend.example"),
            ("ELEVENLABS_AGENT_ID", "AGENT1"),
            ("GLOVEBOX_CONNECT_TIMEOUT_SECS", "0"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.backend_base_url(), "https://backend.example");
        assert_eq!(config.static_agent_id(), Some("AGENT1"));
        assert_eq!(config.connect_timeout(), None);
        assert_eq!(config.log_level(), Level::DEBUG);
    }

    #[test]
    fn blank_agent_id_is_unset() {
        let config = Config::from_lookup(lookup(&[("ELEVENLABS_AGENT_ID", "  ")])).unwrap();
        assert_eq!(config.static_agent_id(), None);
    }

    #[test]
    fn rejects_bad_timeout() {
        let err = Config::from_lookup(lookup(&[("GLOVEBOX_CONNECT_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("GLOVEBOX_CONNECT_TIMEOUT_SECS"));
    }
}
