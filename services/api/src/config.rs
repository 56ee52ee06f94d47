use secrecy::SecretString;
use std::net::SocketAddr;
use tracing::Level;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
pub const DEFAULT_API_URL: &str = "https://api.elevenlabs.io";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
///
/// The credentials are optional here: the service still starts without them and
/// reports the gap on every token request.
#[derive(Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub elevenlabs_api_key: Option<SecretString>,
    pub elevenlabs_agent_id: Option<String>,
    pub elevenlabs_api_url: String,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// This function will look for a `.env` file in the current directory
    /// and load the following variables:
    ///
    /// *   `BIND_ADDRESS`: The address and port to bind the server to. Defaults to "0.0.0.0:8000".
    /// *   `ELEVENLABS_API_KEY`: Secret key sent upstream as `xi-api-key`.
    /// *   `ELEVENLABS_AGENT_ID`: The agent tokens are issued for.
    /// *   `ELEVENLABS_API_URL`: (Optional) Upstream base URL. Defaults to "https://api.elevenlabs.io".
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bind_address_str =
            present("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let elevenlabs_api_key = present("ELEVENLABS_API_KEY").map(SecretString::from);
        let elevenlabs_agent_id = present("ELEVENLABS_AGENT_ID");
        let elevenlabs_api_url =
            present("ELEVENLABS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let log_level_str = present("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            elevenlabs_api_key,
            elevenlabs_agent_id,
            elevenlabs_api_url,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS.parse().unwrap());
        assert!(config.elevenlabs_api_key.is_none());
        assert!(config.elevenlabs_agent_id.is_none());
        assert_eq!(config.elevenlabs_api_url, DEFAULT_API_URL);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let config = Config::from_lookup(lookup(&[
            ("ELEVENLABS_API_KEY", "xi-123"),
            ("ELEVENLABS_AGENT_ID", "  "),
        ]))
        .unwrap();
        assert_eq!(
            config.elevenlabs_api_key.as_ref().map(|k| k.expose_secret()),
            Some("xi-123")
        );
        assert!(config.elevenlabs_agent_id.is_none());
    }

    #[test]
    fn rejects_bad_bind_address() {
        let err = Config::from_lookup(lookup(&[("BIND_ADDRESS", "nowhere")])).unwrap_err();
        assert!(err.to_string().contains("BIND_ADDRESS"));
    }
}
