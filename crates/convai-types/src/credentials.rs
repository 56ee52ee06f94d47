use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Authentication payload for one session start.
///
/// A value is produced for a single attempt and moved into the engine's start call.
/// The token variant is kept behind [`SecretString`] so it never shows up in `Debug`
/// output or logs.
#[derive(Debug)]
pub enum Credentials {
    /// Short-lived session token issued by the backend.
    Token(SecretString),
    /// Static agent id, used when no token could be obtained.
    AgentId(String),
}

impl Credentials {
    pub fn token(token: &str) -> Self {
        Self::Token(SecretString::from(token.to_string()))
    }

    pub fn agent_id(agent_id: &str) -> Self {
        Self::AgentId(agent_id.to_string())
    }

    pub fn source(&self) -> CredentialSource {
        match self {
            Self::Token(_) => CredentialSource::Token,
            Self::AgentId(_) => CredentialSource::AgentId,
        }
    }

    /// Returns the raw credential value. Callers must not log it.
    pub fn expose(&self) -> &str {
        match self {
            Self::Token(token) => token.expose_secret(),
            Self::AgentId(agent_id) => agent_id,
        }
    }
}

/// Which tier produced a [`Credentials`] value. Safe to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    Token,
    AgentId,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => f.write_str("token"),
            Self::AgentId => f.write_str("agent_id"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_token() {
        let credentials = Credentials::token("very-secret");
        let rendered = format!("{:?}", credentials);
        assert!(!rendered.contains("very-secret"));
        assert_eq!(credentials.expose(), "very-secret");
        assert_eq!(credentials.source(), CredentialSource::Token);
    }

    #[test]
    fn agent_id_source() {
        let credentials = Credentials::agent_id("AGENT1");
        assert_eq!(credentials.source(), CredentialSource::AgentId);
        assert_eq!(credentials.source().to_string(), "agent_id");
        assert_eq!(credentials.expose(), "AGENT1");
    }
}
