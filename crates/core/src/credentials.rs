//! Decides which credentials a start attempt sends to the engine.
//!
//! Tier one asks the backend for a short-lived session token. If that is not
//! possible for any reason, tier two falls back to the statically configured agent
//! id. Only when both tiers come up empty does resolution fail.

use crate::config::Config;
use crate::error::{SessionError, TokenUnavailable};
use crate::observer::{SessionObserver, SessionRecord, TracingObserver};
use async_trait::async_trait;
use convai_types::Credentials;
#[cfg(test)]
use mockall::automock;
use secrecy::SecretString;
use serde_json::Value;
use std::sync::Arc;

/// Path of the token endpoint, relative to the backend base URL.
pub const TOKEN_PATH: &str = "/elevenlabs/token";
/// Body fields that may carry the token, highest priority first.
pub const TOKEN_FIELDS: &[&str] = &["conversation_token", "token"];

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResolveCredentials: Send + Sync {
    /// Produces fresh credentials for one start attempt.
    async fn resolve(&self) -> Result<Credentials, SessionError>;
}

/// Two-tier resolver backed by the token endpoint.
///
/// Performs exactly one HTTP request per call. Nothing is retried or cached,
/// tokens may be single-use.
pub struct CredentialResolver {
    client: reqwest::Client,
    token_url: String,
    agent_id: Option<String>,
    observer: Arc<dyn SessionObserver>,
}

impl CredentialResolver {
    pub fn new(backend_base_url: &str, agent_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_url: token_url(backend_base_url),
            agent_id: agent_id.filter(|id| !id.is_empty()),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.backend_base_url(), config.static_agent_id().map(str::to_string))
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    async fn fetch_token(&self) -> Result<SecretString, TokenUnavailable> {
        let response = self
            .client
            .get(&self.token_url)
            .send()
            .await
            .map_err(|e| TokenUnavailable::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenUnavailable::Status(status.as_u16()));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| TokenUnavailable::Malformed(e.to_string()))?;

        extract_token(&body)
            .map(SecretString::from)
            .ok_or(TokenUnavailable::Missing)
    }
}

#[async_trait]
impl ResolveCredentials for CredentialResolver {
    async fn resolve(&self) -> Result<Credentials, SessionError> {
        let credentials = match self.fetch_token().await {
            Ok(token) => Credentials::Token(token),
            Err(reason) => {
                self.observer.record(SessionRecord::TokenUnavailable {
                    reason: reason.clone(),
                });
                match &self.agent_id {
                    Some(agent_id) => Credentials::AgentId(agent_id.clone()),
                    None => return Err(SessionError::NoCredentialsAvailable { token: reason }),
                }
            }
        };
        self.observer.record(SessionRecord::CredentialsResolved {
            source: credentials.source(),
        });
        Ok(credentials)
    }
}

/// Pulls a token out of a token endpoint body: a known field, or the body itself
/// when it is a bare JSON string. Empty strings do not count.
pub fn extract_token(body: &Value) -> Option<String> {
    match body {
        Value::String(token) if !token.is_empty() => Some(token.clone()),
        Value::Object(fields) => TOKEN_FIELDS.iter().find_map(|field| {
            fields
                .get(*field)
                .and_then(Value::as_str)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        }),
        _ => None,
    }
}

fn token_url(backend_base_url: &str) -> String {
    format!("{}{}", backend_base_url.trim_end_matches('/'), TOKEN_PATH)
}
