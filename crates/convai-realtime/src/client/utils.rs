use crate::client::config::Config;
use crate::client::consts::{AGENT_ID_PARAM, TOKEN_PARAM};
use anyhow::{Context, Result};
use convai_types::Credentials;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;

/// Builds the websocket handshake request. The credential ends up in the query
/// string, so the request must never be logged.
pub fn build_request(config: &Config, credentials: &Credentials) -> Result<Request> {
    let param = match credentials {
        Credentials::Token(_) => TOKEN_PARAM,
        Credentials::AgentId(_) => AGENT_ID_PARAM,
    };
    let url = url::Url::parse_with_params(config.base_url(), &[(param, credentials.expose())])
        .with_context(|| format!("invalid conversation url {}", config.base_url()))?;
    let request = url.as_str().into_client_request()?;
    Ok(request)
}
