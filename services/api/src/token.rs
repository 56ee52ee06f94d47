use crate::config::Config;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

pub const TOKEN_ROUTE: &str = "/elevenlabs/token";
const UPSTREAM_PATH: &str = "/v1/convai/conversation/token";
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(20);

/// Failures while minting a conversation token. All of them surface as a 500
/// with a `detail` field.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing ELEVENLABS_API_KEY or ELEVENLABS_AGENT_ID")]
    MissingCredentials,
    #[error("Token error {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("{0}")]
    Request(#[from] reqwest::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "detail": self.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

struct Inner {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    agent_id: Option<String>,
    api_url: String,
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState(Arc<Inner>);

impl AppState {
    pub fn new(api_key: Option<SecretString>, agent_id: Option<String>, api_url: &str) -> Self {
        Self(Arc::new(Inner {
            client: reqwest::Client::new(),
            api_key,
            agent_id,
            api_url: api_url.trim_end_matches('/').to_string(),
        }))
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config
                .elevenlabs_api_key
                .as_ref()
                .map(|key| SecretString::from(key.expose_secret().to_string())),
            config.elevenlabs_agent_id.clone(),
            &config.elevenlabs_api_url,
        )
    }
}

/// Asks the upstream for a single-use conversation token and relays its JSON body.
pub async fn elevenlabs_token(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let inner = &state.0;
    let (Some(api_key), Some(agent_id)) = (&inner.api_key, &inner.agent_id) else {
        tracing::error!("token requested but credentials are not configured");
        return Err(ApiError::MissingCredentials);
    };

    let response = inner
        .client
        .get(format!("{}{}", inner.api_url, UPSTREAM_PATH))
        .query(&[("agent_id", agent_id.as_str())])
        .header("xi-api-key", api_key.expose_secret())
        .timeout(UPSTREAM_TIMEOUT)
        .send()
        .await
        .inspect_err(|e| tracing::error!("token request failed: {}", e))?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!("upstream refused token request with {}", status);
        return Err(ApiError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    let body = response.json::<Value>().await?;
    tracing::debug!("issued conversation token for agent {}", agent_id);
    Ok(Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glovebox_core::{CredentialResolver, ResolveCredentials};
    use tokio::net::TcpListener;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(state: AppState) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, crate::router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn configured(upstream: &MockServer) -> AppState {
        AppState::new(
            Some(SecretString::from("xi-secret".to_string())),
            Some("AGENT1".to_string()),
            &upstream.uri(),
        )
    }

    async fn get(base: &str) -> (u16, Value) {
        let response = reqwest::get(format!("{}{}", base, TOKEN_ROUTE))
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn relays_upstream_body() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(UPSTREAM_PATH))
            .and(query_param("agent_id", "AGENT1"))
            .and(header("xi-api-key", "xi-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-1"})))
            .expect(1)
            .mount(&upstream)
            .await;

        let base = serve(configured(&upstream)).await;
        assert_eq!(get(&base).await, (200, json!({"token": "tok-1"})));
    }

    #[tokio::test]
    async fn missing_credentials() {
        let base = serve(AppState::new(None, Some("AGENT1".to_string()), "http://127.0.0.1:1")).await;
        assert_eq!(
            get(&base).await,
            (
                500,
                json!({"detail": "Missing ELEVENLABS_API_KEY or ELEVENLABS_AGENT_ID"})
            )
        );
    }

    #[tokio::test]
    async fn upstream_rejection_is_reported() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&upstream)
            .await;

        let base = serve(configured(&upstream)).await;
        assert_eq!(
            get(&base).await,
            (500, json!({"detail": "Token error 401: invalid api key"}))
        );
    }

    #[tokio::test]
    async fn resolver_uses_issued_token() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(UPSTREAM_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-2"})))
            .mount(&upstream)
            .await;

        let base = serve(configured(&upstream)).await;
        let resolver = CredentialResolver::new(&base, None);
        let credentials = resolver.resolve().await.unwrap();
        assert_eq!(credentials.expose(), "tok-2");
    }

    #[tokio::test]
    async fn resolver_falls_back_when_broker_is_unconfigured() {
        let base = serve(AppState::new(None, None, "http://127.0.0.1:1")).await;
        let resolver = CredentialResolver::new(&base, Some("AGENT9".to_string()));
        let credentials = resolver.resolve().await.unwrap();
        assert_eq!(credentials.expose(), "AGENT9");
    }
}
