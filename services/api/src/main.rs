use anyhow::Context;
use glovebox_api::{AppState, config::Config, router};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load application configuration")?;

    // Initialize the tracing subscriber for logging.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    if config.elevenlabs_api_key.is_none() || config.elevenlabs_agent_id.is_none() {
        tracing::warn!("ELEVENLABS_API_KEY or ELEVENLABS_AGENT_ID is unset; token requests will fail");
    }

    let app = router(AppState::from_config(&config));

    info!("Starting token service, listening on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
