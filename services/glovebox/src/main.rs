use anyhow::{Context, Result};
use clap::Parser;
use glovebox::{engine_adapter, shell};
use glovebox_core::{Config, CredentialResolver, SessionController, SessionStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(about = "Talk to the GloveBox voice agent")]
struct Cli {
    /// Base URL of the token backend (overrides BACKEND_URL)
    #[arg(long)]
    backend_url: Option<String>,
    /// Agent id used when no session token is available (overrides ELEVENLABS_AGENT_ID)
    #[arg(long)]
    agent_id: Option<String>,
    /// Seconds to wait for the conversation to go live, 0 waits forever
    #[arg(long)]
    connect_timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    // --- 3. Apply Command-Line Overrides ---
    let args = Cli::parse();
    let mut config = config;
    if let Some(url) = &args.backend_url {
        config = config.with_backend_base_url(url);
    }
    if let Some(agent_id) = &args.agent_id {
        config = config.with_static_agent_id(agent_id);
    }
    if let Some(secs) = args.connect_timeout {
        config = config.with_connect_timeout((secs > 0).then(|| Duration::from_secs(secs)));
    }

    // --- 4. Wire Engine, Resolver and Controller ---
    let (events_tx, events_rx) = tokio::sync::mpsc::channel(256);
    let client = Arc::new(convai_realtime::Client::new(
        convai_realtime::Config::new(),
        events_tx,
    ));
    let engine = engine_adapter::engine_handle(client);
    tracing::debug!("engine capabilities: {:?}", engine.names());

    let resolver = Arc::new(CredentialResolver::from_config(&config));
    let controller = SessionController::builder(engine, resolver)
        .with_connect_timeout(config.connect_timeout())
        .build();
    controller
        .attach(events_rx)
        .context("Failed to attach engine events")?;

    // --- 5. Render Every Status Change ---
    let mut status_rx = controller.subscribe();
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            render(&status);
        }
    });

    // --- 6. Command Loop ---
    println!("GloveBox. Commands: start, stop, status, quit");
    render(&controller.status());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let state = controller.current_state();
        match line.trim() {
            "start" if state.can_start() => {
                let controller = controller.clone();
                tokio::spawn(async move { controller.request_start().await });
            }
            "start" => println!("Start is unavailable while {}", state),
            "stop" if state.can_stop() => {
                let controller = controller.clone();
                tokio::spawn(async move { controller.request_stop().await });
            }
            "stop" => println!("Stop is only available while connected"),
            "status" => println!("{}", serde_json::to_string(&controller.status())?),
            "quit" | "exit" => break,
            "" => {}
            other => println!("Unknown command: {}", other),
        }
    }

    shell::shutdown(&controller, shell::SHUTDOWN_GRACE).await;
    Ok(())
}

fn render(status: &SessionStatus) {
    println!("Status: {}", status.state());
    if let Some(error) = status.last_error() {
        println!("Error: {}", error);
    }
}
