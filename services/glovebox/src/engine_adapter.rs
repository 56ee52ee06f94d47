use convai_realtime::Client;
use glovebox_core::EngineHandle;
use std::sync::Arc;

/// Exposes the websocket client's session operations as engine capabilities.
pub fn engine_handle(client: Arc<Client>) -> EngineHandle {
    let start_client = client.clone();
    EngineHandle::new()
        .with_start("start_session", move |credentials| {
            let client = start_client.clone();
            async move { client.start_session(credentials).await }
        })
        .with_stop("end_session", move || {
            let client = client.clone();
            async move { client.end_session().await }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use convai_realtime::Config;

    fn client() -> Arc<Client> {
        let (events_tx, _events_rx) = tokio::sync::mpsc::channel(1);
        let config = Config::builder()
            .with_base_url("ws://127.0.0.1:1/v1/convai/conversation")
            .build();
        Arc::new(Client::new(config, events_tx))
    }

    #[test]
    fn registers_start_and_stop() {
        let engine = engine_handle(client());
        assert_eq!(engine.names(), vec!["end_session", "start_session"]);
        assert_eq!(engine.start_capability().map(|(name, _)| name), Some("start_session"));
        assert_eq!(engine.stop_capability().map(|(name, _)| name), Some("end_session"));
    }

    #[tokio::test]
    async fn stop_without_session_is_rejected() {
        let engine = engine_handle(client());
        let (_, stop) = engine.stop_capability().unwrap();
        let err = stop().await.unwrap_err();
        assert_eq!(err.to_string(), "no conversation session is open");
    }

    #[tokio::test]
    async fn timed_out_session_frees_the_client_for_a_retry() {
        use futures_util::StreamExt;
        use glovebox_core::{CredentialResolver, SessionController, SessionState};
        use std::time::Duration;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accepts conversations but never declares them live.
        let server = tokio::spawn(async move {
            for _ in 0..2 {
                let (stream, _) = listener.accept().await.unwrap();
                tokio::spawn(async move {
                    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                    while let Some(Ok(_)) = ws.next().await {}
                });
            }
        });

        let (events_tx, events_rx) = tokio::sync::mpsc::channel(16);
        let config = Config::builder()
            .with_base_url(&format!("ws://{}/v1/convai/conversation", addr))
            .build();
        let client = Arc::new(Client::new(config, events_tx));
        let resolver = CredentialResolver::new("http://127.0.0.1:1", Some("AGENT1".to_string()));
        let controller = SessionController::builder(engine_handle(client.clone()), Arc::new(resolver))
            .with_connect_timeout(Some(Duration::from_millis(300)))
            .build();
        controller.attach(events_rx).unwrap();
        let mut status = controller.subscribe();

        controller.request_start().await;
        status
            .wait_for(|status| status.state() == SessionState::Error)
            .await
            .unwrap();
        assert_eq!(
            controller.last_error().as_deref(),
            Some("session did not connect within 300ms")
        );

        controller.request_start().await;
        assert_eq!(controller.current_state(), SessionState::Connecting);
        assert!(client.is_open());
        server.await.unwrap();
    }
}
