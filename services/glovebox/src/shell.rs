use glovebox_core::{SessionController, SessionState};
use std::time::Duration;

/// How long quitting waits for a live session to close.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Stops a connected session and waits, at most `grace`, for the engine to report
/// the disconnect. Returns the state the session was left in.
pub async fn shutdown(controller: &SessionController, grace: Duration) -> SessionState {
    if controller.current_state() != SessionState::Connected {
        return controller.current_state();
    }

    let mut status = controller.subscribe();
    controller.request_stop().await;
    if tokio::time::timeout(
        grace,
        status.wait_for(|status| status.state() != SessionState::Connected),
    )
    .await
    .is_err()
    {
        tracing::warn!("session still connected after {:?}, quitting anyway", grace);
    }
    controller.current_state()
}

#[cfg(test)]
mod tests {
    use super::*;
    use convai_realtime::types::EngineEvent;
    use glovebox_core::{CredentialResolver, EngineHandle};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn controller(engine: EngineHandle) -> SessionController {
        let resolver = CredentialResolver::new("http://127.0.0.1:1", Some("AGENT1".to_string()));
        SessionController::builder(engine, Arc::new(resolver))
            .with_connect_timeout(None)
            .build()
    }

    #[tokio::test]
    async fn waits_for_the_disconnect() {
        let (events_tx, events_rx) = mpsc::channel(8);
        let stop_events = events_tx.clone();
        let engine = EngineHandle::new()
            .with_start("start_session", |_| async { Ok(()) })
            .with_stop("end_session", move || {
                let events = stop_events.clone();
                async move {
                    // The close handshake finishes after the stop call returns.
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        let _ = events.send(EngineEvent::Disconnect(None)).await;
                    });
                    Ok(())
                }
            });
        let controller = controller(engine);
        controller.attach(events_rx).unwrap();

        controller.request_start().await;
        events_tx.send(EngineEvent::Connect).await.unwrap();
        controller
            .subscribe()
            .wait_for(|status| status.state() == SessionState::Connected)
            .await
            .unwrap();

        assert_eq!(
            shutdown(&controller, Duration::from_secs(5)).await,
            SessionState::Disconnected
        );
    }

    #[tokio::test]
    async fn nothing_to_stop_when_not_connected() {
        let engine = EngineHandle::new().with_stop("end_session", || async {
            Err(anyhow::anyhow!("must not be called"))
        });
        let controller = controller(engine);

        assert_eq!(
            shutdown(&controller, Duration::from_secs(5)).await,
            SessionState::Idle
        );
    }
}
