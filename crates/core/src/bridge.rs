use crate::error::{ErrorKind, normalize};
use crate::observer::SessionRecord;
use crate::session_state::{SessionController, SessionState, Trigger};
use convai_types::{EngineEvent, EventKind, Fault};

/// Turns engine events into session transitions.
///
/// Only connect, disconnect and error change the state, and only for the attempt
/// that opened the reporting session. Every other event is reported to the
/// observer and otherwise ignored.
#[derive(Clone)]
pub struct EventBridge {
    controller: SessionController,
}

impl EventBridge {
    pub(crate) fn new(controller: SessionController) -> Self {
        Self { controller }
    }

    pub fn dispatch(&self, event: EngineEvent) {
        let kind = event.kind();
        match event {
            EngineEvent::Connect => {
                self.record(kind, None);
                self.controller
                    .apply_from_engine(Trigger::EngineConnected, false);
            }
            EngineEvent::Disconnect(close) => {
                let diagnostic =
                    close.map(|close| normalize(&Fault::Close(close), ErrorKind::EngineCloseEvent));
                // While an error is on record the close detail adds nothing.
                let detail = match self.controller.current_state() {
                    SessionState::Error => None,
                    _ => diagnostic.as_ref().map(|d| d.message().to_string()),
                };
                self.record(kind, detail);
                self.controller
                    .apply_from_engine(Trigger::EngineDisconnected(diagnostic), true);
            }
            EngineEvent::Error(fault) => {
                let diagnostic = normalize(&fault, ErrorKind::EngineReportedError);
                self.record(kind, Some(diagnostic.message().to_string()));
                self.controller
                    .apply_from_engine(Trigger::Failed(diagnostic), false);
            }
            EngineEvent::Message(payload) | EngineEvent::ConversationUpdate(payload) => {
                self.record(kind, Some(payload.to_string()));
            }
            EngineEvent::UserSpeechStart
            | EngineEvent::UserSpeechEnd
            | EngineEvent::AgentSpeechStart
            | EngineEvent::AgentSpeechEnd
            | EngineEvent::AgentInterrupt => self.record(kind, None),
        }
    }

    fn record(&self, kind: EventKind, detail: Option<String>) {
        self.controller
            .observer()
            .record(SessionRecord::EngineEvent { kind, detail });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MockResolveCredentials;
    use crate::engine::EngineHandle;
    use crate::observer::testing::MemoryObserver;
    use convai_types::{CloseEvent, Credentials};
    use serde_json::json;
    use std::sync::Arc;

    fn connected_controller(observer: Arc<MemoryObserver>) -> SessionController {
        let mut resolver = MockResolveCredentials::new();
        resolver
            .expect_resolve()
            .returning(|| Ok(Credentials::agent_id("AGENT1")));
        let engine = EngineHandle::new().with_start("start_session", |_| async { Ok(()) });
        SessionController::builder(engine, Arc::new(resolver))
            .with_connect_timeout(None)
            .with_observer(observer)
            .build()
    }

    #[tokio::test]
    async fn observability_events_leave_state_alone() {
        let observer = Arc::new(MemoryObserver::default());
        let controller = connected_controller(observer.clone());
        controller.request_start().await;
        let bridge = controller.bridge();
        bridge.dispatch(EngineEvent::Connect);

        for event in [
            EngineEvent::UserSpeechStart,
            EngineEvent::UserSpeechEnd,
            EngineEvent::AgentSpeechStart,
            EngineEvent::AgentSpeechEnd,
            EngineEvent::AgentInterrupt,
            EngineEvent::Message(json!({"type": "agent_response", "text": "hi"})),
            EngineEvent::ConversationUpdate(json!({"role": "agent", "text": "hi"})),
        ] {
            bridge.dispatch(event);
            assert_eq!(controller.current_state(), SessionState::Connected);
        }

        let kinds: Vec<EventKind> = observer
            .records()
            .into_iter()
            .filter_map(|record| match record {
                SessionRecord::EngineEvent { kind, .. } => Some(kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Connect,
                EventKind::UserSpeechStart,
                EventKind::UserSpeechEnd,
                EventKind::AgentSpeechStart,
                EventKind::AgentSpeechEnd,
                EventKind::AgentInterrupt,
                EventKind::Message,
                EventKind::ConversationUpdate,
            ]
        );
    }

    #[tokio::test]
    async fn disconnect_detail_is_normalized() {
        let observer = Arc::new(MemoryObserver::default());
        let controller = connected_controller(observer.clone());
        controller.request_start().await;
        controller.bridge().dispatch(EngineEvent::Connect);

        controller
            .bridge()
            .dispatch(EngineEvent::Disconnect(Some(CloseEvent::new(1000, ""))));

        assert_eq!(controller.current_state(), SessionState::Disconnected);
        assert!(observer.records().contains(&SessionRecord::EngineEvent {
            kind: EventKind::Disconnect,
            detail: Some("CloseEvent code=1000 reason=(no reason)".to_string()),
        }));
    }

    #[tokio::test]
    async fn close_before_going_live_rejects_the_attempt() {
        let observer = Arc::new(MemoryObserver::default());
        let controller = connected_controller(observer.clone());
        controller.request_start().await;

        controller.bridge().dispatch(EngineEvent::Disconnect(Some(CloseEvent::new(
            1008,
            "Invalid agent id",
        ))));

        assert_eq!(controller.current_state(), SessionState::Error);
        let diagnostic = controller.last_diagnostic().unwrap();
        assert_eq!(diagnostic.kind(), ErrorKind::EngineCloseEvent);
        assert_eq!(
            diagnostic.message(),
            "CloseEvent code=1008 reason=Invalid agent id"
        );
        assert!(observer
            .records()
            .contains(&SessionRecord::Failure(diagnostic)));
    }

    #[tokio::test]
    async fn bare_disconnect_before_going_live_is_not_an_error() {
        let controller = connected_controller(Arc::new(MemoryObserver::default()));
        controller.request_start().await;

        controller.bridge().dispatch(EngineEvent::Disconnect(None));

        assert_eq!(controller.current_state(), SessionState::Disconnected);
        assert_eq!(controller.last_error(), None);
    }

    #[tokio::test]
    async fn stray_events_before_start_are_ignored() {
        let observer = Arc::new(MemoryObserver::default());
        let controller = connected_controller(observer);
        let bridge = controller.bridge();

        bridge.dispatch(EngineEvent::Connect);
        bridge.dispatch(EngineEvent::Disconnect(None));

        assert_eq!(controller.current_state(), SessionState::Idle);
    }
}
