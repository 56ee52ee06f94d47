//! The session lifecycle controller.
//!
//! Owns the session state, decides which transitions are legal, drives the
//! engine's start/stop capabilities and publishes every change on a `watch`
//! channel so a front end can re-render.

use crate::bridge::EventBridge;
use crate::credentials::ResolveCredentials;
use crate::engine::{EngineHandle, Operation};
use crate::error::{Diagnostic, ErrorKind, SessionError, normalize};
use crate::observer::{SessionObserver, SessionRecord, TracingObserver};
use anyhow::Result;
use convai_types::{EngineEvent, Fault};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl SessionState {
    /// Whether a start request would be accepted.
    pub fn can_start(&self) -> bool {
        !matches!(self, SessionState::Connecting | SessionState::Connected)
    }

    /// Whether a front end should offer stopping.
    pub fn can_stop(&self) -> bool {
        matches!(self, SessionState::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Disconnected => "disconnected",
            SessionState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    StartRequested,
    EngineConnected,
    /// The engine session ended, with the normalized close detail if there was one.
    EngineDisconnected(Option<Diagnostic>),
    Failed(Diagnostic),
}

impl Trigger {
    fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Trigger::Failed(diagnostic) | Trigger::EngineDisconnected(Some(diagnostic)) => {
                Some(diagnostic)
            }
            _ => None,
        }
    }
}

/// The transition table. `None` means the trigger is ignored in that state.
pub fn transition(state: SessionState, trigger: &Trigger) -> Option<SessionState> {
    use SessionState::*;

    match (state, trigger) {
        (Idle | Disconnected | Error, Trigger::StartRequested) => Some(Connecting),
        (Connecting | Connected, Trigger::StartRequested) => None,

        (Connecting, Trigger::EngineConnected) => Some(Connected),
        (Idle | Connected | Disconnected | Error, Trigger::EngineConnected) => None,

        // Closed by the server before going live: the attempt was rejected.
        (Connecting, Trigger::EngineDisconnected(Some(_))) => Some(Error),
        (Connecting | Connected, Trigger::EngineDisconnected(_)) => Some(Disconnected),
        // A disconnect that trails an error must not mask the error.
        (Error, Trigger::EngineDisconnected(_)) => None,
        (Idle | Disconnected, Trigger::EngineDisconnected(_)) => None,

        (_, Trigger::Failed(_)) => Some(Error),
    }
}

/// Snapshot of the session as published to subscribers.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SessionStatus {
    state: SessionState,
    last_error: Option<Diagnostic>,
    #[serde(skip)]
    attempt: u64,
}

impl SessionStatus {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_error(&self) -> Option<&Diagnostic> {
        self.last_error.as_ref()
    }

    /// Counter of accepted start requests.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }
}

struct Inner {
    status: watch::Sender<SessionStatus>,
    engine: EngineHandle,
    resolver: Arc<dyn ResolveCredentials>,
    observer: Arc<dyn SessionObserver>,
    connect_timeout: Option<Duration>,
    attached: AtomicBool,
    // Attempts whose engine session has not reported its disconnect yet, oldest first.
    sessions: Mutex<VecDeque<u64>>,
    // Held across every start and stop call so they reach the engine one at a time.
    engine_calls: tokio::sync::Mutex<()>,
}

pub struct SessionControllerBuilder {
    engine: EngineHandle,
    resolver: Arc<dyn ResolveCredentials>,
    observer: Arc<dyn SessionObserver>,
    connect_timeout: Option<Duration>,
}

impl SessionControllerBuilder {
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Upper bound for an attempt to reach `connected`. `None` waits forever.
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn build(self) -> SessionController {
        let (status, _) = watch::channel(SessionStatus::default());
        SessionController {
            inner: Arc::new(Inner {
                status,
                engine: self.engine,
                resolver: self.resolver,
                observer: self.observer,
                connect_timeout: self.connect_timeout,
                attached: AtomicBool::new(false),
                sessions: Mutex::new(VecDeque::new()),
                engine_calls: tokio::sync::Mutex::new(()),
            }),
        }
    }
}

/// Handle to one voice session. Clones share the same session.
///
/// The engine is expected to report each session it opens in order: every event of
/// a session is delivered before any event of the next one, and a session whose
/// start call succeeded ends with exactly one disconnect. That lets events be
/// attributed to the attempt that opened the session, so a late disconnect of an
/// abandoned session cannot end a newer attempt.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn builder(
        engine: EngineHandle,
        resolver: Arc<dyn ResolveCredentials>,
    ) -> SessionControllerBuilder {
        SessionControllerBuilder {
            engine,
            resolver,
            observer: Arc::new(TracingObserver),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    pub fn current_state(&self) -> SessionState {
        self.inner.status.borrow().state
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner
            .status
            .borrow()
            .last_error
            .as_ref()
            .map(|diagnostic| diagnostic.message().to_string())
    }

    pub fn last_diagnostic(&self) -> Option<Diagnostic> {
        self.inner.status.borrow().last_error.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.status.borrow().clone()
    }

    /// Receiver that is notified on every state or error change.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status.subscribe()
    }

    pub fn bridge(&self) -> EventBridge {
        EventBridge::new(self.clone())
    }

    /// Feeds the engine's event stream through the bridge. Only one stream may be
    /// attached for the lifetime of the controller.
    pub fn attach(&self, mut events: mpsc::Receiver<EngineEvent>) -> Result<JoinHandle<()>> {
        if self.inner.attached.swap(true, Ordering::SeqCst) {
            return Err(anyhow::anyhow!("engine events are already attached"));
        }
        let bridge = self.bridge();
        Ok(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                bridge.dispatch(event);
            }
            tracing::debug!("engine event stream closed");
        }))
    }

    /// Begins a new attempt unless one is already connecting or connected.
    ///
    /// Returning does not mean the session is live; the engine's connect event
    /// does that. Failures end up in the error state, never in the caller.
    pub async fn request_start(&self) {
        let Some(attempt) = self.begin_attempt() else {
            return;
        };

        let Some(limit) = self.inner.connect_timeout else {
            if let Err(diagnostic) = self.start_attempt(attempt).await {
                self.fail_attempt(attempt, diagnostic);
            }
            return;
        };

        let deadline = Instant::now() + limit;
        match tokio::time::timeout_at(deadline, self.start_attempt(attempt)).await {
            Ok(Ok(())) => self.spawn_watchdog(attempt, deadline, limit),
            Ok(Err(diagnostic)) => self.fail_attempt(attempt, diagnostic),
            Err(_) => self.abandon_attempt(attempt, limit, false).await,
        }
    }

    /// Asks the engine to stop. The engine's disconnect event completes the stop.
    pub async fn request_stop(&self) {
        let Some((name, stop)) = self.inner.engine.stop_capability() else {
            let err = capability_missing(Operation::Stop);
            self.apply(Trigger::Failed(err.diagnostic()));
            return;
        };

        let _engine = self.inner.engine_calls.lock().await;
        self.inner
            .observer
            .record(SessionRecord::CapabilityInvoked { name });
        if let Err(err) = stop().await {
            let diagnostic = normalize(&Fault::from(err), ErrorKind::EngineRejected);
            self.apply(Trigger::Failed(diagnostic));
        }
    }

    pub(crate) fn observer(&self) -> &Arc<dyn SessionObserver> {
        &self.inner.observer
    }

    pub(crate) fn apply(&self, trigger: Trigger) -> bool {
        self.apply_when(trigger, |_| true)
    }

    /// Applies a trigger raised by an engine event on behalf of the attempt that
    /// opened the reporting session. `ends_session` marks the session's disconnect.
    pub(crate) fn apply_from_engine(&self, trigger: Trigger, ends_session: bool) -> bool {
        let owner = {
            let mut sessions = self.sessions();
            if ends_session {
                sessions.pop_front()
            } else {
                sessions.front().copied()
            }
        };
        let Some(owner) = owner else {
            return false;
        };
        if owner != self.inner.status.borrow().attempt {
            self.inner
                .observer
                .record(SessionRecord::StaleEvent { attempt: owner });
            return false;
        }
        self.apply_when(trigger, |status| status.attempt == owner)
    }

    /// Runs one transition atomically with respect to every other transition.
    fn apply_when<P>(&self, trigger: Trigger, precondition: P) -> bool
    where
        P: Fn(&SessionStatus) -> bool,
    {
        let mut change = None;
        self.inner.status.send_if_modified(|status| {
            if !precondition(status) {
                return false;
            }
            let Some(next) = transition(status.state, &trigger) else {
                return false;
            };
            change = Some((status.state, next));
            status.state = next;
            match &trigger {
                Trigger::StartRequested => {
                    status.last_error = None;
                    status.attempt += 1;
                }
                Trigger::EngineConnected => status.last_error = None,
                _ if next == SessionState::Error => {
                    status.last_error = trigger.diagnostic().cloned();
                }
                _ => {}
            }
            true
        });

        let Some((from, to)) = change else {
            return false;
        };
        if to == SessionState::Error {
            if let Some(diagnostic) = trigger.diagnostic() {
                self.inner
                    .observer
                    .record(SessionRecord::Failure(diagnostic.clone()));
            }
        }
        if from != to {
            self.inner
                .observer
                .record(SessionRecord::Transition { from, to });
        }
        true
    }

    fn begin_attempt(&self) -> Option<u64> {
        if self.apply(Trigger::StartRequested) {
            return Some(self.inner.status.borrow().attempt);
        }
        let state = self.current_state();
        self.inner
            .observer
            .record(SessionRecord::StartRejected { state });
        None
    }

    async fn start_attempt(&self, attempt: u64) -> Result<(), Diagnostic> {
        let Some((name, start)) = self.inner.engine.start_capability() else {
            return Err(capability_missing(Operation::Start).diagnostic());
        };

        let credentials = self
            .inner
            .resolver
            .resolve()
            .await
            .map_err(|e| e.diagnostic())?;

        let _engine = self.inner.engine_calls.lock().await;
        self.inner
            .observer
            .record(SessionRecord::CapabilityInvoked { name });
        // Registered before the call: the connect event may overtake its return.
        self.sessions().push_back(attempt);
        start(credentials).await.map_err(|e| {
            self.release_session(attempt);
            normalize(&Fault::from(e), ErrorKind::EngineRejected)
        })
    }

    /// Fails the given attempt, unless a newer attempt has replaced it.
    fn fail_attempt(&self, attempt: u64, diagnostic: Diagnostic) {
        self.apply_when(Trigger::Failed(diagnostic), |status| status.attempt == attempt);
    }

    /// Fails an attempt that is still connecting at its deadline and stops the engine
    /// session it may have opened, so the engine is free for the next attempt.
    ///
    /// `opened` is whether the start call returned successfully. When it did not, a
    /// session exists only if the stop call finds one.
    async fn abandon_attempt(&self, attempt: u64, limit: Duration, opened: bool) {
        // Taken before the state changes, so a retry can only reach the engine after
        // the teardown.
        let _engine = self.inner.engine_calls.lock().await;
        let failed = self.apply_when(
            Trigger::Failed(SessionError::ConnectTimeout(limit).diagnostic()),
            |status| status.attempt == attempt && status.state == SessionState::Connecting,
        );
        if !failed {
            return;
        }

        let stopped = self.stop_abandoned().await;
        if !opened && !stopped {
            self.release_session(attempt);
        }
    }

    async fn stop_abandoned(&self) -> bool {
        let Some((name, stop)) = self.inner.engine.stop_capability() else {
            let diagnostic = capability_missing(Operation::Stop).diagnostic();
            self.inner
                .observer
                .record(SessionRecord::StopFailed(diagnostic));
            return false;
        };

        self.inner
            .observer
            .record(SessionRecord::CapabilityInvoked { name });
        match stop().await {
            Ok(()) => true,
            Err(err) => {
                let diagnostic = normalize(&Fault::from(err), ErrorKind::EngineRejected);
                self.inner
                    .observer
                    .record(SessionRecord::StopFailed(diagnostic));
                false
            }
        }
    }

    fn spawn_watchdog(&self, attempt: u64, deadline: Instant, limit: Duration) {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            SessionController { inner }
                .abandon_attempt(attempt, limit, true)
                .await;
        });
    }

    fn sessions(&self) -> MutexGuard<'_, VecDeque<u64>> {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn release_session(&self, attempt: u64) {
        self.sessions().retain(|owner| *owner != attempt);
    }
}

fn capability_missing(operation: Operation) -> SessionError {
    SessionError::CapabilityMissing {
        operation,
        tried: operation.candidates().join(", "),
    }
}
