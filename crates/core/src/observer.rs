//! Diagnostic records emitted by the session, and the sinks that receive them.

use crate::error::{Diagnostic, TokenUnavailable};
use crate::session_state::SessionState;
use convai_types::{CredentialSource, EventKind};

/// One observable thing that happened inside a session. Never carries credentials.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionRecord {
    Transition {
        from: SessionState,
        to: SessionState,
    },
    StartRejected {
        state: SessionState,
    },
    TokenUnavailable {
        reason: TokenUnavailable,
    },
    CredentialsResolved {
        source: CredentialSource,
    },
    CapabilityInvoked {
        name: &'static str,
    },
    EngineEvent {
        kind: EventKind,
        detail: Option<String>,
    },
    Failure(Diagnostic),
    /// Tearing down an abandoned engine session failed. The session's own error stays.
    StopFailed(Diagnostic),
    /// An engine event from a session opened by an earlier attempt.
    StaleEvent {
        attempt: u64,
    },
}

/// Receives session records. Injected so the session can be observed (and tested)
/// without capturing global output.
pub trait SessionObserver: Send + Sync {
    fn record(&self, record: SessionRecord);
}

/// Forwards records to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn record(&self, record: SessionRecord) {
        match record {
            SessionRecord::Transition { from, to } => {
                tracing::info!("session state: {} -> {}", from, to);
            }
            SessionRecord::StartRejected { state } => {
                tracing::debug!("start ignored while {}", state);
            }
            SessionRecord::TokenUnavailable { reason } => {
                tracing::warn!("session token unavailable: {}", reason);
            }
            SessionRecord::CredentialsResolved { source } => {
                tracing::info!("using {} credentials", source);
            }
            SessionRecord::CapabilityInvoked { name } => {
                tracing::debug!("invoking engine capability {}", name);
            }
            SessionRecord::EngineEvent { kind, detail } => match detail {
                Some(detail) => tracing::debug!("engine event {}: {}", kind, detail),
                None => tracing::debug!("engine event {}", kind),
            },
            SessionRecord::Failure(diagnostic) => {
                tracing::error!("session failure ({:?}): {}", diagnostic.kind(), diagnostic);
            }
            SessionRecord::StopFailed(diagnostic) => {
                tracing::warn!("could not stop abandoned engine session: {}", diagnostic);
            }
            SessionRecord::StaleEvent { attempt } => {
                tracing::debug!("ignoring event from the session of attempt {}", attempt);
            }
        }
    }
}
