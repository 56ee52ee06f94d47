//! Lifecycle of a single voice conversation session.
//!
//! [`SessionController`] owns the state machine. It resolves credentials through a
//! [`ResolveCredentials`] implementation, starts and stops the engine through the
//! capabilities registered on an [`EngineHandle`], and learns about the engine's
//! progress through the [`EventBridge`].
pub mod bridge;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod observer;
pub mod session_state;

pub use bridge::EventBridge;
pub use config::{Config, ConfigError};
pub use credentials::{CredentialResolver, ResolveCredentials};
pub use engine::EngineHandle;
pub use error::{Diagnostic, ErrorKind, SessionError};
pub use observer::{SessionObserver, SessionRecord, TracingObserver};
pub use session_state::{SessionController, SessionState, SessionStatus};
