//! Shared types for talking to a conversational-AI engine: the credentials used to
//! open a session, the events an engine emits, and the websocket wire messages.
pub mod credentials;
pub mod events;

pub use credentials::{CredentialSource, Credentials};
pub use events::close::CloseEvent;
pub use events::fault::Fault;
pub use events::{EngineEvent, EventKind};
