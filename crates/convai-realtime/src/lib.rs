mod client;

pub use client::config::{Config, ConfigBuilder};
pub use client::{Client, EventTx};
pub use convai_types as types;
