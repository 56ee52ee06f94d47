//! The engine as the controller sees it: a map of named capabilities.
//!
//! Engine SDKs rename their start/stop operations between versions, so the
//! controller never calls a fixed method. It probes a priority-ordered list of
//! candidate names against the map and uses the first one present.

use anyhow::Result;
use convai_types::Credentials;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Start names, highest priority first.
pub const START_CANDIDATES: &[&str] = &["start_session", "start_conversation", "connect", "start"];
/// Stop names, highest priority first.
pub const STOP_CANDIDATES: &[&str] = &[
    "end_session",
    "stop_session",
    "end_conversation",
    "disconnect",
    "stop",
];

pub type StartCapability = Arc<dyn Fn(Credentials) -> BoxFuture<'static, Result<()>> + Send + Sync>;
pub type StopCapability = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

#[derive(Clone)]
pub enum Capability {
    Start(StartCapability),
    Stop(StopCapability),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Start,
    Stop,
}

impl Operation {
    pub fn candidates(&self) -> &'static [&'static str] {
        match self {
            Operation::Start => START_CANDIDATES,
            Operation::Stop => STOP_CANDIDATES,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Start => f.write_str("start"),
            Operation::Stop => f.write_str("stop"),
        }
    }
}

/// Capabilities supplied by whoever owns the engine.
#[derive(Clone, Default)]
pub struct EngineHandle {
    capabilities: HashMap<String, Capability>,
}

impl EngineHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start<F, Fut>(mut self, name: &str, start: F) -> Self
    where
        F: Fn(Credentials) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let start: StartCapability = Arc::new(move |credentials| start(credentials).boxed());
        self.capabilities
            .insert(name.to_string(), Capability::Start(start));
        self
    }

    pub fn with_stop<F, Fut>(mut self, name: &str, stop: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let stop: StopCapability = Arc::new(move || stop().boxed());
        self.capabilities
            .insert(name.to_string(), Capability::Stop(stop));
        self
    }

    /// Registered names, sorted. Handy when logging what an engine exposes.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.capabilities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// First start capability found in [`START_CANDIDATES`] order.
    pub fn start_capability(&self) -> Option<(&'static str, StartCapability)> {
        START_CANDIDATES
            .iter()
            .find_map(|name| match self.capabilities.get(*name) {
                Some(Capability::Start(start)) => Some((*name, start.clone())),
                _ => None,
            })
    }

    /// First stop capability found in [`STOP_CANDIDATES`] order.
    pub fn stop_capability(&self) -> Option<(&'static str, StopCapability)> {
        STOP_CANDIDATES
            .iter()
            .find_map(|name| match self.capabilities.get(*name) {
                Some(Capability::Stop(stop)) => Some((*name, stop.clone())),
                _ => None,
            })
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("capabilities", &self.names())
            .finish()
    }
}
