//! # Nitro Registry - Service Discovery
//!
//! Directory of running service instances. The server registers itself on
//! start and deregisters on stop; the client resolves call targets here.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  Registry                   │
//! │                                             │
//! │  greeter ── latest ── [node-a, node-b]      │
//! │          └─ v2     ── [node-c]              │
//! │  billing ── latest ── [node-d]              │
//! └─────────────────────────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod memory;
pub mod service;

pub use memory::MemoryRegistry;
pub use service::{Endpoint, Node, Service};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

/// Maximum registry events buffered per watcher before it lags.
pub const DEFAULT_WATCH_CAPACITY: usize = 256;

/// Errors from registry operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No service registered under the name.
    #[error("Service not found: {0}")]
    NotFound(String),

    /// Service record rejected.
    #[error("Invalid service: {0}")]
    InvalidService(String),

    /// Watch channel closed.
    #[error("Watcher stopped")]
    WatcherStopped,
}

/// Kind of change reported to watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryAction {
    /// A service version appeared.
    Create,
    /// Nodes or endpoints of an existing version changed.
    Update,
    /// Nodes were removed.
    Delete,
}

/// A change in the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEvent {
    /// What happened.
    pub action: RegistryAction,
    /// The service record involved. For `Delete`, only the removed nodes.
    pub service: Service,
}

/// Stream of registry changes.
pub struct Watcher {
    receiver: broadcast::Receiver<RegistryEvent>,
}

impl Watcher {
    /// Wrap a broadcast receiver.
    #[must_use]
    pub fn new(receiver: broadcast::Receiver<RegistryEvent>) -> Self {
        Self { receiver }
    }

    /// Next change. Lagged events are skipped.
    pub async fn next(&mut self) -> Result<RegistryEvent, RegistryError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Ok(event),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    tracing::debug!(lagged = count, "Registry watcher lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(RegistryError::WatcherStopped)
                }
            }
        }
    }
}

/// Service-instance directory.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Add or refresh the nodes of a service version.
    async fn register(&self, service: &Service) -> Result<(), RegistryError>;

    /// Remove the given nodes of a service version.
    async fn deregister(&self, service: &Service) -> Result<(), RegistryError>;

    /// All versions registered under `name`.
    async fn get_service(&self, name: &str) -> Result<Vec<Service>, RegistryError>;

    /// Every registered service version.
    async fn list_services(&self) -> Result<Vec<Service>, RegistryError>;

    /// Subscribe to registry changes.
    fn watch(&self) -> Watcher;

    /// Implementation name.
    fn name(&self) -> &'static str;
}
