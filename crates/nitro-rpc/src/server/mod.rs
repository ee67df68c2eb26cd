//! # Server
//!
//! Inbound RPC and event subscription. A server owns a set of [`Handler`]s
//! and [`Subscriber`]s; `start` makes them reachable through the transport
//! and broker and announces the service in the registry.

mod rpc;

pub use rpc::RpcServer;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use nitro_broker::{Broker, MemoryBroker};
use nitro_registry::{MemoryRegistry, Registry};
use nitro_transport::{MemoryTransport, Transport};
use nitro_types::Metadata;
use uuid::Uuid;

use crate::error::ServerError;
use crate::handler::{EventHandler, Handler, Routes, Subscriber};

/// Default server name.
pub const DEFAULT_NAME: &str = "nitro";

/// Default service version.
pub const DEFAULT_VERSION: &str = "latest";

/// Default listen address; the transport allocates a concrete one.
pub const DEFAULT_ADDRESS: &str = ":0";

/// Server configuration.
#[derive(Clone)]
pub struct ServerOptions {
    /// Service name announced in the registry.
    pub name: String,
    /// Node id, unique per process.
    pub id: String,
    /// Service version.
    pub version: String,
    /// Requested listen address.
    pub address: String,
    /// Service metadata.
    pub metadata: Metadata,
    /// Bus the subscribers attach to.
    pub broker: Arc<dyn Broker>,
    /// Directory the service is announced in.
    pub registry: Arc<dyn Registry>,
    /// Listen capability.
    pub transport: Arc<dyn Transport>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            id: Uuid::new_v4().to_string(),
            version: DEFAULT_VERSION.to_string(),
            address: DEFAULT_ADDRESS.to_string(),
            metadata: Metadata::new(),
            broker: Arc::new(MemoryBroker::new()),
            registry: Arc::new(MemoryRegistry::new()),
            transport: Arc::new(MemoryTransport::new()),
        }
    }
}

impl fmt::Debug for ServerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerOptions")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("version", &self.version)
            .field("address", &self.address)
            .field("metadata", &self.metadata)
            .field("broker", &self.broker.name())
            .field("registry", &self.registry.name())
            .field("transport", &self.transport.name())
            .finish()
    }
}

/// Mutates [`ServerOptions`] when passed to [`Server::init`].
pub type ServerOption = Box<dyn FnOnce(&mut ServerOptions) + Send>;

/// Set the service name.
pub fn name(name: impl Into<String>) -> ServerOption {
    let name = name.into();
    Box::new(move |o| o.name = name)
}

/// Set the node id.
pub fn id(id: impl Into<String>) -> ServerOption {
    let id = id.into();
    Box::new(move |o| o.id = id)
}

/// Set the service version.
pub fn version(version: impl Into<String>) -> ServerOption {
    let version = version.into();
    Box::new(move |o| o.version = version)
}

/// Set the listen address.
pub fn address(address: impl Into<String>) -> ServerOption {
    let address = address.into();
    Box::new(move |o| o.address = address)
}

/// Add one metadata entry.
pub fn metadata(key: impl Into<String>, value: impl Into<String>) -> ServerOption {
    let (key, value) = (key.into(), value.into());
    Box::new(move |o| {
        o.metadata.insert(key, value);
    })
}

/// Use `broker` for subscriptions.
pub fn broker(broker: Arc<dyn Broker>) -> ServerOption {
    Box::new(move |o| o.broker = broker)
}

/// Use `registry` for announcements.
pub fn registry(registry: Arc<dyn Registry>) -> ServerOption {
    Box::new(move |o| o.registry = registry)
}

/// Use `transport` for listening.
pub fn transport(transport: Arc<dyn Transport>) -> ServerOption {
    Box::new(move |o| o.transport = transport)
}

/// Inbound RPC and subscription capability.
#[async_trait]
pub trait Server: Send + Sync {
    /// Apply options in order. Takes effect on the next `start`.
    fn init(&self, options: Vec<ServerOption>);

    /// Snapshot of the current options.
    fn options(&self) -> ServerOptions;

    /// Prepare routes for registration.
    fn new_handler(&self, routes: Routes) -> Handler;

    /// Register a handler.
    async fn handle(&self, handler: Handler) -> Result<(), ServerError>;

    /// Bind an event handler to a topic.
    fn new_subscriber(&self, topic: &str, handler: EventHandler) -> Subscriber;

    /// Register a subscriber. Attached to the broker at `start`, or
    /// immediately if the server is already running.
    async fn subscribe(&self, subscriber: Subscriber) -> Result<(), ServerError>;

    /// Begin serving.
    async fn start(&self) -> Result<(), ServerError>;

    /// Stop serving.
    async fn stop(&self) -> Result<(), ServerError>;
}
