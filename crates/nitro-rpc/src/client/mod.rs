//! # Client
//!
//! Outbound RPC and pub/sub. The client resolves targets through the
//! registry, exchanges frames over the transport and publishes through the
//! broker.

mod rpc;

pub use rpc::RpcClient;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nitro_broker::{Broker, MemoryBroker};
use nitro_registry::{MemoryRegistry, Registry};
use nitro_transport::{MemoryTransport, Transport};
use nitro_types::Context;
use serde_json::Value;

use crate::error::ClientError;
use crate::message::{Message, Request, Response};
use crate::DEFAULT_CONTENT_TYPE;

/// Default time a call waits for its reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client configuration.
#[derive(Clone)]
pub struct ClientOptions {
    /// Bus used by `publish`.
    pub broker: Arc<dyn Broker>,
    /// Directory used to resolve call targets.
    pub registry: Arc<dyn Registry>,
    /// Connection capability used by `call`.
    pub transport: Arc<dyn Transport>,
    /// Content type stamped on requests and messages.
    pub content_type: String,
    /// Per-call reply deadline.
    pub request_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            broker: Arc::new(MemoryBroker::new()),
            registry: Arc::new(MemoryRegistry::new()),
            transport: Arc::new(MemoryTransport::new()),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("broker", &self.broker.name())
            .field("registry", &self.registry.name())
            .field("transport", &self.transport.name())
            .field("content_type", &self.content_type)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Mutates [`ClientOptions`] when passed to [`Client::init`].
pub type ClientOption = Box<dyn FnOnce(&mut ClientOptions) + Send>;

/// Use `broker` for publishing.
pub fn broker(broker: Arc<dyn Broker>) -> ClientOption {
    Box::new(move |o| o.broker = broker)
}

/// Use `registry` for target resolution.
pub fn registry(registry: Arc<dyn Registry>) -> ClientOption {
    Box::new(move |o| o.registry = registry)
}

/// Use `transport` for calls.
pub fn transport(transport: Arc<dyn Transport>) -> ClientOption {
    Box::new(move |o| o.transport = transport)
}

/// Set the content type.
pub fn content_type(content_type: impl Into<String>) -> ClientOption {
    let content_type = content_type.into();
    Box::new(move |o| o.content_type = content_type)
}

/// Set the per-call reply deadline.
pub fn request_timeout(timeout: Duration) -> ClientOption {
    Box::new(move |o| o.request_timeout = timeout)
}

/// Outbound RPC and pub/sub capability.
#[async_trait]
pub trait Client: Send + Sync {
    /// Apply options in order.
    fn init(&self, options: Vec<ClientOption>);

    /// Snapshot of the current options.
    fn options(&self) -> ClientOptions;

    /// Build a request for `service`'s `endpoint`.
    fn new_request(&self, service: &str, endpoint: &str, body: Value) -> Request;

    /// Send a request and wait for the reply.
    async fn call(&self, ctx: &Context, request: Request) -> Result<Response, ClientError>;

    /// Build a message for `topic`.
    fn new_message(&self, topic: &str, body: Value) -> Message;

    /// Publish a message.
    async fn publish(&self, ctx: &Context, message: Message) -> Result<(), ClientError>;
}
