//! # Application Options
//!
//! Configuration is a list of option-functions applied in order to an
//! [`Options`] record. Field-setting options overwrite; hook options append.
//!
//! Collaborator options keep the Client and Server consistent: setting the
//! broker, registry or transport re-wires both, and a replacement Client or
//! Server is re-wired with the current broker, registry and transport.

use std::fmt;
use std::sync::Arc;

use nitro_broker::{Broker, MemoryBroker};
use nitro_registry::{MemoryRegistry, Registry};
use nitro_rpc::{Client, ClientOptions, RpcClient, RpcServer, Server, ServerOptions};
use nitro_transport::{MemoryTransport, Transport};
use nitro_types::{BoxError, Context};

/// A zero-argument lifecycle callback.
pub type Hook = Arc<dyn Fn() -> Result<(), BoxError> + Send + Sync>;

/// Mutates [`Options`] when passed to `Application::new` or `init`.
pub type OptionFn = Box<dyn FnOnce(&mut Options) + Send>;

/// Everything an Application runs with.
#[derive(Clone)]
pub struct Options {
    /// Bus shared by client and server.
    pub broker: Arc<dyn Broker>,
    /// Directory shared by client and server.
    pub registry: Arc<dyn Registry>,
    /// Transport shared by client and server.
    pub transport: Arc<dyn Transport>,
    /// Outbound collaborator.
    pub client: Arc<dyn Client>,
    /// Inbound collaborator.
    pub server: Arc<dyn Server>,
    /// `run` returns once this is cancelled.
    pub context: Context,
    /// Hooks run before the server starts.
    pub before_start: Vec<Hook>,
    /// Hooks run after the server started.
    pub after_start: Vec<Hook>,
    /// Hooks run before the server stops.
    pub before_stop: Vec<Hook>,
    /// Hooks run after the server stopped.
    pub after_stop: Vec<Hook>,
}

impl Default for Options {
    /// Fresh in-memory collaborators, wired together, and a background
    /// context.
    fn default() -> Self {
        let broker: Arc<dyn Broker> = Arc::new(MemoryBroker::new());
        let registry: Arc<dyn Registry> = Arc::new(MemoryRegistry::new());
        let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());

        let client = RpcClient::with_options(ClientOptions {
            broker: Arc::clone(&broker),
            registry: Arc::clone(&registry),
            transport: Arc::clone(&transport),
            ..ClientOptions::default()
        });
        let server = RpcServer::with_options(ServerOptions {
            broker: Arc::clone(&broker),
            registry: Arc::clone(&registry),
            transport: Arc::clone(&transport),
            ..ServerOptions::default()
        });

        Self {
            broker,
            registry,
            transport,
            client: Arc::new(client),
            server: Arc::new(server),
            context: Context::background(),
            before_start: Vec::new(),
            after_start: Vec::new(),
            before_stop: Vec::new(),
            after_stop: Vec::new(),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("broker", &self.broker.name())
            .field("registry", &self.registry.name())
            .field("transport", &self.transport.name())
            .field("server", &self.server.options().name)
            .field("context", &self.context)
            .field("before_start", &self.before_start.len())
            .field("after_start", &self.after_start.len())
            .field("before_stop", &self.before_stop.len())
            .field("after_stop", &self.after_stop.len())
            .finish_non_exhaustive()
    }
}

/// Use `b` as the broker for both client and server.
pub fn broker(b: Arc<dyn Broker>) -> OptionFn {
    Box::new(move |o| {
        o.client.init(vec![nitro_rpc::client::broker(Arc::clone(&b))]);
        o.server.init(vec![nitro_rpc::server::broker(Arc::clone(&b))]);
        o.broker = b;
    })
}

/// Use `r` as the registry for both client and server.
pub fn registry(r: Arc<dyn Registry>) -> OptionFn {
    Box::new(move |o| {
        o.client.init(vec![nitro_rpc::client::registry(Arc::clone(&r))]);
        o.server.init(vec![nitro_rpc::server::registry(Arc::clone(&r))]);
        o.registry = r;
    })
}

/// Use `t` as the transport for both client and server.
pub fn transport(t: Arc<dyn Transport>) -> OptionFn {
    Box::new(move |o| {
        o.client.init(vec![nitro_rpc::client::transport(Arc::clone(&t))]);
        o.server.init(vec![nitro_rpc::server::transport(Arc::clone(&t))]);
        o.transport = t;
    })
}

/// Replace the client, wiring it to the current broker, registry and
/// transport.
pub fn client(c: Arc<dyn Client>) -> OptionFn {
    Box::new(move |o| {
        c.init(vec![
            nitro_rpc::client::broker(Arc::clone(&o.broker)),
            nitro_rpc::client::registry(Arc::clone(&o.registry)),
            nitro_rpc::client::transport(Arc::clone(&o.transport)),
        ]);
        o.client = c;
    })
}

/// Replace the server, wiring it to the current broker, registry and
/// transport.
pub fn server(s: Arc<dyn Server>) -> OptionFn {
    Box::new(move |o| {
        s.init(vec![
            nitro_rpc::server::broker(Arc::clone(&o.broker)),
            nitro_rpc::server::registry(Arc::clone(&o.registry)),
            nitro_rpc::server::transport(Arc::clone(&o.transport)),
        ]);
        o.server = s;
    })
}

/// Context whose cancellation ends `run`.
pub fn context(ctx: Context) -> OptionFn {
    Box::new(move |o| o.context = ctx)
}

/// Server name, used as the service name in the registry.
pub fn name(n: impl Into<String>) -> OptionFn {
    let n = n.into();
    Box::new(move |o| o.server.init(vec![nitro_rpc::server::name(n)]))
}

/// Server version.
pub fn version(v: impl Into<String>) -> OptionFn {
    let v = v.into();
    Box::new(move |o| o.server.init(vec![nitro_rpc::server::version(v)]))
}

/// Server listen address.
pub fn address(a: impl Into<String>) -> OptionFn {
    let a = a.into();
    Box::new(move |o| o.server.init(vec![nitro_rpc::server::address(a)]))
}

/// One server metadata entry.
pub fn metadata(key: impl Into<String>, value: impl Into<String>) -> OptionFn {
    let (key, value) = (key.into(), value.into());
    Box::new(move |o| o.server.init(vec![nitro_rpc::server::metadata(key, value)]))
}

/// Append a hook run before the server starts.
pub fn before_start<F>(f: F) -> OptionFn
where
    F: Fn() -> Result<(), BoxError> + Send + Sync + 'static,
{
    Box::new(move |o| o.before_start.push(Arc::new(f)))
}

/// Append a hook run after the server started.
pub fn after_start<F>(f: F) -> OptionFn
where
    F: Fn() -> Result<(), BoxError> + Send + Sync + 'static,
{
    Box::new(move |o| o.after_start.push(Arc::new(f)))
}

/// Append a hook run before the server stops.
pub fn before_stop<F>(f: F) -> OptionFn
where
    F: Fn() -> Result<(), BoxError> + Send + Sync + 'static,
{
    Box::new(move |o| o.before_stop.push(Arc::new(f)))
}

/// Append a hook run after the server stopped.
pub fn after_stop<F>(f: F) -> OptionFn
where
    F: Fn() -> Result<(), BoxError> + Send + Sync + 'static,
{
    Box::new(move |o| o.after_stop.push(Arc::new(f)))
}
