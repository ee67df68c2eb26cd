//! # RPC Server
//!
//! Default [`Server`].
//!
//! ```text
//! start():  transport.listen ─→ broker.connect ─→ subscribe subscribers
//!                 │                                        │
//!                 ▼                                        ▼
//!           accept loop (spawned)  ───────────→  registry.register(service)
//!
//! stop():   registry.deregister ─→ drop subscriptions ─→ signal accept loop
//!                                                  ─→ broker.disconnect
//! ```
//!
//! Each accepted socket is served by its own task, one request at a time.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use nitro_broker::{BrokerHandler, BrokerMessage, BrokerSubscription};
use nitro_registry::{Node, Service};
use nitro_transport::{Listener, Socket};
use nitro_types::BoxError;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Server, ServerOption, ServerOptions};
use crate::codec::{decode_request, encode_response, RequestEnvelope, ResponseEnvelope};
use crate::error::{RpcError, ServerError};
use crate::handler::{EventHandler, Handler, Routes, Subscriber};
use crate::ID_HEADER;

type HandlerTable = Arc<RwLock<BTreeMap<String, Handler>>>;

/// State held between `start` and `stop`.
struct Running {
    /// Options snapshot taken at start.
    options: ServerOptions,
    /// Record announced in the registry.
    service: Service,
    subscriptions: Vec<BrokerSubscription>,
    shutdown: watch::Sender<bool>,
    accept_loop: JoinHandle<()>,
}

/// Default RPC server.
pub struct RpcServer {
    options: RwLock<ServerOptions>,
    handlers: HandlerTable,
    subscribers: RwLock<Vec<Subscriber>>,
    running: Mutex<Option<Running>>,
}

impl RpcServer {
    /// Create a server with its own in-memory collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ServerOptions::default())
    }

    /// Create a server from explicit options.
    #[must_use]
    pub fn with_options(options: ServerOptions) -> Self {
        Self {
            options: RwLock::new(options),
            handlers: Arc::new(RwLock::new(BTreeMap::new())),
            subscribers: RwLock::new(Vec::new()),
            running: Mutex::new(None),
        }
    }

    /// Whether the server is between `start` and `stop`.
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Address the listener is bound to, while running.
    pub async fn listen_address(&self) -> Option<String> {
        self.running
            .lock()
            .await
            .as_ref()
            .and_then(|r| r.service.nodes.first().map(|n| n.address.clone()))
    }

    fn service_record(&self, options: &ServerOptions, address: &str) -> Service {
        let mut node = Node::new(format!("{}-{}", options.name, options.id), address);
        node.metadata = options.metadata.clone();

        let mut service = Service::new(options.name.clone(), options.version.clone()).with_node(node);
        service.metadata = options.metadata.clone();
        service.endpoints = self
            .handlers
            .read()
            .values()
            .flat_map(|h| h.endpoints().iter().cloned())
            .collect();
        service
    }

    async fn attach(
        options: &ServerOptions,
        subscriber: &Subscriber,
    ) -> Result<BrokerSubscription, ServerError> {
        let subscription = options
            .broker
            .subscribe(subscriber.topic(), broker_handler(subscriber))
            .await?;
        debug!(topic = %subscriber.topic(), "[Server] Subscriber attached");
        Ok(subscription)
    }
}

impl Default for RpcServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Server for RpcServer {
    fn init(&self, options: Vec<ServerOption>) {
        let mut current = self.options.write();
        for option in options {
            option(&mut current);
        }
    }

    fn options(&self) -> ServerOptions {
        self.options.read().clone()
    }

    fn new_handler(&self, routes: Routes) -> Handler {
        Handler::new(routes, self.options.read().metadata.clone())
    }

    async fn handle(&self, handler: Handler) -> Result<(), ServerError> {
        if handler.name().is_empty() {
            return Err(ServerError::InvalidHandler("empty handler name".into()));
        }
        if handler.endpoints().is_empty() {
            return Err(ServerError::InvalidHandler(format!(
                "{} has no endpoints",
                handler.name()
            )));
        }

        let name = handler.name().to_string();
        {
            let mut handlers = self.handlers.write();
            match handlers.entry(name.clone()) {
                Entry::Occupied(_) => return Err(ServerError::DuplicateHandler(name)),
                Entry::Vacant(slot) => {
                    slot.insert(handler);
                }
            }
        }
        debug!(handler = %name, "[Server] Handler registered");

        // Re-announce so the registry lists the new endpoints
        let mut running = self.running.lock().await;
        if let Some(running) = running.as_mut() {
            let address = running
                .service
                .nodes
                .first()
                .map(|n| n.address.clone())
                .unwrap_or_default();
            let service = self.service_record(&running.options, &address);
            if let Err(e) = running.options.registry.register(&service).await {
                self.handlers.write().remove(&name);
                warn!(handler = %name, error = %e, "[Server] Re-registration failed, handler dropped");
                return Err(e.into());
            }
            running.service = service;
        }
        Ok(())
    }

    fn new_subscriber(&self, topic: &str, handler: EventHandler) -> Subscriber {
        Subscriber::new(topic, handler)
    }

    async fn subscribe(&self, subscriber: Subscriber) -> Result<(), ServerError> {
        if subscriber.topic().is_empty() {
            return Err(ServerError::InvalidHandler("empty subscriber topic".into()));
        }

        let mut running = self.running.lock().await;
        if let Some(running) = running.as_mut() {
            let subscription = Self::attach(&running.options, &subscriber).await?;
            running.subscriptions.push(subscription);
        }
        self.subscribers.write().push(subscriber);
        Ok(())
    }

    async fn start(&self) -> Result<(), ServerError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(ServerError::AlreadyStarted);
        }

        let options = self.options();
        let mut listener = options.transport.listen(&options.address).await?;
        let address = listener.addr().to_string();

        if let Err(e) = options.broker.connect().await {
            listener.close();
            return Err(e.into());
        }

        let subscribers = self.subscribers.read().clone();
        let mut subscriptions = Vec::with_capacity(subscribers.len());
        for subscriber in &subscribers {
            match Self::attach(&options, subscriber).await {
                Ok(subscription) => subscriptions.push(subscription),
                Err(e) => {
                    listener.close();
                    return Err(e);
                }
            }
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let router = Router {
            service: options.name.clone(),
            handlers: Arc::clone(&self.handlers),
        };
        let accept_loop = tokio::spawn(accept_loop(listener, shutdown_rx, router));

        let service = self.service_record(&options, &address);
        if let Err(e) = options.registry.register(&service).await {
            let _ = shutdown.send(true);
            if let Err(join) = accept_loop.await {
                warn!(error = %join, "[Server] Accept loop ended abnormally");
            }
            drop(subscriptions);
            if let Err(disconnect) = options.broker.disconnect().await {
                warn!(error = %disconnect, "[Server] Broker disconnect failed");
            }
            return Err(e.into());
        }

        info!(
            service = %options.name,
            version = %options.version,
            address = %address,
            handlers = self.handlers.read().len(),
            subscribers = subscriptions.len(),
            "[Server] Started"
        );

        *running = Some(Running {
            options,
            service,
            subscriptions,
            shutdown,
            accept_loop,
        });
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServerError> {
        let Some(running) = self.running.lock().await.take() else {
            return Err(ServerError::NotStarted);
        };
        let Running {
            options,
            service,
            subscriptions,
            shutdown,
            accept_loop,
        } = running;

        let deregistered = options.registry.deregister(&service).await;

        drop(subscriptions);

        let _ = shutdown.send(true);
        if let Err(e) = accept_loop.await {
            warn!(error = %e, "[Server] Accept loop ended abnormally");
        }

        let disconnected = options.broker.disconnect().await;

        info!(service = %options.name, "[Server] Stopped");

        deregistered?;
        disconnected?;
        Ok(())
    }
}

/// Request dispatch shared by every socket task.
#[derive(Clone)]
struct Router {
    service: String,
    handlers: HandlerTable,
}

impl Router {
    async fn route(&self, envelope: RequestEnvelope) -> Result<Value, RpcError> {
        if envelope.service != self.service {
            return Err(RpcError::not_found(format!(
                "unknown service {}",
                envelope.service
            )));
        }

        let handler = self
            .handlers
            .read()
            .values()
            .find(|h| h.endpoints().iter().any(|e| e.name == envelope.endpoint))
            .cloned();
        let Some(handler) = handler else {
            return Err(RpcError::not_found(format!(
                "unknown endpoint {}",
                envelope.endpoint
            )));
        };

        handler.dispatch(&envelope.endpoint, envelope.body).await
    }
}

async fn accept_loop(
    mut listener: Box<dyn Listener>,
    mut shutdown: watch::Receiver<bool>,
    router: Router,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok(socket) => {
                    tokio::spawn(serve_socket(socket, router.clone()));
                }
                Err(e) => {
                    debug!(error = %e, "[Server] Listener stopped accepting");
                    break;
                }
            },
        }
    }
    listener.close();
}

async fn serve_socket(mut socket: Box<dyn Socket>, router: Router) {
    while let Ok(frame) = socket.recv().await {
        let reply = match decode_request(&frame) {
            Ok(envelope) => {
                debug!(
                    endpoint = %envelope.endpoint,
                    remote = %socket.remote(),
                    "[Server] Request received"
                );
                let id = envelope.id.clone();
                ResponseEnvelope::from_result(id, router.route(envelope).await)
            }
            Err(e) => {
                let id = frame.header.get(ID_HEADER).cloned().unwrap_or_default();
                ResponseEnvelope::from_result(id, Err(e))
            }
        };

        if let Some(error) = &reply.error {
            debug!(code = error.code, detail = %error.detail, "[Server] Request failed");
        }

        if socket.send(encode_response(&reply)).await.is_err() {
            break;
        }
    }
}

fn broker_handler(subscriber: &Subscriber) -> BrokerHandler {
    let handler = subscriber.handler().clone();
    Arc::new(move |message: BrokerMessage| {
        let handler = handler.clone();
        async move {
            let body: Value = serde_json::from_slice(&message.body)?;
            handler.handle(body).await?;
            Ok::<(), BoxError>(())
        }
        .boxed()
    })
}
