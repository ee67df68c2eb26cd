//! # Handlers and Subscribers
//!
//! [`Routes`] is a named set of typed endpoint closures. The server wraps it
//! into a [`Handler`] (adding the registry endpoint descriptors) before
//! registering it. [`EventHandler`] is the typed callback behind a
//! [`Subscriber`].
//!
//! ```rust,ignore
//! let greeter = Routes::new("greeter")
//!     .route("Greeter.Hello", |req: HelloRequest| async move {
//!         Ok::<_, RpcError>(HelloResponse { msg: format!("Hello {}", req.name) })
//!     });
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use nitro_registry::Endpoint;
use nitro_types::Metadata;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::RpcError;

type EndpointFn = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, RpcError>> + Send + Sync>;

type EventFn = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<(), RpcError>> + Send + Sync>;

/// Typed endpoint closures for one service.
#[derive(Clone)]
pub struct Routes {
    service: String,
    endpoints: BTreeMap<String, EndpointFn>,
}

impl Routes {
    /// Start a route set for `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            endpoints: BTreeMap::new(),
        }
    }

    /// Add an endpoint. A later route with the same name replaces the earlier one.
    #[must_use]
    pub fn route<Req, Rsp, F, Fut>(mut self, endpoint: impl Into<String>, f: F) -> Self
    where
        Req: DeserializeOwned + Send + 'static,
        Rsp: Serialize + Send + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Rsp, RpcError>> + Send + 'static,
    {
        let endpoint = endpoint.into();
        let name = endpoint.clone();
        let f = Arc::new(f);

        let call: EndpointFn = Arc::new(move |body: Value| {
            let f = Arc::clone(&f);
            let name = name.clone();
            async move {
                let request: Req = serde_json::from_value(body).map_err(|e| {
                    RpcError::bad_request(format!("{name}: cannot decode request: {e}"))
                })?;
                let response = f(request).await?;
                serde_json::to_value(response).map_err(|e| {
                    RpcError::internal(format!("{name}: cannot encode response: {e}"))
                })
            }
            .boxed()
        });

        self.endpoints.insert(endpoint, call);
        self
    }

    /// Service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Endpoint names, sorted.
    pub fn endpoint_names(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }
}

impl fmt::Debug for Routes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routes")
            .field("service", &self.service)
            .field("endpoints", &self.endpoints.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A route set prepared for registration with a server.
#[derive(Clone, Debug)]
pub struct Handler {
    routes: Routes,
    endpoints: Vec<Endpoint>,
    metadata: Metadata,
}

impl Handler {
    /// Wrap routes, deriving one registry endpoint per route.
    #[must_use]
    pub fn new(routes: Routes, metadata: Metadata) -> Self {
        let endpoints = routes
            .endpoint_names()
            .map(|name| {
                let mut endpoint = Endpoint::new(name);
                endpoint.metadata.extend(metadata.clone());
                endpoint
            })
            .collect();
        Self {
            routes,
            endpoints,
            metadata,
        }
    }

    /// Service name the handler answers for.
    #[must_use]
    pub fn name(&self) -> &str {
        self.routes.service()
    }

    /// Registry endpoint descriptors.
    #[must_use]
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Handler metadata.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Invoke `endpoint` with a request body.
    pub async fn dispatch(&self, endpoint: &str, body: Value) -> Result<Value, RpcError> {
        let call = self.routes.endpoints.get(endpoint).ok_or_else(|| {
            RpcError::not_found(format!("unknown endpoint {}/{endpoint}", self.name()))
        })?;
        call(body).await
    }
}

/// Typed callback for broker messages.
#[derive(Clone)]
pub struct EventHandler {
    call: EventFn,
}

impl EventHandler {
    /// Wrap an async closure taking the decoded message body.
    pub fn new<T, F, Fut>(f: F) -> Self
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RpcError>> + Send + 'static,
    {
        let f = Arc::new(f);
        let call: EventFn = Arc::new(move |body: Value| {
            let f = Arc::clone(&f);
            async move {
                let event: T = serde_json::from_value(body)
                    .map_err(|e| RpcError::bad_request(format!("cannot decode event: {e}")))?;
                f(event).await
            }
            .boxed()
        });
        Self { call }
    }

    /// Deliver one message body.
    pub async fn handle(&self, body: Value) -> Result<(), RpcError> {
        (self.call)(body).await
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventHandler")
    }
}

/// An event handler bound to a topic, ready for registration with a server.
#[derive(Clone, Debug)]
pub struct Subscriber {
    topic: String,
    handler: EventHandler,
}

impl Subscriber {
    /// Bind a handler to a topic.
    pub fn new(topic: impl Into<String>, handler: EventHandler) -> Self {
        Self {
            topic: topic.into(),
            handler,
        }
    }

    /// Subscribed topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The callback.
    #[must_use]
    pub fn handler(&self) -> &EventHandler {
        &self.handler
    }
}
