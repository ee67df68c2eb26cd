//! # Test Doubles
//!
//! Scripted collaborators that append every call to a shared [`Journal`],
//! so a test can assert the exact interleaving of hooks and server calls.

use std::sync::Arc;

use async_trait::async_trait;
use nitro_rpc::{
    Client, ClientError, ClientOption, ClientOptions, EventHandler, Handler, Message, Request,
    Response, Routes, Server, ServerError, ServerOption, ServerOptions, Subscriber,
};
use nitro_types::{BoxError, Context};
use parking_lot::Mutex;
use serde_json::Value;

/// Ordered record of calls.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// An empty journal.
pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// Snapshot of a journal's entries.
pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().clone()
}

/// Hook that records `label` and fails when `fail` is set.
pub fn hook(
    journal: &Journal,
    label: &'static str,
    fail: bool,
) -> impl Fn() -> Result<(), BoxError> + Send + Sync + 'static {
    let journal = Arc::clone(journal);
    move || {
        journal.lock().push(label.to_string());
        if fail {
            Err(format!("{label} failed").into())
        } else {
            Ok(())
        }
    }
}

/// Server recording `server.start` / `server.stop` and registrations.
pub struct MockServer {
    journal: Journal,
    start_error: Option<ServerError>,
    stop_error: Option<ServerError>,
    options: Mutex<ServerOptions>,
    handlers: Mutex<Vec<String>>,
    subscribers: Mutex<Vec<String>>,
}

impl MockServer {
    /// A server whose start and stop succeed.
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: Arc::clone(journal),
            start_error: None,
            stop_error: None,
            options: Mutex::new(ServerOptions::default()),
            handlers: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Make `start` fail with `error`.
    #[must_use]
    pub fn failing_start(mut self, error: ServerError) -> Self {
        self.start_error = Some(error);
        self
    }

    /// Make `stop` fail with `error`.
    #[must_use]
    pub fn failing_stop(mut self, error: ServerError) -> Self {
        self.stop_error = Some(error);
        self
    }

    /// Names of registered handlers.
    pub fn handlers(&self) -> Vec<String> {
        self.handlers.lock().clone()
    }

    /// Topics of registered subscribers.
    pub fn subscribers(&self) -> Vec<String> {
        self.subscribers.lock().clone()
    }
}

#[async_trait]
impl Server for MockServer {
    fn init(&self, options: Vec<ServerOption>) {
        let mut current = self.options.lock();
        for option in options {
            option(&mut current);
        }
    }

    fn options(&self) -> ServerOptions {
        self.options.lock().clone()
    }

    fn new_handler(&self, routes: Routes) -> Handler {
        Handler::new(routes, self.options.lock().metadata.clone())
    }

    async fn handle(&self, handler: Handler) -> Result<(), ServerError> {
        self.journal.lock().push("server.handle".into());
        self.handlers.lock().push(handler.name().to_string());
        Ok(())
    }

    fn new_subscriber(&self, topic: &str, handler: EventHandler) -> Subscriber {
        Subscriber::new(topic, handler)
    }

    async fn subscribe(&self, subscriber: Subscriber) -> Result<(), ServerError> {
        self.journal.lock().push("server.subscribe".into());
        self.subscribers.lock().push(subscriber.topic().to_string());
        Ok(())
    }

    async fn start(&self) -> Result<(), ServerError> {
        self.journal.lock().push("server.start".into());
        match &self.start_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn stop(&self) -> Result<(), ServerError> {
        self.journal.lock().push("server.stop".into());
        match &self.stop_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// Client echoing request bodies, or failing every call with a fixed error.
pub struct MockClient {
    journal: Journal,
    call_error: Option<ClientError>,
    options: Mutex<ClientOptions>,
    cancelled_contexts: Mutex<Vec<bool>>,
}

impl MockClient {
    /// A client whose calls echo the request body.
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: Arc::clone(journal),
            call_error: None,
            options: Mutex::new(ClientOptions::default()),
            cancelled_contexts: Mutex::new(Vec::new()),
        }
    }

    /// Make every call and publish fail with `error`.
    #[must_use]
    pub fn failing(mut self, error: ClientError) -> Self {
        self.call_error = Some(error);
        self
    }

    /// For each call or publish, whether its context was already cancelled.
    pub fn cancelled_contexts(&self) -> Vec<bool> {
        self.cancelled_contexts.lock().clone()
    }

    fn record(&self, ctx: &Context, entry: String) -> Result<(), ClientError> {
        self.journal.lock().push(entry);
        self.cancelled_contexts.lock().push(ctx.is_cancelled());
        match &self.call_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Client for MockClient {
    fn init(&self, options: Vec<ClientOption>) {
        let mut current = self.options.lock();
        for option in options {
            option(&mut current);
        }
    }

    fn options(&self) -> ClientOptions {
        self.options.lock().clone()
    }

    fn new_request(&self, service: &str, endpoint: &str, body: Value) -> Request {
        Request::new(
            service,
            endpoint,
            body,
            self.options.lock().content_type.clone(),
        )
    }

    async fn call(&self, ctx: &Context, request: Request) -> Result<Response, ClientError> {
        self.record(
            ctx,
            format!("client.call {} {}", request.service(), request.endpoint()),
        )?;
        Ok(Response {
            header: Default::default(),
            body: request.body().clone(),
        })
    }

    fn new_message(&self, topic: &str, body: Value) -> Message {
        Message::new(topic, body, self.options.lock().content_type.clone())
    }

    async fn publish(&self, ctx: &Context, message: Message) -> Result<(), ClientError> {
        self.record(ctx, format!("client.publish {}", message.topic()))
    }
}
