//! # Application
//!
//! Lifecycle state machine and facade over the Client and Server.
//!
//! ## Failure Semantics
//!
//! | Operation | Hooks | Server failure |
//! |-----------|-------|----------------|
//! | `start` | first failure aborts, returned | returned, `after_start` skipped |
//! | `stop` | every hook runs, last failure returned | returned, recorded hook failures dropped, `after_stop` skipped |
//!
//! An `after_start` failure leaves the server running.

use std::fmt;
use std::sync::Arc;

use nitro_rpc::{Client, ClientError, EventHandler, Routes, Server};
use nitro_types::{BoxError, Context};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, HookPhase};
use crate::options::{Hook, OptionFn, Options};

/// Observable lifecycle position. Recorded only; never gates a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Constructed, no `init` call yet.
    Created,
    /// At least one `init` call applied.
    Initialized,
    /// The server started.
    Started,
    /// The server stopped.
    Stopped,
}

/// The orchestrator.
pub struct Application {
    options: Options,
    state: Mutex<LifecycleState>,
}

impl Application {
    /// Build an Application on fresh in-memory collaborators, then apply
    /// `options` in order.
    #[must_use]
    pub fn new(options: Vec<OptionFn>) -> Self {
        let mut app = Self {
            options: Options::default(),
            state: Mutex::new(LifecycleState::Created),
        };
        app.apply(options);
        app
    }

    /// Apply configuration deltas. Every option passed is applied, in order.
    pub fn init(&mut self, options: Vec<OptionFn>) {
        self.apply(options);
        if self.state() == LifecycleState::Created {
            self.set_state(LifecycleState::Initialized);
        }
    }

    fn apply(&mut self, options: Vec<OptionFn>) {
        for option in options {
            option(&mut self.options);
        }
    }

    /// Run `before_start` hooks, start the server, run `after_start` hooks.
    pub async fn start(&self) -> Result<(), AppError> {
        info!(service = %self.name(), "[App] Starting");

        run_fail_fast(HookPhase::BeforeStart, &self.options.before_start)?;

        self.options.server.start().await.map_err(|e| {
            error!(service = %self.name(), error = %e, "[App] Server failed to start");
            AppError::Server(e)
        })?;
        self.set_state(LifecycleState::Started);

        run_fail_fast(HookPhase::AfterStart, &self.options.after_start)?;

        info!(service = %self.name(), "[App] Started");
        Ok(())
    }

    /// Run every `before_stop` hook, stop the server, run every `after_stop`
    /// hook. Returns the last hook failure unless the server itself failed.
    pub async fn stop(&self) -> Result<(), AppError> {
        info!(service = %self.name(), "[App] Stopping");

        let mut last_failure = run_all(HookPhase::BeforeStop, &self.options.before_stop);

        self.options.server.stop().await.map_err(|e| {
            error!(service = %self.name(), error = %e, "[App] Server failed to stop");
            AppError::Server(e)
        })?;
        self.set_state(LifecycleState::Stopped);

        if let Some(failure) = run_all(HookPhase::AfterStop, &self.options.after_stop) {
            last_failure = Some(failure);
        }

        match last_failure {
            Some(failure) => Err(failure),
            None => {
                info!(service = %self.name(), "[App] Stopped");
                Ok(())
            }
        }
    }

    /// Start, wait for the configured context to be cancelled, then stop.
    pub async fn run(&self) -> Result<(), AppError> {
        self.start().await?;

        info!(service = %self.name(), "[App] Running until cancelled");
        self.options.context.done().await;
        info!(service = %self.name(), "[App] Context cancelled");

        self.stop().await
    }

    /// Call `endpoint` on service `name` and decode the reply.
    pub async fn execute<Req, Rsp>(
        &self,
        name: &str,
        endpoint: &str,
        request: &Req,
    ) -> Result<Rsp, AppError>
    where
        Req: Serialize + ?Sized,
        Rsp: DeserializeOwned,
    {
        let body = serde_json::to_value(request).map_err(|e| ClientError::Codec(e.to_string()))?;
        let request = self.options.client.new_request(name, endpoint, body);
        let response = self
            .options
            .client
            .call(&Context::background(), request)
            .await?;
        Ok(response.decode()?)
    }

    /// Publish `message` on topic `event`.
    pub async fn broadcast<T>(&self, event: &str, message: &T) -> Result<(), AppError>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_value(message).map_err(|e| ClientError::Codec(e.to_string()))?;
        let message = self.options.client.new_message(event, body);
        self.options
            .client
            .publish(&Context::background(), message)
            .await?;
        Ok(())
    }

    /// Register a set of endpoints with the server.
    pub async fn register(&self, routes: Routes) -> Result<(), AppError> {
        let handler = self.options.server.new_handler(routes);
        self.options.server.handle(handler).await?;
        Ok(())
    }

    /// Subscribe a handler to topic `event`.
    pub async fn subscribe(&self, event: &str, handler: EventHandler) -> Result<(), AppError> {
        let subscriber = self.options.server.new_subscriber(event, handler);
        self.options.server.subscribe(subscriber).await?;
        Ok(())
    }

    /// The client.
    #[must_use]
    pub fn client(&self) -> Arc<dyn Client> {
        Arc::clone(&self.options.client)
    }

    /// The server.
    #[must_use]
    pub fn server(&self) -> Arc<dyn Server> {
        Arc::clone(&self.options.server)
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Service name, taken from the server.
    #[must_use]
    pub fn name(&self) -> String {
        self.options.server.options().name
    }

    /// Rename the service.
    pub fn set_name(&self, name: impl Into<String>) {
        self.options.server.init(vec![nitro_rpc::server::name(name)]);
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    fn set_state(&self, state: LifecycleState) {
        let previous = std::mem::replace(&mut *self.state.lock(), state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "[App] Lifecycle transition");
        }
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("rpc")
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("state", &self.state())
            .field("options", &self.options)
            .finish()
    }
}

fn hook_failed(phase: HookPhase, index: usize, source: BoxError) -> AppError {
    warn!(phase = %phase, hook = index, error = %source, "[App] Hook failed");
    AppError::Hook { phase, source }
}

fn run_fail_fast(phase: HookPhase, hooks: &[Hook]) -> Result<(), AppError> {
    for (index, hook) in hooks.iter().enumerate() {
        hook().map_err(|e| hook_failed(phase, index, e))?;
    }
    Ok(())
}

fn run_all(phase: HookPhase, hooks: &[Hook]) -> Option<AppError> {
    let mut last = None;
    for (index, hook) in hooks.iter().enumerate() {
        if let Err(e) = hook() {
            last = Some(hook_failed(phase, index, e));
        }
    }
    last
}
