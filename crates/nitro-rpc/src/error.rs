//! RPC error types.
//!
//! [`RpcError`] travels on the wire; [`ClientError`] and [`ServerError`] are
//! the local failure types of the two collaborators.

use std::time::Duration;

use nitro_broker::BrokerError;
use nitro_registry::RegistryError;
use nitro_transport::TransportError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status codes carried by [`RpcError`]. HTTP-compatible.
pub mod codes {
    pub const BAD_REQUEST: u16 = 400;
    pub const NOT_FOUND: u16 = 404;
    pub const TIMEOUT: u16 = 408;
    pub const INTERNAL: u16 = 500;
}

/// Error returned by a remote handler.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("[{code}] {detail}")]
pub struct RpcError {
    /// Status code.
    pub code: u16,
    /// Human-readable detail.
    pub detail: String,
}

impl RpcError {
    /// Create an error with an explicit code.
    pub fn new(code: u16, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    /// Malformed or undecodable request.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(codes::BAD_REQUEST, detail)
    }

    /// Unknown service or endpoint.
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(codes::NOT_FOUND, detail)
    }

    /// Handler did not finish in time.
    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(codes::TIMEOUT, detail)
    }

    /// Handler failure.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL, detail)
    }
}

/// Errors from client operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// No registered instance of the target service.
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// Registry lookup failed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Dial, send or receive failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Publish failed.
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// Encoding or decoding a body failed.
    #[error("Codec error: {0}")]
    Codec(String),

    /// The remote handler returned an error.
    #[error("Remote error: {0}")]
    Remote(RpcError),

    /// No reply within the request timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The caller's context was cancelled.
    #[error("Request cancelled")]
    Cancelled,
}

/// Errors from server operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// `start` on a running server.
    #[error("Server already started")]
    AlreadyStarted,

    /// `stop` on a server that is not running.
    #[error("Server not started")]
    NotStarted,

    /// A handler for the service name is already registered.
    #[error("Handler already registered: {0}")]
    DuplicateHandler(String),

    /// Handler rejected before registration.
    #[error("Invalid handler: {0}")]
    InvalidHandler(String),

    /// Listener could not be bound.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Broker connect/subscribe/disconnect failed.
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// Self-registration failed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}
