//! # Nitro Transport
//!
//! Bidirectional frame exchange used by the RPC client and server.
//!
//! ```text
//!   RpcClient                         RpcServer
//!      │ dial(addr)                      │ listen(addr)
//!      ▼                                 ▼
//!   Socket ◀════════ frames ════════▶ Listener::accept() → Socket
//! ```
//!
//! The [`MemoryTransport`] keeps everything inside the process; a network
//! transport plugs in behind the same traits.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod memory;

pub use memory::{MemoryListener, MemorySocket, MemoryTransport};

use async_trait::async_trait;
use nitro_types::Metadata;
use thiserror::Error;

/// Default per-socket frame buffer.
pub const DEFAULT_SOCKET_CAPACITY: usize = 64;

/// One unit of data on a socket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Frame headers.
    pub header: Metadata,
    /// Opaque payload.
    pub body: Vec<u8>,
}

impl Frame {
    /// Create a frame with an empty header.
    #[must_use]
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            header: Metadata::new(),
            body,
        }
    }

    /// Add a header and return the frame.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.insert(key.into(), value.into());
        self
    }
}

/// Errors from transport operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Another listener is bound to the address.
    #[error("Address already in use: {0}")]
    AddressInUse(String),

    /// Nothing is listening on the address.
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    /// The socket or listener was closed.
    #[error("Transport closed")]
    Closed,
}

/// Dial/listen capability shared by client and server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Bind a listener. Implementations may allocate an address when the
    /// requested one ends in `:0`.
    async fn listen(&self, addr: &str) -> Result<Box<dyn Listener>, TransportError>;

    /// Open a socket to a listening address.
    async fn dial(&self, addr: &str) -> Result<Box<dyn Socket>, TransportError>;

    /// Implementation name.
    fn name(&self) -> &'static str;
}

/// Accepting side of a transport.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Address actually bound.
    fn addr(&self) -> &str;

    /// Wait for the next inbound socket.
    async fn accept(&mut self) -> Result<Box<dyn Socket>, TransportError>;

    /// Stop accepting and release the address.
    fn close(&mut self);
}

/// One end of a connection.
#[async_trait]
pub trait Socket: Send + Sync {
    /// Send a frame to the peer.
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Receive the next frame from the peer.
    async fn recv(&mut self) -> Result<Frame, TransportError>;

    /// Local address.
    fn local(&self) -> &str;

    /// Peer address.
    fn remote(&self) -> &str;

    /// Close the sending half; the peer sees [`TransportError::Closed`].
    fn close(&mut self);
}
