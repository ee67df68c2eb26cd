//! # Memory Transport
//!
//! In-process transport backed by `tokio::sync::mpsc` channels.
//!
//! Each listener owns a channel of pending sockets keyed by address. A dial
//! builds two frame channels (one per direction) and hands the server half
//! to the listener.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::{Frame, Listener, Socket, Transport, TransportError, DEFAULT_SOCKET_CAPACITY};

/// Address scheme for allocated memory addresses.
pub const MEMORY_SCHEME: &str = "memory://";

type ListenerTable = Arc<RwLock<HashMap<String, mpsc::Sender<MemorySocket>>>>;

/// In-process transport.
///
/// Cloning shares the listener table, so a clone can dial listeners bound
/// through the original.
#[derive(Clone)]
pub struct MemoryTransport {
    listeners: ListenerTable,
    capacity: usize,
}

impl MemoryTransport {
    /// Create a memory transport with the default socket buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SOCKET_CAPACITY)
    }

    /// Create a memory transport with the given per-socket buffer.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            listeners: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Number of bound listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn resolve_addr(addr: &str) -> String {
        if addr.is_empty() || addr.ends_with(":0") {
            format!("{MEMORY_SCHEME}{}", Uuid::new_v4())
        } else {
            addr.to_string()
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn listen(&self, addr: &str) -> Result<Box<dyn Listener>, TransportError> {
        let addr = Self::resolve_addr(addr);
        let (tx, rx) = mpsc::channel(self.capacity);

        {
            let mut listeners = self.listeners.write();
            if listeners.get(&addr).is_some_and(|l| !l.is_closed()) {
                return Err(TransportError::AddressInUse(addr));
            }
            listeners.insert(addr.clone(), tx.clone());
        }

        debug!(addr = %addr, "Memory listener bound");

        Ok(Box::new(MemoryListener {
            addr,
            incoming: rx,
            registration: tx,
            listeners: Arc::clone(&self.listeners),
            closed: false,
        }))
    }

    async fn dial(&self, addr: &str) -> Result<Box<dyn Socket>, TransportError> {
        let acceptor = self
            .listeners
            .read()
            .get(addr)
            .cloned()
            .ok_or_else(|| TransportError::ConnectionRefused(addr.to_string()))?;

        let (client_tx, server_rx) = mpsc::channel(self.capacity);
        let (server_tx, client_rx) = mpsc::channel(self.capacity);
        let client_addr = format!("{MEMORY_SCHEME}{}", Uuid::new_v4());

        let server_end = MemorySocket {
            local: addr.to_string(),
            remote: client_addr.clone(),
            tx: Some(server_tx),
            rx: server_rx,
        };

        acceptor
            .send(server_end)
            .await
            .map_err(|_| TransportError::ConnectionRefused(addr.to_string()))?;

        debug!(addr = %addr, client = %client_addr, "Memory socket dialed");

        Ok(Box::new(MemorySocket {
            local: client_addr,
            remote: addr.to_string(),
            tx: Some(client_tx),
            rx: client_rx,
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Listener half of the memory transport.
pub struct MemoryListener {
    addr: String,
    incoming: mpsc::Receiver<MemorySocket>,
    /// Kept to match against the table entry on close.
    registration: mpsc::Sender<MemorySocket>,
    listeners: ListenerTable,
    closed: bool,
}

#[async_trait]
impl Listener for MemoryListener {
    fn addr(&self) -> &str {
        &self.addr
    }

    async fn accept(&mut self) -> Result<Box<dyn Socket>, TransportError> {
        match self.incoming.recv().await {
            Some(socket) => Ok(Box::new(socket)),
            None => Err(TransportError::Closed),
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        {
            let mut listeners = self.listeners.write();
            if listeners
                .get(&self.addr)
                .is_some_and(|l| l.same_channel(&self.registration))
            {
                listeners.remove(&self.addr);
            }
        }
        self.incoming.close();

        debug!(addr = %self.addr, "Memory listener closed");
    }
}

impl Drop for MemoryListener {
    fn drop(&mut self) {
        self.close();
    }
}

/// One end of a memory connection.
pub struct MemorySocket {
    local: String,
    remote: String,
    tx: Option<mpsc::Sender<Frame>>,
    rx: mpsc::Receiver<Frame>,
}

#[async_trait]
impl Socket for MemorySocket {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame).await.map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Result<Frame, TransportError> {
        self.rx.recv().await.ok_or(TransportError::Closed)
    }

    fn local(&self) -> &str {
        &self.local
    }

    fn remote(&self) -> &str {
        &self.remote
    }

    fn close(&mut self) {
        self.tx = None;
    }
}
