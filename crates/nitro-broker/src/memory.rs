//! # Memory Broker
//!
//! In-process broker. Delivery is synchronous from the publisher's point of
//! view: `publish` awaits every handler subscribed to the topic, in
//! subscription order, before returning.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{Broker, BrokerError, BrokerHandler, BrokerMessage, BrokerSubscription};

type SubscriberTable = RwLock<HashMap<String, Vec<(Uuid, BrokerHandler)>>>;

/// In-memory implementation of the broker.
///
/// Suitable for single-process operation; distributed deployments would
/// substitute a network-backed implementation.
pub struct MemoryBroker {
    /// Broker address.
    address: String,

    /// Connection flag.
    connected: AtomicBool,

    /// Handlers by topic.
    subscribers: Arc<SubscriberTable>,

    /// Total messages published.
    messages_published: AtomicU64,
}

impl MemoryBroker {
    /// Create a new, disconnected memory broker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            address: format!("memory://broker-{}", Uuid::new_v4()),
            connected: AtomicBool::new(false),
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            messages_published: AtomicU64::new(0),
        }
    }

    /// Number of handlers subscribed to `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers.read().get(topic).map_or(0, Vec::len)
    }

    /// Total messages published.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    fn remove_handler(table: &Weak<SubscriberTable>, topic: &str, id: Uuid) {
        let Some(table) = table.upgrade() else {
            return;
        };
        let mut subs = table.write();
        let Some(handlers) = subs.get_mut(topic) else {
            return;
        };

        handlers.retain(|(handler_id, _)| *handler_id != id);
        if handlers.is_empty() {
            subs.remove(topic);
        }
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn connect(&self) -> Result<(), BrokerError> {
        if !self.connected.swap(true, Ordering::SeqCst) {
            info!(address = %self.address, "Memory broker connected");
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!(address = %self.address, "Memory broker disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn publish(&self, topic: &str, message: BrokerMessage) -> Result<usize, BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected);
        }

        self.messages_published.fetch_add(1, Ordering::Relaxed);

        // Snapshot so handlers may subscribe/unsubscribe while running
        let handlers: Vec<BrokerHandler> = self
            .subscribers
            .read()
            .get(topic)
            .map(|hs| hs.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        if handlers.is_empty() {
            debug!(topic = topic, "Message dropped (no subscribers)");
            return Ok(0);
        }

        let mut delivered = 0;
        for handler in handlers {
            match handler(message.clone()).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(topic = topic, error = %e, "Subscriber failed to handle message");
                }
            }
        }

        debug!(topic = topic, receivers = delivered, "Message published");
        Ok(delivered)
    }

    async fn subscribe(
        &self,
        topic: &str,
        handler: BrokerHandler,
    ) -> Result<BrokerSubscription, BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected);
        }
        if topic.is_empty() {
            return Err(BrokerError::InvalidTopic(topic.to_string()));
        }

        let id = Uuid::new_v4();
        self.subscribers
            .write()
            .entry(topic.to_string())
            .or_default()
            .push((id, handler));

        debug!(topic = topic, "New subscription created");

        let table = Arc::downgrade(&self.subscribers);
        let owned_topic = topic.to_string();
        Ok(BrokerSubscription::new(topic, move || {
            Self::remove_handler(&table, &owned_topic, id);
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
