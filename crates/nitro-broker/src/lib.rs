//! # Nitro Broker - Publish/Subscribe Message Bus
//!
//! The client publishes through the broker; the server subscribes its
//! event handlers to it. Both hold the same `Arc<dyn Broker>`.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │   Client     │                    │   Server     │
//! │              │    publish()       │  subscriber  │
//! │              │ ──────┐            │  handlers    │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │    Broker    │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod memory;
pub mod subscriber;

pub use memory::MemoryBroker;
pub use subscriber::BrokerSubscription;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use nitro_types::{BoxError, Metadata};
use thiserror::Error;

/// A message carried by the broker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerMessage {
    /// Message headers.
    pub header: Metadata,
    /// Encoded payload.
    pub body: Vec<u8>,
}

/// Callback invoked for each message on a subscribed topic.
pub type BrokerHandler =
    Arc<dyn Fn(BrokerMessage) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Errors from broker operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Publish or subscribe before `connect`.
    #[error("Broker not connected")]
    NotConnected,

    /// Subscribe with an empty topic.
    #[error("Invalid topic: {0:?}")]
    InvalidTopic(String),
}

/// Publish/subscribe bus.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Broker address.
    fn address(&self) -> String;

    /// Open the broker for traffic. Idempotent.
    async fn connect(&self) -> Result<(), BrokerError>;

    /// Close the broker for traffic. Idempotent.
    async fn disconnect(&self) -> Result<(), BrokerError>;

    /// Whether the broker is connected.
    fn is_connected(&self) -> bool;

    /// Publish a message to every subscriber of `topic`.
    ///
    /// Returns the number of subscribers the message was delivered to.
    async fn publish(&self, topic: &str, message: BrokerMessage) -> Result<usize, BrokerError>;

    /// Subscribe a handler to `topic`.
    ///
    /// The handler stays registered until the returned subscription is
    /// dropped or unsubscribed.
    async fn subscribe(
        &self,
        topic: &str,
        handler: BrokerHandler,
    ) -> Result<BrokerSubscription, BrokerError>;

    /// Implementation name.
    fn name(&self) -> &'static str;
}
