//! # Broker Subscription
//!
//! Handle returned by [`Broker::subscribe`](crate::Broker::subscribe).

use std::fmt;

use tracing::debug;

type Unsubscribe = Box<dyn FnOnce() + Send + Sync>;

/// A live subscription.
///
/// When dropped, the subscription is automatically cleaned up.
pub struct BrokerSubscription {
    /// Subscribed topic.
    topic: String,

    /// Removes the handler from the broker; `None` once run.
    unsubscribe: Option<Unsubscribe>,
}

impl BrokerSubscription {
    /// Create a subscription that runs `unsubscribe` exactly once.
    pub fn new(topic: impl Into<String>, unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            topic: topic.into(),
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Subscribed topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Whether the subscription is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.unsubscribe.is_some()
    }

    /// Remove the handler from the broker. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
            debug!(topic = %self.topic, "Subscription dropped");
        }
    }
}

impl fmt::Debug for BrokerSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerSubscription")
            .field("topic", &self.topic)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for BrokerSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
