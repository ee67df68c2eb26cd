//! Request, response and message values built by the client.

use nitro_types::Metadata;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ClientError;

/// An outbound RPC request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    service: String,
    endpoint: String,
    body: Value,
    content_type: String,
}

impl Request {
    /// Create a request.
    pub fn new(
        service: impl Into<String>,
        endpoint: impl Into<String>,
        body: Value,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            endpoint: endpoint.into(),
            body,
            content_type: content_type.into(),
        }
    }

    /// Target service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Target endpoint, `Service.Method`.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request body.
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Body content type.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub(crate) fn into_body(self) -> Value {
        self.body
    }
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    /// Frame headers of the reply.
    pub header: Metadata,
    /// Decoded reply body.
    pub body: Value,
}

impl Response {
    /// Decode the body into a typed value.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        serde_json::from_value(self.body).map_err(|e| ClientError::Codec(e.to_string()))
    }
}

/// An outbound pub/sub message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    topic: String,
    body: Value,
    content_type: String,
}

impl Message {
    /// Create a message.
    pub fn new(topic: impl Into<String>, body: Value, content_type: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            body,
            content_type: content_type.into(),
        }
    }

    /// Destination topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Message body.
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Body content type.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}
