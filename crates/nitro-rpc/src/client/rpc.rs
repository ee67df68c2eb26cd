//! # RPC Client
//!
//! Default [`Client`]: one dialed socket per call, first registered node
//! wins. No retries.

use async_trait::async_trait;
use nitro_broker::BrokerMessage;
use nitro_registry::RegistryError;
use nitro_types::{Context, Metadata};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::{Client, ClientOption, ClientOptions};
use crate::codec::{decode_response, encode_request, RequestEnvelope};
use crate::error::ClientError;
use crate::message::{Message, Request, Response};
use crate::{CONTENT_TYPE_HEADER, ID_HEADER, TOPIC_HEADER};

/// Default RPC client.
pub struct RpcClient {
    options: RwLock<ClientOptions>,
}

impl RpcClient {
    /// Create a client with its own in-memory collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ClientOptions::default())
    }

    /// Create a client from explicit options.
    #[must_use]
    pub fn with_options(options: ClientOptions) -> Self {
        Self {
            options: RwLock::new(options),
        }
    }

    async fn exchange(options: &ClientOptions, request: Request) -> Result<Response, ClientError> {
        let services = options
            .registry
            .get_service(request.service())
            .await
            .map_err(|e| match e {
                RegistryError::NotFound(name) => ClientError::ServiceNotFound(name),
                other => ClientError::Registry(other),
            })?;

        let node = services
            .iter()
            .flat_map(|s| s.nodes.iter())
            .next()
            .ok_or_else(|| ClientError::ServiceNotFound(request.service().to_string()))?;

        let service = request.service().to_string();
        let endpoint = request.endpoint().to_string();
        let envelope = RequestEnvelope {
            id: Uuid::new_v4().to_string(),
            service,
            endpoint,
            body: request.into_body(),
        };
        let frame = encode_request(&envelope)?;

        debug!(
            service = %envelope.service,
            endpoint = %envelope.endpoint,
            node = %node.id,
            address = %node.address,
            "Dispatching request"
        );

        let mut socket = options.transport.dial(&node.address).await?;
        socket.send(frame).await?;
        let reply = socket.recv().await?;
        socket.close();

        let response = decode_response(&reply)?;
        if response.id != envelope.id {
            return Err(ClientError::Codec(format!(
                "reply id {} does not match request id {}",
                response.id, envelope.id
            )));
        }

        match (response.error, response.body) {
            (Some(err), _) => Err(ClientError::Remote(err)),
            (None, body) => Ok(Response {
                header: reply.header,
                body: body.unwrap_or(Value::Null),
            }),
        }
    }
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Client for RpcClient {
    fn init(&self, options: Vec<ClientOption>) {
        let mut current = self.options.write();
        for option in options {
            option(&mut current);
        }
    }

    fn options(&self) -> ClientOptions {
        self.options.read().clone()
    }

    fn new_request(&self, service: &str, endpoint: &str, body: Value) -> Request {
        Request::new(service, endpoint, body, self.options.read().content_type.clone())
    }

    async fn call(&self, ctx: &Context, request: Request) -> Result<Response, ClientError> {
        if ctx.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        let options = self.options();
        let timeout = options.request_timeout;

        tokio::select! {
            _ = ctx.done() => Err(ClientError::Cancelled),
            result = tokio::time::timeout(timeout, Self::exchange(&options, request)) => {
                result.map_err(|_| ClientError::Timeout(timeout))?
            }
        }
    }

    fn new_message(&self, topic: &str, body: Value) -> Message {
        Message::new(topic, body, self.options.read().content_type.clone())
    }

    async fn publish(&self, ctx: &Context, message: Message) -> Result<(), ClientError> {
        if ctx.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        let broker = self.options.read().broker.clone();
        if !broker.is_connected() {
            broker.connect().await?;
        }

        let body =
            serde_json::to_vec(message.body()).map_err(|e| ClientError::Codec(e.to_string()))?;
        let mut header = Metadata::new();
        header.insert(CONTENT_TYPE_HEADER.to_string(), message.content_type().to_string());
        header.insert(TOPIC_HEADER.to_string(), message.topic().to_string());
        header.insert(ID_HEADER.to_string(), Uuid::new_v4().to_string());

        let delivered = tokio::select! {
            _ = ctx.done() => return Err(ClientError::Cancelled),
            result = broker.publish(message.topic(), BrokerMessage { header, body }) => result?,
        };

        debug!(topic = %message.topic(), receivers = delivered, "Message published");
        Ok(())
    }
}
