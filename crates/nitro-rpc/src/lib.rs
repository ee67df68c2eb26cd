//! # Nitro RPC
//!
//! The default Client and Server collaborators.
//!
//! ## Request Flow
//!
//! ```text
//! RpcClient::call(ctx, request)
//!     │ registry.get_service(name) → first node address
//!     │ transport.dial(address)
//!     ▼
//! ┌──────────┐   request frame    ┌──────────────────────────────┐
//! │  Socket  │ ─────────────────▶ │ RpcServer accept loop        │
//! │          │ ◀───────────────── │   Handler[service][endpoint] │
//! └──────────┘   response frame   └──────────────────────────────┘
//! ```
//!
//! ## Event Flow
//!
//! `RpcClient::publish` encodes the message body as JSON and hands it to the
//! broker; `RpcServer` subscribes each registered [`Subscriber`] to the same
//! broker on start.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod client;
pub mod codec;
pub mod error;
pub mod handler;
pub mod message;
pub mod server;

pub use client::{Client, ClientOption, ClientOptions, RpcClient};
pub use error::{ClientError, RpcError, ServerError};
pub use handler::{EventHandler, Handler, Routes, Subscriber};
pub use message::{Message, Request, Response};
pub use server::{RpcServer, Server, ServerOption, ServerOptions};

/// Content type header key.
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// The only content type the default collaborators speak.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Topic header set on published messages.
pub const TOPIC_HEADER: &str = "Micro-Topic";

/// Request id header.
pub const ID_HEADER: &str = "Micro-Id";

/// Target service header.
pub const SERVICE_HEADER: &str = "Micro-Service";

/// Target endpoint header.
pub const ENDPOINT_HEADER: &str = "Micro-Endpoint";
