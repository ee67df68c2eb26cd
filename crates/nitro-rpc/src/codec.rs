//! # Wire Codec
//!
//! JSON envelopes carried in transport frames.
//!
//! ```text
//! request frame:   headers { Content-Type, Micro-Id, Micro-Service, Micro-Endpoint }
//!                  body    { "id", "service", "endpoint", "body" }
//! response frame:  headers { Content-Type, Micro-Id }
//!                  body    { "id", "body" } | { "id", "error": { "code", "detail" } }
//! ```

use nitro_transport::Frame;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, RpcError};
use crate::{
    CONTENT_TYPE_HEADER, DEFAULT_CONTENT_TYPE, ENDPOINT_HEADER, ID_HEADER, SERVICE_HEADER,
};

/// Request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Correlates the reply.
    pub id: String,
    /// Target service.
    pub service: String,
    /// Target endpoint.
    pub endpoint: String,
    /// Request body.
    #[serde(default)]
    pub body: Value,
}

/// Response envelope. Exactly one of `body` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Id of the request this answers.
    pub id: String,
    /// Reply body on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Failure detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl ResponseEnvelope {
    /// Build from a handler result.
    pub fn from_result(id: impl Into<String>, result: Result<Value, RpcError>) -> Self {
        let id = id.into();
        match result {
            Ok(body) => Self {
                id,
                body: Some(body),
                error: None,
            },
            Err(error) => Self {
                id,
                body: None,
                error: Some(error),
            },
        }
    }
}

/// Encode a request into a frame.
pub fn encode_request(envelope: &RequestEnvelope) -> Result<Frame, ClientError> {
    let body = serde_json::to_vec(envelope).map_err(|e| ClientError::Codec(e.to_string()))?;
    Ok(Frame::new(body)
        .with_header(CONTENT_TYPE_HEADER, DEFAULT_CONTENT_TYPE)
        .with_header(ID_HEADER, envelope.id.clone())
        .with_header(SERVICE_HEADER, envelope.service.clone())
        .with_header(ENDPOINT_HEADER, envelope.endpoint.clone()))
}

/// Decode a request frame. Failures map to a `400` for the reply.
pub fn decode_request(frame: &Frame) -> Result<RequestEnvelope, RpcError> {
    if let Some(content_type) = frame.header.get(CONTENT_TYPE_HEADER) {
        if content_type != DEFAULT_CONTENT_TYPE {
            return Err(RpcError::bad_request(format!(
                "unsupported content type {content_type}"
            )));
        }
    }
    serde_json::from_slice(&frame.body)
        .map_err(|e| RpcError::bad_request(format!("malformed request: {e}")))
}

/// Encode a reply into a frame.
///
/// Serialization of a `serde_json::Value` envelope cannot fail in practice;
/// if it does, the reply degrades to an internal error envelope.
#[must_use]
pub fn encode_response(envelope: &ResponseEnvelope) -> Frame {
    let body = serde_json::to_vec(envelope).unwrap_or_else(|e| {
        let fallback = ResponseEnvelope::from_result(
            envelope.id.clone(),
            Err(RpcError::internal(format!("failed to encode reply: {e}"))),
        );
        serde_json::to_vec(&fallback).unwrap_or_default()
    });
    Frame::new(body)
        .with_header(CONTENT_TYPE_HEADER, DEFAULT_CONTENT_TYPE)
        .with_header(ID_HEADER, envelope.id.clone())
}

/// Decode a reply frame.
pub fn decode_response(frame: &Frame) -> Result<ResponseEnvelope, ClientError> {
    serde_json::from_slice(&frame.body).map_err(|e| ClientError::Codec(e.to_string()))
}
