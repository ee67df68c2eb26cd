//! Service records stored in the registry.

use nitro_types::Metadata;
use serde::{Deserialize, Serialize};

/// A named, versioned service and its running instances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Service name clients address.
    pub name: String,
    /// Version label.
    pub version: String,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Endpoints exposed, as `Service.Method`.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    /// Running instances.
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Service {
    /// Create a service record with no nodes.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Add a node and return the record.
    #[must_use]
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }
}

/// One running instance of a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance id.
    pub id: String,
    /// Transport address the instance listens on.
    pub address: String,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Node {
    /// Create a node record.
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            metadata: Metadata::new(),
        }
    }
}

/// A callable endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Endpoint name, `Service.Method`.
    pub name: String,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Endpoint {
    /// Create an endpoint record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: Metadata::new(),
        }
    }
}
