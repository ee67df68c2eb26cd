//! # Memory Registry
//!
//! In-process service directory keyed by name, then version.
//!
//! ## Merge Rules
//!
//! - `register` adds nodes, replacing any node with the same id, and takes
//!   the incoming endpoints and metadata
//! - `deregister` removes nodes by id; empty versions and names are pruned
//! - Every change is broadcast to watchers

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    Registry, RegistryAction, RegistryError, RegistryEvent, Service, Watcher,
    DEFAULT_WATCH_CAPACITY,
};

/// In-memory implementation of the registry.
pub struct MemoryRegistry {
    /// name → version → record.
    services: RwLock<HashMap<String, HashMap<String, Service>>>,
    /// Change notifications.
    events: broadcast::Sender<RegistryEvent>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(DEFAULT_WATCH_CAPACITY);
        Self {
            services: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Number of distinct service names.
    #[must_use]
    pub fn service_count(&self) -> usize {
        self.services.read().len()
    }

    fn notify(&self, action: RegistryAction, service: Service) {
        // No watchers is not an error
        let _ = self.events.send(RegistryEvent { action, service });
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn register(&self, service: &Service) -> Result<(), RegistryError> {
        if service.name.is_empty() {
            return Err(RegistryError::InvalidService("empty service name".into()));
        }

        let action = {
            let mut services = self.services.write();
            let versions = services.entry(service.name.clone()).or_default();

            match versions.get_mut(&service.version) {
                None => {
                    versions.insert(service.version.clone(), service.clone());
                    RegistryAction::Create
                }
                Some(existing) => {
                    existing.metadata = service.metadata.clone();
                    existing.endpoints = service.endpoints.clone();
                    for node in &service.nodes {
                        match existing.nodes.iter_mut().find(|n| n.id == node.id) {
                            Some(slot) => *slot = node.clone(),
                            None => existing.nodes.push(node.clone()),
                        }
                    }
                    RegistryAction::Update
                }
            }
        };

        info!(
            service = %service.name,
            version = %service.version,
            nodes = service.nodes.len(),
            "[Registry] Registered service"
        );
        self.notify(action, service.clone());

        Ok(())
    }

    async fn deregister(&self, service: &Service) -> Result<(), RegistryError> {
        {
            let mut services = self.services.write();
            let Some(versions) = services.get_mut(&service.name) else {
                debug!(service = %service.name, "[Registry] Deregister of unknown service");
                return Ok(());
            };

            if let Some(existing) = versions.get_mut(&service.version) {
                existing
                    .nodes
                    .retain(|n| !service.nodes.iter().any(|gone| gone.id == n.id));
                if existing.nodes.is_empty() {
                    versions.remove(&service.version);
                }
            }

            if versions.is_empty() {
                services.remove(&service.name);
            }
        }

        info!(
            service = %service.name,
            version = %service.version,
            "[Registry] Deregistered service"
        );
        self.notify(RegistryAction::Delete, service.clone());

        Ok(())
    }

    async fn get_service(&self, name: &str) -> Result<Vec<Service>, RegistryError> {
        let services = self.services.read();
        let versions = services
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        let mut found: Vec<Service> = versions.values().cloned().collect();
        found.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(found)
    }

    async fn list_services(&self) -> Result<Vec<Service>, RegistryError> {
        let mut all: Vec<Service> = self
            .services
            .read()
            .values()
            .flat_map(|versions| versions.values().cloned())
            .collect();
        all.sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
        Ok(all)
    }

    fn watch(&self) -> Watcher {
        Watcher::new(self.events.subscribe())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
