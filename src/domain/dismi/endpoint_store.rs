use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::dismi::model::Endpoint;
use crate::domain::utils::id::ConnectionPointName;

/// Lookup of the physical endpoints behind a connection point name.
pub trait EndpointDirectory: Send + Sync {
    /// # Returns
    /// Returns the candidate endpoints, empty if the name is unknown.
    fn get_endpoints(&self, name: &ConnectionPointName) -> Vec<Endpoint>;
}

/// Connection point registry kept in memory.
#[derive(Debug, Clone, Default)]
pub struct ConnectionPointStore {
    points: Arc<RwLock<HashMap<ConnectionPointName, Vec<Endpoint>>>>,
}

impl ConnectionPointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the endpoints of `name`. Duplicate endpoints are dropped.
    pub fn put(&self, name: impl Into<String>, endpoints: Vec<Endpoint>) {
        let mut unique: Vec<Endpoint> = Vec::with_capacity(endpoints.len());
        for e in endpoints {
            if !unique.contains(&e) {
                unique.push(e);
            }
        }
        self.points.write().expect("RwLock poisoned").insert(ConnectionPointName::new(name), unique);
    }

    pub fn remove(&self, name: &ConnectionPointName) -> Option<Vec<Endpoint>> {
        self.points.write().expect("RwLock poisoned").remove(name)
    }

    pub fn names(&self) -> Vec<ConnectionPointName> {
        let mut names: Vec<_> = self.points.read().expect("RwLock poisoned").keys().cloned().collect();
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        names
    }
}

impl EndpointDirectory for ConnectionPointStore {
    fn get_endpoints(&self, name: &ConnectionPointName) -> Vec<Endpoint> {
        self.points.read().expect("RwLock poisoned").get(name).cloned().unwrap_or_default()
    }
}
