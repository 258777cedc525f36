use std::sync::{Arc, RwLock};

use crate::domain::netrap::registry::Registry;
use crate::domain::netrap::xrap::{PlannerTransport, RouteId, XrapReply, XrapRequest, XrapResource};

/// Outbound and inbound side of the planner protocol.
///
/// Outbound requests go to one named address or to the most recently
/// registered planner. Inbound requests are dispatched to the resource whose
/// route prefixes the requested path.
pub struct PlannerService {
    transport: Arc<dyn PlannerTransport>,
    registry: Arc<Registry>,
    resources: RwLock<Vec<Arc<dyn XrapResource>>>,
}

impl PlannerService {
    pub fn new(transport: Arc<dyn PlannerTransport>, registry: Arc<Registry>) -> Self {
        let register: Arc<dyn XrapResource> = registry.clone();
        Self { transport, registry, resources: RwLock::new(vec![register]) }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn add_resource(&self, resource: Arc<dyn XrapResource>) {
        log::info!("Serving planner resource {}", resource.route());
        self.resources.write().expect("RwLock poisoned").push(resource);
    }

    /// # Returns
    /// Returns the reply, or None if the transport failed.
    pub fn send_one(&self, address: &RouteId, request: XrapRequest) -> Option<XrapReply> {
        let description = format!("{} {}", request.method, request.resource);
        match self.transport.send(address, request) {
            Ok(reply) => {
                log::debug!("{} answered with {}", description, reply.status_code());
                Some(reply)
            }
            Err(e) => {
                log::error!("{} failed: {}", description, e);
                None
            }
        }
    }

    /// Sends to the most recently registered planner.
    pub fn send_any(&self, request: XrapRequest) -> Option<XrapReply> {
        let Some(address) = self.registry.latest() else {
            log::warn!("No planner registered, dropping {} {}", request.method, request.resource);
            return None;
        };
        self.send_one(&address, request)
    }

    pub fn send_to(&self, address: Option<&RouteId>, request: XrapRequest) -> Option<XrapReply> {
        match address {
            Some(address) => self.send_one(address, request),
            None => self.send_any(request),
        }
    }

    /// Handles a request sent by a planner.
    pub fn dispatch(&self, request: &XrapRequest) -> XrapReply {
        let resource = self
            .resources
            .read()
            .expect("RwLock poisoned")
            .iter()
            .find(|r| request.resource.starts_with(r.route().trim_end_matches('/')))
            .cloned();
        match resource {
            Some(resource) => resource.handle(request),
            None => {
                log::warn!("No resource serves {}", request.resource);
                XrapReply::error(404, "Could not find resource")
            }
        }
    }
}
