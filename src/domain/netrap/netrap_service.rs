use std::sync::{Arc, Weak};

use crate::domain::netrap::intent_reconciler::IntentReconciler;
use crate::domain::netrap::planner::PlannerService;
use crate::domain::netrap::topology_export::TopologyExporter;
use crate::domain::netrap::xrap::{RouteId, XrapReply, XrapRequest};

const TOPOLOGY_RESOURCE: &str = "/topology";

/// Entry point of the planner side: pushes topology and demands to planners
/// and answers their requests.
pub struct NetRapService {
    planner: Arc<PlannerService>,
    exporter: Arc<TopologyExporter>,
    reconciler: Arc<IntentReconciler>,
}

impl NetRapService {
    /// Wires the service into the planner: the exporter and reconciler are
    /// served as resources and newly registered planners get greeted with
    /// the current topology and demands.
    pub fn new(planner: Arc<PlannerService>, exporter: Arc<TopologyExporter>, reconciler: Arc<IntentReconciler>) -> Arc<Self> {
        planner.add_resource(exporter.clone());
        planner.add_resource(reconciler.clone());

        let service = Arc::new(Self { planner, exporter, reconciler });
        let weak: Weak<Self> = Arc::downgrade(&service);
        service.planner.registry().set_greeter(Arc::new(move |route_id: RouteId| {
            if let Some(service) = weak.upgrade() {
                log::info!("Greeting newly registered planner");
                service.send_topology(Some(&route_id));
            }
        }));
        service
    }

    pub fn planner(&self) -> &Arc<PlannerService> {
        &self.planner
    }

    pub fn reconciler(&self) -> &Arc<IntentReconciler> {
        &self.reconciler
    }

    /// Sends the topology to `address` (or the most recent planner) and, if
    /// the planner took it, all demands after it.
    ///
    /// # Returns
    /// Returns true if both topology and demands were accepted.
    pub fn send_topology(&self, address: Option<&RouteId>) -> bool {
        let body = match self.exporter.topology_json() {
            Ok(body) => body,
            Err(e) => {
                log::error!("Could not build topology: {}", e);
                return false;
            }
        };

        match self.planner.send_to(address, XrapRequest::post_json(TOPOLOGY_RESOURCE, body)) {
            None => {
                log::error!("No reply was received from the planner regarding the topology!");
                false
            }
            Some(XrapReply::Error { status_code, error_text }) => {
                log::error!("Planner rejected the topology with {}: {}", status_code, error_text);
                false
            }
            Some(reply) => {
                log::debug!("Topology accepted with status {}", reply.status_code());
                self.reconciler.send_intents(address)
            }
        }
    }

    /// Pushes the current topology to the most recent planner.
    pub fn update_topology(&self) -> bool {
        self.send_topology(None)
    }

    pub fn send_intents(&self, address: Option<&RouteId>) -> bool {
        self.reconciler.send_intents(address)
    }

    pub fn network_reopt(&self) -> bool {
        self.reconciler.network_reopt()
    }

    /// Answers a request sent by a planner.
    pub fn dispatch(&self, request: &XrapRequest) -> XrapReply {
        self.planner.dispatch(request)
    }

    pub fn get_status(&self) -> String {
        self.reconciler.get_status()
    }
}
