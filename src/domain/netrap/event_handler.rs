use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;

use crate::domain::dismi::state_handler::DismiStateHandler;
use crate::domain::netrap::intent_reconciler::IntentReconciler;
use crate::domain::netrap::netrap_service::NetRapService;
use crate::domain::network::model::{IntentEvent, IntentEventType, LinkType, TopologyEvent};
use crate::domain::utils::scheduled_task::ScheduledTask;

/// Routes provider events to the planner side and the client intent lifecycle.
pub struct NetRapEventHandler {
    netrap_app_name: String,
    dismi_app_name: String,
    reconciler: Arc<IntentReconciler>,
    state_handler: Option<Arc<DismiStateHandler>>,
    service: Weak<NetRapService>,
    topology_update: ScheduledTask,
    topology_update_delay: Duration,
}

impl NetRapEventHandler {
    pub fn new(
        netrap_app_name: impl Into<String>,
        dismi_app_name: impl Into<String>,
        service: &Arc<NetRapService>,
        handle: Handle,
        topology_update_delay: Duration,
    ) -> Self {
        Self {
            netrap_app_name: netrap_app_name.into(),
            dismi_app_name: dismi_app_name.into(),
            reconciler: service.reconciler().clone(),
            state_handler: None,
            service: Arc::downgrade(service),
            topology_update: ScheduledTask::new("netrap-topology-update", handle),
            topology_update_delay,
        }
    }

    pub fn with_state_handler(mut self, state_handler: Arc<DismiStateHandler>) -> Self {
        self.state_handler = Some(state_handler);
        self
    }

    /// Only intents of the planner and client applications are considered.
    pub fn on_intent_event(&self, event: &IntentEvent) {
        let app = event.intent.app_id.name.as_str();
        let from_dismi = app == self.dismi_app_name;
        if app != self.netrap_app_name && !from_dismi {
            return;
        }

        match event.event_type {
            IntentEventType::Failed | IntentEventType::Installed | IntentEventType::Corrupt => {
                log::debug!("Intent {} is {:?}, offering it to the planner", event.intent.key, event.event_type);
                self.reconciler.update_intents(&event.intent);
            }
            IntentEventType::WithdrawReq => {
                log::debug!("Intent {} is being withdrawn", event.intent.key);
                self.reconciler.delete_intent(&event.intent);
            }
            _ => {}
        }

        if !from_dismi {
            return;
        }
        if let Some(state_handler) = &self.state_handler {
            state_handler.manage_states(&event.intent, &event.intent.key, event.event_type);
        }
    }

    /// Schedules a topology push unless the event only concerns indirect
    /// links or an update is already pending.
    ///
    /// # Returns
    /// Returns true if a new update was scheduled.
    pub fn on_topology_event(&self, event: &TopologyEvent) -> bool {
        if !event.reasons.iter().any(|r| r.link.link_type != LinkType::Indirect) {
            return false;
        }

        let service = self.service.clone();
        self.topology_update.schedule(self.topology_update_delay, move || {
            if let Some(service) = service.upgrade() {
                log::info!("Topology changed, updating the planner");
                service.update_topology();
            }
        })
    }

    pub fn is_topology_update_pending(&self) -> bool {
        self.topology_update.is_pending()
    }
}
