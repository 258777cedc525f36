use std::net::IpAddr;
use std::sync::Arc;

use crate::config::EndpointModel;
use crate::domain::dismi::abstraction_link::AbstractionLink;
use crate::domain::dismi::constraint_compiler::{SelectionLevels, compile_constraints};
use crate::domain::dismi::model::{Endpoint, GenericDismiIntent};
use crate::domain::dismi::selector_compiler::primary_selector;
use crate::domain::network::model::{ApplicationId, ConnectPoint, IntentKey, IpPrefix, PathIntent, TrafficTreatment};
use crate::domain::network::services::{HostService, IntentService};

/// Builds provider intents from decomposed paths and hands them to the
/// intent service.
#[derive(Clone)]
pub struct IntentCompiler {
    intent_service: Arc<dyn IntentService>,
    host_service: Arc<dyn HostService>,
    endpoint_model: EndpointModel,
    default_priority: u32,
    levels: SelectionLevels,
}

impl IntentCompiler {
    pub fn new(
        intent_service: Arc<dyn IntentService>,
        host_service: Arc<dyn HostService>,
        endpoint_model: EndpointModel,
        default_priority: u32,
        levels: SelectionLevels,
    ) -> Self {
        Self { intent_service, host_service, endpoint_model, default_priority, levels }
    }

    pub fn default_priority(&self) -> u32 {
        self.default_priority
    }

    /// `router_id/port_id` of an IP endpoint.
    pub fn to_connect_point(endpoint: &Endpoint) -> Option<ConnectPoint> {
        match endpoint {
            Endpoint::Ip(ip) => {
                let cp = ConnectPoint::parse(&format!("{}/{}", ip.router_id, ip.port_id));
                if cp.is_none() {
                    log::error!("Endpoint {} does not name a valid connect point.", endpoint);
                }
                cp
            }
            other => {
                log::warn!("Only IP endpoints can be attached, found {}.", other);
                None
            }
        }
    }

    /// Location of the first host owning the address of an IP endpoint.
    pub fn host_location(&self, endpoint: &Endpoint) -> Option<ConnectPoint> {
        let Some(ip) = endpoint.as_ip() else {
            log::warn!("Only IP endpoints can be attached, found {}.", endpoint);
            return None;
        };
        let addr: IpAddr = match ip.in_addr.parse::<IpPrefix>() {
            Ok(prefix) => prefix.addr,
            Err(e) => {
                log::error!("Endpoint {} has no usable address: {}", endpoint, e);
                return None;
            }
        };
        self.host_service.get_hosts_by_ip(&addr).into_iter().next().map(|h| h.location)
    }

    fn attachment(&self, endpoint: &Endpoint) -> Option<ConnectPoint> {
        match self.endpoint_model {
            EndpointModel::ConnectPoint => Self::to_connect_point(endpoint),
            EndpointModel::Host => self.host_location(endpoint),
        }
    }

    pub fn attachments(&self, link: &AbstractionLink) -> Option<(ConnectPoint, ConnectPoint)> {
        let Some(src) = self.attachment(&link.src) else {
            log::error!("No source attachment found for {}.", link.src);
            return None;
        };
        let Some(dst) = self.attachment(&link.dst) else {
            log::error!("No destination attachment found for {}.", link.dst);
            return None;
        };
        Some((src, dst))
    }

    fn submit(&self, intent: PathIntent) -> bool {
        let key = intent.key.clone();
        match self.intent_service.submit(intent) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Submission of {} failed: {}", key, e);
                false
            }
        }
    }

    /// Provider intent for `generic` on the candidate `link`, not submitted.
    pub fn build_path_intent(&self, generic: &GenericDismiIntent, app_id: ApplicationId, key: IntentKey, link: &AbstractionLink) -> Option<PathIntent> {
        let (src, dst) = self.attachments(link)?;
        let priority = generic.priority.unwrap_or(self.default_priority);

        let mut intent = PathIntent::new(app_id, key, src, dst, priority);
        intent.selector = primary_selector(&link.src, &link.dst, &generic.selectors);
        intent.treatment = TrafficTreatment::empty();
        intent.constraints = compile_constraints(&generic.path, &generic.constraints, generic.is_negotiable, self.levels);
        Some(intent)
    }

    /// # Returns
    /// Returns true if the provider accepted the intent.
    pub fn submit_path_intent(&self, generic: &GenericDismiIntent, app_id: ApplicationId, key: IntentKey, link: &AbstractionLink) -> bool {
        let Some(intent) = self.build_path_intent(generic, app_id, key, link) else {
            return false;
        };
        log::info!("Submitting intent {} for {} -> {}.", intent.key, intent.src, intent.dst);
        self.submit(intent)
    }

    /// Replaces the installed intent under `key`, keeping its application and priority.
    pub fn update_path_intent(&self, generic: &GenericDismiIntent, key: &IntentKey, link: &AbstractionLink) -> bool {
        let Some(existing) = self.intent_service.get_intent(key) else {
            log::error!("No installed intent under {}.", key);
            return false;
        };
        let Some(mut intent) = self.build_path_intent(generic, existing.app_id.clone(), existing.key.clone(), link) else {
            return false;
        };
        intent.priority = existing.priority;
        log::info!("Updating intent {} to {} -> {}.", intent.key, intent.src, intent.dst);
        self.submit(intent)
    }

    /// # Returns
    /// Returns false if nothing is installed under `key`.
    pub fn delete_path_intent(&self, key: &IntentKey) -> bool {
        match self.intent_service.get_intent(key) {
            Some(intent) => {
                self.intent_service.withdraw(&intent);
                log::info!("Withdrawn intent {}.", key);
                true
            }
            None => {
                log::error!("Cannot withdraw {}, no such intent.", key);
                false
            }
        }
    }

    /// Moves a failed intent onto another candidate, with a selector derived
    /// from the new endpoints.
    pub fn resubmit_intent(&self, failed: &PathIntent, link: &AbstractionLink) -> bool {
        let Some((src, dst)) = self.attachments(link) else {
            return false;
        };
        let mut intent = PathIntent::new(failed.app_id.clone(), failed.key.clone(), src, dst, self.default_priority);
        intent.kind = failed.kind;
        intent.selector = primary_selector(&link.src, &link.dst, &[]);
        intent.treatment = failed.treatment.clone();
        intent.constraints = failed.constraints.clone();
        log::info!("Resubmitting intent {} on {}.", intent.key, link);
        self.submit(intent)
    }
}
