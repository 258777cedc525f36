use bytes::Bytes;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::api::netrap_dto::{NetRapAction, NetRapActionType, NetRapDemand};
use crate::domain::netrap::demand_translation::{
    ATTR_APP_ID, ATTR_APP_NAME, ATTR_ID, ATTR_KEY, intent_to_demand, intent_to_reverse_demand,
};
use crate::domain::netrap::path_extraction::{extract_path, resolve_opto_route};
use crate::domain::netrap::planner::PlannerService;
use crate::domain::netrap::route_store::RouteStore;
use crate::domain::netrap::transaction_queue::{ActionType, TransactionQueue};
use crate::domain::netrap::xrap::{RouteId, XrapReply, XrapRequest, XrapResource};
use crate::domain::network::model::{
    ApplicationId, ConnectPoint, IntentKey, IntentState, NetworkPath, PathIntent, ProviderConstraint,
};
use crate::domain::network::services::{IntentService, LinkService};
use crate::domain::utils::executor::SerialExecutor;
use crate::domain::utils::statistics::ANALYTICS_TARGET;
use crate::error::{Error, Result};

pub const INTENTS_ROUTE: &str = "/intents/";

/// Port of a transponder's client interface, where optical intents start and end.
const TRANSPONDER_CLIENT_PORT: u64 = 1;

/// The attributes a demand carries to find its intent again.
struct DemandIdentity<'a> {
    app_name: Option<&'a str>,
    app_id: Option<&'a str>,
    id: Option<&'a str>,
    key: Option<&'a str>,
}

impl<'a> DemandIdentity<'a> {
    fn of(demand: &'a NetRapDemand) -> Self {
        let get = |name: &str| demand.attributes.get(name).map(String::as_str);
        Self { app_name: get(ATTR_APP_NAME), app_id: get(ATTR_APP_ID), id: get(ATTR_ID), key: get(ATTR_KEY) }
    }

    /// # Returns
    /// Returns None if the key or application id is missing or malformed.
    fn intent_key(&self) -> Option<IntentKey> {
        let app_id = self.app_id?.parse::<u16>().ok()?;
        IntentKey::decode(self.key?, ApplicationId::new(app_id, self.app_name.unwrap_or_default()))
    }

    fn describe(&self) -> String {
        format!(
            "key: {} appid: {} appname: {} id: {}",
            self.key.unwrap_or("null"),
            self.app_id.unwrap_or("null"),
            self.app_name.unwrap_or("null"),
            self.id.unwrap_or("null")
        )
    }

    /// Reports every identity field that disagrees with `intent`.
    fn check(&self, intent: &PathIntent) {
        let fields = [
            ("appname", intent.app_id.name.clone(), self.app_name),
            ("appid", intent.app_id.id.to_string(), self.app_id),
            ("id", intent.id.to_string(), self.id),
            ("key", intent.key.to_string(), self.key),
        ];
        for (name, actual, returned) in fields {
            if Some(actual.as_str()) != returned {
                log::error!("Intent {} does not match the returned value: {} != {}", name, actual, returned.unwrap_or("null"));
            }
        }
    }
}

struct ReconcilerCore {
    app_id: ApplicationId,
    default_priority: u32,
    intent_service: Arc<dyn IntentService>,
    link_service: Arc<dyn LinkService>,
    planner: Arc<PlannerService>,
    queue: Arc<TransactionQueue>,
    routes: RouteStore,
    /// Keys with a request to the planner in flight.
    handled: Mutex<HashSet<IntentKey>>,
}

impl ReconcilerCore {
    fn forget(&self, key: &IntentKey) {
        self.handled.lock().expect("Mutex poisoned").remove(key);
    }

    fn get_demands(&self) -> Result<Vec<NetRapDemand>> {
        let intents = self.intent_service.get_intents().ok_or(Error::IntentServiceUnavailable)?;

        let mut demands = Vec::with_capacity(intents.len());
        for intent in intents {
            match self.intent_service.get_intent_state(&intent.key) {
                Some(
                    IntentState::WithdrawReq
                    | IntentState::Withdrawn
                    | IntentState::Withdrawing
                    | IntentState::Corrupt
                    | IntentState::PurgeReq,
                ) => continue,
                Some(IntentState::Failed) if intent.calculated => {
                    log::debug!("Adding FAILED intent {} to the planner without its path", intent.key);
                    self.routes.remove(&intent.key);
                    let uncalculated =
                        PathIntent { calculated: false, path: None, backup_path: None, ..intent.clone() };
                    demands.push(intent_to_demand(&uncalculated, &self.routes));
                }
                _ => {
                    demands.push(intent_to_demand(&intent, &self.routes));
                    if intent.app_id == self.app_id {
                        demands.push(intent_to_reverse_demand(&intent, &self.routes));
                    }
                }
            }
        }
        Ok(demands)
    }

    /// Posts `demands` as `/demand/list` and applies the answer.
    fn send_demands(&self, address: Option<&RouteId>, demands: &[NetRapDemand]) -> bool {
        let body = match serde_json::to_vec(demands) {
            Ok(body) => body,
            Err(e) => {
                log::error!("Could not encode demand list: {}", e);
                return false;
            }
        };
        match self.planner.send_to(address, XrapRequest::post_json("/demand/list", body)) {
            None => {
                log::error!("No reply was received from the planner regarding the list of demands.");
                false
            }
            Some(reply) => self.handle_reply(None, &reply),
        }
    }

    fn handle_reply(&self, reference: Option<&PathIntent>, reply: &XrapReply) -> bool {
        match reply {
            XrapReply::Post { body, .. } => {
                self.handle_intent_response(reference, body);
                true
            }
            other => {
                log::error!("Planner answered with {:?} instead of a POST reply", other);
                false
            }
        }
    }

    /// Talks to the planner about one intent.
    fn process(&self, intent: &PathIntent, remove: bool) {
        let reply = if remove {
            self.queue.remove_route_intent(&intent.key);
            log::info!("DELETING intent with key={}", intent.key);
            self.planner.send_any(XrapRequest::delete(format!("/demand/{}", intent.key)))
        } else if intent.app_id == self.app_id {
            self.queue.notify_installed_optical_intent(&intent.key);
            log::info!("Sending the optical intent {} to the planner", intent.key);
            let demands = [intent_to_demand(intent, &self.routes), intent_to_reverse_demand(intent, &self.routes)];
            if !self.send_demands(None, &demands) {
                self.forget(&intent.key);
            }
            return;
        } else {
            let demand = intent_to_demand(intent, &self.routes);
            match serde_json::to_vec(&demand) {
                Ok(body) => {
                    log::debug!("Sending intent {} {} -> {} to the planner", intent.key, intent.src, intent.dst);
                    self.planner.send_any(XrapRequest::post_json("/demand", body))
                }
                Err(e) => {
                    log::error!("Could not encode demand for {}: {}", intent.key, e);
                    None
                }
            }
        };

        match reply {
            None => {
                log::error!("No reply was received from the planner regarding intent {}", intent.key);
                self.forget(&intent.key);
            }
            Some(XrapReply::Post { body, .. }) => self.handle_intent_response(Some(intent), &body),
            Some(XrapReply::Delete { .. }) => {
                log::info!("Removed planner demand {}", intent.key);
                self.routes.remove(&intent.key);
            }
            Some(other) => {
                log::error!("Reply is neither a POST nor a DELETE reply: {:?}", other);
                if !remove {
                    self.forget(&intent.key);
                }
            }
        }
    }

    /// Applies planner actions: every NEW first, then MOVE, ROUTE and FAIL.
    fn handle_intent_response(&self, reference: Option<&PathIntent>, body: &[u8]) {
        let actions: Vec<NetRapAction> = match serde_json::from_slice(body) {
            Ok(actions) => actions,
            Err(e) => {
                log::error!("Could not parse planner actions from response: {}", e);
                return;
            }
        };

        for kind in [NetRapActionType::New, NetRapActionType::Move, NetRapActionType::Route, NetRapActionType::Fail] {
            for action in actions.iter().filter(|a| a.action == kind) {
                tracing::info!(
                    target: ANALYTICS_TARGET,
                    LogDescription = "Planner action",
                    Action = %action.action,
                    Key = action.demand.attributes.get(ATTR_KEY).map(String::as_str).unwrap_or("none"),
                );
                match kind {
                    NetRapActionType::New => self.handle_new(action, reference),
                    NetRapActionType::Move => self.handle_move(action),
                    NetRapActionType::Route => self.handle_route(action),
                    NetRapActionType::Fail => self.handle_fail(action),
                }
            }
        }
    }

    /// Creates an optical intent along the planner's lightpath.
    fn handle_new(&self, action: &NetRapAction, reference: Option<&PathIntent>) {
        let demand = &action.demand;
        let Some(route) = &demand.route else {
            log::error!("NEW action without a route");
            return;
        };
        if route.layer != Some(0) {
            log::error!("NEW action got a route that is not on the WDM layer!");
        }

        let path = NetworkPath::new(resolve_opto_route(self.link_service.as_ref(), route));
        let (Some(first), Some(last)) = (path.src(), path.dst()) else {
            log::error!("NEW action route resolved to no links");
            return;
        };
        let src = ConnectPoint::new(first.device_id.as_str(), TRANSPONDER_CLIENT_PORT);
        let dst = ConnectPoint::new(last.device_id.as_str(), TRANSPONDER_CLIENT_PORT);
        let priority = reference.map(|r| r.priority).unwrap_or(self.default_priority);

        let mut intent =
            PathIntent::new(self.app_id.clone(), IntentKey::of_long(0, self.app_id.clone()), src, dst, priority);
        intent.key = IntentKey::of_long(intent.id.0, self.app_id.clone());
        intent.calculated = true;
        intent.path = Some(path);
        if let Some(gbps) = demand.offered_traffic {
            intent.constraints.push(ProviderConstraint::Bandwidth { bps: gbps * 1e9 });
        }

        log::info!("Creating optical intent {} {} -> {}", intent.key, intent.src, intent.dst);
        self.routes.set_route(&intent.key, route);
        self.queue.add_optical_intent(intent);
    }

    fn handle_move(&self, action: &NetRapAction) {
        let identity = DemandIdentity::of(&action.demand);
        let Some(key) = identity.intent_key() else {
            log::error!("Failed to handle MOVE action, intent key or appid is missing!");
            return;
        };
        if self.intent_service.get_intent(&key).is_some() {
            self.apply_route(action, ActionType::Move);
        } else {
            log::error!("Failed to handle MOVE action, could not find existing intent {}!", key);
        }
    }

    fn find_intent(&self, identity: &DemandIdentity) -> Option<PathIntent> {
        if let Some(key) = identity.intent_key() {
            return self.intent_service.get_intent(&key);
        }
        // Keys that do not fit a long are only known by their printed form.
        let printed = identity.key?;
        self.intent_service.get_intents()?.into_iter().find(|i| i.key.to_string() == printed)
    }

    fn handle_route(&self, action: &NetRapAction) {
        self.apply_route(action, ActionType::Route);
    }

    /// Puts an existing intent on the path the planner computed.
    fn apply_route(&self, action: &NetRapAction, action_type: ActionType) {
        let demand = &action.demand;
        let identity = DemandIdentity::of(demand);
        let Some(intent) = self.find_intent(&identity) else {
            log::error!("Could not find intent for {}!", identity.describe());
            return;
        };
        identity.check(&intent);

        let Some(route) = &demand.route else {
            log::error!("Could not get routes from action for {}", intent.key);
            return;
        };
        if route.layer != Some(1) {
            log::error!("ROUTE ON UNKNOWN LAYER {:?}!", route.layer);
            return;
        }

        let key = &intent.key;
        let backup = demand.backup_route.as_ref();
        let unchanged = self.routes.is_equal_primary_route(key, route)
            && backup.is_none_or(|b| self.routes.is_equal_backup_route(key, Some(b)));
        if unchanged {
            log::debug!("Same routes received from the planner for intent {}, skipping...", key);
            return;
        }

        self.routes.set_route(key, route);
        let mut expected_links = Vec::new();
        let path = extract_path(self.link_service.as_ref(), route, &mut expected_links);
        let backup_path = backup.map(|b| {
            self.routes.set_backup_route(key, b);
            extract_path(self.link_service.as_ref(), b, &mut expected_links)
        });

        let (Some(src), Some(dst)) = (path.src().cloned(), path.dst().cloned()) else {
            log::error!("Route for intent {} resolved to an empty path", key);
            return;
        };
        let routed = PathIntent { calculated: true, src, dst, path: Some(path), backup_path, ..intent.clone() };

        log::info!("{:?} intent {} with {} expected links", action_type, key, expected_links.len());
        match action_type {
            ActionType::Move => self.queue.add_moved_intent(routed, expected_links),
            _ => self.queue.add_route_intent(routed, expected_links),
        }
    }

    /// The planner found no route. Drops the stored routes so the intent is
    /// offered again without a path.
    fn handle_fail(&self, action: &NetRapAction) {
        let identity = DemandIdentity::of(&action.demand);
        let Some(key) = identity.intent_key() else {
            log::error!("FAIL action without a usable key: {}", identity.describe());
            return;
        };
        log::error!("Planner FAIL action received for intent {}", key);

        self.forget(&key);
        if !self.routes.remove(&key) {
            log::error!("No route stored for failed intent {}", key);
        }
        match self.intent_service.get_intent(&key) {
            Some(intent) => identity.check(&intent),
            None => log::error!("Could not find intent for {}!", identity.describe()),
        }
    }
}

/// Keeps the planner's demands in step with the provider's intents and turns
/// planner decisions into intents.
pub struct IntentReconciler {
    core: Arc<ReconcilerCore>,
    executor: SerialExecutor,
}

impl IntentReconciler {
    pub fn new(
        app_id: ApplicationId,
        default_priority: u32,
        intent_service: Arc<dyn IntentService>,
        link_service: Arc<dyn LinkService>,
        planner: Arc<PlannerService>,
        queue: Arc<TransactionQueue>,
        routes: RouteStore,
    ) -> Self {
        let core = ReconcilerCore {
            app_id,
            default_priority,
            intent_service,
            link_service,
            planner,
            queue,
            routes,
            handled: Mutex::new(HashSet::new()),
        };
        Self { core: Arc::new(core), executor: SerialExecutor::new("netrap-intent-batch") }
    }

    pub fn app_id(&self) -> &ApplicationId {
        &self.core.app_id
    }

    pub fn routes(&self) -> &RouteStore {
        &self.core.routes
    }

    pub fn is_handled(&self, key: &IntentKey) -> bool {
        self.core.handled.lock().expect("Mutex poisoned").contains(key)
    }

    /// Offers a changed intent to the planner unless a request for its key is
    /// already in flight.
    pub fn update_intents(&self, intent: &PathIntent) {
        if !self.core.handled.lock().expect("Mutex poisoned").insert(intent.key.clone()) {
            log::debug!("Intent {} is already with the planner", intent.key);
            return;
        }
        let core = self.core.clone();
        let intent = intent.clone();
        self.executor.execute(move || core.process(&intent, false));
    }

    /// Withdraws the demand of `intent` from the planner.
    pub fn delete_intent(&self, intent: &PathIntent) {
        let core = self.core.clone();
        let intent = intent.clone();
        self.executor.execute(move || core.process(&intent, true));
    }

    /// Every live intent as a demand; optical intents come with their
    /// reverse direction.
    pub fn get_demands(&self) -> Result<Vec<NetRapDemand>> {
        self.core.get_demands()
    }

    /// Sends all demands to `address`, or to the most recent planner.
    ///
    /// # Returns
    /// Returns false if the demands could not be built or no usable reply came back.
    pub fn send_intents(&self, address: Option<&RouteId>) -> bool {
        match self.core.get_demands() {
            Ok(demands) => self.core.send_demands(address, &demands),
            Err(e) => {
                log::info!("Error building intents: {}", e);
                false
            }
        }
    }

    /// Asks the planner to reoptimize the whole network.
    pub fn network_reopt(&self) -> bool {
        match self.core.planner.send_any(XrapRequest::post_json("/demand/reopt", Bytes::new())) {
            None => {
                log::error!("No reply was received from the planner regarding network reoptimization!");
                false
            }
            Some(reply) => self.core.handle_reply(None, &reply),
        }
    }

    pub fn handle_intent_response(&self, reference: Option<&PathIntent>, body: &[u8]) {
        self.core.handle_intent_response(reference, body);
    }

    pub fn get_status(&self) -> String {
        self.core.queue.get_status()
    }

    /// Waits until every queued planner request has been answered.
    pub fn flush(&self) {
        self.executor.flush();
    }
}

impl XrapResource for IntentReconciler {
    fn route(&self) -> &str {
        INTENTS_ROUTE
    }

    fn handle_get(&self, _request: &XrapRequest) -> XrapReply {
        match self.get_demands().and_then(|d| serde_json::to_string(&d).map_err(Error::from)) {
            Ok(body) => XrapReply::json(body),
            Err(e) => XrapReply::error(500, e.to_string()),
        }
    }
}
