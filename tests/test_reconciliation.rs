mod planner_mock;

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

use netrap_dismi::api::netrap_dto::NetRapActionType;
use netrap_dismi::domain::netrap::demand_translation::intent_to_demand;
use netrap_dismi::domain::netrap::expected_link::ExpectedLink;
use netrap_dismi::domain::netrap::intent_reconciler::IntentReconciler;
use netrap_dismi::domain::netrap::path_extraction::extract_path;
use netrap_dismi::domain::netrap::planner::PlannerService;
use netrap_dismi::domain::netrap::registry::Registry;
use netrap_dismi::domain::netrap::route_store::RouteStore;
use netrap_dismi::domain::netrap::transaction_queue::{ActionType, TransactionQueue};
use netrap_dismi::domain::netrap::xrap::{XrapMethod, XrapRequest};
use netrap_dismi::domain::network::in_memory::{InMemoryIntentService, InMemoryNetwork};
use netrap_dismi::domain::network::model::{
    ApplicationId, ConnectPoint, IntentKey, IntentState, Link, LinkState, LinkType, PathIntent,
};
use netrap_dismi::domain::network::services::IntentService;
use planner_mock::{RecordingTransport, actions_body, planner_link, post_reply, route};

fn netrap_app() -> ApplicationId {
    ApplicationId::new(1, "org.onosproject.orchestrator.netrap")
}

fn dismi_app() -> ApplicationId {
    ApplicationId::new(2, "org.onosproject.orchestrator.dismi")
}

fn client_intent(key: u64) -> PathIntent {
    PathIntent::new(dismi_app(), IntentKey::of_long(key, dismi_app()), ConnectPoint::new("r1", 1), ConnectPoint::new("r4", 1), 100)
}

fn direct(src: &str, src_port: u64, dst: &str, dst_port: u64) -> Link {
    Link::new(ConnectPoint::new(src, src_port), ConnectPoint::new(dst, dst_port), LinkType::Direct)
}

struct Fixture {
    network: InMemoryNetwork,
    intents: Arc<InMemoryIntentService>,
    transport: Arc<RecordingTransport>,
    queue: Arc<TransactionQueue>,
    reconciler: IntentReconciler,
    _runtime: Runtime,
}

impl Fixture {
    fn new(transport: RecordingTransport) -> Self {
        let runtime = Runtime::new().unwrap();
        let network = InMemoryNetwork::new();
        let intents = Arc::new(InMemoryIntentService::new());
        let transport = Arc::new(transport);

        let registry = Arc::new(Registry::new(runtime.handle().clone(), Duration::from_millis(10)));
        registry.register("planner".into(), Bytes::from_static(b"planner-1"));
        let planner = Arc::new(PlannerService::new(transport.clone(), registry));

        let queue = Arc::new(TransactionQueue::new(
            intents.clone(),
            Arc::new(network.clone()),
            runtime.handle().clone(),
            Duration::from_secs(5),
        ));
        let listener_queue = queue.clone();
        network.add_listener(Arc::new(move |event| listener_queue.on_link_event(event)));

        let reconciler = IntentReconciler::new(
            netrap_app(),
            100,
            intents.clone(),
            Arc::new(network.clone()),
            planner,
            queue.clone(),
            RouteStore::new(),
        );
        Self { network, intents, transport, queue, reconciler, _runtime: runtime }
    }

    fn submit(&self, intent: &PathIntent) {
        self.intents.submit(intent.clone()).unwrap();
    }

    fn calculated_submissions(&self) -> Vec<PathIntent> {
        self.intents.submissions().into_iter().filter(|i| i.calculated).collect()
    }
}

#[test]
fn test_identical_route_is_applied_once() {
    let fixture = Fixture::new(RecordingTransport::accept_all());
    fixture.network.add_link(direct("r1", 2, "r4", 2));
    let intent = client_intent(0x10);
    fixture.submit(&intent);

    let mut demand = intent_to_demand(&intent, &RouteStore::new());
    demand.route = Some(route(1, vec![planner_link("r1", 2, "r4", 2)]));
    let body = actions_body(vec![(NetRapActionType::Route, demand)]);

    fixture.reconciler.handle_intent_response(None, &body);
    fixture.reconciler.handle_intent_response(None, &body);

    let routed = fixture.calculated_submissions();
    assert_eq!(routed.len(), 1, "Should skip a route equal to the stored one");
    let path = routed[0].path.as_ref().unwrap();
    assert_eq!(path.links.len(), 1);
    assert_eq!(routed[0].id, intent.id, "Should keep the intent id");
    assert!(fixture.reconciler.routes().route(&intent.key).is_some());
}

#[test]
fn test_changed_backup_route_is_applied_again() {
    let fixture = Fixture::new(RecordingTransport::accept_all());
    fixture.network.add_link(direct("r1", 2, "r4", 2));
    fixture.network.add_link(direct("r1", 3, "r4", 3));
    let intent = client_intent(0x11);
    fixture.submit(&intent);

    let mut demand = intent_to_demand(&intent, &RouteStore::new());
    demand.route = Some(route(1, vec![planner_link("r1", 2, "r4", 2)]));
    fixture.reconciler.handle_intent_response(None, &actions_body(vec![(NetRapActionType::Route, demand.clone())]));

    demand.backup_route = Some(route(1, vec![planner_link("r1", 3, "r4", 3)]));
    fixture.reconciler.handle_intent_response(None, &actions_body(vec![(NetRapActionType::Route, demand)]));

    let routed = fixture.calculated_submissions();
    assert_eq!(routed.len(), 2, "Should apply a route whose backup changed");
    assert!(routed[1].backup_path.is_some());
}

#[test]
fn test_gap_in_route_is_bridged_by_an_expected_link() {
    let network = InMemoryNetwork::new();
    network.add_link(direct("r1", 2, "r2", 2));
    network.add_link(direct("r3", 3, "r4", 3));

    let planned = route(1, vec![planner_link("r1", 2, "r2", 2), planner_link("r3", 3, "r4", 3)]);
    let mut expected = Vec::new();
    let path = extract_path(&network, &planned, &mut expected);

    assert_eq!(expected, vec![ExpectedLink::new(ConnectPoint::new("r1", 2), ConnectPoint::new("r4", 3))]);
    assert_eq!(path.links.len(), 1, "Should replace the link before the gap");
    let bridge = &path.links[0];
    assert_eq!(bridge.link_type, LinkType::Direct);
    assert_eq!(bridge.state, LinkState::Inactive);
    assert!(bridge.expected);
    assert_eq!(bridge.annotation("netRap"), Some("ignore"));
}

#[test]
fn test_gap_uses_existing_link_when_present() {
    let network = InMemoryNetwork::new();
    network.add_link(direct("r1", 2, "r2", 2));
    network.add_link(direct("r3", 3, "r4", 3));
    network.add_link(direct("r1", 2, "r4", 3));

    let planned = route(1, vec![planner_link("r1", 2, "r2", 2), planner_link("r3", 3, "r4", 3)]);
    let mut expected = Vec::new();
    let path = extract_path(&network, &planned, &mut expected);

    assert!(expected.is_empty());
    assert!(!path.links[0].expected, "Should bridge with the discovered link");
}

#[test]
fn test_routed_intent_waits_for_missing_link() {
    let fixture = Fixture::new(RecordingTransport::accept_all());
    fixture.network.add_link(direct("r1", 2, "r2", 2));
    fixture.network.add_link(direct("r3", 3, "r4", 3));
    let intent = client_intent(0x12);
    fixture.submit(&intent);

    let mut demand = intent_to_demand(&intent, &RouteStore::new());
    demand.route = Some(route(1, vec![planner_link("r1", 2, "r2", 2), planner_link("r3", 3, "r4", 3)]));
    fixture.reconciler.handle_intent_response(None, &actions_body(vec![(NetRapActionType::Route, demand)]));

    assert!(fixture.calculated_submissions().is_empty(), "Should hold the intent until the bridge exists");
    assert_eq!(fixture.queue.ip_items().len(), 1);

    fixture.network.add_link(direct("r1", 2, "r4", 3));
    fixture.queue.flush();
    assert_eq!(fixture.calculated_submissions().len(), 1);
    assert!(fixture.queue.ip_items().is_empty());
}

#[test]
fn test_moved_intent_is_queued_as_move() {
    let fixture = Fixture::new(RecordingTransport::accept_all());
    fixture.network.add_link(direct("r1", 2, "r2", 2));
    fixture.network.add_link(direct("r3", 3, "r4", 3));
    let intent = client_intent(0x14);
    fixture.submit(&intent);

    let mut demand = intent_to_demand(&intent, &RouteStore::new());
    demand.route = Some(route(1, vec![planner_link("r1", 2, "r2", 2), planner_link("r3", 3, "r4", 3)]));
    fixture.reconciler.handle_intent_response(None, &actions_body(vec![(NetRapActionType::Move, demand)]));

    let items = fixture.queue.ip_items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].action_type, ActionType::Move, "Should keep the planner's action type");

    fixture.network.add_link(direct("r1", 2, "r4", 3));
    fixture.queue.flush();
    assert_eq!(fixture.calculated_submissions().len(), 1);
}

#[test]
fn test_move_of_unknown_intent_is_dropped() {
    let fixture = Fixture::new(RecordingTransport::accept_all());
    fixture.network.add_link(direct("r1", 2, "r4", 2));
    let intent = client_intent(0x15);

    let mut demand = intent_to_demand(&intent, &RouteStore::new());
    demand.route = Some(route(1, vec![planner_link("r1", 2, "r4", 2)]));
    fixture.reconciler.handle_intent_response(None, &actions_body(vec![(NetRapActionType::Move, demand)]));

    assert!(fixture.calculated_submissions().is_empty());
    assert!(fixture.queue.ip_items().is_empty());
}

#[test]
fn test_route_on_optical_layer_is_ignored() {
    let fixture = Fixture::new(RecordingTransport::accept_all());
    let intent = client_intent(0x13);
    fixture.submit(&intent);

    let mut demand = intent_to_demand(&intent, &RouteStore::new());
    demand.route = Some(route(0, vec![planner_link("r1", 2, "r4", 2)]));
    fixture.reconciler.handle_intent_response(None, &actions_body(vec![(NetRapActionType::Route, demand)]));

    assert!(fixture.calculated_submissions().is_empty());
    assert!(fixture.reconciler.routes().route(&intent.key).is_none());
}

#[test]
fn test_fail_drops_stored_routes() {
    let fixture = Fixture::new(RecordingTransport::accept_all());
    let intent = client_intent(0x14);
    fixture.submit(&intent);
    fixture.reconciler.routes().set_route(&intent.key, &route(1, vec![planner_link("r1", 2, "r4", 2)]));

    let demand = intent_to_demand(&intent, &RouteStore::new());
    fixture.reconciler.handle_intent_response(None, &actions_body(vec![(NetRapActionType::Fail, demand)]));

    assert!(fixture.reconciler.routes().route(&intent.key).is_none(), "Should drop the route of a failed intent");
    assert!(!fixture.reconciler.is_handled(&intent.key));
}

#[test]
fn test_new_action_queues_optical_intents_one_at_a_time() {
    let fixture = Fixture::new(RecordingTransport::accept_all());
    fixture.network.add_link(Link::new(ConnectPoint::new("otn1", 2), ConnectPoint::new("roadm1", 1), LinkType::Optical));
    fixture.network.add_link(Link::new(ConnectPoint::new("roadm1", 2), ConnectPoint::new("otn2", 2), LinkType::Optical));

    let lightpath = route(0, vec![planner_link("otn1", 2, "roadm1", 1), planner_link("roadm1", 2, "otn2", 2)]);
    let mut demand = intent_to_demand(&client_intent(0x20), &RouteStore::new());
    demand.route = Some(lightpath);
    demand.offered_traffic = Some(10.0);
    let body = actions_body(vec![(NetRapActionType::New, demand.clone()), (NetRapActionType::New, demand)]);
    fixture.reconciler.handle_intent_response(None, &body);

    let submitted = fixture.intents.submissions();
    assert_eq!(submitted.len(), 1, "Should submit only the head optical intent");
    let optical = &submitted[0];
    assert_eq!(optical.app_id, netrap_app());
    assert_eq!(optical.src, ConnectPoint::new("otn1", 1), "Should start at the transponder client port");
    assert_eq!(optical.dst, ConnectPoint::new("otn2", 1));
    assert!(optical.calculated);
    assert_eq!(fixture.queue.optical_items().len(), 2);

    // An installed optical intent is offered back to the planner, which
    // releases the next one.
    fixture.reconciler.update_intents(optical);
    fixture.reconciler.flush();
    assert_eq!(fixture.intents.submissions().len(), 2);
    assert_eq!(fixture.transport.count(XrapMethod::Post, "/demand/list"), 1, "Should send both directions as a list");
}

#[test]
fn test_update_is_sent_once_while_in_flight() {
    let fixture = Fixture::new(RecordingTransport::accept_all());
    let intent = client_intent(0x30);
    fixture.submit(&intent);

    fixture.reconciler.update_intents(&intent);
    fixture.reconciler.update_intents(&intent);
    fixture.reconciler.flush();

    assert_eq!(fixture.transport.count(XrapMethod::Post, "/demand"), 1);
    assert!(fixture.reconciler.is_handled(&intent.key));
}

#[test]
fn test_unanswered_update_can_be_retried() {
    let fixture = Fixture::new(RecordingTransport::unreachable());
    let intent = client_intent(0x31);
    fixture.submit(&intent);

    fixture.reconciler.update_intents(&intent);
    fixture.reconciler.flush();
    assert!(!fixture.reconciler.is_handled(&intent.key), "Should forget keys the planner never answered");

    fixture.transport.respond_with(|request| Ok(planner_mock::accepting_reply(request)));
    fixture.reconciler.update_intents(&intent);
    fixture.reconciler.flush();
    assert_eq!(fixture.transport.count(XrapMethod::Post, "/demand"), 2);
}

#[test]
fn test_delete_withdraws_demand_and_routes() {
    let fixture = Fixture::new(RecordingTransport::accept_all());
    let intent = client_intent(0x40);
    fixture.reconciler.routes().set_route(&intent.key, &route(1, Vec::new()));

    fixture.reconciler.delete_intent(&intent);
    fixture.reconciler.flush();

    assert_eq!(fixture.transport.resources(), vec!["DELETE /demand/0x40"]);
    assert!(fixture.reconciler.routes().route(&intent.key).is_none());
}

#[test]
fn test_demands_skip_withdrawn_intents_and_mirror_optical_ones() {
    let fixture = Fixture::new(RecordingTransport::accept_all());
    let live = client_intent(0x50);
    let withdrawn = client_intent(0x51);
    let optical = PathIntent::new(netrap_app(), IntentKey::of_long(0x52, netrap_app()), ConnectPoint::new("otn1", 1), ConnectPoint::new("otn2", 1), 100);
    for intent in [&live, &withdrawn, &optical] {
        fixture.submit(intent);
    }
    fixture.intents.withdraw(&withdrawn);
    fixture.reconciler.routes().set_route(&optical.key, &route(0, vec![planner_link("a", 1, "b", 1), planner_link("b", 2, "c", 1)]));

    let demands = fixture.reconciler.get_demands().unwrap();
    assert_eq!(demands.len(), 3, "Should skip withdrawn intents and add reverse optical demands");
    let reverse = &demands[2];
    assert_eq!(reverse.ingress_node.device, "otn2");
    let reversed_route = reverse.route.as_ref().unwrap();
    assert_eq!(reversed_route.links[0].src, "b", "Should reverse the stored route");
    assert_eq!(reversed_route.reversed(), fixture.reconciler.routes().route(&optical.key).unwrap());
}

#[test]
fn test_failed_calculated_intent_is_offered_without_path() {
    let fixture = Fixture::new(RecordingTransport::accept_all());
    let mut intent = client_intent(0x60);
    intent.calculated = true;
    fixture.submit(&intent);
    fixture.intents.set_state(&intent.key, IntentState::Failed);
    fixture.reconciler.routes().set_route(&intent.key, &route(1, Vec::new()));

    let demands = fixture.reconciler.get_demands().unwrap();
    assert_eq!(demands.len(), 1);
    assert!(demands[0].route.is_none(), "Should drop the route of a failed intent");
    assert!(fixture.reconciler.routes().route(&intent.key).is_none());
}

#[test]
fn test_unavailable_intent_service_yields_no_demands() {
    let fixture = Fixture::new(RecordingTransport::accept_all());
    fixture.intents.set_available(false);

    assert!(fixture.reconciler.get_demands().is_err());
    assert!(!fixture.reconciler.send_intents(None), "Should not send anything without intents");
    assert!(fixture.transport.requests().is_empty());
}

#[test]
fn test_reopt_applies_planner_actions() {
    let fixture = Fixture::new(RecordingTransport::accept_all());
    fixture.network.add_link(direct("r1", 2, "r4", 2));
    let intent = client_intent(0x70);
    fixture.submit(&intent);

    let mut demand = intent_to_demand(&intent, &RouteStore::new());
    demand.route = Some(route(1, vec![planner_link("r1", 2, "r4", 2)]));
    let body = actions_body(vec![(NetRapActionType::Route, demand)]);
    fixture.transport.respond_with(move |_| Ok(post_reply(body.clone())));

    assert!(fixture.reconciler.network_reopt());
    assert_eq!(fixture.transport.resources(), vec!["POST /demand/reopt"]);
    assert_eq!(fixture.calculated_submissions().len(), 1);
}

#[test]
fn test_intents_resource_serves_demands() {
    use netrap_dismi::domain::netrap::xrap::XrapResource;

    let fixture = Fixture::new(RecordingTransport::accept_all());
    fixture.submit(&client_intent(0x80));

    let reply = fixture.reconciler.handle(&XrapRequest::get("/intents/"));
    assert_eq!(reply.status_code(), 200);
    let body = String::from_utf8(reply.body().unwrap().to_vec()).unwrap();
    assert!(body.contains("\"key\":\"0x80\""));
}
