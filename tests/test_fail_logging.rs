mod planner_mock;

use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

use netrap_dismi::api::netrap_dto::NetRapActionType;
use netrap_dismi::domain::netrap::demand_translation::intent_to_demand;
use netrap_dismi::domain::netrap::intent_reconciler::IntentReconciler;
use netrap_dismi::domain::netrap::planner::PlannerService;
use netrap_dismi::domain::netrap::registry::Registry;
use netrap_dismi::domain::netrap::route_store::RouteStore;
use netrap_dismi::domain::netrap::transaction_queue::TransactionQueue;
use netrap_dismi::domain::network::in_memory::{InMemoryIntentService, InMemoryNetwork};
use netrap_dismi::domain::network::model::{ApplicationId, ConnectPoint, IntentKey, PathIntent};
use planner_mock::{RecordingTransport, actions_body};

#[test]
fn test_fail_for_unknown_intent_is_logged() {
    let mut logger = logtest::Logger::start();

    let runtime = Runtime::new().unwrap();
    let network = InMemoryNetwork::new();
    let intents = Arc::new(InMemoryIntentService::new());
    let registry = Arc::new(Registry::new(runtime.handle().clone(), Duration::from_millis(10)));
    let planner = Arc::new(PlannerService::new(Arc::new(RecordingTransport::accept_all()), registry));
    let queue = Arc::new(TransactionQueue::new(
        intents.clone(),
        Arc::new(network.clone()),
        runtime.handle().clone(),
        Duration::from_secs(5),
    ));
    let netrap = ApplicationId::new(1, "org.onosproject.orchestrator.netrap");
    let reconciler = IntentReconciler::new(netrap, 100, intents, Arc::new(network), planner, queue, RouteStore::new());

    let dismi = ApplicationId::new(2, "org.onosproject.orchestrator.dismi");
    let unknown = PathIntent::new(dismi.clone(), IntentKey::of_long(0x99, dismi), ConnectPoint::new("r1", 1), ConnectPoint::new("r2", 1), 100);
    let demand = intent_to_demand(&unknown, &RouteStore::new());
    reconciler.handle_intent_response(None, &actions_body(vec![(NetRapActionType::Fail, demand)]));

    let mut found = false;
    while let Some(record) = logger.pop() {
        if record.args().starts_with("Could not find intent for key: 0x99") {
            assert_eq!(record.level(), log::Level::Error);
            found = true;
        }
    }
    assert!(found, "Should log an error for a failed intent that is not known");
}
