use std::sync::Arc;

use netrap_dismi::config::{Directionality, EndpointModel};
use netrap_dismi::domain::dismi::aci_store::AciStore;
use netrap_dismi::domain::dismi::constraint_compiler::SelectionLevels;
use netrap_dismi::domain::dismi::decomposer::{Primitives, decompose_action};
use netrap_dismi::domain::dismi::dismi_store::DismiStore;
use netrap_dismi::domain::dismi::intent_compiler::IntentCompiler;
use netrap_dismi::domain::dismi::intent_decomposer_manager::{IntentDecomposerManager, arrange_constraints};
use netrap_dismi::domain::dismi::model::{
    AbstractConstraint, Action, Aggregate, Connection, DismiIntent, Mesh, Multicast, Path, ServiceAction, Subject, Tree,
};
use netrap_dismi::domain::dismi::service_decomposer::ServiceDecomposerRegistry;
use netrap_dismi::domain::dismi::tracker::{ErrorType, Tracker};
use netrap_dismi::domain::network::in_memory::{InMemoryIntentService, InMemoryNetwork};
use netrap_dismi::domain::network::model::ApplicationId;

fn subjects(names: &[&str]) -> Vec<Subject> {
    names.iter().map(|n| Subject::new(*n)).collect()
}

fn count(action: &Action, directionality: Directionality) -> usize {
    let mut tracker = Tracker::new();
    let primitives = decompose_action(action, directionality, &mut tracker).expect("Should decompose");
    assert!(tracker.is_valid());
    primitives.len()
}

fn manager(directionality: Directionality) -> IntentDecomposerManager {
    let intents = Arc::new(InMemoryIntentService::new());
    let levels = SelectionLevels { bw_level: 0, delay_level: 0, security_level: 0 };
    let compiler = IntentCompiler::new(intents.clone(), Arc::new(InMemoryNetwork::new()), EndpointModel::ConnectPoint, 100, levels);
    IntentDecomposerManager::new(
        ApplicationId::new(2, "org.onosproject.orchestrator.dismi"),
        directionality,
        DismiStore::new(),
        AciStore::new(),
        compiler,
        intents,
        Arc::new(ServiceDecomposerRegistry::new()),
    )
}

#[test]
fn test_mesh_of_four() {
    let action = Action::Mesh(Mesh { sources: subjects(&["a", "b", "c", "d"]) });

    assert_eq!(count(&action, Directionality::Bidirectional), 6, "Should connect every pair once");
    assert_eq!(count(&action, Directionality::Unidirectional), 12, "Should expand every pair both ways");
}

#[test]
fn test_tree_with_three_leaves() {
    let s = subjects(&["root", "x", "y", "z"]);
    let action = Action::Tree(Tree { source: s[0].clone(), destinations: s[1..].to_vec() });

    assert_eq!(count(&action, Directionality::Bidirectional), 3);
    assert_eq!(count(&action, Directionality::Unidirectional), 6);
}

#[test]
fn test_multicast_and_aggregate() {
    let s = subjects(&["hub", "x", "y"]);
    let multicast = Action::Multicast(Multicast { source: s[0].clone(), destinations: s[1..].to_vec() });
    let aggregate = Action::Aggregate(Aggregate { sources: s[1..].to_vec(), destination: s[0].clone() });

    let mut tracker = Tracker::new();
    let Some(Primitives::Paths(paths)) = decompose_action(&multicast, Directionality::Unidirectional, &mut tracker) else {
        panic!("Should decompose multicast into paths");
    };
    assert_eq!(paths.len(), 2, "Should only go from the source outward");
    assert!(paths.iter().all(|p| p.source.connection_point.as_str() == "hub"));

    let Some(Primitives::Paths(paths)) = decompose_action(&aggregate, Directionality::Unidirectional, &mut tracker) else {
        panic!("Should decompose aggregate into paths");
    };
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| p.destination.connection_point.as_str() == "hub"));

    assert_eq!(count(&multicast, Directionality::Bidirectional), 2);
    assert_eq!(count(&aggregate, Directionality::Bidirectional), 2);
}

#[test]
fn test_duplicate_subjects_yield_one_primitive() {
    let s = subjects(&["hub", "x", "x"]);
    let multicast = Action::Multicast(Multicast { source: s[0].clone(), destinations: s[1..].to_vec() });

    assert_eq!(count(&multicast, Directionality::Unidirectional), 1, "Should drop repeated paths");
}

#[test]
fn test_path_and_connection_in_both_modes() {
    let s = subjects(&["a", "b"]);
    let path = Action::Path(Path { source: s[0].clone(), destination: s[1].clone() });
    let connection = Action::Connection(Connection { source: s[0].clone(), destination: s[1].clone() });

    assert_eq!(count(&path, Directionality::Unidirectional), 1);
    assert_eq!(count(&path, Directionality::Bidirectional), 1);
    assert_eq!(count(&connection, Directionality::Unidirectional), 2);
    assert_eq!(count(&connection, Directionality::Bidirectional), 1);
}

#[test]
fn test_service_action_has_no_decomposer() {
    let s = subjects(&["a", "b"]);
    let action = Action::Sdwan(ServiceAction { source: s[0].clone(), destination: s[1].clone() });

    let mut tracker = Tracker::new();
    assert!(decompose_action(&action, Directionality::Bidirectional, &mut tracker).is_none());
    assert!(tracker.has_issue(ErrorType::NoDecomposer), "Should report the missing decomposer");
    assert!(!tracker.is_valid());
}

#[test]
fn test_generic_intents_are_numbered_from_one() {
    let s = subjects(&["a", "b", "c"]);
    let mut intent = DismiIntent::new("svc-mesh", Action::Mesh(Mesh { sources: s }));
    intent.priority = Some(42);

    let mut tracker = Tracker::new();
    let generic = manager(Directionality::Unidirectional).generic_intents(&intent, &mut tracker).unwrap();

    assert_eq!(generic.len(), 6);
    assert_eq!(generic.iter().map(|g| g.intent_no).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
    assert!(generic.iter().all(|g| g.priority == Some(42) && g.intent_id == intent.intent_id));
}

#[test]
fn test_connections_become_single_generic_paths() {
    let s = subjects(&["a", "b"]);
    let intent = DismiIntent::new("svc-conn", Action::Connection(Connection { source: s[0].clone(), destination: s[1].clone() }));

    let mut tracker = Tracker::new();
    let generic = manager(Directionality::Bidirectional).generic_intents(&intent, &mut tracker).unwrap();

    assert_eq!(generic.len(), 1);
    assert_eq!(generic[0].path.source, s[0]);
    assert_eq!(generic[0].path.destination, s[1]);
}

#[test]
fn test_constraints_move_to_the_right_subjects() {
    let s = subjects(&["a", "b"]);
    let bandwidth = AbstractConstraint::Bandwidth("10mbps".to_string());

    let mut path = DismiIntent::new("svc-path", Action::Path(Path { source: s[0].clone(), destination: s[1].clone() }));
    path.constraints.push(bandwidth.clone());
    let arranged = arrange_constraints(&path);
    let Action::Path(p) = &arranged.action else {
        panic!("Should keep the action shape");
    };
    assert_eq!(p.source.constraints, vec![bandwidth.clone()], "Should constrain the path source");
    assert!(p.destination.constraints.is_empty());
    assert!(arranged.constraints.is_empty(), "Should clear intent level constraints");

    let mut connection = DismiIntent::new("svc-conn", Action::Connection(Connection { source: s[0].clone(), destination: s[1].clone() }));
    connection.constraints.push(bandwidth.clone());
    let arranged = arrange_constraints(&connection);
    assert!(arranged.action.subjects().iter().all(|s| s.constraints == vec![bandwidth.clone()]));
}
