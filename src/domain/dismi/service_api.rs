use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::dismi::dismi_store::DismiStore;
use crate::domain::dismi::endpoint_store::ConnectionPointStore;
use crate::domain::dismi::intent_decomposer_manager::IntentDecomposerManager;
use crate::domain::dismi::intent_fsm::{IntentStateEvent, IntentStateMachine, UserState};
use crate::domain::dismi::model::{DismiIntent, DismiService, Endpoint, OperationType};
use crate::domain::dismi::subject_resolver::SubjectResolver;
use crate::domain::dismi::tracker::{Issue, Tracker};
use crate::domain::utils::executor::SerialExecutor;
use crate::domain::utils::id::{ConnectionPointName, DismiIntentId, ServiceId};

fn qualified_intent_id(service_id: &ServiceId, intent_id: &DismiIntentId) -> DismiIntentId {
    let prefix = format!("{}-", service_id);
    if intent_id.as_str().starts_with(&prefix) {
        intent_id.clone()
    } else {
        DismiIntentId::new(format!("{}{}", prefix, intent_id))
    }
}

fn qualify_intents(service: &mut DismiService) {
    for intent in service.intents.iter_mut() {
        intent.intent_id = qualified_intent_id(&service.service_id, &intent.intent_id);
    }
}

/// Background validation and decomposition of one request.
#[derive(Clone)]
struct ServiceTask {
    dismi_store: DismiStore,
    resolver: SubjectResolver,
    manager: Arc<IntentDecomposerManager>,
    trackers: Arc<RwLock<HashMap<ServiceId, Tracker>>>,
}

impl ServiceTask {
    fn run(&self, service_id: &ServiceId, intent_ids: &[DismiIntentId], operation: OperationType) {
        let Some(stored) = self.dismi_store.get_service(service_id) else {
            log::error!("Service {} disappeared before it could be processed.", service_id);
            return;
        };

        let mut tracker = Tracker::new();
        let intents: Vec<DismiIntent> = match operation {
            OperationType::Delete => stored.intents.iter().filter(|i| intent_ids.contains(&i.intent_id)).cloned().collect(),
            _ => intent_ids.iter().filter_map(|id| self.validate(id, &mut tracker)).collect(),
        };

        if intents.is_empty() {
            log::warn!("Nothing left to {:?} in service {}.", operation, service_id);
        } else {
            let selected = DismiService { service_id: service_id.clone(), display_name: stored.display_name.clone(), intents };
            let mut decomposition = Tracker::new();
            self.manager.perform_action(&selected, &mut decomposition, operation);
            tracker.merge(decomposition);
        }

        for issue in tracker.issues() {
            log::info!("Service {}: {}", service_id, issue);
        }
        self.trackers.write().expect("RwLock poisoned").entry(service_id.clone()).or_default().merge(tracker);
    }

    /// Resolves the subjects of a stored intent and records the outcome on
    /// its state machine.
    ///
    /// # Returns
    /// Returns the resolved intent if validation succeeded.
    fn validate(&self, intent_id: &DismiIntentId, tracker: &mut Tracker) -> Option<DismiIntent> {
        let Some(mut intent) = self.dismi_store.get_intent(intent_id) else {
            log::error!("Intent {} is not stored, skipping validation.", intent_id);
            return None;
        };
        self.dismi_store.change_intent_state(intent_id, IntentStateEvent::SubmitForValidation);

        let mut intent_tracker = Tracker::new();
        let valid = self.resolver.resolve_action(&mut intent.action, &mut intent_tracker);
        tracker.merge(intent_tracker);

        if !valid {
            log::warn!("Validation of intent {} failed.", intent_id);
            self.dismi_store.change_intent_state(intent_id, IntentStateEvent::ValidationFailure);
            return None;
        }

        let resolved = intent.action.clone();
        self.dismi_store.update_intent(intent_id, |stored| stored.action = resolved);
        self.dismi_store.change_intent_state(intent_id, IntentStateEvent::ValidationSuccess);
        self.dismi_store.get_intent(intent_id)
    }
}

/// Client-facing entry points for services and connection points. Requests
/// are accepted synchronously; validation and decomposition run in the
/// background and their outcome is observed by polling the intent states.
pub struct ServiceApi {
    task: ServiceTask,
    connection_points: ConnectionPointStore,
    executor: SerialExecutor,
}

impl ServiceApi {
    pub fn new(dismi_store: DismiStore, manager: Arc<IntentDecomposerManager>, connection_points: ConnectionPointStore, enforce_unique: bool) -> Self {
        let resolver = SubjectResolver::new(Arc::new(connection_points.clone()), enforce_unique);
        Self {
            task: ServiceTask { dismi_store, resolver, manager, trackers: Arc::new(RwLock::new(HashMap::new())) },
            connection_points,
            executor: SerialExecutor::new("dismi-service"),
        }
    }

    fn spawn(&self, service_id: ServiceId, intent_ids: Vec<DismiIntentId>, operation: OperationType) {
        let task = self.task.clone();
        self.executor.execute(move || task.run(&service_id, &intent_ids, operation));
    }

    fn store(&self) -> &DismiStore {
        &self.task.dismi_store
    }

    /// Stores a new service and schedules its validation and installation.
    ///
    /// # Returns
    /// Returns the service id, or None if the id is empty or already taken.
    pub fn submit_new_service(&self, mut service: DismiService) -> Option<ServiceId> {
        if service.service_id.as_str().is_empty() {
            log::error!("Rejected service without id.");
            return None;
        }
        if self.store().get_service(&service.service_id).is_some() {
            log::error!("Service {} already exists.", service.service_id);
            return None;
        }

        qualify_intents(&mut service);
        for intent in service.intents.iter_mut() {
            intent.state = IntentStateMachine::default();
        }
        self.store().put_service(&service);

        let ids = service.intents.iter().map(|i| i.intent_id.clone()).collect();
        log::info!("Service {} accepted with {} intents.", service.service_id, service.intents.len());
        self.spawn(service.service_id.clone(), ids, OperationType::Create);
        Some(service.service_id)
    }

    /// Replaces the intents of an existing service. Intents missing from
    /// `service` are withdrawn.
    pub fn submit_service_update(&self, service_id: &ServiceId, mut service: DismiService) -> Option<ServiceId> {
        let Some(existing) = self.store().get_service(service_id) else {
            log::error!("Cannot update unknown service {}.", service_id);
            return None;
        };

        service.service_id = service_id.clone();
        qualify_intents(&mut service);
        for intent in service.intents.iter_mut() {
            intent.state = match existing.intent(&intent.intent_id) {
                Some(old) => {
                    let mut state = old.state.clone();
                    state.transition(IntentStateEvent::UpdateRequest);
                    state
                }
                None => IntentStateMachine::default(),
            };
        }

        let updated: Vec<DismiIntentId> = service.intents.iter().map(|i| i.intent_id.clone()).collect();
        let removed: Vec<DismiIntent> = existing.intents.into_iter().filter(|i| !updated.contains(&i.intent_id)).collect();
        let removed_ids: Vec<DismiIntentId> = removed.iter().map(|i| i.intent_id.clone()).collect();
        service.intents.extend(removed);
        self.store().put_service(&service);

        if !removed_ids.is_empty() {
            self.spawn(service_id.clone(), removed_ids, OperationType::Delete);
        }
        self.spawn(service_id.clone(), updated, OperationType::Update);
        Some(service_id.clone())
    }

    /// Replaces a single intent of a service.
    pub fn submit_intent_update(&self, service_id: &ServiceId, intent_id: &DismiIntentId, mut intent: DismiIntent) -> Option<DismiIntentId> {
        if !intent_id.as_str().starts_with(service_id.as_str()) {
            log::error!("Intent {} does not belong to service {}.", intent_id, service_id);
            return None;
        }
        let Some(existing) = self.store().get_intent(intent_id) else {
            log::error!("Cannot update unknown intent {} of service {}.", intent_id, service_id);
            return None;
        };

        intent.intent_id = intent_id.clone();
        intent.state = existing.state;
        intent.state.transition(IntentStateEvent::UpdateRequest);
        self.store().update_intent(intent_id, |stored| *stored = intent);

        self.spawn(service_id.clone(), vec![intent_id.clone()], OperationType::Update);
        Some(intent_id.clone())
    }

    /// Withdraws every intent of a service. The service stays queryable so
    /// clients can follow the withdrawal.
    ///
    /// # Returns
    /// Returns false if the service is unknown.
    pub fn delete_service(&self, service_id: &ServiceId) -> bool {
        let Some(service) = self.store().get_service(service_id) else {
            log::error!("Cannot delete unknown service {}.", service_id);
            return false;
        };
        let ids = service.intents.iter().map(|i| i.intent_id.clone()).collect();
        self.spawn(service_id.clone(), ids, OperationType::Delete);
        true
    }

    pub fn delete_intent(&self, service_id: &ServiceId, intent_id: &DismiIntentId) -> bool {
        if !intent_id.as_str().starts_with(service_id.as_str()) || self.store().get_intent(intent_id).is_none() {
            log::error!("Invalid intent {} of service {}.", intent_id, service_id);
            return false;
        }
        self.spawn(service_id.clone(), vec![intent_id.clone()], OperationType::Delete);
        true
    }

    pub fn get_service(&self, service_id: &ServiceId) -> Option<DismiService> {
        self.store().get_service(service_id)
    }

    pub fn list_services(&self) -> Vec<DismiService> {
        self.store().list_services()
    }

    pub fn intent_state(&self, intent_id: &DismiIntentId) -> UserState {
        self.store().user_state(intent_id)
    }

    /// # Returns
    /// Returns the user state of every intent of the service, empty if unknown.
    pub fn intent_states(&self, service_id: &ServiceId) -> Vec<(DismiIntentId, UserState)> {
        self.store()
            .get_service(service_id)
            .map(|s| s.intents.iter().map(|i| (i.intent_id.clone(), i.state.user_state())).collect())
            .unwrap_or_default()
    }

    /// Issues collected while processing the requests of a service.
    pub fn issues(&self, service_id: &ServiceId) -> Vec<Issue> {
        self.task.trackers.read().expect("RwLock poisoned").get(service_id).map(|t| t.issues().to_vec()).unwrap_or_default()
    }

    pub fn register_connection_point(&self, name: impl Into<String>, endpoints: Vec<Endpoint>) {
        self.connection_points.put(name, endpoints);
    }

    pub fn remove_connection_point(&self, name: &ConnectionPointName) -> bool {
        self.connection_points.remove(name).is_some()
    }

    pub fn connection_points(&self) -> Vec<ConnectionPointName> {
        self.connection_points.names()
    }

    /// Blocks until every request accepted so far has been processed.
    pub fn flush(&self) {
        self.executor.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_ids_are_qualified_once() {
        let service = ServiceId::new("svc");
        assert_eq!(qualified_intent_id(&service, &DismiIntentId::new("1")), DismiIntentId::new("svc-1"));
        assert_eq!(qualified_intent_id(&service, &DismiIntentId::new("svc-1")), DismiIntentId::new("svc-1"));
    }
}
