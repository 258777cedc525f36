use std::sync::{Arc, Mutex};

use crate::domain::dismi::intent_fsm::{IntentStateEvent, IntentStateMachine, UserState};
use crate::domain::dismi::model::{DismiIntent, DismiService};
use crate::domain::store::consistent_map::ConsistentMap;
use crate::domain::utils::id::{DismiIntentId, ServiceId};

/// Client services with their intents and lifecycle state.
#[derive(Debug, Clone)]
pub struct DismiStore {
    services: ConsistentMap<ServiceId, DismiService>,
    /// Serializes read-modify-write cycles on a service.
    write_lock: Arc<Mutex<()>>,
}

impl Default for DismiStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DismiStore {
    pub fn new() -> Self {
        Self { services: ConsistentMap::new("consistent-map-dismi-services"), write_lock: Arc::new(Mutex::new(())) }
    }

    pub fn put_service(&self, service: &DismiService) {
        let _guard = self.write_lock.lock().expect("Mutex poisoned");
        if let Err(e) = self.services.put(service.service_id.clone(), service) {
            log::error!("Failed to store service {}: {}", service.service_id, e);
        }
    }

    pub fn get_service(&self, service_id: &ServiceId) -> Option<DismiService> {
        self.services.get(service_id)
    }

    pub fn remove_service(&self, service_id: &ServiceId) -> Option<DismiService> {
        let _guard = self.write_lock.lock().expect("Mutex poisoned");
        self.services.remove(service_id)
    }

    pub fn list_services(&self) -> Vec<DismiService> {
        let mut services: Vec<DismiService> = self.services.entries().into_iter().map(|(_, s)| s).collect();
        services.sort_by(|a, b| a.service_id.cmp(&b.service_id));
        services
    }

    pub fn get_intent(&self, intent_id: &DismiIntentId) -> Option<DismiIntent> {
        let service_id = intent_id.service_id()?;
        self.get_service(&service_id)?.intent(intent_id).cloned()
    }

    /// Applies `f` to the stored intent and writes the service back.
    ///
    /// # Returns
    /// Returns the result of `f`, or None if the intent is unknown.
    pub fn update_intent<R>(&self, intent_id: &DismiIntentId, f: impl FnOnce(&mut DismiIntent) -> R) -> Option<R> {
        let service_id = intent_id.service_id()?;
        let _guard = self.write_lock.lock().expect("Mutex poisoned");
        let mut service = self.services.get(&service_id)?;
        let intent = service.intent_mut(intent_id)?;
        let result = f(intent);
        if let Err(e) = self.services.put(service_id, &service) {
            log::error!("Failed to store service of intent {}: {}", intent_id, e);
        }
        Some(result)
    }

    /// Applies `event` to the intent state machine if the transition is legal.
    ///
    /// # Returns
    /// Returns true if the state changed.
    pub fn change_intent_state(&self, intent_id: &DismiIntentId, event: IntentStateEvent) -> bool {
        match self.update_intent(intent_id, |intent| intent.state.transition(event)) {
            Some(changed) => changed,
            None => {
                log::error!("Cannot change state of unknown intent {}.", intent_id);
                false
            }
        }
    }

    pub fn can_change_state(&self, intent_id: &DismiIntentId, event: IntentStateEvent) -> bool {
        self.intent_state(intent_id).is_some_and(|s| s.can_transition(event))
    }

    pub fn intent_state(&self, intent_id: &DismiIntentId) -> Option<IntentStateMachine> {
        self.get_intent(intent_id).map(|i| i.state)
    }

    pub fn user_state(&self, intent_id: &DismiIntentId) -> UserState {
        self.intent_state(intent_id).map_or(UserState::Unknown, |s| s.user_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dismi::model::{Action, Path, Subject};

    fn service() -> DismiService {
        let action = Action::Path(Path { source: Subject::new("a"), destination: Subject::new("b") });
        DismiService { service_id: ServiceId::new("svc"), display_name: None, intents: vec![DismiIntent::new("svc-1", action)] }
    }

    #[test]
    fn state_changes_are_persisted() {
        let store = DismiStore::new();
        store.put_service(&service());
        let id = DismiIntentId::new("svc-1");

        assert!(store.change_intent_state(&id, IntentStateEvent::SubmitForValidation));
        assert!(!store.change_intent_state(&id, IntentStateEvent::InstallationSuccess), "Should refuse an illegal event");
        assert_eq!(store.user_state(&id), UserState::Processing);
        assert_eq!(store.user_state(&DismiIntentId::new("svc-9")), UserState::Unknown);
    }
}
