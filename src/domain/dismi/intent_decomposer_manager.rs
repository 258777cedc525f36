use std::sync::Arc;

use crate::config::Directionality;
use crate::domain::dismi::abstraction_link::{AbstractionLink, AbstractionLinkList, create_all_endpoint_combinations, remove_link};
use crate::domain::dismi::aci_store::AciStore;
use crate::domain::dismi::decomposer::{Primitives, decompose_action};
use crate::domain::dismi::dismi_store::DismiStore;
use crate::domain::dismi::intent_compiler::IntentCompiler;
use crate::domain::dismi::intent_fsm::IntentStateEvent;
use crate::domain::dismi::model::{Action, DismiIntent, DismiService, Endpoint, GenericDismiIntent, OperationType, Path, Subject};
use crate::domain::dismi::service_decomposer::ServiceDecomposerRegistry;
use crate::domain::dismi::tracker::Tracker;
use crate::domain::network::model::{ApplicationId, IntentKey};
use crate::domain::network::services::IntentService;
use crate::domain::utils::id::DismiIntentId;
use crate::domain::utils::statistics::ANALYTICS_TARGET;

/// Provider key of the `intent_no`-th decomposed path of a client intent.
pub fn generic_intent_key(dismi_id: &DismiIntentId, intent_no: u32, app_id: &ApplicationId) -> IntentKey {
    IntentKey::of_str(format!("{}-{}", dismi_id, intent_no), app_id.clone())
}

/// Copies intent level constraints onto the subjects that carry them for the
/// action shape, then clears them on the intent.
pub fn arrange_constraints(intent: &DismiIntent) -> DismiIntent {
    let mut arranged = intent.clone();
    let constraints = std::mem::take(&mut arranged.constraints);
    if constraints.is_empty() {
        return arranged;
    }

    let targets: Vec<&mut Subject> = match &mut arranged.action {
        Action::Path(p) => vec![&mut p.source],
        Action::Aggregate(a) => a.sources.iter_mut().collect(),
        other => other.subjects_mut(),
    };
    for subject in targets {
        subject.add_constraints(&constraints);
    }
    arranged
}

/// Drives client intents from decomposition to provider submission.
pub struct IntentDecomposerManager {
    app_id: ApplicationId,
    directionality: Directionality,
    dismi_store: DismiStore,
    aci_store: AciStore,
    compiler: IntentCompiler,
    intent_service: Arc<dyn IntentService>,
    service_decomposers: Arc<ServiceDecomposerRegistry>,
}

impl IntentDecomposerManager {
    pub fn new(
        app_id: ApplicationId,
        directionality: Directionality,
        dismi_store: DismiStore,
        aci_store: AciStore,
        compiler: IntentCompiler,
        intent_service: Arc<dyn IntentService>,
        service_decomposers: Arc<ServiceDecomposerRegistry>,
    ) -> Self {
        Self { app_id, directionality, dismi_store, aci_store, compiler, intent_service, service_decomposers }
    }

    pub fn app_id(&self) -> &ApplicationId {
        &self.app_id
    }

    pub fn service_decomposers(&self) -> &Arc<ServiceDecomposerRegistry> {
        &self.service_decomposers
    }

    /// Runs `operation` for every intent of `service`.
    pub fn perform_action(&self, service: &DismiService, tracker: &mut Tracker, operation: OperationType) {
        for intent in &service.intents {
            if operation != OperationType::Delete {
                self.dismi_store.change_intent_state(&intent.intent_id, IntentStateEvent::SubmitForCompilation);
            }
            self.decompose(intent, tracker, operation);
        }
    }

    /// Decomposes one client intent and executes `operation` on the result.
    ///
    /// # Returns
    /// Returns the intent as decomposed (constraints moved onto subjects), or
    /// None if decomposition failed.
    pub fn decompose(&self, intent: &DismiIntent, tracker: &mut Tracker, operation: OperationType) -> Option<DismiIntent> {
        if operation == OperationType::Delete {
            self.delete_intent(intent);
            return Some(intent.clone());
        }

        let arranged = arrange_constraints(intent);

        if arranged.action.is_service() {
            self.execute_service_intents(&arranged, operation);
            return Some(arranged);
        }

        log::debug!("Intent {} received for decomposition.", arranged.intent_id);
        let Some(generic) = self.generic_intents(&arranged, tracker) else {
            self.dismi_store.change_intent_state(&arranged.intent_id, IntentStateEvent::CompilationFailure);
            return None;
        };
        log::info!("Intent {} decomposed into {} generic intents.", arranged.intent_id, generic.len());

        self.dismi_store.change_intent_state(&arranged.intent_id, IntentStateEvent::CompilationSuccess);
        self.execute_generic_intents(&arranged, &generic, operation);
        Some(arranged)
    }

    /// Elementary paths of `intent`, numbered from 1. Connections are turned
    /// into paths carrying the same two subjects.
    pub fn generic_intents(&self, intent: &DismiIntent, tracker: &mut Tracker) -> Option<Vec<GenericDismiIntent>> {
        let paths = match decompose_action(&intent.action, self.directionality, tracker)? {
            Primitives::Paths(paths) => paths,
            Primitives::Connections(connections) => {
                connections.into_iter().map(|c| Path { source: c.source, destination: c.destination }).collect()
            }
        };

        let generic = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| GenericDismiIntent {
                intent_no: i as u32 + 1,
                intent_id: intent.intent_id.clone(),
                path,
                constraints: Vec::new(),
                selectors: intent.selectors.clone(),
                is_negotiable: intent.is_negotiable,
                display_name: intent.display_name.clone(),
                priority: intent.priority,
            })
            .collect();
        Some(generic)
    }

    fn endpoint_in_use(&self, used: &[Endpoint], link: &AbstractionLink) -> bool {
        match self.directionality {
            Directionality::Bidirectional => used.contains(&link.src) || used.contains(&link.dst),
            Directionality::Unidirectional => used.contains(&link.dst),
        }
    }

    fn mark_used(&self, used: &mut Vec<Endpoint>, link: &AbstractionLink) {
        if self.directionality == Directionality::Bidirectional {
            used.push(link.src.clone());
        }
        used.push(link.dst.clone());
    }

    fn installation_failed(&self, intent: &DismiIntent, generic: &GenericDismiIntent, tried: usize) {
        log::error!(
            "No candidate of intent {} (path {}) could be mapped onto the network. Check that its connection points are attached.",
            intent.intent_id,
            generic.intent_no
        );
        tracing::warn!(
            target: ANALYTICS_TARGET,
            LogDescription = "Candidates exhausted",
            IntentId = %intent.intent_id,
            PathNo = generic.intent_no,
            TriedCandidates = tried,
        );
        self.dismi_store.change_intent_state(&intent.intent_id, IntentStateEvent::InstallationFailure);
    }

    /// Submits (create) or replaces (update) the provider intents of every
    /// decomposed path, trying candidates in order.
    pub fn execute_generic_intents(&self, intent: &DismiIntent, generic: &[GenericDismiIntent], operation: OperationType) {
        let dismi_id = &intent.intent_id;
        let mut used: Vec<Endpoint> = Vec::new();

        for path in generic {
            let mut links = create_all_endpoint_combinations(&path.path);
            let key = generic_intent_key(dismi_id, path.intent_no, &self.app_id);

            self.dismi_store.change_intent_state(dismi_id, IntentStateEvent::SubmitForInstallation);

            match operation {
                OperationType::Create => self.create_path(intent, path, &key, &mut links, &mut used),
                OperationType::Update => self.update_path(intent, path, &key, &mut links),
                OperationType::Delete => {
                    if self.aci_store.contains_key(dismi_id, &key) {
                        self.compiler.delete_path_intent(&key);
                    } else {
                        log::error!("No provider key {} registered for deletion.", key);
                    }
                }
            }
        }
    }

    fn create_path(&self, intent: &DismiIntent, path: &GenericDismiIntent, key: &IntentKey, links: &mut AbstractionLinkList, used: &mut Vec<Endpoint>) {
        let candidates = links.clone();
        log::info!("Intent {} path {} has {} candidates.", intent.intent_id, path.intent_no, candidates.len());

        let mut result = false;
        let mut tried = 0;
        for link in &candidates {
            if result {
                break;
            }
            if self.endpoint_in_use(used, link) {
                continue;
            }

            remove_link(links, link);
            self.aci_store.update_abstract_link_list(&intent.intent_id, key, Some(links.clone()));
            tried += 1;

            result = self.compiler.submit_path_intent(path, self.app_id.clone(), key.clone(), link);
            // Several candidates mean the same connection points are shared across paths.
            if result && candidates.len() > 1 {
                self.mark_used(used, link);
            }
        }

        if !result {
            self.installation_failed(intent, path, tried);
        }
        log::info!("Create of {} completed, submitted: {}.", key, result);
    }

    fn update_path(&self, intent: &DismiIntent, path: &GenericDismiIntent, key: &IntentKey, links: &mut AbstractionLinkList) {
        let registered = self.aci_store.contains_key(&intent.intent_id, key);
        if links.is_empty() {
            self.installation_failed(intent, path, 0);
            return;
        }

        let attempt = |link: &AbstractionLink| {
            if registered {
                self.compiler.update_path_intent(path, key, link)
            } else {
                self.compiler.submit_path_intent(path, self.app_id.clone(), key.clone(), link)
            }
        };

        let head = links.remove(0);
        let mut result = attempt(&head);

        if path.is_negotiable {
            // Negotiation continues through provider events.
            log::info!("Negotiable intent {} update result: {}.", key, result);
            if !registered {
                self.aci_store.update_abstract_link_list(&intent.intent_id, key, Some(links.clone()));
            }
            return;
        }

        let mut tried_other = false;
        let mut tried = 1;
        while !result && !links.is_empty() {
            let next = links.remove(0);
            tried_other = true;
            tried += 1;
            result = attempt(&next);
        }

        if !result && links.is_empty() {
            self.installation_failed(intent, path, tried);
        }
        if tried_other || !registered {
            self.aci_store.update_abstract_link_list(&intent.intent_id, key, Some(links.clone()));
        }
    }

    /// Withdraws every provider intent registered for `intent`.
    pub fn delete_intent(&self, intent: &DismiIntent) {
        self.dismi_store.change_intent_state(&intent.intent_id, IntentStateEvent::WithdrawalRequest);
        self.dismi_store.change_intent_state(&intent.intent_id, IntentStateEvent::SubmitForWithdrawal);

        let keys = self.aci_store.get_keys(&intent.intent_id);
        if keys.is_empty() {
            log::error!("No provider intents registered for {}.", intent.intent_id);
            return;
        }
        for status in keys {
            match self.intent_service.get_intent(&status.key) {
                Some(installed) => self.intent_service.withdraw(&installed),
                None => log::warn!("Provider intent {} of {} is already gone.", status.key, intent.intent_id),
            }
        }
        log::info!("Delete of {} completed.", intent.intent_id);
    }

    /// Hands a service action to its registered service decomposer.
    pub fn execute_service_intents(&self, intent: &DismiIntent, operation: OperationType) {
        let dismi_id = &intent.intent_id;
        log::info!("Service intent {} of {}, operation {:?}.", dismi_id, self.app_id.name, operation);

        self.dismi_store.change_intent_state(dismi_id, IntentStateEvent::CompilationSuccess);

        let Some(decomposer) = self.service_decomposers.get(intent.action.kind()) else {
            log::error!("Decomposition of {} actions is not supported.", intent.action.kind());
            self.dismi_store.change_intent_state(dismi_id, IntentStateEvent::InstallationFailure);
            return;
        };

        match operation {
            OperationType::Create => {
                let Some(service) = intent.action.service_action() else {
                    return;
                };
                let mut links =
                    create_all_endpoint_combinations(&Path { source: service.source.clone(), destination: service.destination.clone() });
                if links.is_empty() {
                    log::error!("Service intent {} has no candidate endpoints.", dismi_id);
                    self.dismi_store.change_intent_state(dismi_id, IntentStateEvent::InstallationFailure);
                    return;
                }
                let link = links.remove(0);

                let Some(offered) = decomposer.service_provider_intents(intent, &self.app_id, &link) else {
                    log::error!("No provider intents could be built for {}.", dismi_id);
                    self.dismi_store.change_intent_state(dismi_id, IntentStateEvent::InstallationFailure);
                    return;
                };
                self.dismi_store.change_intent_state(dismi_id, IntentStateEvent::SubmitForInstallation);
                for provider_intent in offered {
                    if let Err(e) = self.intent_service.submit(provider_intent) {
                        log::error!("Submission of service intent {} failed: {}", dismi_id, e);
                    }
                }
            }
            OperationType::Update => {
                let Some(selected) = decomposer.selected_intent(intent, &self.app_id) else {
                    log::error!("No selected provider intent for {}.", dismi_id);
                    return;
                };
                self.dismi_store.change_intent_state(dismi_id, IntentStateEvent::SubmitForInstallation);
                match self.intent_service.submit(selected) {
                    Ok(()) => log::info!("Service intent {} updated.", dismi_id),
                    Err(e) => log::error!("Update of service intent {} failed: {}", dismi_id, e),
                }
            }
            OperationType::Delete => self.delete_intent(intent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dismi::model::{AbstractConstraint, Aggregate, Connection};

    #[test]
    fn intent_constraints_move_onto_subjects() {
        let action = Action::Connection(Connection { source: Subject::new("a"), destination: Subject::new("b") });
        let mut intent = DismiIntent::new("svc-1", action);
        intent.constraints.push(AbstractConstraint::Bandwidth("10mbps".into()));

        let arranged = arrange_constraints(&intent);
        assert!(arranged.constraints.is_empty(), "Should clear intent level constraints");
        for s in arranged.action.subjects() {
            assert_eq!(s.constraints, vec![AbstractConstraint::Bandwidth("10mbps".into())]);
        }
    }

    #[test]
    fn aggregate_constraints_stay_on_sources() {
        let action = Action::Aggregate(Aggregate { sources: vec![Subject::new("a"), Subject::new("b")], destination: Subject::new("c") });
        let mut intent = DismiIntent::new("svc-1", action);
        intent.constraints.push(AbstractConstraint::Delay("5ms".into()));

        let arranged = arrange_constraints(&intent);
        let Action::Aggregate(a) = &arranged.action else { unreachable!() };
        assert!(a.sources.iter().all(|s| s.constraints.len() == 1));
        assert!(a.destination.constraints.is_empty());
    }

    #[test]
    fn key_is_intent_id_and_number() {
        let key = generic_intent_key(&DismiIntentId::new("svc-1"), 3, &ApplicationId::new(1, "dismi"));
        assert_eq!(key.to_string(), "svc-1-3");
    }
}
