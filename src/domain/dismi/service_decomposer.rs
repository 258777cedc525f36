use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::dismi::abstraction_link::AbstractionLink;
use crate::domain::dismi::aci_store::AciStore;
use crate::domain::dismi::constraint_compiler::{SelectionLevels, compile_constraints};
use crate::domain::dismi::intent_compiler::IntentCompiler;
use crate::domain::dismi::model::{ActionKind, DismiIntent, Path};
use crate::domain::dismi::selector_compiler::compile_selector;
use crate::domain::network::model::{ApplicationId, IntentKey, IntentKind, PathIntent, TrafficSelector};
use crate::domain::network::services::IntentService;

/// Compiles a service action into the provider intents that may serve it.
pub trait ServiceDecomposer: Send + Sync {
    /// Provider intents offered for `intent` on `link`. They are recorded but not submitted.
    fn service_provider_intents(&self, intent: &DismiIntent, app_id: &ApplicationId, link: &AbstractionLink) -> Option<Vec<PathIntent>>;

    /// Keeps the provider intent the client picked, withdraws the others and
    /// returns the picked one rebuilt with current constraints.
    fn selected_intent(&self, intent: &DismiIntent, app_id: &ApplicationId) -> Option<PathIntent>;
}

/// Service decomposers by action kind.
#[derive(Default)]
pub struct ServiceDecomposerRegistry {
    decomposers: RwLock<HashMap<ActionKind, Arc<dyn ServiceDecomposer>>>,
}

impl ServiceDecomposerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: ActionKind, decomposer: Arc<dyn ServiceDecomposer>) {
        self.decomposers.write().expect("RwLock poisoned").insert(kind, decomposer);
    }

    pub fn unregister(&self, kind: ActionKind) {
        self.decomposers.write().expect("RwLock poisoned").remove(&kind);
    }

    pub fn get(&self, kind: ActionKind) -> Option<Arc<dyn ServiceDecomposer>> {
        self.decomposers.read().expect("RwLock poisoned").get(&kind).cloned()
    }
}

/// SD-WAN: the same site pair is offered through two providers; the client
/// later picks one of them.
pub struct SdwanDecomposer {
    aci_store: AciStore,
    compiler: IntentCompiler,
    intent_service: Arc<dyn IntentService>,
    levels: SelectionLevels,
}

impl SdwanDecomposer {
    pub fn new(aci_store: AciStore, compiler: IntentCompiler, intent_service: Arc<dyn IntentService>, levels: SelectionLevels) -> Self {
        Self { aci_store, compiler, intent_service, levels }
    }

    fn service_path(intent: &DismiIntent) -> Option<Path> {
        let action = intent.action.service_action()?;
        Some(Path { source: action.source.clone(), destination: action.destination.clone() })
    }

    fn intent_selector(intent: &DismiIntent) -> TrafficSelector {
        let mut compiled = Vec::new();
        for selector in &intent.selectors {
            match compile_selector(selector) {
                Some(Ok(t)) => compiled.push(t),
                Some(Err(e)) => log::error!("Skipping selector: {}", e),
                None => break,
            }
        }
        compiled.into_iter().next().unwrap_or_default()
    }
}

impl ServiceDecomposer for SdwanDecomposer {
    fn service_provider_intents(&self, intent: &DismiIntent, app_id: &ApplicationId, link: &AbstractionLink) -> Option<Vec<PathIntent>> {
        let path = Self::service_path(intent)?;
        let (src, dst) = self.compiler.attachments(link)?;

        let selector = Self::intent_selector(intent);
        let constraints = compile_constraints(&path, &intent.constraints, intent.is_negotiable, self.levels);
        let priority = intent.priority.unwrap_or(self.compiler.default_priority());

        let mut offered = Vec::with_capacity(2);
        for (n, kind) in [(1, IntentKind::ProviderOne), (2, IntentKind::ProviderTwo)] {
            let key = IntentKey::of_str(format!("{}-{}", intent.intent_id, n), app_id.clone());
            let mut provider_intent = PathIntent::new(app_id.clone(), key.clone(), src.clone(), dst.clone(), priority);
            provider_intent.kind = kind;
            provider_intent.selector = selector.clone();
            provider_intent.constraints = constraints.clone();

            self.aci_store.add_key_intent(key.clone(), &provider_intent);
            self.aci_store.update_abstract_link_list(&intent.intent_id, &key, None);
            offered.push(provider_intent);
        }
        Some(offered)
    }

    fn selected_intent(&self, intent: &DismiIntent, app_id: &ApplicationId) -> Option<PathIntent> {
        let Some(picked) = intent.service_provider_key.as_deref() else {
            log::error!("Intent {} does not name a provider key.", intent.intent_id);
            return None;
        };
        let selected_key = IntentKey::decode(picked, app_id.clone())?;

        let mut kept = Vec::new();
        for status in self.aci_store.get_keys(&intent.intent_id) {
            if status.key == selected_key {
                kept.push(status);
            } else if let Some(dropped) = self.aci_store.remove_intent_key(&status.key) {
                self.intent_service.withdraw(&dropped);
            }
        }
        self.aci_store.put(intent.intent_id.clone(), kept);

        let stored = self.aci_store.remove_intent_key(&selected_key)?;
        let path = Self::service_path(intent)?;
        let mut rebuilt = stored.rebuilt();
        rebuilt.app_id = app_id.clone();
        rebuilt.constraints = compile_constraints(&path, &intent.constraints, false, self.levels);
        Some(rebuilt)
    }
}
