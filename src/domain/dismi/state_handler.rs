use crate::domain::dismi::aci_store::{AciIntentKeyStatus, AciStore};
use crate::domain::dismi::dismi_store::DismiStore;
use crate::domain::dismi::intent_compiler::IntentCompiler;
use crate::domain::dismi::intent_fsm::IntentStateEvent;
use crate::domain::network::model::{IntentEventType, IntentKey, PathIntent};
use crate::domain::utils::id::DismiIntentId;

/// Folds provider intent events back into the lifecycle of the client intent
/// they were compiled from.
pub struct DismiStateHandler {
    dismi_store: DismiStore,
    aci_store: AciStore,
    compiler: IntentCompiler,
}

impl DismiStateHandler {
    pub fn new(dismi_store: DismiStore, aci_store: AciStore, compiler: IntentCompiler) -> Self {
        Self { dismi_store, aci_store, compiler }
    }

    pub fn find_dismi_intent_id(&self, key: &IntentKey) -> Option<DismiIntentId> {
        self.aci_store.find_dismi_intent_id(key)
    }

    /// Records `status` for `key` and advances the client intent accordingly.
    pub fn manage_states(&self, intent: &PathIntent, key: &IntentKey, status: IntentEventType) {
        let Some(dismi_id) = self.find_dismi_intent_id(key) else {
            log::warn!("No client intent owns {}, it was not compiled here.", key);
            return;
        };
        if dismi_id.service_id().and_then(|s| self.dismi_store.get_service(&s)).is_none() {
            log::error!("Service of intent {} is gone.", dismi_id);
            return;
        }

        let status = match status {
            IntentEventType::Corrupt => IntentEventType::Failed,
            other => other,
        };

        let (recorded, change_allowed) = self.change_key_status(intent, &dismi_id, key, status);
        match next_event(&self.aci_store.get_keys(&dismi_id), key, recorded, change_allowed) {
            Some(event) => {
                log::info!("Intent {} next event {:?}.", dismi_id, event);
                self.change_state(&dismi_id, event);
            }
            None => log::debug!("Intent {} keeps its state.", dismi_id),
        }
    }

    fn change_state(&self, dismi_id: &DismiIntentId, event: IntentStateEvent) -> bool {
        if !self.dismi_store.can_change_state(dismi_id, event) {
            let state = self.dismi_store.intent_state(dismi_id).map(|s| s.state());
            log::warn!("Intent {}: event {:?} not allowed from {:?}.", dismi_id, event, state);
            return false;
        }
        self.dismi_store.change_intent_state(dismi_id, event)
    }

    /// Stores the new key status; on failure, moves the intent to the next
    /// remaining candidate.
    ///
    /// # Returns
    /// Returns the status actually recorded for `key` and whether an
    /// installed status may still promote the client intent.
    fn change_key_status(&self, intent: &PathIntent, dismi_id: &DismiIntentId, key: &IntentKey, status: IntentEventType) -> (IntentEventType, bool) {
        let Some(mut entry) = self.aci_store.key_status(dismi_id, key) else {
            return (status, true);
        };

        let mut recorded = status;
        let mut change_allowed = true;

        if status == IntentEventType::Failed {
            let mut links = entry.abstraction_links.take().unwrap_or_default();
            self.change_state(dismi_id, IntentStateEvent::InstallationFailure);
            change_allowed = false;

            log::info!("Intent {} failed, {} candidates remaining.", key, links.len());
            while !links.is_empty() {
                let link = links.remove(0);
                if self.compiler.resubmit_intent(intent, &link) {
                    self.change_state(dismi_id, IntentStateEvent::SubmitForInstallation);
                    recorded = IntentEventType::InstallReq;
                    break;
                }
            }
            entry.abstraction_links = Some(links);
        }

        entry.status = recorded;
        entry.calculated = intent.calculated;
        self.aci_store.update_key(dismi_id, entry);
        (recorded, change_allowed)
    }
}

/// Aggregate event for a client intent given the status of all its provider
/// keys, `status` standing in for `key`.
///
/// Withdrawn only when every key is withdrawn; otherwise the most severe
/// status wins (withdraw request, failed, install request, installed).
pub fn next_event(keys: &[AciIntentKeyStatus], key: &IntentKey, status: IntentEventType, change_allowed: bool) -> Option<IntentStateEvent> {
    let statuses: Vec<IntentEventType> = keys.iter().map(|k| if &k.key == key { status } else { k.status }).collect();
    if statuses.is_empty() {
        return None;
    }

    if statuses.iter().all(|s| *s == IntentEventType::Withdrawn) {
        return Some(IntentStateEvent::WithdrawalSuccess);
    }
    let any = |wanted: IntentEventType| statuses.contains(&wanted);
    if any(IntentEventType::WithdrawReq) {
        Some(IntentStateEvent::SubmitForWithdrawal)
    } else if any(IntentEventType::Failed) {
        Some(IntentStateEvent::InstallationFailure)
    } else if any(IntentEventType::InstallReq) {
        Some(IntentStateEvent::SubmitForInstallation)
    } else if any(IntentEventType::Installed) && change_allowed {
        Some(IntentStateEvent::InstallationSuccess)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::network::model::ApplicationId;

    fn status(k: &str, s: IntentEventType) -> AciIntentKeyStatus {
        AciIntentKeyStatus::new(IntentKey::of_str(k, ApplicationId::new(1, "dismi")), s)
    }

    #[test]
    fn all_installed_promotes() {
        let keys = vec![status("a", IntentEventType::Installed), status("b", IntentEventType::InstallReq)];
        let key = IntentKey::of_str("b", ApplicationId::new(1, "dismi"));
        assert_eq!(next_event(&keys, &key, IntentEventType::Installed, true), Some(IntentStateEvent::InstallationSuccess));
        assert_eq!(next_event(&keys, &key, IntentEventType::Installed, false), None);
    }

    #[test]
    fn failure_outranks_pending() {
        let keys = vec![status("a", IntentEventType::InstallReq), status("b", IntentEventType::Installed)];
        let key = IntentKey::of_str("b", ApplicationId::new(1, "dismi"));
        assert_eq!(next_event(&keys, &key, IntentEventType::Failed, true), Some(IntentStateEvent::InstallationFailure));
    }

    #[test]
    fn withdrawn_needs_every_key() {
        let keys = vec![status("a", IntentEventType::Withdrawn), status("b", IntentEventType::Installed)];
        let key = IntentKey::of_str("b", ApplicationId::new(1, "dismi"));
        assert_eq!(next_event(&keys, &key, IntentEventType::Withdrawn, true), Some(IntentStateEvent::WithdrawalSuccess));
        assert_eq!(next_event(&keys, &IntentKey::of_str("x", ApplicationId::new(1, "dismi")), IntentEventType::Withdrawn, true), Some(IntentStateEvent::InstallationSuccess));
    }
}
