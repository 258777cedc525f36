use serde::{Deserialize, Serialize};

use crate::domain::dismi::abstraction_link::AbstractionLinkList;
use crate::domain::network::model::{IntentEventType, IntentKey, PathIntent};
use crate::domain::store::consistent_map::ConsistentMap;
use crate::domain::utils::id::DismiIntentId;

/// Provider intent key registered for a client intent, with the last seen
/// provider status and the candidates not tried yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AciIntentKeyStatus {
    pub key: IntentKey,
    pub status: IntentEventType,
    pub calculated: bool,
    pub abstraction_links: Option<AbstractionLinkList>,
}

impl AciIntentKeyStatus {
    pub fn new(key: IntentKey, status: IntentEventType) -> Self {
        Self { key, status, calculated: false, abstraction_links: None }
    }

    pub fn remaining_links(&self) -> usize {
        self.abstraction_links.as_ref().map_or(0, Vec::len)
    }
}

/// Binds client intents to the provider intents compiled from them.
#[derive(Debug, Clone)]
pub struct AciStore {
    keys: ConsistentMap<DismiIntentId, Vec<AciIntentKeyStatus>>,
    intents: ConsistentMap<IntentKey, PathIntent>,
}

impl Default for AciStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AciStore {
    pub fn new() -> Self {
        Self { keys: ConsistentMap::new("consistent-map-aci-store"), intents: ConsistentMap::new("consistent-map-database-intent-store") }
    }

    pub fn get_keys(&self, dismi_id: &DismiIntentId) -> Vec<AciIntentKeyStatus> {
        self.keys.get(dismi_id).unwrap_or_default()
    }

    pub fn key_status(&self, dismi_id: &DismiIntentId, key: &IntentKey) -> Option<AciIntentKeyStatus> {
        self.get_keys(dismi_id).into_iter().find(|s| &s.key == key)
    }

    pub fn contains_key(&self, dismi_id: &DismiIntentId, key: &IntentKey) -> bool {
        self.key_status(dismi_id, key).is_some()
    }

    /// # Returns
    /// Returns true if an entry was removed.
    pub fn remove_dismi_intent(&self, dismi_id: &DismiIntentId) -> bool {
        self.keys.remove(dismi_id).is_some()
    }

    pub fn put(&self, dismi_id: DismiIntentId, keys: Vec<AciIntentKeyStatus>) {
        if let Err(e) = self.keys.put(dismi_id, &keys) {
            log::error!("Failed to store provider keys: {}", e);
        }
    }

    /// Inserts `status`, replacing any entry with the same key.
    pub fn update_key(&self, dismi_id: &DismiIntentId, status: AciIntentKeyStatus) {
        let mut keys = self.get_keys(dismi_id);
        match keys.iter_mut().find(|s| s.key == status.key) {
            Some(existing) => *existing = status,
            None => keys.push(status),
        }
        self.put(dismi_id.clone(), keys);
    }

    /// Sets the provider status of `key`, keeping its candidates.
    ///
    /// # Returns
    /// Returns false if `key` is not registered for `dismi_id`.
    pub fn update_key_status(&self, dismi_id: &DismiIntentId, key: &IntentKey, status: IntentEventType) -> bool {
        let mut keys = self.get_keys(dismi_id);
        let Some(entry) = keys.iter_mut().find(|s| &s.key == key) else {
            return false;
        };
        entry.status = status;
        self.put(dismi_id.clone(), keys);
        true
    }

    pub fn list_dismi_intent_ids(&self) -> Vec<DismiIntentId> {
        let mut ids = self.keys.keys();
        ids.sort();
        ids
    }

    pub fn add_key_intent(&self, key: IntentKey, intent: &PathIntent) {
        if let Err(e) = self.intents.put(key, intent) {
            log::error!("Failed to store provider intent: {}", e);
        }
    }

    pub fn get_key_intent(&self, key: &IntentKey) -> Option<PathIntent> {
        self.intents.get(key)
    }

    pub fn remove_intent_key(&self, key: &IntentKey) -> Option<PathIntent> {
        self.intents.remove(key)
    }

    /// Stores the remaining candidates of `key`. A key seen for the first time
    /// is registered with status `InstallReq`.
    pub fn update_abstract_link_list(&self, dismi_id: &DismiIntentId, key: &IntentKey, links: Option<AbstractionLinkList>) {
        let mut keys = self.get_keys(dismi_id);
        match keys.iter_mut().find(|s| &s.key == key) {
            Some(existing) => existing.abstraction_links = links,
            None => {
                let mut status = AciIntentKeyStatus::new(key.clone(), IntentEventType::InstallReq);
                status.abstraction_links = links;
                keys.push(status);
            }
        }
        self.put(dismi_id.clone(), keys);
        log::debug!("Candidate list of {} updated.", key);
    }

    /// Client intent that `key` was compiled from.
    pub fn find_dismi_intent_id(&self, key: &IntentKey) -> Option<DismiIntentId> {
        self.keys.entries().into_iter().find(|(_, statuses)| statuses.iter().any(|s| &s.key == key)).map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::network::model::ApplicationId;

    fn key(s: &str) -> IntentKey {
        IntentKey::of_str(s, ApplicationId::new(2, "dismi"))
    }

    #[test]
    fn link_list_update_registers_new_key() {
        let store = AciStore::new();
        let id = DismiIntentId::new("svc-1");
        store.update_abstract_link_list(&id, &key("svc-1-1"), Some(Vec::new()));

        let status = store.key_status(&id, &key("svc-1-1")).unwrap();
        assert_eq!(status.status, IntentEventType::InstallReq);
        assert_eq!(store.find_dismi_intent_id(&key("svc-1-1")), Some(id.clone()));
        assert_eq!(store.find_dismi_intent_id(&key("other")), None);
    }

    #[test]
    fn status_update_keeps_candidates() {
        let store = AciStore::new();
        let id = DismiIntentId::new("svc-1");
        store.update_abstract_link_list(&id, &key("k"), Some(Vec::new()));
        assert!(store.update_key_status(&id, &key("k"), IntentEventType::Installed));
        assert!(!store.update_key_status(&id, &key("missing"), IntentEventType::Installed));

        let status = store.key_status(&id, &key("k")).unwrap();
        assert_eq!(status.status, IntentEventType::Installed);
        assert_eq!(status.abstraction_links, Some(Vec::new()));
    }
}
