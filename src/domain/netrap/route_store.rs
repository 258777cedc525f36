use crate::api::netrap_dto::NetRapRoute;
use crate::domain::network::model::IntentKey;
use crate::domain::store::consistent_map::ConsistentMap;

const PRIMARY_MAP: &str = "onos-intent-netraproute";
const BACKUP_MAP: &str = "onos-intent-netrap-backuproute";

/// Primary and backup planner routes per intent key.
///
/// Routes carry free-form JSON attributes, so they are kept as JSON text
/// inside the maps.
#[derive(Debug, Clone)]
pub struct RouteStore {
    primary: ConsistentMap<IntentKey, String>,
    backup: ConsistentMap<IntentKey, String>,
}

impl Default for RouteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteStore {
    pub fn new() -> Self {
        Self { primary: ConsistentMap::new(PRIMARY_MAP), backup: ConsistentMap::new(BACKUP_MAP) }
    }

    pub fn route(&self, key: &IntentKey) -> Option<NetRapRoute> {
        Self::decode(&self.primary, key)
    }

    pub fn backup_route(&self, key: &IntentKey) -> Option<NetRapRoute> {
        Self::decode(&self.backup, key)
    }

    pub fn set_route(&self, key: &IntentKey, route: &NetRapRoute) {
        Self::encode(&self.primary, key, route);
    }

    pub fn set_backup_route(&self, key: &IntentKey, route: &NetRapRoute) {
        Self::encode(&self.backup, key, route);
    }

    /// Drops both routes of `key`.
    ///
    /// # Returns
    /// Returns true if at least one route was stored.
    pub fn remove(&self, key: &IntentKey) -> bool {
        let primary = self.primary.remove(key).is_some();
        let backup = self.backup.remove(key).is_some();
        primary || backup
    }

    pub fn is_equal_primary_route(&self, key: &IntentKey, route: &NetRapRoute) -> bool {
        self.route(key).is_some_and(|stored| &stored == route)
    }

    /// An absent backup only equals an absent stored backup.
    pub fn is_equal_backup_route(&self, key: &IntentKey, route: Option<&NetRapRoute>) -> bool {
        self.backup_route(key).as_ref() == route
    }

    pub fn len(&self) -> usize {
        self.primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.backup.is_empty()
    }

    fn decode(map: &ConsistentMap<IntentKey, String>, key: &IntentKey) -> Option<NetRapRoute> {
        let raw = map.get(key)?;
        serde_json::from_str(&raw).map_err(|e| log::error!("Stored route for {} in {} is unreadable: {}", key, map.name(), e)).ok()
    }

    fn encode(map: &ConsistentMap<IntentKey, String>, key: &IntentKey, route: &NetRapRoute) {
        let stored = serde_json::to_string(route).map_err(crate::error::Error::from).and_then(|json| map.put(key.clone(), &json));
        if let Err(e) = stored {
            log::error!("Could not store route for {} in {}: {}", key, map.name(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::network::model::ApplicationId;

    #[test]
    fn backup_comparison_treats_absence_as_a_value() {
        let store = RouteStore::new();
        let key = IntentKey::of_long(1, ApplicationId::new(1, "app"));
        let route = NetRapRoute { layer: Some(1), ..Default::default() };

        assert!(store.is_equal_backup_route(&key, None), "Should match when neither side has a backup");
        store.set_backup_route(&key, &route);
        assert!(!store.is_equal_backup_route(&key, None), "Should not match a stored backup against none");
        assert!(store.is_equal_backup_route(&key, Some(&route)));
        assert!(store.remove(&key));
        assert!(!store.remove(&key), "Should report nothing removed the second time");
    }
}
