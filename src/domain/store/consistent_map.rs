use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use crate::error::Result;

/// Named key/value map whose values are held in serialized form, the way a
/// replicated store would keep them. Reads may observe stale data written by
/// another handle; the last write wins.
#[derive(Debug)]
pub struct ConsistentMap<K, V> {
    name: String,
    entries: Arc<RwLock<HashMap<K, Bytes>>>,
    _value: PhantomData<fn() -> V>,
}

impl<K, V> Clone for ConsistentMap<K, V> {
    fn clone(&self) -> Self {
        Self { name: self.name.clone(), entries: self.entries.clone(), _value: PhantomData }
    }
}

impl<K, V> ConsistentMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Serialize + DeserializeOwned,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), entries: Arc::new(RwLock::new(HashMap::new())), _value: PhantomData }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn put(&self, key: K, value: &V) -> Result<()> {
        let encoded = Bytes::from(bincode::serialize(value)?);
        self.entries.write().expect("RwLock poisoned").insert(key, encoded);
        Ok(())
    }

    /// # Returns
    /// Returns Some(value) if present and decodable, else None.
    pub fn get(&self, key: &K) -> Option<V> {
        let raw = self.entries.read().expect("RwLock poisoned").get(key).cloned()?;
        self.decode(&raw)
    }

    /// # Returns
    /// Returns the removed value if the key was present.
    pub fn remove(&self, key: &K) -> Option<V> {
        let raw = self.entries.write().expect("RwLock poisoned").remove(key)?;
        self.decode(&raw)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.read().expect("RwLock poisoned").contains_key(key)
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries.read().expect("RwLock poisoned").keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(K, V)> {
        let guard = self.entries.read().expect("RwLock poisoned");
        guard.iter().filter_map(|(k, raw)| self.decode(raw).map(|v| (k.clone(), v))).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("RwLock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().expect("RwLock poisoned").clear();
    }

    fn decode(&self, raw: &Bytes) -> Option<V> {
        match bincode::deserialize::<V>(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("Map {} holds an undecodable value: {}", self.name, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_entries() {
        let map: ConsistentMap<String, Vec<u32>> = ConsistentMap::new("test");
        let other = map.clone();

        map.put("a".to_string(), &vec![1, 2, 3]).unwrap();

        assert_eq!(other.get(&"a".to_string()), Some(vec![1, 2, 3]));
        assert_eq!(other.remove(&"a".to_string()), Some(vec![1, 2, 3]));
        assert!(map.is_empty());
    }
}
