use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// String identifier tagged with the kind of object it names.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct Id<T> {
    pub id: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(id: impl Into<String>) -> Self {
        Id { id: id.into(), _marker: PhantomData }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<T> From<Id<T>> for String {
    fn from(id_wrapper: Id<T>) -> Self {
        id_wrapper.id
    }
}

impl<T> From<&str> for Id<T> {
    fn from(id: &str) -> Self {
        Id::new(id)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_name = std::any::type_name::<T>();
        let clean_name = full_name.split("::").last().unwrap_or(full_name);
        let display_name = clean_name.replace("Tag", "Id");

        write!(f, "{}: {:?}", display_name, self.id)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct DeviceTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct HostTag;

// Dismi Domain Tags
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct DismiServiceTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct DismiIntentTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct ConnectionPointTag;

// NetRap Domain Tags
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct PlannerPeerTag;

pub type DeviceId = Id<DeviceTag>;
pub type HostId = Id<HostTag>;

// Dismi Domain Aliases
pub type ServiceId = Id<DismiServiceTag>;
pub type DismiIntentId = Id<DismiIntentTag>;
pub type ConnectionPointName = Id<ConnectionPointTag>;

// NetRap Domain Aliases
pub type PeerName = Id<PlannerPeerTag>;

impl DismiIntentId {
    /// The owning service id is everything before the last `-` of the intent id.
    pub fn service_id(&self) -> Option<ServiceId> {
        self.id.rfind('-').map(|pos| ServiceId::new(&self.id[..pos]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_id_is_prefix_before_last_dash() {
        let id = DismiIntentId::new("svc-a-3");
        assert_eq!(id.service_id(), Some(ServiceId::new("svc-a")));
        assert_eq!(DismiIntentId::new("plain").service_id(), None);
    }

    #[test]
    fn id_serializes_as_plain_string() {
        let id = DeviceId::new("of:0001");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"of:0001\"");
        let back: DeviceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
