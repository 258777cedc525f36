use bimap::BiMap;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::runtime::Handle;

use crate::api::netrap_dto::RegEntry;
use crate::domain::netrap::xrap::{JSON_CONTENT_TYPE, RouteId, XrapReply, XrapRequest, XrapResource};
use crate::domain::utils::id::PeerName;
use crate::domain::utils::scheduled_task::ScheduledTask;

pub const REGISTER_ROUTE: &str = "/register/";

/// Called with the address of a newly registered planner.
pub type Greeter = Arc<dyn Fn(RouteId) + Send + Sync>;

#[derive(Default)]
struct Peers {
    addresses: BiMap<PeerName, RouteId>,
    /// Registration order, most recent last.
    order: Vec<PeerName>,
}

fn hex(route_id: &RouteId) -> String {
    route_id.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Connected planner instances by name.
pub struct Registry {
    peers: RwLock<Peers>,
    greeter: RwLock<Option<Greeter>>,
    greeting: ScheduledTask,
    greeting_delay: Duration,
}

impl Registry {
    pub fn new(handle: Handle, greeting_delay: Duration) -> Self {
        Self {
            peers: RwLock::new(Peers::default()),
            greeter: RwLock::new(None),
            greeting: ScheduledTask::new("netrap-greeting", handle),
            greeting_delay,
        }
    }

    pub fn set_greeter(&self, greeter: Greeter) {
        *self.greeter.write().expect("RwLock poisoned") = Some(greeter);
    }

    /// Records `name` at `route_id`. A name or address seen before is
    /// rebound and counts as the most recent registration.
    pub fn register(&self, name: PeerName, route_id: RouteId) -> RegEntry {
        let mut peers = self.peers.write().expect("RwLock poisoned");
        let displaced = peers.addresses.insert(name.clone(), route_id.clone());
        log::debug!("Registering {} displaced {:?}", name, displaced);

        let Peers { addresses, order } = &mut *peers;
        order.retain(|n| n != &name && addresses.contains_left(n));
        order.push(name.clone());
        log::info!("Registry now contains {} entries", addresses.len());

        RegEntry { name: name.to_string(), route_id: Some(hex(&route_id)) }
    }

    /// Forgets the planner at `route_id`, e.g. after it disconnected.
    pub fn unregister(&self, route_id: &RouteId) -> Option<PeerName> {
        let mut peers = self.peers.write().expect("RwLock poisoned");
        let (name, _) = peers.addresses.remove_by_right(route_id)?;
        peers.order.retain(|n| n != &name);
        Some(name)
    }

    pub fn address_of(&self, name: &PeerName) -> Option<RouteId> {
        self.peers.read().expect("RwLock poisoned").addresses.get_by_left(name).cloned()
    }

    /// Address of the most recently registered planner.
    pub fn latest(&self) -> Option<RouteId> {
        let peers = self.peers.read().expect("RwLock poisoned");
        peers.order.last().and_then(|name| peers.addresses.get_by_left(name)).cloned()
    }

    pub fn entry(&self, name: &PeerName) -> Option<RegEntry> {
        let route_id = self.address_of(name)?;
        Some(RegEntry { name: name.to_string(), route_id: Some(hex(&route_id)) })
    }

    /// # Returns
    /// Returns every entry in registration order.
    pub fn entries(&self) -> Vec<RegEntry> {
        let peers = self.peers.read().expect("RwLock poisoned");
        peers
            .order
            .iter()
            .filter_map(|name| {
                peers.addresses.get_by_left(name).map(|r| RegEntry { name: name.to_string(), route_id: Some(hex(r)) })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().expect("RwLock poisoned").addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn schedule_greeting(&self, route_id: RouteId) {
        let Some(greeter) = self.greeter.read().expect("RwLock poisoned").clone() else {
            log::warn!("No greeter configured, new planner will not receive the topology.");
            return;
        };
        if self.greeting.schedule(self.greeting_delay, move || greeter(route_id)) {
            log::info!("Scheduling a greeting");
        }
    }

    fn entry_reply(etag: String, body: serde_json::Result<String>) -> XrapReply {
        match body {
            Ok(body) => XrapReply::Get {
                status_code: 200,
                content_type: JSON_CONTENT_TYPE.to_string(),
                etag: Some(etag),
                body: body.into(),
            },
            Err(e) => XrapReply::error(500, e.to_string()),
        }
    }
}

impl XrapResource for Registry {
    fn route(&self) -> &str {
        REGISTER_ROUTE
    }

    fn handle_post(&self, request: &XrapRequest) -> XrapReply {
        if request.content_type.as_deref() != Some(JSON_CONTENT_TYPE) {
            log::info!("Bad contentType!");
            return XrapReply::error(400, "Only ContentType: application/json supported");
        }
        let Some(route_id) = request.route_id.clone() else {
            return XrapReply::error(400, "Registration without a sender address");
        };
        let entry: RegEntry = match serde_json::from_slice(&request.body) {
            Ok(entry) => entry,
            Err(e) => return XrapReply::error(400, format!("Malformed registration: {}", e)),
        };

        log::info!("Putting {} into registry", entry.name);
        let registered = self.register(PeerName::new(entry.name), route_id.clone());
        self.schedule_greeting(route_id);

        XrapReply::Post {
            status_code: 201,
            location: Some(format!("{}{}", REGISTER_ROUTE, registered.name)),
            etag: Some(registered.name),
            body: Default::default(),
        }
    }

    fn handle_get(&self, request: &XrapRequest) -> XrapReply {
        let mut name = request.resource.strip_prefix(REGISTER_ROUTE).filter(|n| !n.is_empty()).map(str::to_string);
        if let Some(n) = &name {
            if self.entry(&PeerName::new(n.as_str())).is_none() {
                return XrapReply::error(404, "Could not find resource");
            }
        }

        for (key, value) in request.parameters.iter() {
            if key != "id" {
                log::info!("Unknown parameter {}", key);
                return XrapReply::error(400, format!("Unknown parameter \"{}\"", key));
            }
            if name.is_none() {
                name = Some(value.clone());
            }
        }

        match name.and_then(|n| self.entry(&PeerName::new(n))) {
            Some(entry) => Self::entry_reply(entry.name.clone(), serde_json::to_string(&entry)),
            None => {
                let all: BTreeMap<String, RegEntry> = self.entries().into_iter().map(|e| (e.name.clone(), e)).collect();
                Self::entry_reply("*".to_string(), serde_json::to_string(&all))
            }
        }
    }
}
