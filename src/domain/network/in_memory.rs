use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};

use crate::domain::network::model::{
    ConnectPoint, Device, Host, IntentKey, IntentState, Link, LinkEvent, LinkEventType, LinkState, LinkType, PathIntent, Port,
};
use crate::domain::network::services::{DeviceService, HostService, IntentService, LinkInstaller, LinkService};
use crate::domain::utils::id::DeviceId;
use crate::error::{Error, Result};

pub type LinkListener = Arc<dyn Fn(&LinkEvent) + Send + Sync>;

#[derive(Default)]
struct NetworkInner {
    devices: HashMap<DeviceId, Device>,
    ports: HashMap<DeviceId, Vec<Port>>,
    links: HashMap<(ConnectPoint, ConnectPoint), Link>,
    hosts: Vec<Host>,
}

/// Topology held in memory. Link changes are reported to registered listeners
/// after the internal lock has been released.
#[derive(Clone, Default)]
pub struct InMemoryNetwork {
    inner: Arc<RwLock<NetworkInner>>,
    listeners: Arc<RwLock<Vec<LinkListener>>>,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: LinkListener) {
        self.listeners.write().expect("RwLock poisoned").push(listener);
    }

    pub fn add_device(&self, device: Device, ports: Vec<Port>) {
        let mut guard = self.inner.write().expect("RwLock poisoned");
        guard.ports.insert(device.id.clone(), ports);
        guard.devices.insert(device.id.clone(), device);
    }

    pub fn add_host(&self, host: Host) {
        self.inner.write().expect("RwLock poisoned").hosts.push(host);
    }

    /// Adds or replaces a link and notifies listeners.
    pub fn add_link(&self, link: Link) {
        let event_type = {
            let mut guard = self.inner.write().expect("RwLock poisoned");
            let previous = guard.links.insert((link.src.clone(), link.dst.clone()), link.clone());
            if previous.is_some() { LinkEventType::LinkUpdated } else { LinkEventType::LinkAdded }
        };
        self.notify(LinkEvent { event_type, link });
    }

    pub fn remove_link(&self, src: &ConnectPoint, dst: &ConnectPoint) -> Option<Link> {
        let removed = self.inner.write().expect("RwLock poisoned").links.remove(&(src.clone(), dst.clone()));
        if let Some(link) = &removed {
            self.notify(LinkEvent { event_type: LinkEventType::LinkRemoved, link: link.clone() });
        }
        removed
    }

    fn notify(&self, event: LinkEvent) {
        let listeners: Vec<LinkListener> = self.listeners.read().expect("RwLock poisoned").clone();
        for listener in listeners {
            listener(&event);
        }
    }
}

impl LinkService for InMemoryNetwork {
    fn get_links(&self) -> Vec<Link> {
        self.inner.read().expect("RwLock poisoned").links.values().cloned().collect()
    }

    fn get_link(&self, src: &ConnectPoint, dst: &ConnectPoint) -> Option<Link> {
        self.inner.read().expect("RwLock poisoned").links.get(&(src.clone(), dst.clone())).cloned()
    }
}

impl HostService for InMemoryNetwork {
    fn get_hosts_by_ip(&self, ip: &IpAddr) -> Vec<Host> {
        let guard = self.inner.read().expect("RwLock poisoned");
        guard.hosts.iter().filter(|h| h.ips.contains(ip)).cloned().collect()
    }
}

impl DeviceService for InMemoryNetwork {
    fn get_devices(&self) -> Vec<Device> {
        let guard = self.inner.read().expect("RwLock poisoned");
        let mut devices: Vec<Device> = guard.devices.values().cloned().collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }

    fn get_device(&self, id: &DeviceId) -> Option<Device> {
        self.inner.read().expect("RwLock poisoned").devices.get(id).cloned()
    }

    fn get_port(&self, id: &DeviceId, port: u64) -> Option<Port> {
        let guard = self.inner.read().expect("RwLock poisoned");
        guard.ports.get(id)?.iter().find(|p| p.number.0 == port).cloned()
    }

    fn get_ports(&self, id: &DeviceId) -> Vec<Port> {
        self.inner.read().expect("RwLock poisoned").ports.get(id).cloned().unwrap_or_default()
    }
}

impl LinkInstaller for InMemoryNetwork {
    fn install_link(&self, src: &ConnectPoint, dst: &ConnectPoint) {
        log::info!("Installing expected link {} -> {}", src, dst);
        let mut link = Link::new(src.clone(), dst.clone(), LinkType::Direct);
        link.state = LinkState::Active;
        self.add_link(link);
    }
}

type RejectRule = Box<dyn Fn(&PathIntent) -> bool + Send + Sync>;

#[derive(Default)]
struct IntentInner {
    intents: HashMap<IntentKey, (PathIntent, IntentState)>,
    order: Vec<IntentKey>,
    submissions: Vec<PathIntent>,
    withdrawals: Vec<IntentKey>,
    available: bool,
}

/// Intent store that accepts every submission unless a reject rule matches.
/// Accepted intents go to `InstallReq`.
pub struct InMemoryIntentService {
    inner: RwLock<IntentInner>,
    reject_rule: RwLock<Option<RejectRule>>,
}

impl Default for InMemoryIntentService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIntentService {
    pub fn new() -> Self {
        Self { inner: RwLock::new(IntentInner { available: true, ..Default::default() }), reject_rule: RwLock::new(None) }
    }

    pub fn reject_when(&self, rule: impl Fn(&PathIntent) -> bool + Send + Sync + 'static) {
        *self.reject_rule.write().expect("RwLock poisoned") = Some(Box::new(rule));
    }

    pub fn set_available(&self, available: bool) {
        self.inner.write().expect("RwLock poisoned").available = available;
    }

    pub fn set_state(&self, key: &IntentKey, state: IntentState) {
        if let Some(entry) = self.inner.write().expect("RwLock poisoned").intents.get_mut(key) {
            entry.1 = state;
        }
    }

    /// Every accepted submission, oldest first.
    pub fn submissions(&self) -> Vec<PathIntent> {
        self.inner.read().expect("RwLock poisoned").submissions.clone()
    }

    pub fn withdrawals(&self) -> Vec<IntentKey> {
        self.inner.read().expect("RwLock poisoned").withdrawals.clone()
    }

    pub fn intent_count(&self) -> usize {
        self.inner.read().expect("RwLock poisoned").intents.len()
    }
}

impl IntentService for InMemoryIntentService {
    fn submit(&self, intent: PathIntent) -> Result<()> {
        if let Some(rule) = self.reject_rule.read().expect("RwLock poisoned").as_ref() {
            if rule(&intent) {
                return Err(Error::IntentRejected(format!("{} {} -> {}", intent.key, intent.src, intent.dst)));
            }
        }
        let mut guard = self.inner.write().expect("RwLock poisoned");
        if !guard.intents.contains_key(&intent.key) {
            guard.order.push(intent.key.clone());
        }
        guard.submissions.push(intent.clone());
        guard.intents.insert(intent.key.clone(), (intent, IntentState::InstallReq));
        Ok(())
    }

    fn withdraw(&self, intent: &PathIntent) {
        let mut guard = self.inner.write().expect("RwLock poisoned");
        guard.withdrawals.push(intent.key.clone());
        if let Some(entry) = guard.intents.get_mut(&intent.key) {
            entry.1 = IntentState::WithdrawReq;
        }
    }

    fn get_intent(&self, key: &IntentKey) -> Option<PathIntent> {
        self.inner.read().expect("RwLock poisoned").intents.get(key).map(|(i, _)| i.clone())
    }

    fn get_intents(&self) -> Option<Vec<PathIntent>> {
        let guard = self.inner.read().expect("RwLock poisoned");
        if !guard.available {
            return None;
        }
        Some(guard.order.iter().filter_map(|k| guard.intents.get(k).map(|(i, _)| i.clone())).collect())
    }

    fn get_intent_state(&self, key: &IntentKey) -> Option<IntentState> {
        self.inner.read().expect("RwLock poisoned").intents.get(key).map(|(_, s)| *s)
    }
}
