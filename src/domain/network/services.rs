use std::net::IpAddr;

use crate::domain::network::model::{ConnectPoint, Device, Host, IntentKey, IntentState, Link, PathIntent, Port};
use crate::domain::utils::id::DeviceId;
use crate::error::Result;

/// Provider intent subsystem.
pub trait IntentService: Send + Sync {
    /// Hands an intent to the provider. An intent with a known key replaces the old one.
    fn submit(&self, intent: PathIntent) -> Result<()>;

    fn withdraw(&self, intent: &PathIntent);

    fn get_intent(&self, key: &IntentKey) -> Option<PathIntent>;

    /// # Returns
    /// Returns None if the intent subsystem cannot be reached.
    fn get_intents(&self) -> Option<Vec<PathIntent>>;

    fn get_intent_state(&self, key: &IntentKey) -> Option<IntentState>;
}

pub trait LinkService: Send + Sync {
    fn get_links(&self) -> Vec<Link>;

    fn get_link(&self, src: &ConnectPoint, dst: &ConnectPoint) -> Option<Link>;

    fn get_device_links(&self, device: &DeviceId) -> Vec<Link> {
        self.get_links().into_iter().filter(|l| &l.src.device_id == device || &l.dst.device_id == device).collect()
    }
}

pub trait HostService: Send + Sync {
    fn get_hosts_by_ip(&self, ip: &IpAddr) -> Vec<Host>;
}

pub trait DeviceService: Send + Sync {
    fn get_devices(&self) -> Vec<Device>;

    fn get_device(&self, id: &DeviceId) -> Option<Device>;

    fn get_port(&self, id: &DeviceId, port: u64) -> Option<Port>;

    fn get_ports(&self, id: &DeviceId) -> Vec<Port>;
}

/// Installs links the planner expects to exist, used when running without a
/// real southbound provider.
pub trait LinkInstaller: Send + Sync {
    fn install_link(&self, src: &ConnectPoint, dst: &ConnectPoint);
}
