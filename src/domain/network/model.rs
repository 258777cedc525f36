use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::utils::id::{DeviceId, HostId};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortNumber(pub u64);

impl fmt::Display for PortNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A port on a device, written as `device/port`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectPoint {
    pub device_id: DeviceId,
    pub port: PortNumber,
}

impl ConnectPoint {
    pub fn new(device_id: impl Into<String>, port: u64) -> Self {
        Self { device_id: DeviceId::new(device_id), port: PortNumber(port) }
    }

    /// Parses `device/port`, splitting at the last `/` since device ids may
    /// contain slashes themselves.
    pub fn parse(s: &str) -> Option<Self> {
        let (device, port) = s.rsplit_once('/')?;
        if device.is_empty() {
            return None;
        }
        let port = port.trim().parse::<u64>().ok()?;
        Some(Self::new(device, port))
    }
}

impl fmt::Display for ConnectPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device_id, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    Direct,
    Indirect,
    Edge,
    Tunnel,
    Optical,
    Virtual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkState {
    Active,
    Inactive,
}

pub type Annotations = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub src: ConnectPoint,
    pub dst: ConnectPoint,
    pub link_type: LinkType,
    pub state: LinkState,
    pub expected: bool,
    pub annotations: Annotations,
}

impl Link {
    pub fn new(src: ConnectPoint, dst: ConnectPoint, link_type: LinkType) -> Self {
        Self { src, dst, link_type, state: LinkState::Active, expected: false, annotations: Annotations::new() }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    pub fn is_active(&self) -> bool {
        self.state == LinkState::Active
    }

    /// Two links are the same physical link if both ends match.
    pub fn same_ends(&self, src: &ConnectPoint, dst: &ConnectPoint) -> bool {
        &self.src == src && &self.dst == dst
    }
}

/// An ordered, contiguous list of links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NetworkPath {
    pub links: Vec<Link>,
}

impl NetworkPath {
    pub fn new(links: Vec<Link>) -> Self {
        Self { links }
    }

    pub fn src(&self) -> Option<&ConnectPoint> {
        self.links.first().map(|l| &l.src)
    }

    pub fn dst(&self) -> Option<&ConnectPoint> {
        self.links.last().map(|l| &l.dst)
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId {
    pub id: u16,
    pub name: String,
}

impl ApplicationId {
    pub fn new(id: u16, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyValue {
    Long(u64),
    Str(String),
}

/// Application-scoped intent key. Long keys print as `0x<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntentKey {
    pub app_id: ApplicationId,
    pub value: KeyValue,
}

impl IntentKey {
    pub fn of_long(value: u64, app_id: ApplicationId) -> Self {
        Self { app_id, value: KeyValue::Long(value) }
    }

    pub fn of_str(value: impl Into<String>, app_id: ApplicationId) -> Self {
        Self { app_id, value: KeyValue::Str(value.into()) }
    }

    /// Decodes a key string as printed by `Display`.
    ///
    /// # Returns
    /// Returns None if the string claims to be hex (`0x` prefix) but does not parse.
    pub fn decode(s: &str, app_id: ApplicationId) -> Option<Self> {
        match s.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok().map(|v| Self::of_long(v, app_id)),
            None => Some(Self::of_str(s, app_id)),
        }
    }
}

impl fmt::Display for IntentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            KeyValue::Long(v) => write!(f, "0x{:x}", v),
            KeyValue::Str(s) => write!(f, "{}", s),
        }
    }
}

static NEXT_INTENT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntentId(pub u64);

impl IntentId {
    pub fn next() -> Self {
        IntentId(NEXT_INTENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentState {
    InstallReq,
    Compiling,
    Installing,
    Installed,
    Recompiling,
    WithdrawReq,
    Withdrawing,
    Withdrawn,
    Failed,
    Corrupt,
    PurgeReq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentEventType {
    InstallReq,
    Installed,
    Failed,
    WithdrawReq,
    Withdrawn,
    Corrupt,
    Purged,
}

#[derive(Debug, Clone)]
pub struct IntentEvent {
    pub event_type: IntentEventType,
    pub intent: PathIntent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEventType {
    LinkAdded,
    LinkUpdated,
    LinkRemoved,
}

#[derive(Debug, Clone)]
pub struct LinkEvent {
    pub event_type: LinkEventType,
    pub link: Link,
}

#[derive(Debug, Clone, Default)]
pub struct TopologyEvent {
    pub reasons: Vec<LinkEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpPrefix {
    pub addr: IpAddr,
    pub len: u8,
}

impl IpPrefix {
    pub fn is_ipv4(&self) -> bool {
        self.addr.is_ipv4()
    }

    pub fn is_ipv6(&self) -> bool {
        self.addr.is_ipv6()
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (self.addr, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = if self.len == 0 { 0 } else { u32::MAX << (32 - u32::from(self.len.min(32))) };
                u32::from(net) & mask == u32::from(*ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = if self.len == 0 { 0 } else { u128::MAX << (128 - u32::from(self.len.min(128))) };
                u128::from(net) & mask == u128::from(*ip) & mask
            }
            _ => false,
        }
    }
}

impl FromStr for IpPrefix {
    type Err = Error;

    /// Accepts `addr/len` or a bare address (host prefix).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (addr, len) = match s.split_once('/') {
            Some((addr, len)) => (addr, Some(len)),
            None => (s, None),
        };
        let addr: IpAddr = addr.parse().map_err(|_| Error::InvalidPrefix(s.to_string()))?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        let len = match len {
            Some(len) => len.parse::<u8>().map_err(|_| Error::InvalidPrefix(s.to_string()))?,
            None => max,
        };
        if len > max {
            return Err(Error::InvalidPrefix(s.to_string()));
        }
        Ok(Self { addr, len })
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

pub const ETH_TYPE_IPV4: u16 = 0x0800;
pub const ETH_TYPE_IPV6: u16 = 0x86DD;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Criterion {
    EthType(u16),
    IpSrc(IpPrefix),
    IpDst(IpPrefix),
    Ipv6Src(IpPrefix),
    Ipv6Dst(IpPrefix),
    IpProto(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TrafficSelector {
    pub criteria: Vec<Criterion>,
}

impl TrafficSelector {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TrafficTreatment {
    pub instructions: Vec<String>,
}

impl TrafficTreatment {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProviderConstraint {
    Bandwidth { bps: f64 },
    Latency { millis: u64 },
    Encryption,
    HighAvailability,
    Availability(f64),
    Negotiable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentKind {
    PointToPoint,
    ProviderOne,
    ProviderTwo,
}

/// A provider-level point to point intent, optionally with a precomputed
/// primary and backup path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathIntent {
    pub id: IntentId,
    pub app_id: ApplicationId,
    pub key: IntentKey,
    pub kind: IntentKind,
    pub calculated: bool,
    pub priority: u32,
    pub selector: TrafficSelector,
    pub treatment: TrafficTreatment,
    pub constraints: Vec<ProviderConstraint>,
    pub src: ConnectPoint,
    pub dst: ConnectPoint,
    pub path: Option<NetworkPath>,
    pub backup_path: Option<NetworkPath>,
}

impl PathIntent {
    /// A fresh intent with a new id, empty selector and treatment.
    pub fn new(app_id: ApplicationId, key: IntentKey, src: ConnectPoint, dst: ConnectPoint, priority: u32) -> Self {
        Self {
            id: IntentId::next(),
            app_id,
            key,
            kind: IntentKind::PointToPoint,
            calculated: false,
            priority,
            selector: TrafficSelector::empty(),
            treatment: TrafficTreatment::empty(),
            constraints: Vec::new(),
            src,
            dst,
            path: None,
            backup_path: None,
        }
    }

    /// Same intent under the same key with a new id, as a rebuilt intent would get.
    pub fn rebuilt(&self) -> Self {
        Self { id: IntentId::next(), ..self.clone() }
    }

    pub fn is_negotiable(&self) -> bool {
        self.constraints.contains(&ProviderConstraint::Negotiable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    pub ips: Vec<IpAddr>,
    pub location: ConnectPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    Switch,
    Router,
    Roadm,
    Otn,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub device_type: DeviceType,
    pub annotations: Annotations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    Copper,
    OduClt,
    Och,
    Oms,
    Fiber,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub number: PortNumber,
    pub port_type: PortType,
    /// Port speed in Mbit/s.
    pub speed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_point_parses_at_last_slash() {
        let cp = ConnectPoint::parse("netconf:10.0.0.1:830/7").unwrap();
        assert_eq!(cp.device_id.as_str(), "netconf:10.0.0.1:830");
        assert_eq!(cp.port, PortNumber(7));
        assert!(ConnectPoint::parse("no-port").is_none());
    }

    #[test]
    fn long_keys_print_as_hex_and_decode_back() {
        let app = ApplicationId::new(3, "app");
        let key = IntentKey::of_long(255, app.clone());
        assert_eq!(key.to_string(), "0xff");
        assert_eq!(IntentKey::decode("0xff", app.clone()), Some(key));
        assert_eq!(IntentKey::decode("0xzz", app.clone()), None);
        assert_eq!(IntentKey::decode("svc-1", app.clone()), Some(IntentKey::of_str("svc-1", app)));
    }

    #[test]
    fn prefix_parsing_and_containment() {
        let prefix: IpPrefix = "10.0.0.0/24".parse().unwrap();
        assert!(prefix.contains(&"10.0.0.42".parse().unwrap()));
        assert!(!prefix.contains(&"10.0.1.1".parse().unwrap()));
        let host: IpPrefix = "fe80::1".parse().unwrap();
        assert_eq!(host.len, 128);
        assert!("10.0.0.0/40".parse::<IpPrefix>().is_err());
    }
}
