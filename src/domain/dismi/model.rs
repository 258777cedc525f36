use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::dismi::intent_fsm::IntentStateMachine;
use crate::domain::utils::id::{ConnectionPointName, DismiIntentId, ServiceId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpEndpoint {
    pub router_id: String,
    pub port_id: String,
    /// Address or prefix reachable behind this port.
    pub in_addr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EthEndpoint {
    pub switch_id: String,
    pub port_id: String,
    pub mac: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LambdaEndpoint {
    pub device_id: String,
    pub port_id: String,
    pub lambda: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiberEndpoint {
    pub device_id: String,
    pub port_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    Ip(IpEndpoint),
    Eth(EthEndpoint),
    Lambda(LambdaEndpoint),
    Fiber(FiberEndpoint),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointType {
    Ip,
    Eth,
    Lambda,
    Fiber,
}

impl EndpointType {
    pub const ALL: [EndpointType; 4] = [EndpointType::Ip, EndpointType::Eth, EndpointType::Lambda, EndpointType::Fiber];
}

impl Endpoint {
    pub fn endpoint_type(&self) -> EndpointType {
        match self {
            Endpoint::Ip(_) => EndpointType::Ip,
            Endpoint::Eth(_) => EndpointType::Eth,
            Endpoint::Lambda(_) => EndpointType::Lambda,
            Endpoint::Fiber(_) => EndpointType::Fiber,
        }
    }

    pub fn as_ip(&self) -> Option<&IpEndpoint> {
        match self {
            Endpoint::Ip(ip) => Some(ip),
            _ => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Ip(e) => write!(f, "ip[{}/{} {}]", e.router_id, e.port_id, e.in_addr),
            Endpoint::Eth(e) => write!(f, "eth[{}/{} {}]", e.switch_id, e.port_id, e.mac),
            Endpoint::Lambda(e) => write!(f, "lambda[{}/{} {}]", e.device_id, e.port_id, e.lambda),
            Endpoint::Fiber(e) => write!(f, "fiber[{}/{}]", e.device_id, e.port_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AbstractConstraint {
    /// Bandwidth with unit, e.g. `10mbps`.
    Bandwidth(String),
    /// Delay with unit, e.g. `20ms`.
    Delay(String),
    Security { encryption: bool },
    /// Availability in percent.
    Availability(f64),
    HighAvailability(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpProtocol {
    Icmp,
    Tcp,
    Udp,
    Icmp6,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpSelector {
    pub src_prefix: Option<String>,
    pub dst_prefix: Option<String>,
    pub protocol: IpProtocol,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthSelector {
    pub src_mac: Option<String>,
    pub dst_mac: Option<String>,
    pub vlan: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    Ip(IpSelector),
    Eth(EthSelector),
}

/// A participant of a request: a connection point name plus its own
/// selectors, constraints and, once resolved, candidate endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub connection_point: ConnectionPointName,
    pub selectors: Vec<Selector>,
    pub constraints: Vec<AbstractConstraint>,
    pub endpoints: Vec<Endpoint>,
}

impl Subject {
    pub fn new(connection_point: impl Into<String>) -> Self {
        Self { connection_point: ConnectionPointName::new(connection_point), selectors: Vec::new(), constraints: Vec::new(), endpoints: Vec::new() }
    }

    pub fn with_endpoints(mut self, endpoints: Vec<Endpoint>) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_constraint(mut self, constraint: AbstractConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Appends `constraints` that are not present yet.
    pub fn add_constraints(&mut self, constraints: &[AbstractConstraint]) {
        for c in constraints {
            if !self.constraints.contains(c) {
                self.constraints.push(c.clone());
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub source: Subject,
    pub destination: Subject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source: Subject,
    pub destination: Subject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub sources: Vec<Subject>,
    pub destination: Subject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multicast {
    pub source: Subject,
    pub destinations: Vec<Subject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub sources: Vec<Subject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub source: Subject,
    pub destinations: Vec<Subject>,
}

/// Two-site service delivered through provider specific intents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAction {
    pub source: Subject,
    pub destination: Subject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Path(Path),
    Connection(Connection),
    Mesh(Mesh),
    Tree(Tree),
    Multicast(Multicast),
    Aggregate(Aggregate),
    Sdwan(ServiceAction),
    Vpn(ServiceAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Path,
    Connection,
    Mesh,
    Tree,
    Multicast,
    Aggregate,
    Sdwan,
    Vpn,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Path(_) => ActionKind::Path,
            Action::Connection(_) => ActionKind::Connection,
            Action::Mesh(_) => ActionKind::Mesh,
            Action::Tree(_) => ActionKind::Tree,
            Action::Multicast(_) => ActionKind::Multicast,
            Action::Aggregate(_) => ActionKind::Aggregate,
            Action::Sdwan(_) => ActionKind::Sdwan,
            Action::Vpn(_) => ActionKind::Vpn,
        }
    }

    pub fn is_service(&self) -> bool {
        matches!(self, Action::Sdwan(_) | Action::Vpn(_))
    }

    pub fn service_action(&self) -> Option<&ServiceAction> {
        match self {
            Action::Sdwan(s) | Action::Vpn(s) => Some(s),
            _ => None,
        }
    }

    /// All subjects, sources first.
    pub fn subjects(&self) -> Vec<&Subject> {
        match self {
            Action::Path(p) => vec![&p.source, &p.destination],
            Action::Connection(c) => vec![&c.source, &c.destination],
            Action::Mesh(m) => m.sources.iter().collect(),
            Action::Tree(t) => std::iter::once(&t.source).chain(t.destinations.iter()).collect(),
            Action::Multicast(m) => std::iter::once(&m.source).chain(m.destinations.iter()).collect(),
            Action::Aggregate(a) => a.sources.iter().chain(std::iter::once(&a.destination)).collect(),
            Action::Sdwan(s) | Action::Vpn(s) => vec![&s.source, &s.destination],
        }
    }

    pub fn subjects_mut(&mut self) -> Vec<&mut Subject> {
        match self {
            Action::Path(p) => vec![&mut p.source, &mut p.destination],
            Action::Connection(c) => vec![&mut c.source, &mut c.destination],
            Action::Mesh(m) => m.sources.iter_mut().collect(),
            Action::Tree(t) => std::iter::once(&mut t.source).chain(t.destinations.iter_mut()).collect(),
            Action::Multicast(m) => std::iter::once(&mut m.source).chain(m.destinations.iter_mut()).collect(),
            Action::Aggregate(a) => a.sources.iter_mut().chain(std::iter::once(&mut a.destination)).collect(),
            Action::Sdwan(s) | Action::Vpn(s) => vec![&mut s.source, &mut s.destination],
        }
    }
}

/// A client intent inside a service, carrying its own lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DismiIntent {
    pub intent_id: DismiIntentId,
    pub display_name: Option<String>,
    pub action: Action,
    pub constraints: Vec<AbstractConstraint>,
    pub selectors: Vec<Selector>,
    pub is_negotiable: bool,
    pub priority: Option<u32>,
    /// Provider intent key picked by the client for service actions.
    pub service_provider_key: Option<String>,
    pub state: IntentStateMachine,
}

impl DismiIntent {
    pub fn new(intent_id: impl Into<String>, action: Action) -> Self {
        Self {
            intent_id: DismiIntentId::new(intent_id),
            display_name: None,
            action,
            constraints: Vec::new(),
            selectors: Vec::new(),
            is_negotiable: false,
            priority: None,
            service_provider_key: None,
            state: IntentStateMachine::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DismiService {
    pub service_id: ServiceId,
    pub display_name: Option<String>,
    pub intents: Vec<DismiIntent>,
}

impl DismiService {
    pub fn intent(&self, intent_id: &DismiIntentId) -> Option<&DismiIntent> {
        self.intents.iter().find(|i| &i.intent_id == intent_id)
    }

    pub fn intent_mut(&mut self, intent_id: &DismiIntentId) -> Option<&mut DismiIntent> {
        self.intents.iter_mut().find(|i| &i.intent_id == intent_id)
    }
}

/// One elementary unit of work produced by decomposition: a single path with
/// the intent-level metadata it inherits. Constraints live on the subjects.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericDismiIntent {
    pub intent_no: u32,
    pub intent_id: DismiIntentId,
    pub path: Path,
    pub constraints: Vec<AbstractConstraint>,
    pub selectors: Vec<Selector>,
    pub is_negotiable: bool,
    pub display_name: Option<String>,
    pub priority: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    Create,
    Update,
    Delete,
}
