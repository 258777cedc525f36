use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::dismi::model::{
    AbstractConstraint, Action, Aggregate, Connection, DismiIntent, DismiService, Endpoint, EthEndpoint, EthSelector, FiberEndpoint,
    IpEndpoint, IpProtocol, IpSelector, LambdaEndpoint, Mesh, Multicast, Path, Selector, ServiceAction, Subject, Tree,
};
use crate::domain::utils::id::ServiceId;
use crate::error::{Error, Result};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EndpointDto {
    #[serde(rename_all = "camelCase")]
    Ip { router_id: String, port_id: String, in_addr: String },
    #[serde(rename_all = "camelCase")]
    Eth { switch_id: String, port_id: String, mac: String },
    #[serde(rename_all = "camelCase")]
    Lambda { device_id: String, port_id: String, lambda: u32 },
    #[serde(rename_all = "camelCase")]
    Fiber { device_id: String, port_id: String },
}

impl From<EndpointDto> for Endpoint {
    fn from(dto: EndpointDto) -> Self {
        match dto {
            EndpointDto::Ip { router_id, port_id, in_addr } => Endpoint::Ip(IpEndpoint { router_id, port_id, in_addr }),
            EndpointDto::Eth { switch_id, port_id, mac } => Endpoint::Eth(EthEndpoint { switch_id, port_id, mac }),
            EndpointDto::Lambda { device_id, port_id, lambda } => Endpoint::Lambda(LambdaEndpoint { device_id, port_id, lambda }),
            EndpointDto::Fiber { device_id, port_id } => Endpoint::Fiber(FiberEndpoint { device_id, port_id }),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPointDto {
    pub name: String,
    pub endpoints: Vec<EndpointDto>,
}

impl ConnectionPointDto {
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints.iter().cloned().map(Endpoint::from).collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ConstraintDto {
    Bandwidth(String),
    Delay(String),
    Security(bool),
    Availability(f64),
    HighAvailability(bool),
}

impl From<ConstraintDto> for AbstractConstraint {
    fn from(dto: ConstraintDto) -> Self {
        match dto {
            ConstraintDto::Bandwidth(value) => AbstractConstraint::Bandwidth(value),
            ConstraintDto::Delay(value) => AbstractConstraint::Delay(value),
            ConstraintDto::Security(encryption) => AbstractConstraint::Security { encryption },
            ConstraintDto::Availability(value) => AbstractConstraint::Availability(value),
            ConstraintDto::HighAvailability(value) => AbstractConstraint::HighAvailability(value),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SelectorDto {
    #[serde(rename_all = "camelCase")]
    Ip { src_prefix: Option<String>, dst_prefix: Option<String>, protocol: Option<String> },
    #[serde(rename_all = "camelCase")]
    Eth { src_mac: Option<String>, dst_mac: Option<String>, vlan: Option<u16> },
}

fn parse_protocol(protocol: Option<&str>) -> Result<IpProtocol> {
    match protocol.map(str::to_ascii_uppercase).as_deref() {
        None | Some("ALL") => Ok(IpProtocol::All),
        Some("ICMP") => Ok(IpProtocol::Icmp),
        Some("TCP") => Ok(IpProtocol::Tcp),
        Some("UDP") => Ok(IpProtocol::Udp),
        Some("ICMP6") => Ok(IpProtocol::Icmp6),
        Some(other) => Err(Error::ModelConstructionError(format!("Unknown IP protocol '{}'", other))),
    }
}

impl TryFrom<SelectorDto> for Selector {
    type Error = Error;

    fn try_from(dto: SelectorDto) -> Result<Self> {
        Ok(match dto {
            SelectorDto::Ip { src_prefix, dst_prefix, protocol } => {
                Selector::Ip(IpSelector { src_prefix, dst_prefix, protocol: parse_protocol(protocol.as_deref())? })
            }
            SelectorDto::Eth { src_mac, dst_mac, vlan } => Selector::Eth(EthSelector { src_mac, dst_mac, vlan }),
        })
    }
}

fn selectors(dtos: Vec<SelectorDto>) -> Result<Vec<Selector>> {
    dtos.into_iter().map(Selector::try_from).collect()
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDto {
    pub connection_point: String,
    #[serde(default)]
    pub selectors: Vec<SelectorDto>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDto>,
}

impl TryFrom<SubjectDto> for Subject {
    type Error = Error;

    fn try_from(dto: SubjectDto) -> Result<Self> {
        let mut subject = Subject::new(dto.connection_point);
        subject.selectors = selectors(dto.selectors)?;
        subject.constraints = dto.constraints.into_iter().map(AbstractConstraint::from).collect();
        Ok(subject)
    }
}

fn subjects(dtos: Vec<SubjectDto>) -> Result<Vec<Subject>> {
    dtos.into_iter().map(Subject::try_from).collect()
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActionDto {
    Path { source: SubjectDto, destination: SubjectDto },
    Connection { source: SubjectDto, destination: SubjectDto },
    Mesh { sources: Vec<SubjectDto> },
    Tree { source: SubjectDto, destinations: Vec<SubjectDto> },
    Multicast { source: SubjectDto, destinations: Vec<SubjectDto> },
    Aggregate { sources: Vec<SubjectDto>, destination: SubjectDto },
    Sdwan { source: SubjectDto, destination: SubjectDto },
    Vpn { source: SubjectDto, destination: SubjectDto },
}

impl TryFrom<ActionDto> for Action {
    type Error = Error;

    fn try_from(dto: ActionDto) -> Result<Self> {
        Ok(match dto {
            ActionDto::Path { source, destination } => {
                Action::Path(Path { source: source.try_into()?, destination: destination.try_into()? })
            }
            ActionDto::Connection { source, destination } => {
                Action::Connection(Connection { source: source.try_into()?, destination: destination.try_into()? })
            }
            ActionDto::Mesh { sources } => Action::Mesh(Mesh { sources: subjects(sources)? }),
            ActionDto::Tree { source, destinations } => {
                Action::Tree(Tree { source: source.try_into()?, destinations: subjects(destinations)? })
            }
            ActionDto::Multicast { source, destinations } => {
                Action::Multicast(Multicast { source: source.try_into()?, destinations: subjects(destinations)? })
            }
            ActionDto::Aggregate { sources, destination } => {
                Action::Aggregate(Aggregate { sources: subjects(sources)?, destination: destination.try_into()? })
            }
            ActionDto::Sdwan { source, destination } => {
                Action::Sdwan(ServiceAction { source: source.try_into()?, destination: destination.try_into()? })
            }
            ActionDto::Vpn { source, destination } => {
                Action::Vpn(ServiceAction { source: source.try_into()?, destination: destination.try_into()? })
            }
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IntentDto {
    pub intent_id: String,
    pub display_name: Option<String>,
    pub action: ActionDto,
    #[serde(default)]
    pub constraints: Vec<ConstraintDto>,
    #[serde(default)]
    pub selectors: Vec<SelectorDto>,
    #[serde(default)]
    pub is_negotiable: bool,
    pub priority: Option<u32>,
    pub service_provider_key: Option<String>,
}

impl TryFrom<IntentDto> for DismiIntent {
    type Error = Error;

    fn try_from(dto: IntentDto) -> Result<Self> {
        let mut intent = DismiIntent::new(dto.intent_id, dto.action.try_into()?);
        intent.display_name = dto.display_name;
        intent.constraints = dto.constraints.into_iter().map(AbstractConstraint::from).collect();
        intent.selectors = selectors(dto.selectors)?;
        intent.is_negotiable = dto.is_negotiable;
        intent.priority = dto.priority;
        intent.service_provider_key = dto.service_provider_key;
        Ok(intent)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDto {
    /// Generated when the client leaves it out.
    #[serde(default)]
    pub service_id: Option<String>,
    pub display_name: Option<String>,
    pub intents: Vec<IntentDto>,
}

impl TryFrom<ServiceDto> for DismiService {
    type Error = Error;

    fn try_from(dto: ServiceDto) -> Result<Self> {
        let intents = dto.intents.into_iter().map(DismiIntent::try_from).collect::<Result<Vec<_>>>()?;
        let service_id = dto.service_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        Ok(DismiService { service_id: ServiceId::new(service_id), display_name: dto.display_name, intents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_client_service_json() {
        let json = r#"{
            "serviceId": "s1",
            "intents": [{
                "intentId": "i1",
                "action": {
                    "type": "connection",
                    "source": {"connectionPoint": "cp-a", "constraints": [{"type": "bandwidth", "value": "10mbps"}]},
                    "destination": {"connectionPoint": "cp-b"}
                },
                "selectors": [{"type": "ip", "protocol": "tcp"}]
            }]
        }"#;
        let dto: ServiceDto = serde_json::from_str(json).unwrap();
        let service = DismiService::try_from(dto).unwrap();

        let intent = &service.intents[0];
        assert!(matches!(&intent.action, Action::Connection(c) if c.source.constraints == vec![AbstractConstraint::Bandwidth("10mbps".into())]));
        assert_eq!(intent.selectors, vec![Selector::Ip(IpSelector { src_prefix: None, dst_prefix: None, protocol: IpProtocol::Tcp })]);
    }

    #[test]
    fn missing_service_id_is_generated() {
        let dto: ServiceDto = serde_json::from_str(r#"{"intents": []}"#).unwrap();
        let service = DismiService::try_from(dto).unwrap();
        assert_eq!(service.service_id.as_str().len(), 36, "Should assign a UUID");
    }

    #[test]
    fn unknown_protocol_is_rejected() {
        let dto = SelectorDto::Ip { src_prefix: None, dst_prefix: None, protocol: Some("sctp".into()) };
        assert!(Selector::try_from(dto).is_err(), "Should reject protocols without a known number");
    }
}
