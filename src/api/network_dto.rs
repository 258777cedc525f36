use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;

use crate::domain::network::in_memory::InMemoryNetwork;
use crate::domain::network::model::{ConnectPoint, Device, DeviceType, Host, Link, LinkState, LinkType, Port, PortNumber, PortType};
use crate::domain::utils::id::{DeviceId, HostId};
use crate::error::{Error, Result};

fn connect_point(text: &str) -> Result<ConnectPoint> {
    ConnectPoint::parse(text).ok_or_else(|| Error::ModelConstructionError(format!("'{}' is not a device/port pair", text)))
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PortDto {
    pub number: u64,
    #[serde(rename = "type")]
    pub port_type: PortType,
    /// Mbit/s.
    #[serde(default)]
    pub speed: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDto {
    pub id: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub ports: Vec<PortDto>,
}

impl DeviceDto {
    pub fn into_domain(self) -> (Device, Vec<Port>) {
        let ports = self.ports.into_iter().map(|p| Port { number: PortNumber(p.number), port_type: p.port_type, speed: p.speed }).collect();
        (Device { id: DeviceId::new(self.id), device_type: self.device_type, annotations: self.annotations }, ports)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LinkDto {
    /// `device/port`
    pub src: String,
    pub dst: String,
    #[serde(rename = "type")]
    pub link_type: LinkType,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

fn default_active() -> bool {
    true
}

impl TryFrom<LinkDto> for Link {
    type Error = Error;

    fn try_from(dto: LinkDto) -> Result<Self> {
        let mut link = Link::new(connect_point(&dto.src)?, connect_point(&dto.dst)?, dto.link_type);
        link.state = if dto.active { LinkState::Active } else { LinkState::Inactive };
        link.annotations = dto.annotations;
        Ok(link)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HostDto {
    pub id: String,
    pub ips: Vec<String>,
    pub location: String,
}

impl TryFrom<HostDto> for Host {
    type Error = Error;

    fn try_from(dto: HostDto) -> Result<Self> {
        let ips = dto
            .ips
            .iter()
            .map(|ip| ip.parse::<IpAddr>().map_err(|_| Error::ModelConstructionError(format!("Invalid host address '{}'", ip))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Host { id: HostId::new(dto.id), ips, location: connect_point(&dto.location)? })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkDto {
    pub devices: Vec<DeviceDto>,
    pub links: Vec<LinkDto>,
    pub hosts: Vec<HostDto>,
}

impl NetworkDto {
    /// Adds every device, host and link to `network`. Nothing is added if
    /// any element is malformed.
    pub fn populate(self, network: &InMemoryNetwork) -> Result<()> {
        let links = self.links.into_iter().map(Link::try_from).collect::<Result<Vec<_>>>()?;
        let hosts = self.hosts.into_iter().map(Host::try_from).collect::<Result<Vec<_>>>()?;

        for device in self.devices {
            let (device, ports) = device.into_domain();
            network.add_device(device, ports);
        }
        for host in hosts {
            network.add_host(host);
        }
        let count = links.len();
        for link in links {
            network.add_link(link);
        }
        log::info!("Loaded network with {} links", count);
        Ok(())
    }
}
