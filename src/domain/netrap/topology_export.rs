use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::netrap_dto::{NetRapLink, NetRapNode, NetRapTopology};
use crate::domain::netrap::expected_link::NETRAP_ANNOTATION;
use crate::domain::netrap::xrap::{XrapReply, XrapRequest, XrapResource};
use crate::domain::network::model::{Annotations, Device, DeviceType, Link, LinkType, Port, PortType};
use crate::domain::network::services::{DeviceService, LinkService};
use crate::error::{Error, Result};

pub const TOPOLOGY_ROUTE: &str = "/topology/";

const OPTO_LAYER: i32 = 0;
const IP_LAYER: i32 = 1;
const OPTO_CAPACITY: f64 = 80.0;

const LATITUDE: &str = "latitude";
const LONGITUDE: &str = "longitude";

/// Builds the planner's view of the network from devices and links.
pub struct TopologyExporter {
    links: Arc<dyn LinkService>,
    devices: Arc<dyn DeviceService>,
}

impl TopologyExporter {
    pub fn new(links: Arc<dyn LinkService>, devices: Arc<dyn DeviceService>) -> Self {
        Self { links, devices }
    }

    /// Links annotated with `netRap` were put there for the planner and are
    /// left out. Links between unsupported port types are skipped with an error.
    pub fn build_topology(&self) -> NetRapTopology {
        let mut devices = self.devices.get_devices();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        let nodes = devices.iter().filter_map(node).collect();

        let mut links = self.links.get_links();
        links.sort_by(|a, b| (&a.src.device_id, a.src.port.0).cmp(&(&b.src.device_id, b.src.port.0)));
        let links = links.iter().filter(|l| l.annotation(NETRAP_ANNOTATION).is_none()).filter_map(|l| self.link(l)).collect();

        NetRapTopology { nodes, links }
    }

    pub fn topology_json(&self) -> Result<String> {
        serde_json::to_string(&self.build_topology()).map_err(Error::from)
    }

    fn link(&self, link: &Link) -> Option<NetRapLink> {
        let src_port = self.devices.get_port(&link.src.device_id, link.src.port.0)?;
        let dst_port = self.devices.get_port(&link.dst.device_id, link.dst.port.0)?;

        match link.link_type {
            LinkType::Direct => {
                let speed = match (src_port.port_type, dst_port.port_type) {
                    (PortType::Copper, PortType::Copper) => src_port.speed.max(dst_port.speed),
                    (PortType::Copper, PortType::OduClt) => dst_port.speed,
                    (PortType::OduClt, PortType::Copper) => src_port.speed,
                    _ => {
                        log::error!("Direct link {} -> {} isn't between copper/copper or copper/oduclt!", link.src, link.dst);
                        return None;
                    }
                };
                Some(ip_link(link, &src_port, &dst_port, speed as f64 / 1000.0))
            }
            LinkType::Optical => match (src_port.port_type, dst_port.port_type) {
                (PortType::Och, PortType::Oms) | (PortType::Oms, PortType::Och) | (PortType::Oms, PortType::Oms) => {
                    Some(opto_link(link, &src_port, &dst_port))
                }
                _ => {
                    log::error!("Optical link {} -> {} isn't between och/oms or oms/oms!", link.src, link.dst);
                    None
                }
            },
            _ => None,
        }
    }
}

fn with_link_defaults(link: &Link, layer: i32, capacity: f64) -> NetRapLink {
    let mut exported = NetRapLink {
        src: link.src.device_id.to_string(),
        dst: link.dst.device_id.to_string(),
        layer: Some(layer),
        capacity: Some(capacity),
        mttr: Some(24.0),
        mtbf: Some(24.0 * 365.0 * 2.0),
        propagation_speed: Some(200_000),
        length_in_km: Some(1.0),
        attributes: BTreeMap::new(),
    };

    for (key, value) in link.annotations.iter() {
        let parsed = match key.as_str() {
            "MTTR" => value.parse().map(|v| exported.mttr = Some(v)).is_ok(),
            "MTBF" => value.parse().map(|v| exported.mtbf = Some(v)).is_ok(),
            "LengthInKm" => value.parse().map(|v| exported.length_in_km = Some(v)).is_ok(),
            "PropagationSpeed" => value.parse().map(|v| exported.propagation_speed = Some(v)).is_ok(),
            _ => {
                exported.attributes.insert(key.clone(), value.clone());
                true
            }
        };
        if !parsed {
            log::warn!("Ignoring malformed {} annotation '{}' on {} -> {}", key, value, link.src, link.dst);
        }
    }
    exported
}

fn ip_link(link: &Link, src: &Port, dst: &Port, capacity: f64) -> NetRapLink {
    let mut exported = with_link_defaults(link, IP_LAYER, capacity);
    exported.attributes.insert("srcPort".to_string(), src.number.to_string());
    exported.attributes.insert("dstPort".to_string(), dst.number.to_string());
    exported.attributes.insert("do not delete me".to_string(), "true".to_string());
    exported.attributes.insert("active".to_string(), link.is_active().to_string());
    exported
}

fn opto_link(link: &Link, src: &Port, dst: &Port) -> NetRapLink {
    let mut exported = with_link_defaults(link, OPTO_LAYER, OPTO_CAPACITY);
    exported.attributes.insert("srcPort".to_string(), src.number.to_string());
    exported.attributes.insert("dstPort".to_string(), dst.number.to_string());
    exported
}

fn node(device: &Device) -> Option<NetRapNode> {
    let (ip_node, kind) = match device.device_type {
        DeviceType::Switch | DeviceType::Router => ("true", "Router"),
        DeviceType::Otn => ("IPtransponder", "Transponder"),
        DeviceType::Roadm => ("false", "TopRoadm"),
        DeviceType::Other => {
            log::warn!("Found unknown device {}", device.id);
            return None;
        }
    };

    let mut attributes: BTreeMap<String, String> =
        BTreeMap::from([("IPNode".to_string(), ip_node.to_string()), ("type".to_string(), kind.to_string())]);
    if kind == "Router" {
        attributes.insert("do not attach IP links to me".to_string(), "true".to_string());
    }
    let (latitude, longitude) = position(&device.annotations, &mut attributes);

    Some(NetRapNode {
        name: device.id.to_string(),
        latitude: Some(latitude),
        longitude: Some(longitude),
        mttr: Some(1.0),
        mtbf: Some(1000.0),
        attributes,
    })
}

/// Splits device annotations into coordinates and plain attributes.
fn position(annotations: &Annotations, attributes: &mut BTreeMap<String, String>) -> (f64, f64) {
    let (mut latitude, mut longitude) = (0.0, 0.0);
    for (key, value) in annotations.iter() {
        match key.as_str() {
            LATITUDE => latitude = value.parse().unwrap_or(0.0),
            LONGITUDE => longitude = value.parse().unwrap_or(0.0),
            _ => {
                attributes.insert(key.clone(), value.clone());
            }
        }
    }
    (latitude, longitude)
}

impl XrapResource for TopologyExporter {
    fn route(&self) -> &str {
        TOPOLOGY_ROUTE
    }

    fn handle_get(&self, _request: &XrapRequest) -> XrapReply {
        match self.topology_json() {
            Ok(body) => XrapReply::json(body),
            Err(e) => XrapReply::error(500, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::network::in_memory::InMemoryNetwork;
    use crate::domain::network::model::{ConnectPoint, PortNumber};
    use crate::domain::utils::id::DeviceId;

    fn device(id: &str, device_type: DeviceType, port_type: PortType, network: &InMemoryNetwork) {
        let ports = vec![Port { number: PortNumber(1), port_type, speed: 10_000 }];
        network.add_device(Device { id: DeviceId::new(id), device_type, annotations: Annotations::new() }, ports);
    }

    #[test]
    fn exports_ip_links_with_defaults_and_skips_planner_links() {
        let network = InMemoryNetwork::new();
        device("r1", DeviceType::Router, PortType::Copper, &network);
        device("r2", DeviceType::Router, PortType::Copper, &network);
        network.add_link(Link::new(ConnectPoint::new("r1", 1), ConnectPoint::new("r2", 1), LinkType::Direct).with_annotation("MTTR", "5"));
        network.add_link(
            Link::new(ConnectPoint::new("r2", 1), ConnectPoint::new("r1", 1), LinkType::Direct).with_annotation("netRap", "ignore"),
        );

        let exporter = TopologyExporter::new(Arc::new(network.clone()), Arc::new(network));
        let topology = exporter.build_topology();

        assert_eq!(topology.nodes.len(), 2);
        assert_eq!(topology.links.len(), 1, "Should skip links annotated for the planner");
        let link = &topology.links[0];
        assert_eq!(link.layer, Some(1));
        assert_eq!(link.capacity, Some(10.0), "Should convert Mbit/s to Gbit/s");
        assert_eq!(link.mttr, Some(5.0), "Should let annotations override defaults");
        assert_eq!(link.mtbf, Some(17520.0));
        assert_eq!(link.attribute("srcPort"), Some("1"));
        assert_eq!(topology.nodes[0].attributes["type"], "Router");
    }

    #[test]
    fn optical_links_get_fixed_capacity() {
        let network = InMemoryNetwork::new();
        device("otn", DeviceType::Otn, PortType::Och, &network);
        device("roadm", DeviceType::Roadm, PortType::Oms, &network);
        network.add_link(Link::new(ConnectPoint::new("otn", 1), ConnectPoint::new("roadm", 1), LinkType::Optical));

        let topology = TopologyExporter::new(Arc::new(network.clone()), Arc::new(network)).build_topology();
        assert_eq!(topology.links[0].layer, Some(0));
        assert_eq!(topology.links[0].capacity, Some(80.0));
    }
}
