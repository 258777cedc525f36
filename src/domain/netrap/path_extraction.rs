use crate::api::netrap_dto::{NetRapLink, NetRapRoute};
use crate::domain::netrap::expected_link::ExpectedLink;
use crate::domain::network::model::{ConnectPoint, Link, NetworkPath};
use crate::domain::network::services::LinkService;

fn connect_point(node: &str, port: Option<&str>) -> Option<ConnectPoint> {
    let text = format!("{}/{}", node, port.unwrap_or("null"));
    let cp = ConnectPoint::parse(&text);
    if cp.is_none() {
        log::error!("Planner node {} is not a valid connect point", text);
    }
    cp
}

/// Looks the link up in either direction.
fn lookup(links: &dyn LinkService, src: &ConnectPoint, dst: &ConnectPoint) -> Option<Link> {
    let link = links.get_link(src, dst).or_else(|| links.get_link(dst, src));
    if link.is_none() {
        log::error!("Could not find link between {} and {}", src, dst);
    }
    link
}

/// Resolves a planner IP link. Links without any port are planner-internal
/// and resolve to nothing.
pub fn resolve_ip_link(links: &dyn LinkService, link: &NetRapLink) -> Option<Link> {
    let src_port = link.attribute("srcPort");
    let dst_port = link.attribute("dstPort");
    if src_port.is_none() && dst_port.is_none() {
        log::info!("Dropping planner link {} -> {} without ports", link.src, link.dst);
        return None;
    }

    let src = connect_point(&link.src, src_port)?;
    let dst = connect_point(&link.dst, dst_port)?;
    lookup(links, &src, &dst)
}

/// Resolves a planner optical link. Node names of the form `device/port`
/// carry their own port; links inside one device resolve to nothing.
pub fn resolve_opto_link(links: &dyn LinkService, link: &NetRapLink) -> Option<Link> {
    let split = |node: &str, port: Option<&str>| -> (String, Option<String>) {
        match node.split_once('/') {
            Some((device, port)) => (device.to_string(), Some(port.to_string())),
            None => (node.to_string(), port.map(str::to_string)),
        }
    };
    let (src_node, src_port) = split(&link.src, link.attribute("srcPort"));
    let (dst_node, dst_port) = split(&link.dst, link.attribute("dstPort"));
    if src_node == dst_node {
        return None;
    }

    let src = connect_point(&src_node, src_port.as_deref())?;
    let dst = connect_point(&dst_node, dst_port.as_deref())?;
    lookup(links, &src, &dst)
}

pub fn resolve_opto_route(links: &dyn LinkService, route: &NetRapRoute) -> Vec<Link> {
    route.links.iter().filter_map(|l| resolve_opto_link(links, l)).collect()
}

/// Turns an IP route into a contiguous path.
///
/// Where two consecutive links do not meet, the gap is bridged by a direct
/// link from the first link's source to the second link's destination. If the
/// topology has no such link yet, an inactive placeholder takes its place and
/// the missing link is appended to `expected_links`.
pub fn extract_path(links: &dyn LinkService, route: &NetRapRoute, expected_links: &mut Vec<ExpectedLink>) -> NetworkPath {
    let resolved: Vec<Link> = route.links.iter().filter_map(|l| resolve_ip_link(links, l)).collect();

    let mut path: Vec<Link> = Vec::with_capacity(resolved.len());
    for next in resolved {
        let Some(previous) = path.last() else {
            path.push(next);
            continue;
        };
        if previous.dst.device_id == next.src.device_id {
            path.push(next);
            continue;
        }

        let src = previous.src.clone();
        let dst = next.dst.clone();
        let bridge = match links.get_link(&src, &dst) {
            Some(found) => {
                log::debug!("Found a link to bridge the gap: {} -> {}", found.src, found.dst);
                found
            }
            None => {
                let expected = ExpectedLink::new(src, dst);
                let placeholder = expected.placeholder();
                expected_links.push(expected);
                placeholder
            }
        };
        path.pop();
        path.push(bridge);
    }

    log::debug!("Expected links = {:?}", expected_links);
    NetworkPath::new(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::network::in_memory::InMemoryNetwork;
    use crate::domain::network::model::LinkType;

    fn planner_link(src: &str, dst: &str, ports: Option<(&str, &str)>) -> NetRapLink {
        let mut link = NetRapLink { src: src.into(), dst: dst.into(), layer: Some(1), ..Default::default() };
        if let Some((s, d)) = ports {
            link.attributes.insert("srcPort".into(), s.into());
            link.attributes.insert("dstPort".into(), d.into());
        }
        link
    }

    #[test]
    fn portless_links_are_dropped() {
        let network = InMemoryNetwork::new();
        assert!(resolve_ip_link(&network, &planner_link("a", "b", None)).is_none());
    }

    #[test]
    fn links_resolve_in_either_direction() {
        let network = InMemoryNetwork::new();
        network.add_link(Link::new(ConnectPoint::new("b", 2), ConnectPoint::new("a", 1), LinkType::Direct));

        let resolved = resolve_ip_link(&network, &planner_link("a", "b", Some(("1", "2"))));
        assert_eq!(resolved.map(|l| l.src), Some(ConnectPoint::new("b", 2)), "Should fall back to the reverse link");
    }

    #[test]
    fn optical_links_inside_one_device_are_dropped() {
        let network = InMemoryNetwork::new();
        assert!(resolve_opto_link(&network, &planner_link("roadm/1", "roadm/2", None)).is_none());
    }
}
