use crate::domain::dismi::model::{Endpoint, IpProtocol, IpSelector, Selector};
use crate::domain::network::model::{Criterion, ETH_TYPE_IPV4, ETH_TYPE_IPV6, IpPrefix, TrafficSelector};
use crate::error::{Error, Result};

fn protocol_number(protocol: IpProtocol) -> Option<u8> {
    match protocol {
        IpProtocol::Icmp => Some(1),
        IpProtocol::Tcp => Some(6),
        IpProtocol::Udp => Some(17),
        IpProtocol::Icmp6 => Some(58),
        IpProtocol::All => None,
    }
}

/// Compiles an IP selector into match criteria.
///
/// The ethernet type follows the prefixes: IPv6 if any prefix is v6,
/// IPv4 otherwise. Mixing versions is an error.
pub fn compile_ip_selector(selector: &IpSelector) -> Result<TrafficSelector> {
    let src = selector.src_prefix.as_deref().map(str::parse::<IpPrefix>).transpose()?;
    let dst = selector.dst_prefix.as_deref().map(str::parse::<IpPrefix>).transpose()?;

    if let (Some(s), Some(d)) = (&src, &dst) {
        if s.is_ipv4() != d.is_ipv4() {
            return Err(Error::IpVersionMismatch { src: s.to_string(), dst: d.to_string() });
        }
    }

    let v6 = src.iter().chain(dst.iter()).any(IpPrefix::is_ipv6);
    let mut traffic = TrafficSelector::empty().with(Criterion::EthType(if v6 { ETH_TYPE_IPV6 } else { ETH_TYPE_IPV4 }));

    if let Some(s) = src {
        traffic = traffic.with(if v6 { Criterion::Ipv6Src(s) } else { Criterion::IpSrc(s) });
    }
    if let Some(d) = dst {
        traffic = traffic.with(if v6 { Criterion::Ipv6Dst(d) } else { Criterion::IpDst(d) });
    }
    if let Some(proto) = protocol_number(selector.protocol) {
        traffic = traffic.with(Criterion::IpProto(proto));
    }
    Ok(traffic)
}

/// # Returns
/// Returns None for selectors that have no provider form.
pub fn compile_selector(selector: &Selector) -> Option<Result<TrafficSelector>> {
    match selector {
        Selector::Ip(ip) => Some(compile_ip_selector(ip)),
        Selector::Eth(_) => None,
    }
}

/// Traffic selectors for a path between two endpoints: one derived from the
/// endpoint addresses (IP endpoints only) followed by the request selectors.
/// Compilation stops at the first selector without a provider form.
pub fn build_traffic_selectors(src: &Endpoint, dst: &Endpoint, selectors: &[Selector]) -> Vec<TrafficSelector> {
    let mut compiled = Vec::new();

    match (src.as_ip(), dst.as_ip()) {
        (Some(s), Some(d)) => {
            let endpoint_selector =
                IpSelector { src_prefix: Some(s.in_addr.clone()), dst_prefix: Some(d.in_addr.clone()), protocol: IpProtocol::All };
            match compile_ip_selector(&endpoint_selector) {
                Ok(t) => compiled.push(t),
                Err(e) => log::error!("Could not derive selector from endpoints: {}", e),
            }
        }
        _ => log::error!("Endpoints {} and {} are not both IP endpoints.", src, dst),
    }

    for selector in selectors {
        match compile_selector(selector) {
            Some(Ok(t)) => compiled.push(t),
            Some(Err(e)) => log::error!("Skipping selector: {}", e),
            None => break,
        }
    }
    compiled
}

/// First compiled selector, or the empty selector.
pub fn primary_selector(src: &Endpoint, dst: &Endpoint, selectors: &[Selector]) -> TrafficSelector {
    build_traffic_selectors(src, dst, selectors).into_iter().next().unwrap_or_default()
}
