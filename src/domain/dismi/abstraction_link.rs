use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::dismi::model::{Endpoint, Path};

/// One candidate pairing of physical endpoints for a decomposed path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbstractionLink {
    pub src: Endpoint,
    pub dst: Endpoint,
}

impl AbstractionLink {
    pub fn new(src: Endpoint, dst: Endpoint) -> Self {
        Self { src, dst }
    }
}

impl fmt::Display for AbstractionLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}

/// Ordered candidates, consumed head first.
pub type AbstractionLinkList = Vec<AbstractionLink>;

/// Every source × destination endpoint combination of `path`, source major.
pub fn create_all_endpoint_combinations(path: &Path) -> AbstractionLinkList {
    let mut links = Vec::with_capacity(path.source.endpoints.len() * path.destination.endpoints.len());
    for src in &path.source.endpoints {
        for dst in &path.destination.endpoints {
            links.push(AbstractionLink::new(src.clone(), dst.clone()));
        }
    }
    links
}

/// Removes the first occurrence of `link`.
///
/// # Returns
/// Returns true if the link was present.
pub fn remove_link(links: &mut AbstractionLinkList, link: &AbstractionLink) -> bool {
    match links.iter().position(|l| l == link) {
        Some(index) => {
            links.remove(index);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dismi::model::{IpEndpoint, Subject};

    fn ip(router: &str, port: &str) -> Endpoint {
        Endpoint::Ip(IpEndpoint { router_id: router.into(), port_id: port.into(), in_addr: "10.0.0.1".into() })
    }

    #[test]
    fn combinations_are_source_major() {
        let path = Path {
            source: Subject::new("a").with_endpoints(vec![ip("r1", "1"), ip("r1", "2")]),
            destination: Subject::new("b").with_endpoints(vec![ip("r2", "1"), ip("r2", "2"), ip("r2", "3")]),
        };
        let links = create_all_endpoint_combinations(&path);
        assert_eq!(links.len(), 6);
        assert_eq!(links[0], AbstractionLink::new(ip("r1", "1"), ip("r2", "1")));
        assert_eq!(links[3], AbstractionLink::new(ip("r1", "2"), ip("r2", "1")));
    }

    #[test]
    fn remove_link_only_takes_one() {
        let link = AbstractionLink::new(ip("r1", "1"), ip("r2", "1"));
        let mut links = vec![link.clone(), link.clone()];
        assert!(remove_link(&mut links, &link));
        assert_eq!(links.len(), 1);
    }
}
