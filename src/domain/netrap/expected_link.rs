use std::fmt;

use crate::domain::network::model::{Annotations, ConnectPoint, Link, LinkState, LinkType};

/// Annotation that keeps a link out of the exported topology.
pub const NETRAP_ANNOTATION: &str = "netRap";
pub const NETRAP_IGNORE: &str = "ignore";

/// A link the planner routed over that has not shown up in the topology yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedLink {
    pub src: ConnectPoint,
    pub dst: ConnectPoint,
    pub annotations: Annotations,
}

impl ExpectedLink {
    pub fn new(src: ConnectPoint, dst: ConnectPoint) -> Self {
        let mut annotations = Annotations::new();
        annotations.insert(NETRAP_ANNOTATION.to_string(), NETRAP_IGNORE.to_string());
        Self { src, dst, annotations }
    }

    pub fn ends(&self) -> (ConnectPoint, ConnectPoint) {
        (self.src.clone(), self.dst.clone())
    }

    pub fn matches(&self, link: &Link) -> bool {
        link.same_ends(&self.src, &self.dst)
    }

    /// Inactive stand-in used inside a path until the real link exists.
    pub fn placeholder(&self) -> Link {
        Link {
            src: self.src.clone(),
            dst: self.dst.clone(),
            link_type: LinkType::Direct,
            state: LinkState::Inactive,
            expected: true,
            annotations: self.annotations.clone(),
        }
    }
}

impl fmt::Display for ExpectedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExpectedLink{{src={}, dst={}}}", self.src, self.dst)
    }
}
