use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Free-form planner attributes. Values are kept as JSON because the planner
/// mixes strings, numbers and lists.
pub type Attributes = BTreeMap<String, Value>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PortId {
    pub device: String,
    pub port: String,
}

impl PortId {
    pub fn new(device: impl Into<String>, port: impl Into<String>) -> Self {
        Self { device: device.into(), port: port.into() }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetRapNode {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(rename = "MTTR", skip_serializing_if = "Option::is_none")]
    pub mttr: Option<f64>,
    #[serde(rename = "MTBF", skip_serializing_if = "Option::is_none")]
    pub mtbf: Option<f64>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetRapLink {
    pub src: String,
    pub dst: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
    #[serde(rename = "MTTR", skip_serializing_if = "Option::is_none")]
    pub mttr: Option<f64>,
    #[serde(rename = "MTBF", skip_serializing_if = "Option::is_none")]
    pub mtbf: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagation_speed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_in_km: Option<f64>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl NetRapLink {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// A planner route. Two routes are equal if everything but the demand id
/// matches; the planner renumbers demands on every recalculation.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetRapRoute {
    #[serde(default)]
    pub links: Vec<NetRapLink>,
    #[serde(default)]
    pub nodes: Vec<NetRapNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demand_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupied_capacity: Option<f64>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl PartialEq for NetRapRoute {
    fn eq(&self, other: &Self) -> bool {
        self.links == other.links
            && self.nodes == other.nodes
            && self.layer == other.layer
            && self.occupied_capacity == other.occupied_capacity
            && self.attributes == other.attributes
    }
}

impl NetRapRoute {
    /// The same route traversed the other way round.
    pub fn reversed(&self) -> Self {
        let mut reversed = self.clone();
        reversed.links.reverse();
        reversed.nodes.reverse();
        reversed
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetRapDemand {
    #[serde(default)]
    pub ingress_node: PortId,
    #[serde(default)]
    pub egress_node: PortId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offered_traffic: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<NetRapRoute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_route: Option<NetRapRoute>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum NetRapActionType {
    New,
    Move,
    Route,
    Fail,
}

impl fmt::Display for NetRapActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetRapActionType::New => "NEW",
            NetRapActionType::Move => "MOVE",
            NetRapActionType::Route => "ROUTE",
            NetRapActionType::Fail => "FAIL",
        };
        write!(f, "{}", name)
    }
}

/// One decision of the planner about a demand.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetRapAction {
    pub action: NetRapActionType,
    pub demand: NetRapDemand,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetRapTopology {
    pub nodes: Vec<NetRapNode>,
    pub links: Vec<NetRapLink>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_equality_ignores_demand_id() {
        let mut a = NetRapRoute { layer: Some(1), ..Default::default() };
        a.demand_id = Some("1".to_string());
        let mut b = a.clone();
        b.demand_id = Some("42".to_string());

        assert_eq!(a, b, "Should ignore the demand id when comparing routes");
        b.layer = Some(0);
        assert_ne!(a, b, "Should compare the layer");
    }

    #[test]
    fn actions_use_upper_case_types() {
        let json = r#"[{"action":"FAIL","demand":{"ingressNode":{"device":"a","port":"1"},
            "egressNode":{"device":"b","port":"2"},"attributes":{"key":"0x1"}}}]"#;
        let actions: Vec<NetRapAction> = serde_json::from_str(json).unwrap();
        assert_eq!(actions[0].action, NetRapActionType::Fail);
        assert_eq!(actions[0].demand.attributes.get("key").map(String::as_str), Some("0x1"));
    }
}
