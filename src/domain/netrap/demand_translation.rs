use std::collections::BTreeMap;

use crate::api::netrap_dto::{NetRapDemand, NetRapRoute, PortId};
use crate::domain::netrap::route_store::RouteStore;
use crate::domain::network::model::{ConnectPoint, PathIntent, ProviderConstraint};

/// Placeholder traffic for intents without a bandwidth constraint, in Gbit/s.
pub const DEFAULT_OFFERED_TRAFFIC: f64 = 0.0001;

pub const ATTR_APP_NAME: &str = "appname";
pub const ATTR_APP_ID: &str = "appid";
pub const ATTR_KEY: &str = "key";
pub const ATTR_ID: &str = "id";
pub const ATTR_MAX_LATENCY: &str = "maxLatencyInMs";

fn port_id(cp: &ConnectPoint) -> PortId {
    PortId::new(cp.device_id.as_str(), cp.port.to_string())
}

fn attributes(intent: &PathIntent) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::from([
        (ATTR_MAX_LATENCY.to_string(), "10000".to_string()),
        ("minAvailability".to_string(), "0.001".to_string()),
        ("wdmClass".to_string(), "0".to_string()),
        (ATTR_APP_NAME.to_string(), intent.app_id.name.clone()),
        (ATTR_APP_ID.to_string(), intent.app_id.id.to_string()),
        (ATTR_KEY.to_string(), intent.key.to_string()),
        (ATTR_ID.to_string(), intent.id.to_string()),
    ]);
    for constraint in intent.constraints.iter() {
        match constraint {
            ProviderConstraint::Latency { millis } => {
                attributes.insert(ATTR_MAX_LATENCY.to_string(), millis.to_string());
            }
            ProviderConstraint::HighAvailability => {
                attributes.insert("Protection".to_string(), "true".to_string());
            }
            _ => {}
        }
    }
    attributes
}

fn offered_traffic(intent: &PathIntent) -> f64 {
    intent
        .constraints
        .iter()
        .rev()
        .find_map(|c| match c {
            ProviderConstraint::Bandwidth { bps } => Some(bps / 1e9),
            _ => None,
        })
        .unwrap_or(DEFAULT_OFFERED_TRAFFIC)
}

fn demand(intent: &PathIntent, ingress: &ConnectPoint, egress: &ConnectPoint, route: Option<NetRapRoute>, backup: Option<NetRapRoute>) -> NetRapDemand {
    NetRapDemand {
        ingress_node: port_id(ingress),
        egress_node: port_id(egress),
        offered_traffic: Some(offered_traffic(intent)),
        route,
        backup_route: backup,
        attributes: attributes(intent),
    }
}

/// Demand for `intent` carrying the routes stored for its key.
pub fn intent_to_demand(intent: &PathIntent, routes: &RouteStore) -> NetRapDemand {
    demand(intent, &intent.src, &intent.dst, routes.route(&intent.key), routes.backup_route(&intent.key))
}

/// Demand for the opposite direction of `intent`, with the stored routes reversed.
pub fn intent_to_reverse_demand(intent: &PathIntent, routes: &RouteStore) -> NetRapDemand {
    let route = routes.route(&intent.key).map(|r| r.reversed());
    let backup = routes.backup_route(&intent.key).map(|r| r.reversed());
    demand(intent, &intent.dst, &intent.src, route, backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::network::model::{ApplicationId, IntentKey};

    fn intent() -> PathIntent {
        let app = ApplicationId::new(7, "org.onosproject.orchestrator.netrap");
        PathIntent::new(app.clone(), IntentKey::of_long(0x1f, app), ConnectPoint::new("r1", 1), ConnectPoint::new("r2", 2), 100)
    }

    #[test]
    fn defaults_and_identity_attributes() {
        let demand = intent_to_demand(&intent(), &RouteStore::new());

        assert_eq!(demand.offered_traffic, Some(DEFAULT_OFFERED_TRAFFIC));
        assert_eq!(demand.attributes["maxLatencyInMs"], "10000");
        assert_eq!(demand.attributes["minAvailability"], "0.001");
        assert_eq!(demand.attributes["wdmClass"], "0");
        assert_eq!(demand.attributes["key"], "0x1f");
        assert_eq!(demand.attributes["appid"], "7");
        assert_eq!(demand.ingress_node, PortId::new("r1", "1"));
        assert!(demand.route.is_none());
    }

    #[test]
    fn constraints_override_defaults() {
        let mut intent = intent();
        intent.constraints = vec![
            ProviderConstraint::Bandwidth { bps: 2e9 },
            ProviderConstraint::Latency { millis: 25 },
            ProviderConstraint::HighAvailability,
        ];
        let demand = intent_to_demand(&intent, &RouteStore::new());

        assert_eq!(demand.offered_traffic, Some(2.0), "Should convert bandwidth to Gbit/s");
        assert_eq!(demand.attributes["maxLatencyInMs"], "25");
        assert_eq!(demand.attributes["Protection"], "true");
    }

    #[test]
    fn reverse_demand_swaps_ends_and_reverses_routes() {
        let intent = intent();
        let routes = RouteStore::new();
        let route = NetRapRoute {
            links: vec![
                crate::api::netrap_dto::NetRapLink { src: "a".into(), dst: "b".into(), ..Default::default() },
                crate::api::netrap_dto::NetRapLink { src: "b".into(), dst: "c".into(), ..Default::default() },
            ],
            layer: Some(0),
            ..Default::default()
        };
        routes.set_route(&intent.key, &route);

        let reverse = intent_to_reverse_demand(&intent, &routes);
        assert_eq!(reverse.ingress_node, PortId::new("r2", "2"));
        assert_eq!(reverse.route.unwrap().links[0].src, "b", "Should reverse the link order");
        assert!(reverse.backup_route.is_none());
    }
}
