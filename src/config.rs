use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::dismi::constraint_compiler::SelectionLevels;

/// How compound actions are expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Directionality {
    /// Every action is broken down into one-way `Path` primitives.
    Unidirectional,
    /// Every action is broken down into two-way `Connection` primitives.
    #[default]
    Bidirectional,
}

/// How an endpoint is attached to a provider intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum EndpointModel {
    /// IP endpoints map directly onto `router_id/port_id` connect points.
    #[default]
    ConnectPoint,
    /// Endpoints are matched against known hosts by IP and use the host location.
    Host,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorConfig {
    pub directionality: Directionality,
    pub endpoint_model: EndpointModel,
    pub netrap_app_name: String,
    pub dismi_app_name: String,
    pub default_priority: u32,
    pub bw_level: usize,
    pub delay_level: usize,
    pub security_level: usize,
    pub topology_update_delay_ms: u64,
    pub greeting_delay_ms: u64,
    pub fallback_drain_delay_ms: u64,
    pub null_provider: bool,
    pub enforce_unique_connection_points: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            directionality: Directionality::default(),
            endpoint_model: EndpointModel::default(),
            netrap_app_name: "org.onosproject.orchestrator.netrap".to_string(),
            dismi_app_name: "org.onosproject.orchestrator.dismi".to_string(),
            default_priority: 100,
            bw_level: 0,
            delay_level: 0,
            security_level: 0,
            topology_update_delay_ms: 2000,
            greeting_delay_ms: 10,
            fallback_drain_delay_ms: 5000,
            null_provider: false,
            enforce_unique_connection_points: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn selection_levels(&self) -> SelectionLevels {
        SelectionLevels { bw_level: self.bw_level, delay_level: self.delay_level, security_level: self.security_level }
    }

    pub fn topology_update_delay(&self) -> Duration {
        Duration::from_millis(self.topology_update_delay_ms)
    }

    pub fn greeting_delay(&self) -> Duration {
        Duration::from_millis(self.greeting_delay_ms)
    }

    pub fn fallback_drain_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_drain_delay_ms)
    }
}
