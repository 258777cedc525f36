use serde::{Deserialize, Serialize};

use crate::api::dismi_dto::{ConnectionPointDto, ServiceDto};
use crate::api::network_dto::NetworkDto;
use crate::config::OrchestratorConfig;

/// A complete offline run: configuration, provider network, connection
/// points and the services clients submit.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ScenarioDto {
    pub config: OrchestratorConfig,
    pub network: NetworkDto,
    pub connection_points: Vec<ConnectionPointDto>,
    pub services: Vec<ServiceDto>,
}
