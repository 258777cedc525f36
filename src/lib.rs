use crate::api::scenario_dto::ScenarioDto;
use crate::error::Result;
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Reads a scenario file holding configuration, network, connection points
/// and client services.
pub fn load_scenario(file_path: &str) -> Result<ScenarioDto> {
    let scenario = parse_json_file::<ScenarioDto>(file_path)?;
    log::info!(
        "Scenario '{}' parsed: {} devices, {} links, {} services.",
        file_path,
        scenario.network.devices.len(),
        scenario.network.links.len(),
        scenario.services.len()
    );
    Ok(scenario)
}
