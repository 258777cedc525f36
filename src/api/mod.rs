pub mod dismi_dto;
pub mod netrap_dto;
pub mod network_dto;
pub mod scenario_dto;
