pub mod dismi;
pub mod netrap;
pub mod network;
pub mod orchestrator;
pub mod store;
pub mod utils;
