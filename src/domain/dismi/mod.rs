pub mod abstraction_link;
pub mod aci_store;
pub mod constraint_compiler;
pub mod decomposer;
pub mod dismi_store;
pub mod endpoint_store;
pub mod intent_compiler;
pub mod intent_decomposer_manager;
pub mod intent_fsm;
pub mod model;
pub mod selector_compiler;
pub mod service_api;
pub mod service_decomposer;
pub mod state_handler;
pub mod subject_resolver;
pub mod tracker;
pub mod units;
