pub mod demand_translation;
pub mod event_handler;
pub mod expected_link;
pub mod intent_reconciler;
pub mod netrap_service;
pub mod path_extraction;
pub mod planner;
pub mod registry;
pub mod route_store;
pub mod topology_export;
pub mod transaction_queue;
pub mod xrap;
