pub mod in_memory;
pub mod model;
pub mod services;
