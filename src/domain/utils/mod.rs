pub mod executor;
pub mod id;
pub mod scheduled_task;
pub mod statistics;
