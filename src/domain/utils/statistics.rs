/// Target for structured analytics events, see `logger::init_analytics`.
pub const ANALYTICS_TARGET: &str = "netrap_dismi::analytics";
