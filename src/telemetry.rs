//! Telemetry event names and the properties builder. Transmission lives elsewhere.

pub mod event;
pub mod properties;
