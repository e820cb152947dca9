//! Runtime glue: validated configuration, environment access, and logging setup.

pub mod config;
pub mod env;
pub mod logging;
