//! Fixture paths, the dependency manifest, and the package registry.

pub mod error;
pub mod facade;
pub mod manifest;
pub mod package;
pub mod package_manager;
