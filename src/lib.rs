pub mod fixture;
pub mod runtime;
pub mod telemetry;
pub mod tester;

pub use fixture::error::PackageError;
pub use fixture::facade::Fixture;
pub use fixture::manifest::ComposerManifest;
pub use fixture::package::Package;
pub use fixture::package_manager::{PackageManager, FOUNDATIONAL_PACKAGE};
pub use runtime::config::{OrcaConfig, OrcaConfigBuilder, OrcaConfigParams};
pub use runtime::env::{EnvReader, MapEnv, ProcessEnv};
pub use runtime::logging::init_tracing;
pub use telemetry::event::TelemetryEventName;
pub use telemetry::properties::{EventProperties, TelemetryEventPropertiesBuilder};
pub use tester::process::{BackgroundProcess, CommandSpec, ProcessRunner, TokioProcessRunner};
pub use tester::runner::{TestRunState, Tester};
pub use tester::scope::TestScope;
pub use tester::server::WebServer;
