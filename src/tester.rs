//! Test-run orchestration: the web server, runner configuration, scope
//! resolution, suite discovery, and the subprocesses that execute them.

pub mod behat;
pub mod phpunit;
pub mod process;
pub mod runner;
pub mod scope;
pub mod server;
