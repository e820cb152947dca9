use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// Variable checked before `RUST_LOG` for harness-specific filtering.
pub const LOG_ENV: &str = "ORCA_LOG";
/// Harness events at `info`, everything else only when it warns.
pub const DEFAULT_LOG_DIRECTIVE: &str = "warn,orca=info";

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs the harness's fmt subscriber unless one is already active.
///
/// The filter comes from `ORCA_LOG`, then `RUST_LOG`, then [`DEFAULT_LOG_DIRECTIVE`].
pub fn init_tracing() {
    TRACING_INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_target(true)
            .try_init();
    });
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
}
