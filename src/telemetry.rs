use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_FILTER_ENV_VAR: &str = "FORGE_LOG";
pub const DEFAULT_LOG_FILTER: &str = "intent_forge=info,forge_api=info";

/// Installs a global `fmt` subscriber filtered by `FORGE_LOG`.
///
/// Returns `false` when a global subscriber was already installed, which makes
/// repeated calls from hosts and tests harmless.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
