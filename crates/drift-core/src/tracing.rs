//! Log output for the drift binary.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "DRIFT_LOG";

const DEFAULT_DIRECTIVES: &str = "info";

/// Filter from `DRIFT_LOG`, then `RUST_LOG`, then `info`.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the global subscriber.
///
/// Logs go to stderr, since stdout may carry the records being ingested.
/// Thread names are included so timer-driven rolls (on `drift-roller`
/// threads) can be told apart from appends.
pub fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter())
        .init();
}
