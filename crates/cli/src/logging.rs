//! Tracing subscriber setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter for `krishi serve`.
pub(crate) const SERVE_FILTER: &str = "krishi=info,tower_http=info";

/// Default filter for one-shot commands, whose output is the result itself.
pub(crate) const COMMAND_FILTER: &str = "warn";

/// Install the global subscriber, writing to stderr.
///
/// Filter precedence: `--log-level`, then `RUST_LOG`, then `KRISHI_LOG`,
/// then `default_filter`. `--quiet` lowers the default to errors only.
pub(crate) fn init(level: Option<&str>, default_filter: &str, quiet: bool) {
    let filter = level
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .or_else(|| EnvFilter::try_from_env("KRISHI_LOG").ok())
        .unwrap_or_else(|| EnvFilter::new(if quiet { "error" } else { default_filter }));

    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
