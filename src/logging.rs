use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "NETSIM_LOG";

/// Installs the global subscriber: formatted events on stderr, filtered by
/// `NETSIM_LOG` (default `warn`). Test output goes to stdout and stays clean.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
