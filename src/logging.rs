use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured log filter.
pub const LOG_ENV: &str = "BABYTRACK_LOG";

/// Install the stderr subscriber. stdout is reserved for command output.
///
/// `BABYTRACK_LOG` wins over `fallback`. Calling this twice is harmless.
pub fn init(fallback: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
