use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "MP_LOG";

/// Install a fmt subscriber filtered by `MP_LOG` (default `warn`).
///
/// When a global subscriber is already set it is left in place and the
/// refusal is logged through it at debug level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .try_init()
    {
        tracing::debug!(error = %e, "log subscriber already installed");
    }
}
