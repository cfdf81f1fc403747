use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable that switches log output to JSON lines.
pub const LOG_JSON_ENV: &str = "TOKENWALLET_LOG_JSON";

/// Install the global subscriber. Filter comes from `RUST_LOG` (default
/// `info`); output goes to stderr. Calling this twice is harmless.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = std::env::var(LOG_JSON_ENV)
        .map(|value| value == "1")
        .unwrap_or(false);

    if use_json {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .with_writer(std::io::stderr)
            .try_init();
    } else {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
