use crate::config::LogFormat;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes tracing/logging based on environment variables. Logs go to stderr so
/// `ask` output on stdout stays valid JSON.
pub fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}
