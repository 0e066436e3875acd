use crate::config::LogFormat;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Output always goes to stderr; stdout belongs to the stdio
/// transport.
///
/// `RUST_LOG`, when set, replaces `default_level`.
pub fn init(default_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = installed {
        eprintln!("tracing subscriber already installed: {e}");
    }
}
