use tracing_subscriber::EnvFilter;

use crate::cli::args::LogFormat;

/// Log to stderr; `RUST_LOG` wins over the `info` default.
pub fn init(format: LogFormat) {
    if let Err(e) = install(format) {
        eprintln!("Warning: failed to install log subscriber: {}", e);
    }
}

fn install(format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
}
