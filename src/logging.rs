use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins when set; otherwise `default_level` is used.
pub fn build_filter(default_level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level)
            .with_context(|| format!("Invalid log level '{}'", default_level)),
    }
}

/// Diagnostics go to stderr so command output on stdout stays clean.
pub fn init_logging(default_level: &str) -> Result<()> {
    let filter = build_filter(default_level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
