use tracing_subscriber::{fmt, EnvFilter};

/// Initialize structured logging for the process.
///
/// `RUST_LOG` takes precedence over `default_level`. Must be called once
/// at startup (in main.rs).
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Logging initialized");
}
