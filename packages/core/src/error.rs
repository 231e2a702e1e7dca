use thiserror::Error;

/// Unified process-level error.
///
/// The metrics core never fails at runtime; these cover bootstrapping
/// (configuration, rule files, self-metrics registration).
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
