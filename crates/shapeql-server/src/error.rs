use std::path::PathBuf;

/// The server error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration file cannot be read
    #[error("reading {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML or has unknown keys
    #[error("parsing configuration: {0}")]
    ParseConfig(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid log filter: {0}")]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),
    #[error("installing the log subscriber: {0}")]
    Telemetry(#[from] tracing_subscriber::util::TryInitError),
    /// Cannot start the HTTP server
    #[error("starting server: {0}")]
    Server(#[source] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
