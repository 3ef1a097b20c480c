//! Configuration and startup error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading configuration or resolving the provider.
///
/// All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{given} is an unsupported provider, use one of: {}", .supported.join(", "))]
    UnsupportedProvider {
        given: String,
        supported: Vec<&'static str>,
    },

    #[error("configuration has no [{0}] section for the selected provider")]
    MissingProviderSection(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
