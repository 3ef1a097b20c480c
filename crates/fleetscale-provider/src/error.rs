//! Provider error types.

use fleetscale_core::{ConfigError, ProviderIdentity};
use thiserror::Error;

/// Errors that prevent a provider call from producing an outcome at all.
///
/// An API that answers with a refusal is not an error; it yields an
/// unsuccessful `ActionOutcome` instead.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response from {endpoint}: {message}")]
    Response { endpoint: String, message: String },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("no backend available for provider {0}")]
    Unsupported(ProviderIdentity),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
