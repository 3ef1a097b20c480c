//! Load-balancer refresh error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BalancerError {
    #[error("failed to read template {}: {source}", .path.display())]
    Template {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to render template {}: {source}", .path.display())]
    Render {
        path: PathBuf,
        source: minijinja::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to run reload command `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("reload command `{command}` exited with {status}")]
    Reload { command: String, status: String },
}

pub type BalancerResult<T> = Result<T, BalancerError>;
