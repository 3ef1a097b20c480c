//! Decision-engine error types.

use fleetscale_provider::ProviderError;
use fleetscale_state::StateError;
use thiserror::Error;

/// Errors from selecting a fleet member by name.
#[derive(Debug, Error)]
pub enum NamingError {
    #[error("cannot scale down: {count} matching servers, minimum is {min_servers}")]
    CannotScaleDown { count: usize, min_servers: u32 },

    #[error("invalid naming pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Errors that abort a single decision.
///
/// Provider failures are not in here: they are reported as
/// `Decision::ActionFailed` and retried on the next event.
#[derive(Debug, Error)]
pub enum AutoscaleError {
    #[error("state store error: {0}")]
    State(#[from] StateError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("naming error: {0}")]
    Naming(#[from] NamingError),
}

pub type AutoscaleResult<T> = Result<T, AutoscaleError>;
