//! fleetscale-core — shared types and configuration for fleetscale.
//!
//! Everything the decision engine and its collaborators agree on lives here:
//! the TOML configuration document, the provider identity tag, telemetry
//! events, and the direction/classification vocabulary.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    BalancerConfig, DigitalOceanConfig, FleetConfig, IntakeConfig, NamingConfig, ScalingConfig,
    StateConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
