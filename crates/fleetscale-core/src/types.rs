//! Shared types used across fleetscale crates.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Unix timestamp in seconds.
///
/// Signed so that `now - first_observed` never underflows when a telemetry
/// source stamps events slightly ahead of the decision-maker's clock.
pub type EpochSecs = i64;

/// Which edge of the utilization band a host has crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Utilization at or above `max_cpu_utilization`.
    Max,
    /// Utilization at or below `min_cpu_utilization`.
    Min,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Max => "max",
            Direction::Min => "min",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of comparing one utilization reading against the configured band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    ScaleUp,
    ScaleDown,
    Normal,
}

impl Classification {
    /// The band edge this classification crossed, if any.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Classification::ScaleUp => Some(Direction::Max),
            Classification::ScaleDown => Some(Direction::Min),
            Classification::Normal => None,
        }
    }
}

/// Selects the provider backend and the configuration section holding its
/// credentials and naming parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ProviderIdentity {
    DigitalOcean,
}

impl ProviderIdentity {
    /// Every identity this build knows how to drive.
    pub const ALL: &'static [ProviderIdentity] = &[ProviderIdentity::DigitalOcean];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderIdentity::DigitalOcean => "digitalocean",
        }
    }

    pub fn supported() -> Vec<&'static str> {
        Self::ALL.iter().map(|p| p.as_str()).collect()
    }
}

impl fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderIdentity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnsupportedProvider {
                given: s.to_string(),
                supported: Self::supported(),
            })
    }
}

/// A single utilization report from one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub host: String,
    /// Raw reading with "idle percent" semantics, see `utilization()`.
    pub reading: i64,
    /// When the reporter sampled the reading.
    pub timestamp: EpochSecs,
}

impl TelemetryEvent {
    pub fn new(host: impl Into<String>, reading: i64, timestamp: EpochSecs) -> Self {
        Self {
            host: host.into(),
            reading,
            timestamp,
        }
    }
}

/// Current wall-clock time in whole seconds.
pub fn epoch_secs() -> EpochSecs {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as EpochSecs)
        .unwrap_or_default()
}
