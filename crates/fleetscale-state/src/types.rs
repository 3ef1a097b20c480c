//! Persisted shape of the debounce state.
//!
//! ```json
//! {
//!   "scaling": false,
//!   "hosts": {
//!     "app01.staging.nyc1.example.com": { "timestamp": 1700000000, "type": "max" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use fleetscale_core::{Direction, EpochSecs};
use serde::{Deserialize, Serialize};

/// The full on-disk document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    /// Legacy "scaling in progress" marker. Reset on every removal, never
    /// read by the decision logic.
    #[serde(default)]
    pub scaling: bool,
    /// One entry per host currently outside the utilization band.
    #[serde(default)]
    pub hosts: BTreeMap<String, StoredTransgression>,
}

/// A host's entry as it appears in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransgression {
    /// When the crossing was first observed. Never rewritten while the
    /// entry exists.
    pub timestamp: EpochSecs,
    #[serde(rename = "type")]
    pub direction: Direction,
}

/// A host's debounce record, as handed out by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransgressionRecord {
    pub hostname: String,
    pub first_observed: EpochSecs,
    pub direction: Direction,
}

impl TransgressionRecord {
    pub(crate) fn from_stored(hostname: &str, stored: &StoredTransgression) -> Self {
        Self {
            hostname: hostname.to_string(),
            first_observed: stored.timestamp,
            direction: stored.direction,
        }
    }

    /// Seconds since the crossing was first observed, saturating at the
    /// `EpochSecs` bounds.
    pub fn elapsed(&self, now: EpochSecs) -> EpochSecs {
        now.saturating_sub(self.first_observed)
    }
}
