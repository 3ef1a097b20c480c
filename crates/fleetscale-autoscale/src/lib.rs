//! fleetscale-autoscale — the decision engine.
//!
//! Turns a stream of per-host CPU readings into at most one provider action
//! per sustained threshold crossing.
//!
//! # Decision Algorithm
//!
//! ```text
//! u = 100 - reading        (reading <= 100)
//! u = reading              (reading > 100)
//!
//! if u >= max_cpu: direction = max
//! elif u <= min_cpu: direction = min
//! else: clear the host's record, done
//!
//! no record           -> record (host, event timestamp, direction)
//! dwelled && same dir -> scale; clear the record only on success
//! different dir       -> overwrite direction, keep timestamp
//! otherwise           -> keep waiting
//! ```
//!
//! A failed action leaves the record in place, so the next qualifying
//! event for that host retries it.

pub mod error;
pub mod naming;
pub mod scaler;
pub mod threshold;

pub use error::{AutoscaleError, AutoscaleResult, NamingError};
pub use naming::FleetNaming;
pub use scaler::{Autoscaler, Decision, ScaleAction, ScaledCallback};
pub use threshold::{ThresholdEvaluator, utilization};
