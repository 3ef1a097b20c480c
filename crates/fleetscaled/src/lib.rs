//! fleetscaled — the pieces of the fleetscale daemon that are not `main`.
//!
//! - [`intake`]: HTTP endpoint receiving telemetry and exposing state
//! - [`refresh`]: pushes fleet membership to the load balancer after scaling
//! - [`report`]: the per-server CPU reporter

pub mod intake;
pub mod refresh;
pub mod report;
