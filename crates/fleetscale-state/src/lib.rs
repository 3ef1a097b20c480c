//! fleetscale-state — persistent debounce state for the decision engine.
//!
//! Tracks, per host, when a utilization crossing was first observed and in
//! which direction, so that a scaling action only fires once the crossing
//! has persisted for the configured dwell time.
//!
//! # Architecture
//!
//! The whole state is one small JSON document. Every mutating call loads
//! the document, applies its change, and rewrites it in full through a
//! `DocumentBackend`. The file backend writes to a temporary file in the
//! target directory and renames it over the original, so readers never see
//! a truncated document. There is no cross-process locking: one decision
//! maker per document.
//!
//! `DebounceStore` is `Clone` + `Send` + `Sync` (backed by
//! `Arc<dyn DocumentBackend>`) and can be shared with the intake API.

pub mod backend;
pub mod error;
pub mod store;
pub mod types;

pub use backend::{DocumentBackend, FileBackend, MemoryBackend};
pub use error::{StateError, StateResult};
pub use store::DebounceStore;
pub use types::*;
