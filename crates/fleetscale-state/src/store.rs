//! Per-host transgression records.
//!
//! Each public method is one read-modify-write of the whole document. A
//! call that changes nothing does not rewrite the document.

use std::path::Path;
use std::sync::{Arc, Mutex};

use fleetscale_core::{Direction, EpochSecs};
use tracing::debug;

use crate::backend::{DocumentBackend, FileBackend, MemoryBackend};
use crate::error::{StateError, StateResult};
use crate::types::*;

/// Thread-safe handle to the debounce state.
#[derive(Clone)]
pub struct DebounceStore {
    backend: Arc<dyn DocumentBackend>,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Arc<Mutex<()>>,
}

impl DebounceStore {
    /// Open the document at `path`. The file is created on first write.
    ///
    /// An existing document is loaded once up front so that corruption is
    /// reported at startup rather than on the first telemetry event.
    pub fn open(path: &Path) -> StateResult<Self> {
        let backend = FileBackend::new(path);
        let doc = backend.load()?;
        debug!(?path, hosts = doc.hosts.len(), "debounce store opened");
        Ok(Self::with_backend(Arc::new(backend)))
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> Self {
        Self::with_backend(Arc::new(MemoryBackend::new()))
    }

    pub fn with_backend(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load the document, let `f` mutate it, and save it if `f` reports a change.
    fn modify<R>(&self, f: impl FnOnce(&mut StateDocument) -> (R, bool)) -> StateResult<R> {
        let _guard = self.write_lock.lock().map_err(|_| StateError::Poisoned)?;
        let mut doc = self.backend.load()?;
        let (result, changed) = f(&mut doc);
        if changed {
            self.backend.save(&doc)?;
        }
        Ok(result)
    }

    /// Whole document, for inspection.
    pub fn snapshot(&self) -> StateResult<StateDocument> {
        self.backend.load()
    }

    pub fn has_record(&self, host: &str) -> StateResult<bool> {
        Ok(self.backend.load()?.hosts.contains_key(host))
    }

    pub fn get(&self, host: &str) -> StateResult<Option<TransgressionRecord>> {
        let doc = self.backend.load()?;
        Ok(doc
            .hosts
            .get(host)
            .map(|stored| TransgressionRecord::from_stored(host, stored)))
    }

    /// Record the first crossing for `host`. Returns false, leaving the
    /// existing record and its timestamp untouched, if one is already stored.
    pub fn put(&self, host: &str, timestamp: EpochSecs, direction: Direction) -> StateResult<bool> {
        let inserted = self.modify(|doc| {
            if doc.hosts.contains_key(host) {
                return (false, false);
            }
            doc.hosts.insert(
                host.to_string(),
                StoredTransgression {
                    timestamp,
                    direction,
                },
            );
            (true, true)
        })?;
        if inserted {
            debug!(%host, timestamp, %direction, "transgression recorded");
        }
        Ok(inserted)
    }

    /// Overwrite the stored direction, keeping the original timestamp.
    /// Returns false if there is no record or it already has `direction`.
    pub fn update_direction(&self, host: &str, direction: Direction) -> StateResult<bool> {
        let updated = self.modify(|doc| match doc.hosts.get_mut(host) {
            Some(stored) if stored.direction != direction => {
                stored.direction = direction;
                (true, true)
            }
            _ => (false, false),
        })?;
        if updated {
            debug!(%host, %direction, "transgression direction changed");
        }
        Ok(updated)
    }

    /// Drop the record for `host` and clear the scaling marker.
    /// Returns true if a record existed.
    pub fn remove(&self, host: &str) -> StateResult<bool> {
        let existed = self.modify(|doc| {
            let existed = doc.hosts.remove(host).is_some();
            let was_scaling = std::mem::replace(&mut doc.scaling, false);
            (existed, existed || was_scaling)
        })?;
        if existed {
            debug!(%host, "transgression cleared");
        }
        Ok(existed)
    }

    /// Seconds since the crossing for `host` was first observed.
    pub fn elapsed(&self, host: &str, now: EpochSecs) -> StateResult<Option<EpochSecs>> {
        Ok(self.get(host)?.map(|record| record.elapsed(now)))
    }

    pub fn scaling_in_progress(&self) -> StateResult<bool> {
        Ok(self.backend.load()?.scaling)
    }

    pub fn set_scaling_in_progress(&self, scaling: bool) -> StateResult<()> {
        self.modify(|doc| {
            let changed = doc.scaling != scaling;
            doc.scaling = scaling;
            ((), changed)
        })
    }
}
