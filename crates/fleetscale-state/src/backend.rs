//! Storage backends for the state document.
//!
//! A backend only knows how to load and replace the whole document. The
//! read-modify-write sequencing lives in `DebounceStore`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::types::StateDocument;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Whole-document persistence.
pub trait DocumentBackend: Send + Sync {
    /// Load the current document. A backend with nothing stored yet returns
    /// the empty document.
    fn load(&self) -> StateResult<StateDocument>;

    /// Replace the stored document with `doc`.
    fn save(&self, doc: &StateDocument) -> StateResult<()>;
}

/// JSON file on local disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the temporary file is created in. Must be on the same
    /// filesystem as the target for the rename to be atomic.
    fn staging_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl DocumentBackend for FileBackend {
    fn load(&self) -> StateResult<StateDocument> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StateDocument::default());
            }
            Err(e) => return Err(StateError::Read(format!("{}: {e}", self.path.display()))),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(StateDocument::default());
        }
        serde_json::from_slice(&bytes).map_err(map_err!(Deserialize))
    }

    fn save(&self, doc: &StateDocument) -> StateResult<()> {
        let bytes = serde_json::to_vec_pretty(doc).map_err(map_err!(Serialize))?;
        let mut tmp = NamedTempFile::new_in(self.staging_dir()).map_err(map_err!(Write))?;
        tmp.write_all(&bytes).map_err(map_err!(Write))?;
        tmp.as_file().sync_all().map_err(map_err!(Write))?;
        tmp.persist(&self.path)
            .map_err(|e| StateError::Write(e.error.to_string()))?;
        debug!(path = ?self.path, hosts = doc.hosts.len(), "state document written");
        Ok(())
    }
}

/// Ephemeral in-memory document (for testing).
#[derive(Debug, Default)]
pub struct MemoryBackend {
    doc: Mutex<StateDocument>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentBackend for MemoryBackend {
    fn load(&self) -> StateResult<StateDocument> {
        let doc = self.doc.lock().map_err(|_| StateError::Poisoned)?;
        Ok(doc.clone())
    }

    fn save(&self, doc: &StateDocument) -> StateResult<()> {
        let mut stored = self.doc.lock().map_err(|_| StateError::Poisoned)?;
        *stored = doc.clone();
        Ok(())
    }
}
