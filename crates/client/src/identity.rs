//! Durable slot holding the last-used job id.
//!
//! Lets a later invocation resume a job without repeating `--job`. The
//! slot is never validated: a stale or foreign id only surfaces when the
//! server rejects it.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lecturegen_core::error::CoreError;
use lecturegen_core::types::JobId;
use serde::{Deserialize, Serialize};

/// File name of the state file inside the state directory.
pub const STATE_FILE_NAME: &str = "state.json";

/// Application directory name under the platform data directory.
const APP_DIR_NAME: &str = "lecturegen";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Failed to access job state at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt job state at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No local data directory available; set LECTUREGEN_STATE_DIR")]
    NoStateDir,
}

/// Key-value slot retaining one job id across invocations.
pub trait IdentityStore: Send + Sync {
    /// Persist `id`, overwriting any prior value.
    fn save(&self, id: &JobId) -> Result<(), IdentityError>;

    /// Retrieve the stored id, if any.
    fn load(&self) -> Result<Option<JobId>, IdentityError>;
}

/// Pick the job id for an invocation.
///
/// An explicit id (the `?job=` equivalent) wins over the stored one.
/// Blank explicit values count as absent.
pub fn resolve_job_id(
    explicit: Option<&str>,
    store: &dyn IdentityStore,
) -> Result<JobId, ResolveError> {
    if let Some(id) = explicit.and_then(JobId::parse) {
        return Ok(id);
    }
    store.load()?.ok_or(ResolveError::Missing(CoreError::MissingJobId))
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Missing(CoreError),

    #[error(transparent)]
    Store(#[from] IdentityError),
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    lecture_job_id: Option<JobId>,
}

/// JSON file `{"lecture_job_id": "<id>"}` in a state directory.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    /// Store inside `dir`, which is created on first save.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STATE_FILE_NAME),
        }
    }

    /// Store in the platform's local data directory.
    pub fn default_location() -> Result<Self, IdentityError> {
        let base = dirs::data_local_dir().ok_or(IdentityError::NoStateDir)?;
        Ok(Self::in_dir(base.join(APP_DIR_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> IdentityError {
        IdentityError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl IdentityStore for FileIdentityStore {
    fn save(&self, id: &JobId) -> Result<(), IdentityError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let state = StateFile {
            lecture_job_id: Some(id.clone()),
        };
        let json = serde_json::to_vec_pretty(&state).map_err(|source| IdentityError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))?;
        tracing::debug!(job_id = %id, path = %self.path.display(), "Saved job id");
        Ok(())
    }

    fn load(&self) -> Result<Option<JobId>, IdentityError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let state: StateFile =
            serde_json::from_slice(&bytes).map_err(|source| IdentityError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        Ok(state.lecture_job_id)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    slot: Mutex<Option<JobId>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(id: JobId) -> Self {
        Self {
            slot: Mutex::new(Some(id)),
        }
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn save(&self, id: &JobId) -> Result<(), IdentityError> {
        let mut slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        *slot = Some(id.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<JobId>, IdentityError> {
        let slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        Ok(slot.clone())
    }
}
