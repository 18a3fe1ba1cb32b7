use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tempfile::Builder;
use tracing::{debug, info};

use crate::domain::SampleId;
use crate::error::AssembleError;
use crate::table::Table;

pub const DEFAULT_CACHE_FILE: &str = "timelapse.cache";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Use,
    Ignore,
}

/// The full sample -> time table mapping. No version or freshness data:
/// a snapshot on disk is trusted as-is.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSnapshot(pub BTreeMap<SampleId, Table>);

#[derive(Debug, Clone, PartialEq)]
pub enum CacheState {
    Valid(TimeSnapshot),
    Absent,
}

#[derive(Debug, Clone)]
pub struct TimeCache {
    path: Utf8PathBuf,
}

impl TimeCache {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn load(&self) -> Result<CacheState, AssembleError> {
        let content = match fs::read(self.path.as_std_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path, "no time cache");
                return Ok(CacheState::Absent);
            }
            Err(_) => return Err(AssembleError::CacheRead(self.path.clone())),
        };
        let snapshot =
            serde_json::from_slice(&content).map_err(|err| AssembleError::CacheParse {
                path: self.path.clone(),
                message: err.to_string(),
            })?;
        Ok(CacheState::Valid(snapshot))
    }

    /// Replaces any previous snapshot via temp file + rename.
    pub fn store(&self, snapshot: &TimeSnapshot) -> Result<(), AssembleError> {
        let write_error = |message: String| AssembleError::CacheWrite {
            path: self.path.clone(),
            message,
        };
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
            _ => Utf8PathBuf::from("."),
        };
        fs::create_dir_all(parent.as_std_path()).map_err(|err| write_error(err.to_string()))?;

        let content = serde_json::to_vec(snapshot).map_err(|err| write_error(err.to_string()))?;
        let temp = Builder::new()
            .prefix("kira-sa-cache")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| write_error(err.to_string()))?;
        fs::write(temp.path(), &content).map_err(|err| write_error(err.to_string()))?;
        temp.persist(self.path.as_std_path())
            .map_err(|err| write_error(err.to_string()))?;
        info!(path = %self.path, samples = snapshot.0.len(), "time cache written");
        Ok(())
    }

    /// Returns whether a snapshot was removed.
    pub fn invalidate(&self) -> Result<bool, AssembleError> {
        match fs::remove_file(self.path.as_std_path()) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(AssembleError::Filesystem(format!(
                "remove {}: {err}",
                self.path
            ))),
        }
    }
}
