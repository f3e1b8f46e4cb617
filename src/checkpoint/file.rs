//! JSON checkpoint file (`bot_state.json`)
//!
//! Writes go to an unpredictable temp file in the target directory, are synced,
//! and then renamed over the target, so readers see either the old or the new
//! checkpoint and never a truncated one. The directory is synced after the
//! rename so the new entry is durable too.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{Checkpoint, CheckpointStore};
use crate::error::PersistenceError;

/// Checkpoint store backed by a single JSON file
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Directory the temp file is staged in; must be on the same filesystem as the target
    fn staging_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn read(&self) -> Result<Checkpoint, PersistenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no checkpoint found, starting from the beginning");
                return Ok(Checkpoint::fresh());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let checkpoint: Checkpoint =
            serde_json::from_str(&content).map_err(|source| PersistenceError::Parse {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(
            path = %self.path.display(),
            next_index = checkpoint.next_index,
            total_posted = checkpoint.total_posted,
            "checkpoint loaded"
        );
        Ok(checkpoint)
    }

    fn write(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        let mut json =
            serde_json::to_string_pretty(checkpoint).map_err(PersistenceError::Serialize)?;
        json.push('\n');

        let dir = self.staging_dir();
        fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let mut staging = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        staging
            .write_all(json.as_bytes())
            .map_err(|e| self.io_error(e))?;
        staging
            .as_file()
            .sync_all()
            .map_err(|e| self.io_error(e))?;
        staging
            .persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        sync_dir(dir).map_err(|e| self.io_error(e))?;

        tracing::debug!(
            path = %self.path.display(),
            next_index = checkpoint.next_index,
            "checkpoint written"
        );
        Ok(())
    }
}

/// Flush the directory entry so the rename itself survives a crash
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
