//! Crash-safe writes for the small files a session keeps: the settings map
//! and the batch report. Both are rewritten whole, so a reader must never
//! see a half-written file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};
use thiserror::Error;

/// Staging files start with this, so a crash leaves recognizable debris.
const STAGING_PREFIX: &str = ".squeeze-";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("directory missing or not writable: {0}")]
    Dir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Creates `dir` if needed and checks a file can be staged in it.
pub fn ensure_dir(dir: &Path) -> Result<(), PersistError> {
    match fs::metadata(dir) {
        Ok(meta) if !meta.is_dir() => {
            return Err(PersistError::Dir(format!("{} is not a directory", dir.display())));
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|e| PersistError::Dir(e.to_string()))?;
        }
        Err(err) => return Err(PersistError::Dir(err.to_string())),
    }
    stage_in(dir).map_err(|e| PersistError::Dir(e.to_string()))?;
    Ok(())
}

fn stage_in(dir: &Path) -> io::Result<NamedTempFile> {
    Builder::new().prefix(STAGING_PREFIX).tempfile_in(dir)
}

/// Replaces `{dir}/{filename}` in one rename.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the final path. On error the previous file, if any, is intact.
    pub fn write(&self, filename: &str, content: impl AsRef<[u8]>) -> Result<PathBuf, PersistError> {
        ensure_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut staged = stage_in(&self.dir)?;
        staged.write_all(content.as_ref())?;
        staged.as_file_mut().sync_all()?;
        staged.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
